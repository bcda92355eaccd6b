//! Fetching and normalizing the remote node directory.
//!
//! The directory format is versioned by whoever runs the map backend. A
//! deployment targets exactly one [`DirectorySchema`] at build time; the
//! reader never sniffs the document to pick one.
use std::marker::PhantomData;

use chrono::{DateTime, NaiveDateTime, Utc};
use knoten_common::{KnotenError, Result};
use knoten_http::{HttpClient, RequestOpts};
use serde::de::DeserializeOwned;

use crate::http_to_knoten;
use crate::node::NodeRecord;

mod meshviewer;
mod nodelist;

pub use meshviewer::{MeshviewerDocument, MeshviewerV2};
pub use nodelist::{NodelistDocument, NodelistV1};

/// One concrete directory document layout and its mapping into [`NodeRecord`].
pub trait DirectorySchema {
    /// Raw document as served by the directory endpoint.
    type Document: DeserializeOwned;

    /// Name used in logs.
    const NAME: &'static str;

    /// Normalize every usable entry, keeping document order. Entries without
    /// an id or a well-formed first-seen timestamp are dropped.
    fn into_records(doc: Self::Document) -> Vec<NodeRecord>;
}

pub struct DirectoryReader<S> {
    http: HttpClient,
    url: String,
    _schema: PhantomData<fn() -> S>,
}

impl<S: DirectorySchema> DirectoryReader<S> {
    pub fn new(url: &str) -> Result<Self> {
        let http = HttpClient::new(url)
            .map_err(|e| KnotenError::Config(format!("directory url {url}: {e}")))?;
        Ok(Self {
            http,
            url: url.to_string(),
            _schema: PhantomData,
        })
    }

    pub fn with_user_agent(mut self, agent: &str) -> Result<Self> {
        self.http = self
            .http
            .with_user_agent(agent)
            .map_err(|e| KnotenError::Config(e.to_string()))?;
        Ok(self)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// GET the directory and normalize it.
    ///
    /// Fails with [`KnotenError::Fetch`] on transport errors or non-success
    /// status, and with [`KnotenError::Decode`] when the body does not match
    /// `S::Document`.
    pub async fn fetch(&self) -> Result<Vec<NodeRecord>> {
        let doc: S::Document = self
            .http
            .get_json(
                &self.url,
                RequestOpts {
                    allow_absolute: true,
                    ..Default::default()
                },
            )
            .await
            .map_err(http_to_knoten)?;

        let records = S::into_records(doc);
        tracing::info!(
            schema = S::NAME,
            url = %self.url,
            nodes = records.len(),
            "directory.fetched"
        );
        Ok(records)
    }
}

/// Parse directory timestamps.
///
/// Accepts RFC 3339, ISO 8601 with a compact offset (`+0200`), and naive
/// `YYYY-MM-DDTHH:MM:SS[.fff]` which is taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Shared by the schema mappings: resolve a first-seen value or log why the
/// entry is being dropped.
pub(crate) fn first_seen(schema: &str, id: &str, raw: Option<&str>) -> Option<DateTime<Utc>> {
    let parsed = raw.and_then(parse_timestamp);
    if parsed.is_none() {
        tracing::warn!(
            schema,
            node_id = %id,
            first_seen = ?raw,
            "directory.node.rejected_timestamp"
        );
    }
    parsed
}

/// Entries without a usable id cannot be linked on the map; drop them.
pub(crate) fn node_id(schema: &str, raw: Option<String>) -> Option<String> {
    match raw.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => Some(id.to_string()),
        _ => {
            tracing::warn!(schema, node_id = ?raw, "directory.node.rejected_id");
            None
        }
    }
}

/// Directories without a hostname still need something readable in the post.
pub(crate) fn display_name(id: &str, name: Option<String>) -> String {
    match name {
        Some(n) if !n.trim().is_empty() => n.trim().to_string(),
        _ => id.to_string(),
    }
}
