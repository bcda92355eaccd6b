//! New-node detection and announcement for Freifunk node directories.
//!
//! One run walks a fixed pipeline: fetch the node directory, keep nodes that
//! first appeared after the cutoff and have a known location, resolve each
//! location to a place name, and announce it. The [`runner::Runner`] ties the
//! stages together; each stage is usable on its own.
//!
//! # Examples
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use knoten_core::filter::filter_new_nodes;
//! use knoten_core::node::{Coordinates, NodeRecord};
//!
//! let cutoff = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
//! let node = NodeRecord {
//!     id: "c04a00dd692a".into(),
//!     display_name: "ff-mitte-01".into(),
//!     first_seen_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
//!     location: Coordinates::from_pair(Some(52.52), Some(13.40)),
//!     online: true,
//! };
//!
//! let fresh = filter_new_nodes(vec![node], cutoff);
//! assert_eq!(fresh.len(), 1);
//! ```
pub mod announce;
pub mod directory;
pub mod filter;
pub mod geo;
pub mod node;
pub mod runner;

use knoten_common::KnotenError;
use knoten_http::HttpError;

pub use announce::{Announcement, Announcer};
pub use directory::{DirectoryReader, DirectorySchema, MeshviewerV2, NodelistV1};
pub use geo::{GeoResolver, PlaceName};
pub use node::{Coordinates, NodeRecord};
pub use runner::{RunPhase, RunReport, Runner};

/// Map transport failures onto the run's error taxonomy.
pub(crate) fn http_to_knoten(e: HttpError) -> KnotenError {
    match e {
        HttpError::Url(_) | HttpError::Build(_) => KnotenError::Config(e.to_string()),
        HttpError::Network(_) | HttpError::Api { .. } => KnotenError::Fetch(e.to_string()),
        HttpError::Decode(..) => KnotenError::Decode(e.to_string()),
    }
}
