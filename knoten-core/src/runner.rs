//! One announcement run, from directory fetch to the last post.
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use knoten_common::{KnotenError, Result};
use knoten_config::KnotenConfig;
use knoten_social::twitter::{OAuthCredentials, TwitterApi};

use crate::announce::{Announcement, Announcer};
use crate::directory::{DirectoryReader, DirectorySchema};
use crate::filter::filter_new_nodes;
use crate::geo::GeoResolver;

/// Gap between consecutive announcements, so bursts of new nodes stay inside
/// the social platform's posting rate limit. Not applied after the last node.
pub const ANNOUNCE_PACE: Duration = Duration::from_millis(1100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Init,
    DirectoryFetched,
    Filtering,
    PerNodeAnnounce,
    Done,
    Fatal,
}

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub cutoff: DateTime<Utc>,
    pub fetched: usize,
    pub candidates: usize,
    pub announcements: Vec<Announcement>,
}

/// `now - lookback`, rejecting windows chrono cannot represent.
pub fn compute_cutoff(now: DateTime<Utc>, lookback: Duration) -> Result<DateTime<Utc>> {
    chrono::Duration::from_std(lookback)
        .ok()
        .and_then(|window| now.checked_sub_signed(window))
        .ok_or_else(|| KnotenError::Config(format!("lookback {lookback:?} out of range")))
}

pub struct Runner<S: DirectorySchema> {
    directory: DirectoryReader<S>,
    geo: GeoResolver,
    announcer: Announcer,
    lookback: Duration,
    pace: Duration,
    phase: RunPhase,
}

impl<S: DirectorySchema> Runner<S> {
    pub fn new(
        directory: DirectoryReader<S>,
        geo: GeoResolver,
        announcer: Announcer,
        lookback: Duration,
    ) -> Self {
        Self {
            directory,
            geo,
            announcer,
            lookback,
            pace: ANNOUNCE_PACE,
            phase: RunPhase::Init,
        }
    }

    /// Wire every stage from a validated configuration. A Twitter client is
    /// only built outside debug mode.
    pub fn from_config(cfg: &KnotenConfig) -> Result<Self> {
        let agent = cfg.geocoder.user_agent.as_str();
        let directory = DirectoryReader::<S>::new(&cfg.freifunk.nodelist_url)?.with_user_agent(agent)?;
        let geo = GeoResolver::new(&cfg.geocoder.endpoint)?
            .with_user_agent(agent)?
            .with_contact_email(cfg.settings.contact_email());

        let map_url = cfg.freifunk.map_url.as_str();
        let language = cfg.settings.language;
        let announcer = if cfg.settings.debug {
            Announcer::dry_run(map_url, language)
        } else {
            let t = &cfg.twitter;
            let credentials = OAuthCredentials::new(
                &t.consumer_key,
                &t.consumer_secret,
                &t.access_token,
                &t.access_token_secret,
            );
            let api = TwitterApi::new(&t.api_base, credentials)?;
            Announcer::posting(map_url, language, Arc::new(api))
        };

        Ok(Self::new(directory, geo, announcer, cfg.settings.lookback()))
    }

    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = pace;
        self
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    fn set_phase(&mut self, phase: RunPhase) {
        tracing::debug!(from = ?self.phase, to = ?phase, "runner.phase");
        self.phase = phase;
    }

    /// Run once against `now`. The first failure aborts the run; nodes
    /// already announced stay announced. Reporting the error is left to the
    /// caller.
    pub async fn run(&mut self, now: DateTime<Utc>) -> Result<RunReport> {
        self.phase = RunPhase::Init;
        match self.run_inner(now).await {
            Ok(report) => {
                self.set_phase(RunPhase::Done);
                tracing::info!(
                    fetched = report.fetched,
                    candidates = report.candidates,
                    announced = report.announcements.len(),
                    "run.done"
                );
                Ok(report)
            }
            Err(e) => {
                self.set_phase(RunPhase::Fatal);
                Err(e)
            }
        }
    }

    async fn run_inner(&mut self, now: DateTime<Utc>) -> Result<RunReport> {
        let cutoff = compute_cutoff(now, self.lookback)?;
        tracing::info!(
            schema = S::NAME,
            url = %self.directory.url(),
            %cutoff,
            dry_run = self.announcer.is_dry_run(),
            "run.start"
        );

        let nodes = self.directory.fetch().await?;
        self.set_phase(RunPhase::DirectoryFetched);
        let fetched = nodes.len();

        self.set_phase(RunPhase::Filtering);
        let candidates = filter_new_nodes(nodes, cutoff);

        self.set_phase(RunPhase::PerNodeAnnounce);
        let mut announcements = Vec::with_capacity(candidates.len());
        for (i, node) in candidates.iter().enumerate() {
            if i > 0 && !self.pace.is_zero() {
                tokio::time::sleep(self.pace).await;
            }
            // filter_new_nodes only keeps located nodes
            let Some(at) = node.location else { continue };
            let place = self.geo.resolve(at).await?;
            announcements.push(self.announcer.announce(node, &place).await?);
        }

        Ok(RunReport {
            cutoff,
            fetched,
            candidates: candidates.len(),
            announcements,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn cutoff_subtracts_lookback() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap();
        let cutoff = compute_cutoff(now, Duration::from_secs(3600)).unwrap();
        assert_eq!(cutoff, Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
    }

    #[test]
    fn absurd_lookback_is_config_error() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap();
        let err = compute_cutoff(now, Duration::from_secs(u64::MAX)).unwrap_err();
        assert!(matches!(err, KnotenError::Config(_)));
    }

    #[test]
    fn new_runner_starts_in_init() {
        let runner = Runner::<crate::NodelistV1>::new(
            DirectoryReader::new("http://127.0.0.1:1/nodes.json").unwrap(),
            GeoResolver::new("http://127.0.0.1:1/reverse").unwrap(),
            Announcer::dry_run("https://map.example/", Default::default()),
            Duration::from_secs(60),
        );
        assert_eq!(runner.phase(), RunPhase::Init);
    }
}
