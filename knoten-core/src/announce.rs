//! Turning a new node into a post (or a console line in debug mode).
use std::io::{self, Write};
use std::sync::Arc;

use knoten_common::{KnotenError, Result};
use knoten_config::Language;
use knoten_social::FeedPoster;

use crate::geo::PlaceName;
use crate::node::NodeRecord;

/// What was emitted for one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub text: String,
    pub target_node_id: String,
}

/// Deep link to the node in the map view.
///
/// ```
/// use knoten_core::announce::map_link;
///
/// assert_eq!(
///     map_link("https://map.example/", "abc123"),
///     "https://map.example/#!v:m;n:abc123"
/// );
/// ```
pub fn map_link(map_url: &str, node_id: &str) -> String {
    format!("{map_url}#!v:m;n:{node_id}")
}

pub fn announcement_text(language: Language, place: &PlaceName, name: &str, link: &str) -> String {
    match language {
        Language::De => format!("In {place} gibt es einen neuen #Freifunk-Knoten: {name} {link}"),
        Language::En => format!("There is a new #Freifunk node in {place}: {name} {link}"),
    }
}

pub struct Announcer {
    map_url: String,
    language: Language,
    /// `None` means debug mode: nothing leaves the machine.
    poster: Option<Arc<dyn FeedPoster>>,
    out: Box<dyn Write + Send>,
}

impl Announcer {
    /// Debug mode: one console line per node, no network.
    pub fn dry_run(map_url: impl Into<String>, language: Language) -> Self {
        Self {
            map_url: map_url.into(),
            language,
            poster: None,
            out: Box::new(io::stdout()),
        }
    }

    /// Production mode: every announcement is posted to the feed.
    pub fn posting(
        map_url: impl Into<String>,
        language: Language,
        poster: Arc<dyn FeedPoster>,
    ) -> Self {
        Self {
            map_url: map_url.into(),
            language,
            poster: Some(poster),
            out: Box::new(io::stdout()),
        }
    }

    /// Redirect console lines and post echoes.
    pub fn with_output(mut self, out: Box<dyn Write + Send>) -> Self {
        self.out = out;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.poster.is_none()
    }

    pub fn compose(&self, node: &NodeRecord, place: &PlaceName) -> Announcement {
        let link = map_link(&self.map_url, &node.id);
        Announcement {
            text: announcement_text(self.language, place, &node.display_name, &link),
            target_node_id: node.id.clone(),
        }
    }

    pub async fn announce(&mut self, node: &NodeRecord, place: &PlaceName) -> Result<Announcement> {
        let announcement = self.compose(node, place);

        match &self.poster {
            None => {
                let link = map_link(&self.map_url, &node.id);
                writeln!(self.out, "{} {} {}", place, node.display_name, link)
                    .and_then(|_| self.out.flush())
                    .map_err(|e| KnotenError::Post(format!("console write failed: {e}")))?;
                tracing::info!(node_id = %node.id, place = %place, "announce.dry_run");
            }
            Some(poster) => {
                let posted = poster.post(&announcement.text).await?;
                tracing::info!(
                    node_id = %node.id,
                    status_id = %posted.id,
                    "announce.posted"
                );
                // the post is already live; a lost echo must not fail the run
                if let Err(e) = writeln!(self.out, "posted {}: {}", posted.id, posted.text)
                    .and_then(|_| self.out.flush())
                {
                    tracing::warn!(status_id = %posted.id, error = %e, "announce.echo_failed");
                }
            }
        }
        Ok(announcement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Coordinates;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use knoten_social::PostedStatus;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "stdout closed"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingPoster {
        posts: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl FeedPoster for RecordingPoster {
        async fn post(&self, text: &str) -> Result<PostedStatus> {
            if self.fail {
                return Err(KnotenError::Post("403 Forbidden".into()));
            }
            let mut posts = self.posts.lock().unwrap();
            posts.push(text.to_string());
            Ok(PostedStatus {
                id: format!("{}", posts.len()),
                text: text.to_string(),
            })
        }
    }

    fn gw01() -> NodeRecord {
        NodeRecord {
            id: "abc123".into(),
            display_name: "gw01".into(),
            first_seen_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            location: Coordinates::from_pair(Some(52.52), Some(13.40)),
            online: true,
        }
    }

    fn mitte() -> PlaceName {
        crate::geo::pick_place_name(&crate::geo::Address {
            suburb: Some("Mitte".into()),
            ..Default::default()
        })
    }

    #[test]
    fn text_contains_place_name_and_link() {
        let a = Announcer::dry_run("https://map.example/", Language::De).compose(&gw01(), &mitte());
        assert!(a.text.contains("https://map.example/#!v:m;n:abc123"));
        assert!(a.text.contains("Mitte"));
        assert!(a.text.contains("gw01"));
        assert_eq!(a.target_node_id, "abc123");
        assert_eq!(
            a.text,
            "In Mitte gibt es einen neuen #Freifunk-Knoten: gw01 https://map.example/#!v:m;n:abc123"
        );
    }

    #[test]
    fn english_template() {
        let a = Announcer::dry_run("https://map.example/", Language::En).compose(&gw01(), &mitte());
        assert_eq!(
            a.text,
            "There is a new #Freifunk node in Mitte: gw01 https://map.example/#!v:m;n:abc123"
        );
    }

    #[tokio::test]
    async fn dry_run_writes_console_line() {
        let buf = SharedBuf::default();
        let mut announcer = Announcer::dry_run("https://map.example/", Language::De)
            .with_output(Box::new(buf.clone()));
        assert!(announcer.is_dry_run());

        announcer.announce(&gw01(), &mitte()).await.unwrap();
        assert_eq!(buf.contents(), "Mitte gw01 https://map.example/#!v:m;n:abc123\n");
    }

    #[tokio::test]
    async fn posting_mode_posts_and_echoes() {
        let poster = Arc::new(RecordingPoster::default());
        let buf = SharedBuf::default();
        let mut announcer = Announcer::posting("https://map.example/", Language::De, poster.clone())
            .with_output(Box::new(buf.clone()));

        let a = announcer.announce(&gw01(), &mitte()).await.unwrap();
        assert_eq!(*poster.posts.lock().unwrap(), vec![a.text.clone()]);
        assert!(buf.contents().starts_with("posted 1: In Mitte"));
    }

    #[tokio::test]
    async fn lost_echo_does_not_fail_a_sent_post() {
        let poster = Arc::new(RecordingPoster::default());
        let mut announcer = Announcer::posting("https://map.example/", Language::De, poster.clone())
            .with_output(Box::new(BrokenPipe));

        let a = announcer.announce(&gw01(), &mitte()).await.unwrap();
        assert_eq!(*poster.posts.lock().unwrap(), vec![a.text]);
    }

    #[tokio::test]
    async fn dry_run_console_failure_is_an_error() {
        let mut announcer = Announcer::dry_run("https://map.example/", Language::De)
            .with_output(Box::new(BrokenPipe));
        assert!(announcer.announce(&gw01(), &mitte()).await.is_err());
    }

    #[tokio::test]
    async fn failed_post_is_surfaced() {
        let poster = Arc::new(RecordingPoster {
            fail: true,
            ..Default::default()
        });
        let mut announcer = Announcer::posting("https://map.example/", Language::De, poster)
            .with_output(Box::new(SharedBuf::default()));
        let err = announcer.announce(&gw01(), &mitte()).await.unwrap_err();
        assert!(matches!(err, KnotenError::Post(_)));
    }
}
