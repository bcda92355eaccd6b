#![allow(dead_code)]
use std::io::{self, Write};
use std::sync::{Arc, Mutex, OnceLock};

use knoten_common::observability::{LogConfig, LogFormat};

static INIT_PATH: OnceLock<std::path::PathBuf> = OnceLock::new();

pub fn init_test_tracing() {
    let _ = INIT_PATH.get_or_init(|| {
        let config = LogConfig {
            app_name: "knoten-tests",
            log_dir: Some(std::env::temp_dir().join("knoten-tests")),
            emit_stderr: true,
            format: if std::env::var("KNOTEN_LOG_FORMAT")
                .map(|raw| raw.trim().eq_ignore_ascii_case("json"))
                .unwrap_or(false)
            {
                LogFormat::Json
            } else {
                LogFormat::Text
            },
            default_filter: "debug".into(),
        };

        knoten_common::observability::init_logging(config).unwrap_or_default()
    });
}

/// Captures announcer output so tests can assert on console lines.
#[derive(Clone, Default)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
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

/// Three nodes around a 12:00 cutoff: one fresh with a position, one old,
/// one fresh at (0, 0).
pub fn nodelist_fixture() -> serde_json::Value {
    serde_json::json!({
        "version": "1.0.0",
        "updated_at": "2024-05-01T13:00:00",
        "nodes": [
            {
                "id": "abc123",
                "name": "gw01",
                "status": { "online": true, "firstcontact": "2024-05-01T12:30:00", "clients": 3 },
                "position": { "lat": 52.52, "long": 13.40 }
            },
            {
                "id": "old001",
                "name": "veteran",
                "status": { "online": true, "firstcontact": "2019-01-01T00:00:00" },
                "position": { "lat": 52.50, "long": 13.30 }
            },
            {
                "id": "nopos1",
                "name": "somewhere",
                "status": { "online": false, "firstcontact": "2024-05-01T12:45:00" },
                "position": { "lat": 0.0, "long": 0.0 }
            }
        ]
    })
}

pub fn reverse_fixture(suburb: &str) -> serde_json::Value {
    serde_json::json!({
        "display_name": format!("{suburb}, Berlin, Deutschland"),
        "address": { "suburb": suburb, "city": "Berlin", "country": "Deutschland" }
    })
}
