//! Nested meshviewer `nodes.json` (version 2) layout: `nodeinfo`, `flags`,
//! and an ISO 8601 `firstseen`.
use serde::Deserialize;

use super::{display_name, first_seen, node_id, DirectorySchema};
use crate::node::{Coordinates, NodeRecord};

pub struct MeshviewerV2;

#[derive(Debug, Deserialize)]
pub struct MeshviewerDocument {
    pub nodes: Vec<MeshviewerNode>,
}

#[derive(Debug, Deserialize)]
pub struct MeshviewerNode {
    #[serde(default)]
    pub firstseen: Option<String>,
    #[serde(default)]
    pub flags: Option<Flags>,
    #[serde(default)]
    pub nodeinfo: Option<NodeInfo>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Flags {
    #[serde(default)]
    pub online: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NodeInfo {
    #[serde(default)]
    pub node_id: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub location: Option<Location>,
}

#[derive(Debug, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl DirectorySchema for MeshviewerV2 {
    type Document = MeshviewerDocument;
    const NAME: &'static str = "meshviewer-v2";

    fn into_records(doc: Self::Document) -> Vec<NodeRecord> {
        doc.nodes
            .into_iter()
            .filter_map(|node| {
                let NodeInfo {
                    node_id: raw_id,
                    hostname,
                    location,
                } = node.nodeinfo.unwrap_or_default();
                let id = node_id(Self::NAME, raw_id)?;
                let first_seen_at = first_seen(Self::NAME, &id, node.firstseen.as_deref())?;
                let location = location.and_then(|l| Coordinates::from_pair(l.latitude, l.longitude));
                Some(NodeRecord {
                    display_name: display_name(&id, hostname),
                    id,
                    first_seen_at,
                    location,
                    online: node.flags.unwrap_or_default().online.unwrap_or(false),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn decode(raw: &str) -> Vec<NodeRecord> {
        let doc: MeshviewerDocument = serde_json::from_str(raw).unwrap();
        MeshviewerV2::into_records(doc)
    }

    #[test]
    fn maps_nested_entry() {
        let nodes = decode(
            r#"{
              "version": 2,
              "timestamp": "2017-01-01T12:00:00+0100",
              "nodes": [{
                "firstseen": "2017-01-01T11:30:00+0100",
                "lastseen": "2017-01-01T11:59:00+0100",
                "flags": {"online": true, "gateway": false},
                "statistics": {"clients": 3, "uptime": 1200.5},
                "nodeinfo": {
                  "node_id": "60e327a1b2c3",
                  "hostname": "ff-altona-7",
                  "location": {"latitude": 53.5502, "longitude": 9.9351}
                }
              }]
            }"#,
        );
        assert_eq!(nodes.len(), 1);
        let n = &nodes[0];
        assert_eq!(n.id, "60e327a1b2c3");
        assert_eq!(n.display_name, "ff-altona-7");
        assert!(n.online);
        assert_eq!(n.first_seen_at, Utc.with_ymd_and_hms(2017, 1, 1, 10, 30, 0).unwrap());
        assert!(n.location.is_some());
    }

    #[test]
    fn sparse_entry_defaults() {
        let nodes = decode(
            r#"{"nodes": [{"firstseen": "2017-01-01T11:30:00Z", "nodeinfo": {"node_id": "x1"}}]}"#,
        );
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].display_name, "x1");
        assert!(!nodes[0].online);
        assert!(nodes[0].location.is_none());
    }

    #[test]
    fn entry_without_firstseen_is_dropped() {
        let nodes = decode(
            r#"{"nodes": [
                {"nodeinfo": {"node_id": "x1"}},
                {"firstseen": "2017-01-01T11:30:00Z", "nodeinfo": {"node_id": "x2"}}
            ]}"#,
        );
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].id, "x2");
    }

    #[test]
    fn entry_without_node_id_is_dropped_alone() {
        let nodes = decode(
            r#"{"nodes": [
                {"firstseen": "2017-01-01T11:30:00Z"},
                {"firstseen": "2017-01-01T11:30:00Z", "nodeinfo": {"hostname": "anon"}},
                {"firstseen": "2017-01-01T11:30:00Z", "nodeinfo": {"node_id": "x3"}}
            ]}"#,
        );
        let ids: Vec<_> = nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["x3"]);
    }

    #[test]
    fn flat_document_yields_no_records() {
        let raw = r#"{"nodes": [{"id": "a1", "status": {"firstcontact": "2015-03-01T18:04:05"}}]}"#;
        assert!(decode(raw).is_empty());
    }
}
