//! Flat `nodelist.json` layout: `status.firstcontact` plus a `position` block.
use serde::Deserialize;

use super::{display_name, first_seen, node_id, DirectorySchema};
use crate::node::{Coordinates, NodeRecord};

pub struct NodelistV1;

#[derive(Debug, Deserialize)]
pub struct NodelistDocument {
    pub nodes: Vec<NodelistNode>,
}

#[derive(Debug, Deserialize)]
pub struct NodelistNode {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<NodelistStatus>,
    #[serde(default)]
    pub position: Option<NodelistPosition>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NodelistStatus {
    #[serde(default)]
    pub online: Option<bool>,
    #[serde(default)]
    pub firstcontact: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NodelistPosition {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub long: Option<f64>,
}

impl DirectorySchema for NodelistV1 {
    type Document = NodelistDocument;
    const NAME: &'static str = "nodelist-v1";

    fn into_records(doc: Self::Document) -> Vec<NodeRecord> {
        doc.nodes
            .into_iter()
            .filter_map(|node| {
                let id = node_id(Self::NAME, node.id)?;
                let status = node.status.unwrap_or_default();
                let first_seen_at = first_seen(Self::NAME, &id, status.firstcontact.as_deref())?;
                let location = node
                    .position
                    .and_then(|p| Coordinates::from_pair(p.lat, p.long));
                Some(NodeRecord {
                    display_name: display_name(&id, node.name),
                    id,
                    first_seen_at,
                    location,
                    online: status.online.unwrap_or(false),
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
        let doc: NodelistDocument = serde_json::from_str(raw).unwrap();
        NodelistV1::into_records(doc)
    }

    #[test]
    fn maps_full_entry() {
        let nodes = decode(
            r#"{
              "version": "1.0.0",
              "updated_at": "2015-03-02T10:00:00",
              "nodes": [{
                "id": "c04a00dd692a",
                "name": "gw01",
                "status": {"online": true, "clients": 4,
                           "firstcontact": "2015-03-01T18:04:05",
                           "lastcontact": "2015-03-02T09:59:00"},
                "position": {"lat": 52.52001, "long": 13.40495}
              }]
            }"#,
        );
        assert_eq!(nodes.len(), 1);
        let n = &nodes[0];
        assert_eq!(n.id, "c04a00dd692a");
        assert_eq!(n.display_name, "gw01");
        assert!(n.online);
        assert_eq!(n.first_seen_at, Utc.with_ymd_and_hms(2015, 3, 1, 18, 4, 5).unwrap());
        let loc = n.location.unwrap();
        assert_eq!((loc.latitude, loc.longitude), (52.52001, 13.40495));
    }

    #[test]
    fn missing_optional_fields_become_absent() {
        let nodes = decode(
            r#"{"nodes": [{"id": "a1", "status": {"firstcontact": "2015-03-01T18:04:05"}}]}"#,
        );
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].display_name, "a1");
        assert!(!nodes[0].online);
        assert!(nodes[0].location.is_none());
    }

    #[test]
    fn null_values_are_tolerated() {
        let nodes = decode(
            r#"{"nodes": [{"id": "a1", "name": null,
                "status": {"online": null, "firstcontact": "2015-03-01T18:04:05"},
                "position": {"lat": null, "long": null}}]}"#,
        );
        assert_eq!(nodes.len(), 1);
        assert!(nodes[0].location.is_none());
    }

    #[test]
    fn zero_position_is_absent() {
        let nodes = decode(
            r#"{"nodes": [{"id": "a1",
                "status": {"firstcontact": "2015-03-01T18:04:05"},
                "position": {"lat": 0, "long": 0}}]}"#,
        );
        assert!(nodes[0].location.is_none());
    }

    #[test]
    fn bad_timestamps_drop_only_that_entry() {
        let nodes = decode(
            r#"{"nodes": [
                {"id": "bad", "status": {"firstcontact": "not-a-date"}},
                {"id": "none"},
                {"id": "good", "status": {"firstcontact": "2015-03-01T18:04:05"}}
            ]}"#,
        );
        let ids: Vec<_> = nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["good"]);
    }

    #[test]
    fn entry_without_id_is_dropped_alone() {
        let nodes = decode(
            r#"{"nodes": [
                {"name": "x", "status": {"firstcontact": "2015-03-01T18:04:05"}},
                {"id": "", "status": {"firstcontact": "2015-03-01T18:04:05"}},
                {"id": "ok", "status": {"firstcontact": "2015-03-01T18:04:05"}}
            ]}"#,
        );
        let ids: Vec<_> = nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["ok"]);
    }

    #[test]
    fn unread_counters_do_not_break_decoding() {
        let nodes = decode(
            r#"{"nodes": [{"id": "a1",
                "status": {"firstcontact": "2015-03-01T18:04:05", "clients": -1}}]}"#,
        );
        assert_eq!(nodes.len(), 1);
    }

    #[test]
    fn missing_nodes_array_is_a_shape_error() {
        assert!(serde_json::from_str::<NodelistDocument>(r#"{"version": "1.0.0"}"#).is_err());
    }
}
