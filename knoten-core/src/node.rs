use chrono::{DateTime, Utc};

/// A directory entry normalized across schema versions.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecord {
    pub id: String,
    pub display_name: String,
    pub first_seen_at: DateTime<Utc>,
    /// `None` when the directory has no usable position for the node.
    pub location: Option<Coordinates>,
    pub online: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Build a location from raw directory values.
    ///
    /// Missing or non-finite components yield `None`, and so does the exact
    /// pair `(0, 0)`, which directories use as "location unknown".
    ///
    /// ```
    /// use knoten_core::node::Coordinates;
    ///
    /// assert!(Coordinates::from_pair(Some(0.0), Some(0.0)).is_none());
    /// assert!(Coordinates::from_pair(Some(53.55), None).is_none());
    /// assert!(Coordinates::from_pair(Some(53.55), Some(9.99)).is_some());
    /// ```
    pub fn from_pair(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        let (latitude, longitude) = (latitude?, longitude?);
        if !latitude.is_finite() || !longitude.is_finite() {
            return None;
        }
        if latitude == 0.0 && longitude == 0.0 {
            return None;
        }
        Some(Self {
            latitude,
            longitude,
        })
    }
}

impl NodeRecord {
    pub fn has_location(&self) -> bool {
        self.location.is_some()
    }
}
