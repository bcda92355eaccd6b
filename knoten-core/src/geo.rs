//! Reverse geocoding of node positions into short place names.
//!
//! Neighbourhood-level names are preferred over city names: a post saying
//! "new node in Ottensen" is more useful than "new node in Hamburg".
use std::borrow::Cow;
use std::fmt;

use knoten_common::{KnotenError, Result};
use knoten_http::{HttpClient, RequestOpts};
use serde::Deserialize;

use crate::http_to_knoten;
use crate::node::Coordinates;

/// Returned when the geocoder knows none of the preferred address parts.
pub const UNKNOWN_PLACE: &str = "*hust*";

/// Neighbourhood granularity in Nominatim's zoom scale.
const ZOOM: &str = "16";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceName(String);

impl PlaceName {
    pub fn unknown() -> Self {
        Self(UNKNOWN_PLACE.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == UNKNOWN_PLACE
    }
}

impl fmt::Display for PlaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ReverseResponse {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub address: Address,
}

#[derive(Debug, Default, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub suburb: Option<String>,
    #[serde(default)]
    pub city_district: Option<String>,
    #[serde(default)]
    pub village: Option<String>,
    #[serde(default)]
    pub town: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
}

/// First non-empty of suburb, city district, village, town, city.
///
/// ```
/// use knoten_core::geo::{pick_place_name, Address};
///
/// let addr = Address {
///     suburb: Some("Mitte".into()),
///     city: Some("Berlin".into()),
///     ..Default::default()
/// };
/// assert_eq!(pick_place_name(&addr).as_str(), "Mitte");
/// ```
pub fn pick_place_name(address: &Address) -> PlaceName {
    [
        &address.suburb,
        &address.city_district,
        &address.village,
        &address.town,
        &address.city,
    ]
    .into_iter()
    .flatten()
    .map(|part| part.trim())
    .find(|part| !part.is_empty())
    .map(|part| PlaceName(part.to_string()))
    .unwrap_or_else(PlaceName::unknown)
}

pub struct GeoResolver {
    http: HttpClient,
    endpoint: String,
    contact_email: Option<String>,
}

impl GeoResolver {
    pub fn new(endpoint: &str) -> Result<Self> {
        let http = HttpClient::new(endpoint)
            .map_err(|e| KnotenError::Config(format!("geocoder endpoint {endpoint}: {e}")))?;
        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
            contact_email: None,
        })
    }

    pub fn with_user_agent(mut self, agent: &str) -> Result<Self> {
        self.http = self
            .http
            .with_user_agent(agent)
            .map_err(|e| KnotenError::Config(e.to_string()))?;
        Ok(self)
    }

    pub fn with_contact_email(mut self, email: Option<&str>) -> Self {
        self.contact_email = email.map(str::to_string);
        self
    }

    /// Look up the place name for a node position.
    pub async fn resolve(&self, at: Coordinates) -> Result<PlaceName> {
        let resp: ReverseResponse = self
            .http
            .get_json(
                &self.endpoint,
                RequestOpts {
                    query: Some(self.query(at)),
                    allow_absolute: true,
                    ..Default::default()
                },
            )
            .await
            .map_err(http_to_knoten)?;

        let place = pick_place_name(&resp.address);
        tracing::debug!(
            lat = at.latitude,
            lon = at.longitude,
            place = %place,
            display_name = ?resp.display_name,
            "geo.resolved"
        );
        Ok(place)
    }

    fn query(&self, at: Coordinates) -> Vec<(&'static str, Cow<'_, str>)> {
        let mut q: Vec<(&'static str, Cow<'_, str>)> = vec![
            ("format", Cow::Borrowed("json")),
            ("lat", Cow::Owned(format!("{:.5}", at.latitude))),
            ("lon", Cow::Owned(format!("{:.5}", at.longitude))),
            ("zoom", Cow::Borrowed(ZOOM)),
            ("addressdetails", Cow::Borrowed("1")),
        ];
        if let Some(email) = &self.contact_email {
            q.push(("email", Cow::Borrowed(email.as_str())));
        }
        q
    }
}
