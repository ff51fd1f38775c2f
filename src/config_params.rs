use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;

use crate::error::{MapError, Result};

/// Zoom added to the fitted fallback view on the overview map.
pub const SIDE_FALLBACK_ZOOM_OFFSET: f64 = 3.0;
/// Zoom added to the fitted fallback view on the detail map.
pub const MAIN_FALLBACK_ZOOM_OFFSET: f64 = 4.0;

pub const DEFAULT_ZOOM: u8 = 10;
pub const DEFAULT_NULLISLAND_URL: &str = "/geojson/null-island.geojson";
pub const DEFAULT_CREDITS_URL: &str = "/credits";

/// Upper bound on the fallback dataset request.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

pub const MIN_MAIN_MAP_HEIGHT: u32 = 415;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(from = "[f64; 2]")]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        LatLng { lat, lng }
    }
}

impl From<[f64; 2]> for LatLng {
    fn from(pair: [f64; 2]) -> Self {
        LatLng::new(pair[0], pair[1])
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({:.5}, {:.5})", self.lat, self.lng)
    }
}

/// Rectangular extent, always normalized so that `south_west` holds the minima.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLngBounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl LatLngBounds {
    pub fn new(a: LatLng, b: LatLng) -> Self {
        LatLngBounds {
            south_west: LatLng::new(a.lat.min(b.lat), a.lng.min(b.lng)),
            north_east: LatLng::new(a.lat.max(b.lat), a.lng.max(b.lng)),
        }
    }

    /// Geographic midpoint of the extent.
    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.south_west.lat + self.north_east.lat) / 2.0,
            (self.south_west.lng + self.north_east.lng) / 2.0,
        )
    }

    pub fn extend(&mut self, point: LatLng) {
        self.south_west.lat = self.south_west.lat.min(point.lat);
        self.south_west.lng = self.south_west.lng.min(point.lng);
        self.north_east.lat = self.north_east.lat.max(point.lat);
        self.north_east.lng = self.north_east.lng.max(point.lng);
    }

    pub fn contains(&self, point: LatLng) -> bool {
        point.lat >= self.south_west.lat
            && point.lat <= self.north_east.lat
            && point.lng >= self.south_west.lng
            && point.lng <= self.north_east.lng
    }

    pub fn contains_bounds(&self, other: &LatLngBounds) -> bool {
        self.contains(other.south_west) && self.contains(other.north_east)
    }
}

impl fmt::Display for LatLngBounds {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}, {}]", self.south_west, self.north_east)
    }
}

/// The two reserved map mount points of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapSlot {
    /// Small, non-interactive overview map.
    Side,
    /// Larger, interactive detail map.
    Main,
}

impl MapSlot {
    pub fn key(self) -> &'static str {
        match self {
            MapSlot::Side => "side",
            MapSlot::Main => "main",
        }
    }

    pub fn element_id(self) -> &'static str {
        match self {
            MapSlot::Side => "side-map",
            MapSlot::Main => "main-map",
        }
    }

    pub fn fallback_zoom_offset(self) -> f64 {
        match self {
            MapSlot::Side => SIDE_FALLBACK_ZOOM_OFFSET,
            MapSlot::Main => MAIN_FALLBACK_ZOOM_OFFSET,
        }
    }
}

impl fmt::Display for MapSlot {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Everything the hosting page knows about the place being shown.
///
/// Built once at startup and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlaceConfig {
    #[serde(default, deserialize_with = "deserialize_bounds")]
    pub bounds: Option<LatLngBounds>,
    #[serde(default)]
    pub centroid: Option<LatLng>,
    #[serde(default = "default_zoom")]
    pub zoom: u8,
    #[serde(default)]
    pub popup: Option<String>,
    #[serde(default)]
    pub geojson: Option<JsonValue>,
    #[serde(default = "default_nullisland_url")]
    pub nullisland_url: String,
    #[serde(default = "default_credits_url")]
    pub credits_url: String,
    #[serde(default)]
    pub scale: Option<u32>,
    #[serde(default)]
    pub placetype: Option<String>,
}

fn default_zoom() -> u8 {
    DEFAULT_ZOOM
}

fn default_nullisland_url() -> String {
    DEFAULT_NULLISLAND_URL.to_string()
}

fn default_credits_url() -> String {
    DEFAULT_CREDITS_URL.to_string()
}

fn deserialize_bounds<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<LatLngBounds>, D::Error>
where
    D: Deserializer<'de>,
{
    let corners: Option<Vec<LatLng>> = Option::deserialize(deserializer)?;
    match corners.as_deref() {
        None | Some([]) => Ok(None),
        Some([a, b]) => Ok(Some(LatLngBounds::new(*a, *b))),
        Some(other) => Err(serde::de::Error::invalid_length(
            other.len(),
            &"two corners [[sw_lat, sw_lng], [ne_lat, ne_lng]]",
        )),
    }
}

impl Default for PlaceConfig {
    fn default() -> Self {
        PlaceConfig {
            bounds: None,
            centroid: None,
            zoom: DEFAULT_ZOOM,
            popup: None,
            geojson: None,
            nullisland_url: default_nullisland_url(),
            credits_url: default_credits_url(),
            scale: None,
            placetype: None,
        }
    }
}

impl PlaceConfig {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(MapError::from)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(MapError::from)
    }

    /// Popup markup, if any non-empty content was configured.
    pub fn popup_content(&self) -> Option<&str> {
        self.popup.as_deref().filter(|s| !s.is_empty())
    }

    /// Geometry to overlay, if anything other than `null`, `{}` or `[]`.
    pub fn geometry(&self) -> Option<&JsonValue> {
        self.geojson.as_ref().filter(|value| !is_empty_value(value))
    }

    pub fn attribution_prefix(&self) -> String {
        format!("<a href=\"{}\">Map Credits</a>", self.credits_url)
    }
}

pub(crate) fn is_empty_value(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::Object(map) => map.is_empty(),
        JsonValue::Array(items) => items.is_empty(),
        JsonValue::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Centroid and extent pulled out of a place record.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlaceCoordinates {
    pub centroid: Option<LatLng>,
    pub bounds: Option<LatLngBounds>,
}

impl PlaceCoordinates {
    /// Reads `lat`/`lng` and `sw_lat`/`sw_lng`/`ne_lat`/`ne_lng`.
    ///
    /// A missing or zero component makes the whole value absent: a place sitting
    /// exactly on 0,0 is a place without coordinates.
    pub fn extract(record: &JsonValue) -> Self {
        let get = |key: &str| record.get(key).and_then(JsonValue::as_f64).filter(|v| *v != 0.0);

        let centroid = match (get("lat"), get("lng")) {
            (Some(lat), Some(lng)) => Some(LatLng::new(lat, lng)),
            _ => None,
        };
        let bounds = match (get("sw_lat"), get("sw_lng"), get("ne_lat"), get("ne_lng")) {
            (Some(sw_lat), Some(sw_lng), Some(ne_lat), Some(ne_lng)) => Some(LatLngBounds::new(
                LatLng::new(sw_lat, sw_lng),
                LatLng::new(ne_lat, ne_lng),
            )),
            _ => None,
        };
        PlaceCoordinates { centroid, bounds }
    }

    pub fn apply_to(&self, config: &mut PlaceConfig) {
        config.centroid = self.centroid;
        config.bounds = self.bounds;
    }
}
