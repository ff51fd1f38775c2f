//! Error types and the failure journal kept by a map pair.

use std::cell::RefCell;
use std::fmt;

use thiserror::Error;

use crate::config_params::MapSlot;

#[derive(Error, Debug)]
pub enum MapError {
    #[error("HTTP {status} when fetching {url}")]
    Fetch { url: String, status: u16 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request for {url} timed out")]
    Timeout { url: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid GeoJSON: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid position {0:?}")]
    InvalidPosition(Vec<f64>),

    #[error("geometry has no coordinates")]
    EmptyGeometry,

    #[error("map has no view yet")]
    NoView,

    #[error("no such layer: {0}")]
    UnknownLayer(u32),

    #[error("element #{0} is not on the page")]
    MissingElement(String),
}

pub type Result<T> = std::result::Result<T, MapError>;

/// One failure caught inside the component.
#[derive(Debug, Clone, PartialEq)]
pub struct Incident {
    pub slot: MapSlot,
    pub operation: &'static str,
    pub message: String,
}

impl fmt::Display for Incident {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{} map] {}: {}", self.slot, self.operation, self.message)
    }
}

/// Failures are logged where they happen and kept here so the degraded state
/// can be inspected afterwards.
#[derive(Debug, Default)]
pub struct Incidents {
    entries: RefCell<Vec<Incident>>,
}

impl Incidents {
    pub fn record(&self, slot: MapSlot, operation: &'static str, err: &MapError) {
        tracing::error!(map = %slot, operation, error = %err, "map operation failed");
        self.entries.borrow_mut().push(Incident {
            slot,
            operation,
            message: err.to_string(),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn snapshot(&self) -> Vec<Incident> {
        self.entries.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_slot_and_operation() {
        let incidents = Incidents::default();
        incidents.record(
            MapSlot::Main,
            "load fallback",
            &MapError::Fetch { url: "/x".into(), status: 404 },
        );
        let entries = incidents.snapshot();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].slot, MapSlot::Main);
        assert_eq!(entries[0].to_string(), "[main map] load fallback: HTTP 404 when fetching /x");
    }
}
