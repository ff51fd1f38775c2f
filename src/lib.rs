//! Overview and detail maps for a place record.
//!
//! A page carries up to two map elements: a small, static overview map and a
//! larger, interactive detail map. [`init_map`] gives each one an initial view
//! (the place's extent, its centroid, or the null island placeholder when the
//! place has no coordinates), draws the place geometry and its popup on the
//! detail map, and makes the overview follow the detail map around.

#[macro_use]
mod macros;

pub mod config_params;
pub mod error;
pub mod fallback;
pub mod fetch;
pub mod headless;
pub mod layer;
pub mod overlay;
pub mod pair;
pub mod popup;
pub mod render;
pub mod surface;
pub mod sync;
pub mod view;

pub use config_params::{LatLng, LatLngBounds, MapSlot, PlaceConfig, PlaceCoordinates};
pub use error::{Incident, Incidents, MapError, Result};
pub use pair::{init_map, MapPair, MapState, Page};
pub use surface::MapSurface;
