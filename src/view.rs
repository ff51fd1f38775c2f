use std::cell::RefCell;

use crate::config_params::{LatLng, LatLngBounds, MapSlot, PlaceConfig};
use crate::error::Result;
use crate::fallback::{FallbackLayer, FallbackLoader};
use crate::fetch::DatasetSource;
use crate::surface::MapSurface;

/// How a map gets its first view, in priority order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Strategy {
    FitBounds(LatLngBounds),
    Centroid { center: LatLng, zoom: f64 },
    Fallback { zoom_offset: f64 },
}

impl Strategy {
    pub fn choose(config: &PlaceConfig, slot: MapSlot) -> Self {
        if let Some(bounds) = config.bounds {
            Strategy::FitBounds(bounds)
        } else if let Some(center) = config.centroid {
            Strategy::Centroid {
                center,
                zoom: f64::from(config.zoom),
            }
        } else {
            Strategy::Fallback {
                zoom_offset: slot.fallback_zoom_offset(),
            }
        }
    }
}

/// The view a map ended up with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EstablishedView {
    Bounds,
    Centroid,
    Fallback(FallbackLayer),
}

/// Gives `map` its initial view. Only the fallback strategy suspends.
pub async fn establish<M: MapSurface, S: DatasetSource>(
    map: &RefCell<M>,
    slot: MapSlot,
    config: &PlaceConfig,
    source: &S,
) -> Result<EstablishedView> {
    let strategy = Strategy::choose(config, slot);
    tracing::debug!(map = %slot, ?strategy, "establishing view");
    match strategy {
        Strategy::FitBounds(bounds) => {
            map.borrow_mut().fit_bounds(&bounds);
            Ok(EstablishedView::Bounds)
        }
        Strategy::Centroid { center, zoom } => {
            map.borrow_mut().set_view(center, zoom);
            Ok(EstablishedView::Centroid)
        }
        Strategy::Fallback { zoom_offset } => {
            let loader = FallbackLoader::new(source, &config.nullisland_url);
            let layer = loader.load(map, slot, zoom_offset).await?;
            Ok(EstablishedView::Fallback(layer))
        }
    }
}
