use std::cell::RefCell;

use crate::config_params::{LatLng, MapSlot};
use crate::error::Result;
use crate::fetch::DatasetSource;
use crate::layer::{fallback_style, parse_geojson};
use crate::surface::{Control, LayerId, MapSurface};

/// The placeholder layer added to a map and the view derived from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FallbackLayer {
    pub layer: LayerId,
    pub center: LatLng,
    pub zoom: f64,
}

/// Shows the null island dataset on maps of places without coordinates.
pub struct FallbackLoader<'a, S> {
    source: &'a S,
    url: &'a str,
}

impl<'a, S: DatasetSource> FallbackLoader<'a, S> {
    pub fn new(source: &'a S, url: &'a str) -> Self {
        FallbackLoader { source, url }
    }

    /// Adds the placeholder layer and frames it, `zoom_offset` levels closer
    /// than the fitted zoom.
    ///
    /// The overview map gets its explanatory label before the request goes
    /// out, so the label stays even when the request fails. On failure the
    /// viewport is left untouched.
    pub async fn load<M: MapSurface>(
        &self,
        map: &RefCell<M>,
        slot: MapSlot,
        zoom_offset: f64,
    ) -> Result<FallbackLayer> {
        if slot == MapSlot::Side {
            map.borrow_mut().add_control(Control::null_label());
        }

        let body = self.source.fetch(self.url).await?;
        let data = parse_geojson(&body)?;

        let mut map = map.borrow_mut();
        let layer = map.add_geojson_layer(data, fallback_style())?;
        let bounds = map.layer_bounds(layer)?;
        let center = bounds.center();
        let zoom = map.bounds_zoom(&bounds, true) + zoom_offset;
        tracing::debug!(map = %slot, %bounds, zoom, "framing fallback dataset");
        map.set_view(center, zoom);

        Ok(FallbackLayer { layer, center, zoom })
    }
}
