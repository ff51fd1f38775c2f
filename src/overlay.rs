use serde_json::Value as JsonValue;

use crate::config_params::is_empty_value;
use crate::error::Result;
use crate::layer::{parse_geojson_value, place_style};
use crate::surface::{LayerId, MapSurface};

/// Draws the place's own geometry. Absent or empty geometry draws nothing.
pub fn draw<M: MapSurface>(map: &mut M, geometry: Option<&JsonValue>) -> Result<Option<LayerId>> {
    let geometry = match geometry {
        Some(value) if !is_empty_value(value) => value,
        _ => return Ok(None),
    };
    let data = parse_geojson_value(geometry)?;
    let layer = map.add_geojson_layer(data, place_style())?;
    Ok(Some(layer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessMap;
    use crate::surface::MapOptions;
    use serde_json::json;

    fn map() -> HeadlessMap {
        HeadlessMap::new("main-map", 800.0, 415.0, MapOptions::detail())
    }

    #[test]
    fn absent_geometry_is_a_no_op() {
        let mut map = map();
        assert_eq!(draw(&mut map, None).unwrap(), None);
        assert_eq!(draw(&mut map, Some(&json!(null))).unwrap(), None);
        assert_eq!(draw(&mut map, Some(&json!({}))).unwrap(), None);
        assert!(map.journal().is_empty());
    }

    #[test]
    fn polygon_gets_place_style() {
        let mut map = map();
        let polygon = json!({
            "type": "Feature",
            "properties": {"name": "square"},
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[10, 10], [20, 10], [20, 20], [10, 20], [10, 10]]]
            }
        });
        let id = draw(&mut map, Some(&polygon)).unwrap().unwrap();
        let (layer, _, style) = map.vector_layers().next().unwrap();
        assert_eq!(layer, id);
        assert_eq!(*style, place_style());
    }

    #[test]
    fn malformed_geometry_is_an_error_not_a_panic() {
        let mut map = map();
        assert!(draw(&mut map, Some(&json!({"type": "Polygon", "coordinates": "nope"}))).is_err());
        assert_eq!(map.vector_layers().count(), 0);
    }
}
