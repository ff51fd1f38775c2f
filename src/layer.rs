use geojson::{GeoJson, Geometry, Value};
use serde_json::Value as JsonValue;

use crate::config_params::{LatLng, LatLngBounds};
use crate::error::{MapError, Result};
use crate::surface::LayerStyle;

/// Style of a place's own geometry.
pub fn place_style() -> LayerStyle {
    LayerStyle {
        color: "#6000DB".to_string(),
        weight: 4.0,
        opacity: 1.0,
        fill_color: Some("#6000DB".to_string()),
        fill_opacity: Some(0.35),
    }
}

/// Style of the null island placeholder; warmer and lighter than `place_style`.
pub fn fallback_style() -> LayerStyle {
    LayerStyle {
        color: "#ff7800".to_string(),
        weight: 5.0,
        opacity: 0.65,
        fill_color: None,
        fill_opacity: None,
    }
}

pub fn parse_geojson(raw: &str) -> Result<GeoJson> {
    let value: JsonValue = serde_json::from_str(raw)?;
    parse_geojson_value(&value)
}

/// Decodes and checks a GeoJSON-like value so that only drawable data reaches a map.
pub fn parse_geojson_value(value: &JsonValue) -> Result<GeoJson> {
    let geojson = GeoJson::from_json_value(value.clone())?;
    get_extent(&geojson)?;
    Ok(geojson)
}

/// Every geometry of a document, with collections flattened.
pub fn geometries(geojson: &GeoJson) -> Vec<&Geometry> {
    fn push<'a>(geom: &'a Geometry, out: &mut Vec<&'a Geometry>) {
        match geom.value {
            Value::GeometryCollection(ref members) => {
                for member in members {
                    push(member, out);
                }
            }
            _ => out.push(geom),
        }
    }
    let mut out = Vec::new();
    match *geojson {
        GeoJson::Geometry(ref geom) => push(geom, &mut out),
        GeoJson::Feature(ref feature) => {
            if let Some(ref geom) = feature.geometry {
                push(geom, &mut out);
            }
        }
        GeoJson::FeatureCollection(ref collection) => {
            for feature in &collection.features {
                if let Some(ref geom) = feature.geometry {
                    push(geom, &mut out);
                }
            }
        }
    }
    out
}

fn to_latlng(position: &[f64]) -> Result<LatLng> {
    match position {
        [lng, lat, ..] if lng.is_finite() && lat.is_finite() => Ok(LatLng::new(*lat, *lng)),
        _ => Err(MapError::InvalidPosition(position.to_vec())),
    }
}

/// Bounding box of all coordinates; fails on malformed positions or when
/// there is nothing to bound.
pub fn get_extent(geojson: &GeoJson) -> Result<LatLngBounds> {
    fn verif(point: &[f64], extent: &mut Option<LatLngBounds>) -> Result<()> {
        let point = to_latlng(point)?;
        match extent {
            Some(bounds) => bounds.extend(point),
            None => *extent = Some(LatLngBounds::new(point, point)),
        }
        Ok(())
    }
    let mut extent = None;
    for geom in geometries(geojson) {
        match geom.value {
            Value::Point(ref point) => verif(point, &mut extent)?,
            Value::MultiPoint(ref points) | Value::LineString(ref points) => {
                for point in points {
                    verif(point, &mut extent)?;
                }
            }
            Value::MultiLineString(ref rings) | Value::Polygon(ref rings) => {
                for ring in rings {
                    for point in ring {
                        verif(point, &mut extent)?;
                    }
                }
            }
            Value::MultiPolygon(ref polygons) => {
                for polygon in polygons {
                    for ring in polygon {
                        for point in ring {
                            verif(point, &mut extent)?;
                        }
                    }
                }
            }
            // flattened by `geometries`
            Value::GeometryCollection(_) => {}
        }
    }
    extent.ok_or(MapError::EmptyGeometry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extent_of_feature_collection() {
        let geojson = parse_geojson_value(&json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {},
                 "geometry": {"type": "Point", "coordinates": [-1.0, 2.0]}},
                {"type": "Feature", "properties": {}, "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[0.0, 0.0], [3.0, 0.0], [3.0, -4.0], [0.0, 0.0]]]
                }}
            ]
        }))
        .unwrap();
        let extent = get_extent(&geojson).unwrap();
        assert_eq!(extent.south_west, LatLng::new(-4.0, -1.0));
        assert_eq!(extent.north_east, LatLng::new(2.0, 3.0));
    }

    #[test]
    fn geometry_collections_are_flattened() {
        let geojson = parse_geojson_value(&json!({
            "type": "GeometryCollection",
            "geometries": [
                {"type": "Point", "coordinates": [5.0, 5.0]},
                {"type": "LineString", "coordinates": [[6.0, 6.0], [7.0, 8.0]]}
            ]
        }))
        .unwrap();
        assert_eq!(geometries(&geojson).len(), 2);
        assert_eq!(get_extent(&geojson).unwrap().north_east, LatLng::new(8.0, 7.0));
    }

    #[test]
    fn short_positions_are_rejected() {
        let err = parse_geojson_value(&json!({"type": "Point", "coordinates": [1.0]}));
        assert!(err.is_err());
    }

    #[test]
    fn not_geojson_is_rejected() {
        assert!(parse_geojson_value(&json!({"type": "Blob"})).is_err());
        assert!(parse_geojson("{not json").is_err());
    }

    #[test]
    fn empty_collection_has_no_extent() {
        let empty = json!({"type": "FeatureCollection", "features": []});
        let geojson = GeoJson::from_json_value(empty).unwrap();
        assert!(matches!(get_extent(&geojson), Err(MapError::EmptyGeometry)));
    }

    #[test]
    fn fallback_style_differs_from_place_style() {
        assert_ne!(fallback_style().color, place_style().color);
        assert!(fallback_style().fill_color.is_none());
    }
}
