//! SVG snapshots of a headless map.

use std::path::Path;

use geojson::{GeoJson, Value};
use svg::node::element::path::Data;
use svg::node::element::{Circle, Element, Group, Path as SvgPath, Rectangle};
use svg::node::Text as NodeText;
use svg::{Document, Node};

use crate::config_params::LatLng;
use crate::error::Result;
use crate::headless::HeadlessMap;
use crate::layer::geometries;
use crate::surface::{ControlKind, ControlPosition, LayerStyle, MapSurface};

/// Converts geographic features into the pixel space of a map's current view.
pub struct Converter<'a> {
    map: &'a HeadlessMap,
}

impl<'a> Converter<'a> {
    pub fn new(map: &'a HeadlessMap) -> Self {
        Converter { map }
    }

    fn pixel(&self, position: &[f64]) -> Option<(f32, f32)> {
        match position {
            [lng, lat, ..] => self
                .map
                .to_pixel(LatLng::new(*lat, *lng))
                .map(|(x, y)| (x as f32, y as f32)),
            _ => None,
        }
    }

    pub fn convert(&self, data: &GeoJson, style: &LayerStyle) -> Group {
        let mut group = Group::new();
        for geom in geometries(data) {
            match geom.value {
                Value::Point(ref point) => {
                    if let Some(circle) = self.draw_point(point, style) {
                        group.append(circle);
                    }
                }
                Value::MultiPoint(ref points) => {
                    for point in points {
                        if let Some(circle) = self.draw_point(point, style) {
                            group.append(circle);
                        }
                    }
                }
                Value::LineString(ref positions) => {
                    let data = self.draw_path(std::slice::from_ref(positions), false);
                    group.append(stroked(style).set("fill", "none").set("d", data));
                }
                Value::MultiLineString(ref lines) => {
                    let data = self.draw_path(lines, false);
                    group.append(stroked(style).set("fill", "none").set("d", data));
                }
                Value::Polygon(ref rings) => {
                    let data = self.draw_path(rings, true);
                    group.append(filled(style).set("d", data));
                }
                Value::MultiPolygon(ref polygons) => {
                    let rings: Vec<_> = polygons.iter().flatten().cloned().collect();
                    let data = self.draw_path(&rings, true);
                    group.append(filled(style).set("d", data));
                }
                Value::GeometryCollection(_) => {}
            }
        }
        group
    }

    fn draw_point(&self, point: &[f64], style: &LayerStyle) -> Option<Circle> {
        let (cx, cy) = self.pixel(point)?;
        Some(
            Circle::new()
                .set("cx", cx)
                .set("cy", cy)
                .set("r", style.weight * 2.0)
                .set("fill", style.fill_color.clone().unwrap_or_else(|| style.color.clone()))
                .set("stroke", style.color.clone())
                .set("stroke-opacity", style.opacity),
        )
    }

    fn draw_path(&self, lines: &[Vec<Vec<f64>>], close: bool) -> Data {
        let mut data = Data::new();
        for line in lines {
            let mut iter = line.iter().filter_map(|position| self.pixel(position));
            let first = match iter.next() {
                Some(first) => first,
                None => continue,
            };
            data = data.move_to(first);
            for point in iter {
                data = data.line_to(point);
            }
            if close {
                data = data.close();
            }
        }
        data
    }
}

fn stroked(style: &LayerStyle) -> SvgPath {
    SvgPath::new()
        .set("stroke", style.color.clone())
        .set("stroke-width", style.weight)
        .set("stroke-opacity", style.opacity)
}

fn filled(style: &LayerStyle) -> SvgPath {
    match style.fill_color {
        Some(ref fill) => stroked(style)
            .set("fill", fill.clone())
            .set("fill-opacity", style.fill_opacity.unwrap_or(0.2)),
        None => stroked(style).set("fill", style.color.clone()).set("fill-opacity", 0.2),
    }
}

fn strip_tags(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => {
                in_tag = true;
                text.push(' ');
            }
            '>' => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn text(id: &str, content: &str, x: f64, y: f64, anchor: &str, font_size: &str) -> Element {
    let mut node = Element::new("text");
    node.assign("id", id);
    node.assign("x", x);
    node.assign("y", y);
    node.assign("text-anchor", anchor);
    node.assign("font-size", font_size);
    node.append(NodeText::new(content));
    node
}

/// Anchor point and alignment of a control, inset by a 25th of the map size.
fn control_position(
    position: ControlPosition,
    width: f64,
    height: f64,
) -> (f64, f64, &'static str) {
    match position {
        ControlPosition::TopLeft => (width / 25.0, height / 25.0 + 12.0, "start"),
        ControlPosition::TopRight => (width - width / 25.0, height / 25.0 + 12.0, "end"),
        ControlPosition::BottomLeft => (width / 25.0, height - height / 25.0, "start"),
        ControlPosition::BottomRight => (width - width / 25.0, height - height / 25.0, "end"),
    }
}

/// Draws the current view: background, vector layers, popup and controls.
pub fn render(map: &HeadlessMap) -> Document {
    let (width, height) = map.size();
    let mut document = Document::new()
        .set("id", map.element_id())
        .set("width", width)
        .set("height", height)
        .set("viewBox", format!("0 0 {} {}", width, height));

    let mut background = Rectangle::new()
        .set("fill", "#f2efe9")
        .set("width", "100%")
        .set("height", "100%");
    if let Some(tiles) = map.tile_layers().next() {
        background = background.set("data-tiles", tiles.url_template.clone());
    }
    document = document.add(background);

    let converter = Converter::new(map);
    for (id, data, style) in map.vector_layers() {
        let group = converter.convert(data, style).set("id", format!("layer-{}", id.0));
        document = document.add(group);
    }

    for popup in map.popups() {
        if let Some((x, y)) = map.to_pixel(popup.anchor) {
            let group = Group::new()
                .set("id", "popup")
                .add(Circle::new().set("cx", x).set("cy", y).set("r", 4).set("fill", "black"))
                .add(text(
                    "popup-content",
                    &strip_tags(&popup.content),
                    x,
                    y - 10.0,
                    "middle",
                    "14",
                ));
            document = document.add(group);
        }
    }

    for (i, control) in map.controls().enumerate() {
        let (x, y, anchor) = control_position(control.position, width, height);
        let node = match control.kind {
            ControlKind::Attribution { ref prefix } => {
                text(&format!("control-{}", i), &strip_tags(prefix), x, y, anchor, "10")
            }
            ControlKind::Html { ref element_id, ref html, .. } => {
                text(element_id, &strip_tags(html), x, y, anchor, "12")
            }
        };
        document = document.add(node);
    }

    if map.center().is_none() {
        document = document.add(text(
            "no-view",
            "no view",
            width / 2.0,
            height / 2.0,
            "middle",
            "22",
        ));
    }
    document
}

pub fn save<P: AsRef<Path>>(map: &HeadlessMap, path: P) -> Result<()> {
    svg::save(path, &render(map))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{parse_geojson, place_style};
    use crate::surface::{Control, MapOptions, Popup};

    #[test]
    fn strips_markup() {
        assert_eq!(
            strip_tags("<p><strong>Ahem.</strong></p><p>No coords.</p>"),
            "Ahem. No coords."
        );
        assert_eq!(strip_tags("<a href=\"/credits\">Map Credits</a>"), "Map Credits");
    }

    #[test]
    fn renders_layers_popup_and_controls() {
        let mut map = HeadlessMap::new("main-map", 400.0, 300.0, MapOptions::detail());
        map.set_view(LatLng::new(15.0, 15.0), 5.0);
        let square = parse_geojson(
            r#"{"type": "Polygon",
                "coordinates": [[[10, 10], [20, 10], [20, 20], [10, 20], [10, 10]]]}"#,
        )
        .unwrap();
        map.add_geojson_layer(square, place_style()).unwrap();
        map.open_popup(Popup {
            content: "<p>Hi</p>".to_string(),
            anchor: LatLng::new(15.0, 15.0),
            close_on_click: false,
            close_button: false,
        });
        map.add_control(Control::null_label());

        let svg = render(&map).to_string();
        assert!(svg.contains("#6000DB"));
        assert!(svg.contains("Hi"));
        assert!(svg.contains("null-island"));
        assert!(!svg.contains("no view"));
    }

    #[test]
    fn marks_maps_without_view() {
        let map = HeadlessMap::new("side-map", 300.0, 300.0, MapOptions::overview());
        assert!(render(&map).to_string().contains("no view"));
    }
}
