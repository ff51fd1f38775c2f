//! In-memory map surface.
//!
//! Keeps a spherical-mercator viewport, the layer/popup/control lists and a
//! journal of every call made on it, and dispatches viewport notifications
//! synchronously. Used by the command line renderer and by the tests.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use geojson::GeoJson;

use crate::config_params::{LatLng, LatLngBounds};
use crate::error::{MapError, Result};
use crate::layer::get_extent;
use crate::pair::Page;
use crate::surface::{
    Control, ControlId, LayerId, LayerStyle, MapEvent, MapOptions, MapSurface, Popup, PopupId,
    SubscriptionId, TileLayer, ViewChange, ViewHandler,
};

const TILE_SIZE: f64 = 256.0;
const MAX_LATITUDE: f64 = 85.0511287798;

/// Projects to normalized web-mercator coordinates, `[0, 1]` on both axes.
pub fn project(point: LatLng) -> (f64, f64) {
    let lat = point.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = (point.lng + 180.0) / 360.0;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0;
    (x, y)
}

pub fn unproject(x: f64, y: f64) -> LatLng {
    let lat = (PI * (1.0 - 2.0 * y)).sinh().atan().to_degrees();
    LatLng::new(lat, x * 360.0 - 180.0)
}

/// A call made on a [`HeadlessMap`].
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    SetView { center: LatLng, zoom: f64 },
    FitBounds(LatLngBounds),
    AddLayer(LayerId),
    RemoveLayer(LayerId),
    OpenPopup(PopupId),
    ClosePopup(PopupId),
    AddControl(ControlId),
    Subscribe(MapEvent),
    Unsubscribe(SubscriptionId),
}

#[derive(Debug, Clone)]
pub enum HeadlessLayer {
    Tile(TileLayer),
    Vector {
        data: GeoJson,
        style: LayerStyle,
        bounds: LatLngBounds,
    },
}

pub struct HeadlessMap {
    element_id: String,
    options: MapOptions,
    width: f64,
    height: f64,
    min_zoom: f64,
    max_zoom: f64,
    view: Option<(LatLng, f64)>,
    layers: BTreeMap<LayerId, HeadlessLayer>,
    handlers: Vec<(SubscriptionId, MapEvent, ViewHandler)>,
    popups: Vec<(PopupId, Popup)>,
    controls: Vec<(ControlId, Control)>,
    journal: Vec<Operation>,
    next_id: u32,
}

impl HeadlessMap {
    pub fn new(element_id: &str, width: f64, height: f64, options: MapOptions) -> Self {
        HeadlessMap {
            element_id: element_id.to_string(),
            options,
            width,
            height,
            min_zoom: 0.0,
            max_zoom: 20.0,
            view: None,
            layers: BTreeMap::new(),
            handlers: Vec::new(),
            popups: Vec::new(),
            controls: Vec::new(),
            journal: Vec::new(),
            next_id: 1,
        }
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn element_id(&self) -> &str {
        &self.element_id
    }

    pub fn options(&self) -> MapOptions {
        self.options
    }

    pub fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    pub fn journal(&self) -> &[Operation] {
        &self.journal
    }

    pub fn tile_layers(&self) -> impl Iterator<Item = &TileLayer> {
        self.layers.values().filter_map(|layer| match layer {
            HeadlessLayer::Tile(tile) => Some(tile),
            HeadlessLayer::Vector { .. } => None,
        })
    }

    pub fn vector_layers(&self) -> impl Iterator<Item = (LayerId, &GeoJson, &LayerStyle)> {
        self.layers.iter().filter_map(|(id, layer)| match layer {
            HeadlessLayer::Vector { data, style, .. } => Some((*id, data, style)),
            HeadlessLayer::Tile(_) => None,
        })
    }

    pub fn popups(&self) -> impl Iterator<Item = &Popup> {
        self.popups.iter().map(|(_, popup)| popup)
    }

    pub fn controls(&self) -> impl Iterator<Item = &Control> {
        self.controls.iter().map(|(_, control)| control)
    }

    pub fn subscription_count(&self) -> usize {
        self.handlers.len()
    }

    /// Extent currently on screen.
    pub fn visible_bounds(&self) -> Option<LatLngBounds> {
        let (center, zoom) = self.view?;
        let scale = TILE_SIZE * 2f64.powf(zoom);
        let (cx, cy) = project(center);
        let (dx, dy) = (self.width / 2.0 / scale, self.height / 2.0 / scale);
        Some(LatLngBounds::new(unproject(cx - dx, cy + dy), unproject(cx + dx, cy - dy)))
    }

    /// Pixel position of a point on the current view, origin top-left.
    pub fn to_pixel(&self, point: LatLng) -> Option<(f64, f64)> {
        let (center, zoom) = self.view?;
        let scale = TILE_SIZE * 2f64.powf(zoom);
        let (cx, cy) = project(center);
        let (x, y) = project(point);
        Some(((x - cx) * scale + self.width / 2.0, (y - cy) * scale + self.height / 2.0))
    }

    /// A user drag ending at `center`.
    pub fn pan_to(&mut self, center: LatLng) -> Result<()> {
        let zoom = self.zoom().ok_or(MapError::NoView)?;
        self.apply_view(center, zoom);
        Ok(())
    }

    /// A user zoom around the current center.
    pub fn zoom_to(&mut self, zoom: f64) -> Result<()> {
        let center = self.center().ok_or(MapError::NoView)?;
        self.apply_view(center, zoom);
        Ok(())
    }

    fn apply_view(&mut self, center: LatLng, zoom: f64) {
        let zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        let zoom_changed = self.zoom() != Some(zoom);
        self.view = Some((center, zoom));
        if zoom_changed {
            self.emit(MapEvent::ZoomEnd);
        }
        self.emit(MapEvent::MoveEnd);
    }

    fn emit(&mut self, event: MapEvent) {
        let (center, zoom) = match self.view {
            Some(view) => view,
            None => return,
        };
        let change = ViewChange { event, center, zoom };
        for (_, kind, handler) in self.handlers.iter_mut() {
            if *kind == event {
                handler(&change);
            }
        }
    }
}

impl MapSurface for HeadlessMap {
    fn add_tile_layer(&mut self, layer: TileLayer) -> LayerId {
        let id = LayerId(self.next_id());
        self.min_zoom = f64::from(layer.min_zoom);
        self.max_zoom = f64::from(layer.max_zoom);
        self.layers.insert(id, HeadlessLayer::Tile(layer));
        self.journal.push(Operation::AddLayer(id));
        id
    }

    fn add_geojson_layer(&mut self, data: GeoJson, style: LayerStyle) -> Result<LayerId> {
        let bounds = get_extent(&data)?;
        let id = LayerId(self.next_id());
        self.layers.insert(id, HeadlessLayer::Vector { data, style, bounds });
        self.journal.push(Operation::AddLayer(id));
        Ok(id)
    }

    fn remove_layer(&mut self, id: LayerId) -> Result<()> {
        self.layers.remove(&id).ok_or(MapError::UnknownLayer(id.0))?;
        self.journal.push(Operation::RemoveLayer(id));
        Ok(())
    }

    fn layer_bounds(&self, id: LayerId) -> Result<LatLngBounds> {
        match self.layers.get(&id) {
            Some(HeadlessLayer::Vector { bounds, .. }) => Ok(*bounds),
            _ => Err(MapError::UnknownLayer(id.0)),
        }
    }

    fn center(&self) -> Option<LatLng> {
        self.view.map(|(center, _)| center)
    }

    fn zoom(&self) -> Option<f64> {
        self.view.map(|(_, zoom)| zoom)
    }

    fn set_view(&mut self, center: LatLng, zoom: f64) {
        self.journal.push(Operation::SetView { center, zoom });
        self.apply_view(center, zoom);
    }

    fn fit_bounds(&mut self, bounds: &LatLngBounds) {
        self.journal.push(Operation::FitBounds(*bounds));
        let zoom = self.bounds_zoom(bounds, false);
        let (x1, y1) = project(bounds.south_west);
        let (x2, y2) = project(bounds.north_east);
        self.apply_view(unproject((x1 + x2) / 2.0, (y1 + y2) / 2.0), zoom);
    }

    fn bounds_zoom(&self, bounds: &LatLngBounds, inside: bool) -> f64 {
        let (x1, y1) = project(bounds.south_west);
        let (x2, y2) = project(bounds.north_east);
        let (bw, bh) = ((x2 - x1).abs() * TILE_SIZE, (y1 - y2).abs() * TILE_SIZE);
        let sx = if bw > 0.0 { self.width / bw } else { f64::INFINITY };
        let sy = if bh > 0.0 { self.height / bh } else { f64::INFINITY };
        let scale = if inside { sx.max(sy) } else { sx.min(sy) };
        let zoom = scale.log2();
        let zoom = if inside { zoom.ceil() } else { zoom.floor() };
        zoom.clamp(self.min_zoom, self.max_zoom)
    }

    fn subscribe(&mut self, event: MapEvent, handler: ViewHandler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id());
        self.handlers.push((id, event, handler));
        self.journal.push(Operation::Subscribe(event));
        id
    }

    fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(sub, _, _)| *sub != id);
        let removed = self.handlers.len() != before;
        if removed {
            self.journal.push(Operation::Unsubscribe(id));
        }
        removed
    }

    fn open_popup(&mut self, popup: Popup) -> PopupId {
        let id = PopupId(self.next_id());
        self.popups.push((id, popup));
        self.journal.push(Operation::OpenPopup(id));
        id
    }

    fn close_popup(&mut self, id: PopupId) -> bool {
        let before = self.popups.len();
        self.popups.retain(|(popup, _)| *popup != id);
        let removed = self.popups.len() != before;
        if removed {
            self.journal.push(Operation::ClosePopup(id));
        }
        removed
    }

    fn add_control(&mut self, control: Control) -> ControlId {
        let id = ControlId(self.next_id());
        self.controls.push((id, control));
        self.journal.push(Operation::AddControl(id));
        id
    }
}

/// A page with a fixed set of mount elements and their pixel sizes.
#[derive(Debug, Default, Clone)]
pub struct HeadlessPage {
    elements: BTreeMap<String, (f64, f64)>,
}

impl HeadlessPage {
    pub fn new() -> Self {
        HeadlessPage::default()
    }

    pub fn with_element(mut self, id: &str, width: f64, height: f64) -> Self {
        self.elements.insert(id.to_string(), (width, height));
        self
    }
}

impl Page for HeadlessPage {
    type Map = HeadlessMap;

    fn has_element(&self, id: &str) -> bool {
        self.elements.contains_key(id)
    }

    fn create_map(&mut self, id: &str, options: MapOptions) -> Result<HeadlessMap> {
        let (width, height) = *self
            .elements
            .get(id)
            .ok_or_else(|| MapError::MissingElement(id.to_string()))?;
        Ok(HeadlessMap::new(id, width, height, options))
    }
}
