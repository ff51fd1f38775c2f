//! The mapping capability the pair controller drives.
//!
//! Rendering, tile fetching and projection all live behind [`MapSurface`]; the
//! controller only ever asks for views, layers, popups, controls and viewport
//! notifications.

use geojson::GeoJson;

use crate::config_params::{LatLng, LatLngBounds};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PopupId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControlId(pub u32);

/// Interaction toggles given when a map is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapOptions {
    pub attribution_control: bool,
    pub zoom_control: bool,
    pub double_click_zoom: bool,
    pub box_zoom: bool,
    pub dragging: bool,
    pub keyboard: bool,
    pub scroll_wheel_zoom: bool,
    pub touch_zoom: bool,
}

impl MapOptions {
    /// A static map: nothing the user does moves it.
    pub fn overview() -> Self {
        MapOptions {
            attribution_control: false,
            zoom_control: false,
            double_click_zoom: false,
            box_zoom: false,
            dragging: false,
            keyboard: false,
            scroll_wheel_zoom: false,
            touch_zoom: false,
        }
    }

    pub fn detail() -> Self {
        MapOptions {
            attribution_control: false,
            ..MapOptions::interactive()
        }
    }

    fn interactive() -> Self {
        MapOptions {
            attribution_control: true,
            zoom_control: true,
            double_click_zoom: true,
            box_zoom: true,
            dragging: true,
            keyboard: true,
            scroll_wheel_zoom: true,
            touch_zoom: true,
        }
    }

    pub fn is_interactive(&self) -> bool {
        self.dragging || self.scroll_wheel_zoom || self.touch_zoom || self.keyboard
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TileLayer {
    pub url_template: String,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub ext: &'static str,
}

impl TileLayer {
    fn stadia(style: &str) -> Self {
        TileLayer {
            url_template: format!(
                "https://tiles.stadiamaps.com/tiles/{}/{{z}}/{{x}}/{{y}}{{r}}.{{ext}}",
                style
            ),
            min_zoom: 0,
            max_zoom: 20,
            ext: "png",
        }
    }

    pub fn toner() -> Self {
        TileLayer::stadia("stamen_toner")
    }

    pub fn toner_lite() -> Self {
        TileLayer::stadia("stamen_toner_lite")
    }
}

/// Vector layer paint properties.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerStyle {
    pub color: String,
    pub weight: f64,
    pub opacity: f64,
    pub fill_color: Option<String>,
    pub fill_opacity: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControlKind {
    Attribution { prefix: String },
    Html { element_id: String, class_name: String, html: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Control {
    pub position: ControlPosition,
    pub kind: ControlKind,
}

impl Control {
    pub fn attribution(prefix: String, position: ControlPosition) -> Self {
        Control {
            position,
            kind: ControlKind::Attribution { prefix },
        }
    }

    /// Fixed panel explaining that the place has no coordinates.
    pub fn null_label() -> Self {
        Control {
            position: ControlPosition::TopLeft,
            kind: ControlKind::Html {
                element_id: "null-island".to_string(),
                class_name: "text-panel".to_string(),
                html: "<p><strong>Ahem.</strong></p>\
                       <p>We don't seem to have coordinates for this place.</p>\
                       <p>So here's a map of Null Island instead.</p>"
                    .to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Popup {
    pub content: String,
    pub anchor: LatLng,
    pub close_on_click: bool,
    pub close_button: bool,
}

/// Viewport notifications a map can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapEvent {
    MoveEnd,
    ZoomEnd,
}

/// Payload handed to subscribers: the emitting map's viewport after the change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewChange {
    pub event: MapEvent,
    pub center: LatLng,
    pub zoom: f64,
}

pub type ViewHandler = Box<dyn FnMut(&ViewChange)>;

pub trait MapSurface {
    fn add_tile_layer(&mut self, layer: TileLayer) -> LayerId;

    /// Adds a vector layer; fails when the data cannot be drawn.
    fn add_geojson_layer(&mut self, data: GeoJson, style: LayerStyle) -> Result<LayerId>;

    fn remove_layer(&mut self, id: LayerId) -> Result<()>;

    /// Extent of a vector layer's features.
    fn layer_bounds(&self, id: LayerId) -> Result<LatLngBounds>;

    /// `None` until a view has been established.
    fn center(&self) -> Option<LatLng>;

    fn zoom(&self) -> Option<f64>;

    fn set_view(&mut self, center: LatLng, zoom: f64);

    fn fit_bounds(&mut self, bounds: &LatLngBounds);

    /// Zoom at which `bounds` fits the map; with `inside`, the largest zoom at
    /// which the view still lies within `bounds`.
    fn bounds_zoom(&self, bounds: &LatLngBounds, inside: bool) -> f64;

    fn subscribe(&mut self, event: MapEvent, handler: ViewHandler) -> SubscriptionId;

    fn unsubscribe(&mut self, id: SubscriptionId) -> bool;

    fn open_popup(&mut self, popup: Popup) -> PopupId;

    fn close_popup(&mut self, id: PopupId) -> bool;

    fn add_control(&mut self, control: Control) -> ControlId;
}
