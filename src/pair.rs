//! The overview/detail map pair of a place page.

use std::cell::RefCell;
use std::rc::Rc;

use crate::config_params::{MapSlot, PlaceConfig};
use crate::error::{Incidents, Result};
use crate::fetch::DatasetSource;
use crate::overlay;
use crate::popup::PopupPresenter;
use crate::surface::{Control, ControlPosition, LayerId, MapOptions, MapSurface, TileLayer};
use crate::sync::ViewportSync;
use crate::view::{self, EstablishedView};

/// The document a pair is mounted in.
pub trait Page {
    type Map: MapSurface;

    fn has_element(&self, id: &str) -> bool;

    /// Creates a map bound to the element `id`.
    fn create_map(&mut self, id: &str, options: MapOptions) -> Result<Self::Map>;
}

/// Progress of a single map. The overview map stops at `ViewEstablished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MapState {
    Uninitialized,
    ViewEstablished,
    GeometryDrawn,
    PopupOpen,
}

pub struct MapHandle<M> {
    slot: MapSlot,
    map: Rc<RefCell<M>>,
    state: MapState,
    view: Option<EstablishedView>,
    geometry: Option<LayerId>,
}

impl<M: MapSurface> MapHandle<M> {
    fn new(slot: MapSlot, map: M) -> Self {
        MapHandle {
            slot,
            map: Rc::new(RefCell::new(map)),
            state: MapState::Uninitialized,
            view: None,
            geometry: None,
        }
    }

    pub fn map(&self) -> &Rc<RefCell<M>> {
        &self.map
    }

    pub fn state(&self) -> MapState {
        self.state
    }

    pub fn view(&self) -> Option<EstablishedView> {
        self.view
    }

    pub fn geometry_layer(&self) -> Option<LayerId> {
        self.geometry
    }

    fn has_view(&self) -> bool {
        self.state >= MapState::ViewEstablished
    }
}

/// Both maps of a page, sharing one configuration.
pub struct MapPair<M> {
    config: Rc<PlaceConfig>,
    side: Option<MapHandle<M>>,
    main: Option<MapHandle<M>>,
    popup: PopupPresenter,
    sync: ViewportSync,
    incidents: Incidents,
    initialized: bool,
}

/// Mounts and initializes the pair; `None` when the page has neither map element.
pub async fn init_map<P, S>(
    config: Rc<PlaceConfig>,
    page: &mut P,
    source: &S,
) -> Option<MapPair<P::Map>>
where
    P: Page,
    P::Map: 'static,
    S: DatasetSource,
{
    let mut pair = MapPair::attach(config, page)?;
    pair.initialize(source).await;
    Some(pair)
}

impl<M: MapSurface + 'static> MapPair<M> {
    /// Creates whichever maps the page has room for, with their base layers.
    pub fn attach<P: Page<Map = M>>(config: Rc<PlaceConfig>, page: &mut P) -> Option<Self> {
        let has_side = page.has_element(MapSlot::Side.element_id());
        let has_main = page.has_element(MapSlot::Main.element_id());
        if !has_side && !has_main {
            tracing::debug!("no map elements on this page");
            return None;
        }
        tracing::info!(side = has_side, main = has_main, "attaching maps");

        let incidents = Incidents::default();
        let side = if has_side {
            let created = page.create_map(MapSlot::Side.element_id(), MapOptions::overview());
            try_or_record!(incidents, MapSlot::Side, "create map", created).map(|mut map| {
                map.add_tile_layer(TileLayer::toner());
                map.add_control(Control::attribution(
                    config.attribution_prefix(),
                    ControlPosition::BottomLeft,
                ));
                MapHandle::new(MapSlot::Side, map)
            })
        } else {
            None
        };
        let main = if has_main {
            let created = page.create_map(MapSlot::Main.element_id(), MapOptions::detail());
            try_or_record!(incidents, MapSlot::Main, "create map", created).map(|mut map| {
                map.add_tile_layer(TileLayer::toner_lite());
                MapHandle::new(MapSlot::Main, map)
            })
        } else {
            None
        };

        Some(MapPair {
            config,
            side,
            main,
            popup: PopupPresenter::new(),
            sync: ViewportSync::new(),
            incidents,
            initialized: false,
        })
    }

    /// Establishes both views concurrently, then decorates the detail map and
    /// binds the overview to it. Failures are recorded, never returned.
    ///
    /// Runs once per pair: later calls do nothing, even if a view failed.
    pub async fn initialize<S: DatasetSource>(&mut self, source: &S) {
        if self.initialized {
            tracing::debug!("maps already initialized");
            return;
        }
        self.initialized = true;

        let MapPair {
            config,
            side,
            main,
            popup,
            sync,
            incidents,
            ..
        } = self;
        let config: &PlaceConfig = config;
        let incidents: &Incidents = incidents;

        futures::join!(
            establish(side.as_mut(), config, source, incidents),
            establish(main.as_mut(), config, source, incidents)
        );

        let handle = match main.as_mut() {
            Some(handle) if handle.has_view() => handle,
            _ => return,
        };

        let drawn = overlay::draw(&mut *handle.map.borrow_mut(), config.geometry());
        let drawn = try_or_record!(incidents, MapSlot::Main, "draw geometry", drawn);
        if let Some(Some(layer)) = drawn {
            handle.geometry = Some(layer);
            handle.state = MapState::GeometryDrawn;
        }

        if let Some(content) = config.popup_content() {
            let opened = popup.open(&mut *handle.map.borrow_mut(), content);
            if let Some(Some(_)) = try_or_record!(incidents, MapSlot::Main, "open popup", opened) {
                handle.state = MapState::PopupOpen;
            }
        }

        arm(sync, side.as_ref(), main.as_ref());
    }

    /// Binds the overview to the detail map once both exist and the detail
    /// map has a view. Safe to call repeatedly.
    pub fn arm_sync(&mut self) -> bool {
        arm(&mut self.sync, self.side.as_ref(), self.main.as_ref())
    }

    pub fn is_synced(&self) -> bool {
        self.sync.is_armed()
    }

    pub fn handle(&self, slot: MapSlot) -> Option<&MapHandle<M>> {
        match slot {
            MapSlot::Side => self.side.as_ref(),
            MapSlot::Main => self.main.as_ref(),
        }
    }

    pub fn map(&self, slot: MapSlot) -> Option<&Rc<RefCell<M>>> {
        self.handle(slot).map(MapHandle::map)
    }

    pub fn state(&self, slot: MapSlot) -> Option<MapState> {
        self.handle(slot).map(MapHandle::state)
    }

    pub fn config(&self) -> &PlaceConfig {
        &self.config
    }

    pub fn incidents(&self) -> &Incidents {
        &self.incidents
    }

    /// Drops the binding and the popup, then releases both maps.
    pub fn teardown(mut self) {
        if let Some(ref main) = self.main {
            self.sync.disarm(&main.map);
            self.popup.close(&mut *main.map.borrow_mut());
        }
        tracing::info!("maps torn down");
    }
}

async fn establish<M: MapSurface, S: DatasetSource>(
    handle: Option<&mut MapHandle<M>>,
    config: &PlaceConfig,
    source: &S,
    incidents: &Incidents,
) {
    let handle = match handle {
        Some(handle) => handle,
        None => return,
    };
    let established = view::establish(&handle.map, handle.slot, config, source).await;
    if let Some(view) = try_or_record!(incidents, handle.slot, "establish view", established) {
        tracing::debug!(map = %handle.slot, ?view, "view established");
        handle.view = Some(view);
        handle.state = MapState::ViewEstablished;
    }
}

fn arm<M: MapSurface + 'static>(
    sync: &mut ViewportSync,
    side: Option<&MapHandle<M>>,
    main: Option<&MapHandle<M>>,
) -> bool {
    match (side, main) {
        (Some(side), Some(main)) if main.has_view() => {
            let armed = sync.arm(&main.map, &side.map);
            if armed {
                tracing::debug!("overview map follows detail map");
            }
            armed
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_params::LatLng;
    use crate::fetch::MemorySource;
    use crate::headless::HeadlessPage;
    use crate::surface::ControlKind;
    use futures::executor::block_on;

    fn page() -> HeadlessPage {
        HeadlessPage::new()
            .with_element("side-map", 300.0, 300.0)
            .with_element("main-map", 800.0, 415.0)
    }

    #[test]
    fn no_elements_no_pair() {
        let mut page = HeadlessPage::new().with_element("search-query", 10.0, 10.0);
        let config = Rc::new(PlaceConfig::default());
        let pair = block_on(init_map(config, &mut page, &MemorySource::new()));
        assert!(pair.is_none());
    }

    #[test]
    fn side_map_gets_credits_attribution() {
        let config = Rc::new(PlaceConfig {
            credits_url: "/about/credits".to_string(),
            ..PlaceConfig::default()
        });
        let pair = MapPair::attach(config, &mut page()).unwrap();
        let side = pair.map(MapSlot::Side).unwrap().borrow();
        let control = side.controls().next().unwrap();
        assert_eq!(control.position, ControlPosition::BottomLeft);
        assert_eq!(
            control.kind,
            ControlKind::Attribution {
                prefix: "<a href=\"/about/credits\">Map Credits</a>".to_string()
            }
        );
        let tiles = side.tile_layers().next().unwrap();
        assert_eq!(tiles.url_template, TileLayer::toner().url_template);
    }

    #[test]
    fn only_detail_map_never_syncs() {
        let config = Rc::new(PlaceConfig {
            centroid: Some(LatLng::new(1.0, 2.0)),
            ..PlaceConfig::default()
        });
        let mut page = HeadlessPage::new().with_element("main-map", 800.0, 415.0);
        let mut pair = block_on(init_map(config, &mut page, &MemorySource::new())).unwrap();
        assert!(pair.map(MapSlot::Side).is_none());
        assert_eq!(pair.state(MapSlot::Main), Some(MapState::ViewEstablished));
        assert!(!pair.arm_sync());
        assert!(!pair.is_synced());
    }

    #[test]
    fn states_follow_the_detail_sequence() {
        let config = Rc::new(PlaceConfig {
            centroid: Some(LatLng::new(1.0, 2.0)),
            popup: Some("<p>Hi</p>".to_string()),
            geojson: Some(serde_json::json!({"type": "Point", "coordinates": [2.0, 1.0]})),
            ..PlaceConfig::default()
        });
        let mut pair = block_on(init_map(config, &mut page(), &MemorySource::new())).unwrap();
        assert_eq!(pair.state(MapSlot::Side), Some(MapState::ViewEstablished));
        assert_eq!(pair.state(MapSlot::Main), Some(MapState::PopupOpen));
        let main = pair.handle(MapSlot::Main).unwrap();
        assert_eq!(main.view(), Some(EstablishedView::Centroid));
        assert!(main.geometry_layer().is_some());
        assert!(pair.is_synced());
        assert!(!pair.arm_sync());
        assert!(pair.incidents().is_empty());
    }

    #[test]
    fn teardown_releases_subscriptions() {
        let config = Rc::new(PlaceConfig {
            centroid: Some(LatLng::new(1.0, 2.0)),
            popup: Some("x".to_string()),
            ..PlaceConfig::default()
        });
        let pair = block_on(init_map(config, &mut page(), &MemorySource::new())).unwrap();
        let main = Rc::clone(pair.map(MapSlot::Main).unwrap());
        assert_eq!(main.borrow().subscription_count(), 2);
        pair.teardown();
        assert_eq!(main.borrow().subscription_count(), 0);
        assert_eq!(main.borrow().popups().count(), 0);
    }

    #[test]
    fn second_initialize_is_a_no_op() {
        let source = MemorySource::new().with_body(
            "/geojson/null-island.geojson",
            r#"{"type": "Polygon", "coordinates":
                [[[-1.0, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, 1.0], [-1.0, -1.0]]]}"#,
        );
        let mut pair = MapPair::attach(Rc::new(PlaceConfig::default()), &mut page()).unwrap();
        block_on(pair.initialize(&source));
        block_on(pair.initialize(&source));

        assert_eq!(source.requests().len(), 2);
        let side = pair.map(MapSlot::Side).unwrap().borrow();
        assert_eq!(side.vector_layers().count(), 1);
        assert_eq!(side.controls().count(), 2);
        let main = pair.map(MapSlot::Main).unwrap().borrow();
        assert_eq!(main.vector_layers().count(), 1);
        assert_eq!(main.subscription_count(), 2);
    }

    #[test]
    fn failed_fallback_is_not_retried() {
        let source = MemorySource::new();
        let mut pair = MapPair::attach(Rc::new(PlaceConfig::default()), &mut page()).unwrap();
        block_on(pair.initialize(&source));
        block_on(pair.initialize(&source));

        assert_eq!(source.requests().len(), 2);
        assert_eq!(pair.incidents().len(), 2);
        assert_eq!(pair.state(MapSlot::Main), Some(MapState::Uninitialized));
    }
}
