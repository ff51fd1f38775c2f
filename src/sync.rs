use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::surface::{MapEvent, MapSurface, SubscriptionId, ViewChange};

/// One-way binding: the follower's center tracks the primary's, the follower
/// keeps its own zoom. Nothing is ever written back to the primary.
#[derive(Debug, Default)]
pub struct ViewportSync {
    subscriptions: Option<[SubscriptionId; 2]>,
}

impl ViewportSync {
    pub fn new() -> Self {
        ViewportSync::default()
    }

    pub fn is_armed(&self) -> bool {
        self.subscriptions.is_some()
    }

    /// Subscribes to the primary's pan-end and zoom-end notifications.
    ///
    /// Returns `false` without subscribing when already armed or when both
    /// handles are the same map.
    pub fn arm<M: MapSurface + 'static>(
        &mut self,
        primary: &Rc<RefCell<M>>,
        follower: &Rc<RefCell<M>>,
    ) -> bool {
        if self.is_armed() || Rc::ptr_eq(primary, follower) {
            return false;
        }
        let mut primary = primary.borrow_mut();
        let zoom_end = primary.subscribe(MapEvent::ZoomEnd, follow(Rc::downgrade(follower)));
        let move_end = primary.subscribe(MapEvent::MoveEnd, follow(Rc::downgrade(follower)));
        self.subscriptions = Some([zoom_end, move_end]);
        true
    }

    pub fn disarm<M: MapSurface>(&mut self, primary: &RefCell<M>) -> bool {
        match self.subscriptions.take() {
            Some(ids) => {
                let mut primary = primary.borrow_mut();
                for id in ids {
                    primary.unsubscribe(id);
                }
                true
            }
            None => false,
        }
    }
}

fn follow<M: MapSurface + 'static>(follower: Weak<RefCell<M>>) -> Box<dyn FnMut(&ViewChange)> {
    Box::new(move |change: &ViewChange| {
        let follower = match follower.upgrade() {
            Some(follower) => follower,
            None => return,
        };
        let mut follower = follower.borrow_mut();
        match follower.zoom() {
            Some(zoom) => follower.set_view(change.center, zoom),
            None => tracing::debug!("follower has no zoom yet, not syncing"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_params::LatLng;
    use crate::headless::{HeadlessMap, Operation};
    use crate::surface::MapOptions;

    fn pair() -> (Rc<RefCell<HeadlessMap>>, Rc<RefCell<HeadlessMap>>) {
        let mut main = HeadlessMap::new("main-map", 800.0, 415.0, MapOptions::detail());
        main.set_view(LatLng::new(0.0, 0.0), 8.0);
        let mut side = HeadlessMap::new("side-map", 300.0, 300.0, MapOptions::overview());
        side.set_view(LatLng::new(0.0, 0.0), 3.0);
        (Rc::new(RefCell::new(main)), Rc::new(RefCell::new(side)))
    }

    fn set_views(map: &RefCell<HeadlessMap>) -> usize {
        map.borrow()
            .journal()
            .iter()
            .filter(|op| matches!(op, Operation::SetView { .. }))
            .count()
    }

    #[test]
    fn follower_keeps_its_zoom() {
        let (main, side) = pair();
        let mut sync = ViewportSync::new();
        assert!(sync.arm(&main, &side));

        main.borrow_mut().pan_to(LatLng::new(5.0, 6.0)).unwrap();
        assert_eq!(side.borrow().center(), Some(LatLng::new(5.0, 6.0)));
        assert_eq!(side.borrow().zoom(), Some(3.0));

        main.borrow_mut().zoom_to(12.0).unwrap();
        assert_eq!(side.borrow().zoom(), Some(3.0));
    }

    #[test]
    fn arming_twice_subscribes_once() {
        let (main, side) = pair();
        let mut sync = ViewportSync::new();
        assert!(sync.arm(&main, &side));
        assert!(!sync.arm(&main, &side));
        assert_eq!(main.borrow().subscription_count(), 2);

        let before = set_views(&side);
        main.borrow_mut().pan_to(LatLng::new(1.0, 1.0)).unwrap();
        assert_eq!(set_views(&side), before + 1);
    }

    #[test]
    fn follower_never_drives_primary() {
        let (main, side) = pair();
        let mut sync = ViewportSync::new();
        sync.arm(&main, &side);
        side.borrow_mut().pan_to(LatLng::new(40.0, 40.0)).unwrap();
        assert_eq!(main.borrow().center(), Some(LatLng::new(0.0, 0.0)));
        assert_eq!(side.borrow().subscription_count(), 0);
    }

    #[test]
    fn refuses_self_binding() {
        let (main, _) = pair();
        let mut sync = ViewportSync::new();
        assert!(!sync.arm(&main, &main));
        assert!(!sync.is_armed());
    }

    #[test]
    fn disarm_unsubscribes() {
        let (main, side) = pair();
        let mut sync = ViewportSync::new();
        sync.arm(&main, &side);
        assert!(sync.disarm(&main));
        assert_eq!(main.borrow().subscription_count(), 0);
        main.borrow_mut().pan_to(LatLng::new(9.0, 9.0)).unwrap();
        assert_eq!(side.borrow().center(), Some(LatLng::new(0.0, 0.0)));
    }
}
