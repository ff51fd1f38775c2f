use crate::error::{MapError, Result};
use crate::surface::{MapSurface, Popup, PopupId};

/// Keeps at most one open popup; opening again replaces the previous one.
#[derive(Debug, Default)]
pub struct PopupPresenter {
    open: Option<PopupId>,
}

impl PopupPresenter {
    pub fn new() -> Self {
        PopupPresenter::default()
    }

    /// Opens `content` at the map's current center. Empty content is a no-op.
    pub fn open<M: MapSurface>(&mut self, map: &mut M, content: &str) -> Result<Option<PopupId>> {
        if content.is_empty() {
            return Ok(None);
        }
        let anchor = map.center().ok_or(MapError::NoView)?;
        if let Some(previous) = self.open.take() {
            map.close_popup(previous);
        }
        let id = map.open_popup(Popup {
            content: content.to_string(),
            anchor,
            close_on_click: false,
            close_button: false,
        });
        self.open = Some(id);
        Ok(Some(id))
    }

    pub fn close<M: MapSurface>(&mut self, map: &mut M) -> bool {
        match self.open.take() {
            Some(id) => map.close_popup(id),
            None => false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }
}
