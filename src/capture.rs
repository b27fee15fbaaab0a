//! In-process [`PointerCapture`] implementation.

use crate::traits::{PointerCapture, PointerId};
use log::debug;
use std::cell::RefCell;
use std::collections::HashMap;

/// Tracks which pointer holds which widget.
///
/// Share one registry (behind an `Rc`) between the drag and resize
/// controllers so a widget can only be in one session at a time.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    holders: RefCell<HashMap<String, PointerId>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of widgets currently held.
    pub fn active_sessions(&self) -> usize {
        self.holders.borrow().len()
    }
}

impl PointerCapture for SessionRegistry {
    fn acquire(&self, widget_id: &str, pointer: PointerId) -> bool {
        let mut holders = self.holders.borrow_mut();
        match holders.get(widget_id) {
            Some(&held) if held != pointer => {
                debug!("{} already captured by pointer {}", widget_id, held);
                false
            }
            _ => {
                holders.insert(widget_id.to_string(), pointer);
                true
            }
        }
    }

    fn release(&self, widget_id: &str, pointer: PointerId) {
        let mut holders = self.holders.borrow_mut();
        if holders.get(widget_id) == Some(&pointer) {
            holders.remove(widget_id);
        }
    }

    fn holder(&self, widget_id: &str) -> Option<PointerId> {
        self.holders.borrow().get(widget_id).copied()
    }
}
