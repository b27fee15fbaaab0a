//! Moving widgets with the pointer.
//!
//! A press on an unlocked widget arms a drag.  Once the pointer has travelled
//! past the drag threshold the session becomes a drag, and from then on the
//! widget follows the pointer cell by cell.  Each accepted cell change is
//! applied immediately through [`LayoutExecutor::move_widget`], which may push
//! other widgets aside; nothing is buffered for a final commit.
//!
//! Pointer motion is coalesced: [`pointer_move`](PointerDragController::pointer_move)
//! only records the latest position and asks for an animation frame, and
//! [`animation_frame`](PointerDragController::animation_frame) performs at
//! most one move per frame.

use crate::config::InteractionConfig;
use crate::geometry::GridGeometry;
use crate::layout::{Cell, Footprint};
use crate::traits::{LayoutExecutor, PointerCapture, PointerId};
use log::debug;

/// Default drag-intent threshold in pixels.
pub const DEFAULT_DRAG_THRESHOLD: f64 = 4.0;

/// Where the controller is in its state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragPhase {
    Idle,
    /// Pressed, but not yet moved far enough to count as a drag.
    Armed,
    Dragging,
}

/// How a press ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragOutcome {
    /// Released before the threshold was crossed.
    Click,
    /// Released after dragging; the last applied position stands.
    Dropped,
    /// The release did not belong to the active session.
    Ignored,
}

#[derive(Debug)]
struct DragSession {
    widget_id: String,
    pointer: PointerId,
    footprint: Footprint,
    start: (f64, f64),
    /// Pointer position relative to the widget's top-left pixel.
    grab: (f64, f64),
    last_cell: Cell,
    pending: Option<(f64, f64)>,
    dragging: bool,
}

/// Drives widget moves from pointer events.
pub struct PointerDragController<C: PointerCapture> {
    capture: C,
    threshold: f64,
    session: Option<DragSession>,
    blocked: bool,
}

impl<C: PointerCapture> PointerDragController<C> {
    pub fn new(capture: C) -> Self {
        Self {
            capture,
            threshold: DEFAULT_DRAG_THRESHOLD,
            session: None,
            blocked: false,
        }
    }

    /// A controller using the configured drag threshold.
    pub fn from_config(capture: C, config: &InteractionConfig) -> Self {
        Self::new(capture).with_threshold(config.drag_threshold_px)
    }

    pub fn with_threshold(mut self, threshold_px: f64) -> Self {
        self.threshold = threshold_px.max(0.0);
        self
    }

    pub fn phase(&self) -> DragPhase {
        match &self.session {
            None => DragPhase::Idle,
            Some(s) if s.dragging => DragPhase::Dragging,
            Some(_) => DragPhase::Armed,
        }
    }

    /// Whether the most recent move attempt was rejected.  For UI feedback
    /// only; the controller does not retry.
    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    pub fn active_widget(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.widget_id.as_str())
    }

    /// Press on `widget_id`.  Returns `false` if the press does not start a
    /// session: another session is active, the widget is unknown or locked,
    /// or another pointer holds it.
    pub fn pointer_down<E: LayoutExecutor>(
        &mut self,
        executor: &E,
        geometry: &GridGeometry,
        widget_id: &str,
        pointer: PointerId,
        px: f64,
        py: f64,
    ) -> bool {
        if self.session.is_some() {
            return false;
        }
        let widget = match executor.state().find(widget_id) {
            Some(w) if !w.locked => w,
            Some(_) => {
                debug!("drag refused: {} is locked", widget_id);
                return false;
            }
            None => return false,
        };
        if !self.capture.acquire(widget_id, pointer) {
            return false;
        }

        let origin = widget.rect().origin();
        let footprint = widget.footprint();
        let pixel = geometry.pixel_rect_from_cell(origin, footprint);
        self.session = Some(DragSession {
            widget_id: widget_id.to_string(),
            pointer,
            footprint,
            start: (px, py),
            grab: (px - pixel.left, py - pixel.top),
            last_cell: origin,
            pending: None,
            dragging: false,
        });
        self.blocked = false;
        true
    }

    /// Pointer motion.  Returns `true` when the caller should request an
    /// animation frame; further motion before that frame is coalesced.
    pub fn pointer_move(&mut self, pointer: PointerId, px: f64, py: f64) -> bool {
        let threshold = self.threshold;
        let session = match self.session.as_mut() {
            Some(s) if s.pointer == pointer => s,
            _ => return false,
        };
        if !session.dragging {
            let dx = px - session.start.0;
            let dy = py - session.start.1;
            if dx * dx + dy * dy < threshold * threshold {
                return false;
            }
            debug!("drag started on {}", session.widget_id);
            session.dragging = true;
        }
        let needs_frame = session.pending.is_none();
        session.pending = Some((px, py));
        needs_frame
    }

    /// Apply the latest coalesced pointer position.  Returns `true` if the
    /// widget moved.
    pub fn animation_frame<E: LayoutExecutor>(&mut self, executor: &mut E, geometry: &GridGeometry) -> bool {
        let (id, cell) = match self.session.as_mut() {
            Some(session) => match session.pending.take() {
                Some((px, py)) => (
                    session.widget_id.clone(),
                    geometry.cell_from_point(px - session.grab.0, py - session.grab.1, session.footprint),
                ),
                None => return false,
            },
            None => return false,
        };
        if !executor.state().contains(&id) {
            debug!("{} disappeared during drag", id);
            self.cancel_drag();
            return false;
        }
        if self.session.as_ref().map(|s| s.last_cell) == Some(cell) {
            self.blocked = false;
            return false;
        }

        let moved = executor.move_widget(&id, cell.col, cell.row);
        self.blocked = !moved;
        if moved {
            if let (Some(session), Some(widget)) = (self.session.as_mut(), executor.state().find(&id)) {
                session.last_cell = widget.rect().origin();
            }
        }
        moved
    }

    /// Release.  A drag applies any position still waiting for a frame.
    pub fn pointer_up<E: LayoutExecutor>(
        &mut self,
        executor: &mut E,
        geometry: &GridGeometry,
        pointer: PointerId,
    ) -> DragOutcome {
        let dragging = match &self.session {
            Some(s) if s.pointer == pointer => s.dragging,
            _ => return DragOutcome::Ignored,
        };
        if dragging {
            self.animation_frame(executor, geometry);
        }
        self.end_session();
        if dragging {
            DragOutcome::Dropped
        } else {
            DragOutcome::Click
        }
    }

    /// Abandon the session.  Moves already applied are kept.
    pub fn cancel_drag(&mut self) {
        self.end_session();
        self.blocked = false;
    }

    /// Escape key.  Returns `true` if a session was cancelled.
    pub fn on_escape(&mut self) -> bool {
        let active = self.session.is_some();
        self.cancel_drag();
        active
    }

    fn end_session(&mut self) {
        if let Some(session) = self.session.take() {
            self.capture.release(&session.widget_id, session.pointer);
        }
    }
}
