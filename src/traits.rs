//! Seams between the layout engine and its environment.
//!
//! The engine never talks to a backend, a timer, or a UI toolkit directly.
//! Instead:
//!
//! * [`LayoutAuthority`] is the backend that loads, saves, and (optionally)
//!   recomputes layouts authoritatively.
//! * [`Scheduler`] runs a callback after a delay; the store uses it to
//!   debounce saves.  Tests drive it with a fake clock.
//! * [`PointerCapture`] hands out exclusive interaction sessions per widget,
//!   standing in for a toolkit's native pointer capture.
//! * [`LayoutExecutor`] is what the interactive controllers need from the
//!   store.
//! * [`OperationSource`] is a transport delivering operations from outside
//!   the process (stdin, a pipe, ...).

use crate::layout::{LayoutState, WidgetConstraints};
use crate::operation::LayoutOperation;
use std::rc::Rc;
use std::sync::mpsc;
use std::time::Duration;

/// Errors from a [`LayoutAuthority`].
#[derive(Debug, thiserror::Error)]
pub enum AuthorityError {
    /// The authority could not be reached.
    #[error("layout authority unavailable: {0}")]
    Unavailable(String),
    /// The authority evaluated the operation and refused it.
    #[error("rejected by layout authority: {0}")]
    Rejected(String),
    /// Nothing has been saved yet.
    #[error("no saved dashboard")]
    NotFound,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The backend that owns the persisted dashboard.
///
/// Calls are synchronous from the engine's point of view.  Implementations
/// backed by a remote service surface transport problems as
/// [`AuthorityError::Unavailable`]; the store then computes the operation
/// locally instead.
pub trait LayoutAuthority {
    /// Load the persisted layout.
    fn load_dashboard(&self) -> Result<LayoutState, AuthorityError>;

    /// Persist `state`.  Failures are logged by the caller, never surfaced.
    fn save_dashboard(&self, state: &LayoutState) -> Result<(), AuthorityError>;

    /// Apply `op` authoritatively and return the resulting layout, which the
    /// caller adopts verbatim.
    fn apply_layout_operation(&self, op: &LayoutOperation) -> Result<LayoutState, AuthorityError>;
}

impl<A: LayoutAuthority + ?Sized> LayoutAuthority for Rc<A> {
    fn load_dashboard(&self) -> Result<LayoutState, AuthorityError> {
        (**self).load_dashboard()
    }

    fn save_dashboard(&self, state: &LayoutState) -> Result<(), AuthorityError> {
        (**self).save_dashboard(state)
    }

    fn apply_layout_operation(&self, op: &LayoutOperation) -> Result<LayoutState, AuthorityError> {
        (**self).apply_layout_operation(op)
    }
}

/// Handle to a scheduled callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CancelToken(pub u64);

/// Deferred execution on the UI thread.
pub trait Scheduler {
    /// Run `task` once after `delay`.
    fn schedule_after(&self, delay: Duration, task: Box<dyn FnOnce()>) -> CancelToken;

    /// Drop a pending task.  Cancelling a task that already ran is a no-op.
    fn cancel(&self, token: CancelToken);
}

impl<S: Scheduler + ?Sized> Scheduler for Rc<S> {
    fn schedule_after(&self, delay: Duration, task: Box<dyn FnOnce()>) -> CancelToken {
        (**self).schedule_after(delay, task)
    }

    fn cancel(&self, token: CancelToken) {
        (**self).cancel(token)
    }
}

/// Identifier of a pointer (mouse, pen, or one touch contact).
pub type PointerId = u32;

/// Exclusive interaction sessions keyed by widget id.
///
/// At most one pointer may hold a widget at a time; a second pointer cannot
/// take over an active drag or resize.
pub trait PointerCapture {
    /// Try to take `widget_id` for `pointer`.  Returns `false` if another
    /// pointer holds it.  Re-acquiring with the holding pointer succeeds.
    fn acquire(&self, widget_id: &str, pointer: PointerId) -> bool;

    /// Release `widget_id` if `pointer` holds it.
    fn release(&self, widget_id: &str, pointer: PointerId);

    /// The pointer currently holding `widget_id`.
    fn holder(&self, widget_id: &str) -> Option<PointerId>;
}

impl<C: PointerCapture + ?Sized> PointerCapture for Rc<C> {
    fn acquire(&self, widget_id: &str, pointer: PointerId) -> bool {
        (**self).acquire(widget_id, pointer)
    }

    fn release(&self, widget_id: &str, pointer: PointerId) {
        (**self).release(widget_id, pointer)
    }

    fn holder(&self, widget_id: &str) -> Option<PointerId> {
        (**self).holder(widget_id)
    }
}

/// The subset of the layout store the pointer controllers drive.
pub trait LayoutExecutor {
    /// The committed layout.
    fn state(&self) -> &LayoutState;

    /// Size limits for `widget_type`.
    fn constraints_for(&self, widget_type: &str) -> WidgetConstraints;

    /// Move `id` so its top-left corner is at `(x, y)`, displacing others.
    fn move_widget(&mut self, id: &str, x: u32, y: u32) -> bool;

    /// Resize `id`, optionally re-anchoring its origin.
    fn resize_widget(&mut self, id: &str, width: u32, height: u32, x: Option<u32>, y: Option<u32>) -> bool;
}

/// A transport that delivers [`LayoutOperation`]s.
///
/// # Contract
///
/// * [`run`](OperationSource::run) **blocks** until the source is exhausted or
///   an unrecoverable error occurs.
/// * Each received operation is sent through `sink` exactly once.
/// * Implementations are [`Send`] so they can run on a dedicated thread.
pub trait OperationSource: Send {
    type Error: std::error::Error + Send + 'static;

    /// Forward every incoming operation into `sink`.  Returns when the
    /// source is exhausted or the receiving end hangs up.
    fn run(&mut self, sink: mpsc::Sender<LayoutOperation>) -> Result<(), Self::Error>;
}
