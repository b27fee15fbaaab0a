//! **dashgrid**: the grid layout engine of a desktop widget dashboard.
//!
//! Widgets live on a `columns × rows` grid (24×12 canonically).  Every
//! mutation goes through a [`LayoutStore`](store::LayoutStore), which keeps
//! the committed [`LayoutState`](layout::LayoutState) free of overlaps and
//! within bounds and size limits.  Pointer interaction is handled by the
//! [`drag`] and [`resize`] controllers, which translate pixels to cells with
//! [`geometry`] and push the result through the store.
//!
//! # Architecture
//!
//! The engine is single-threaded and never talks to its environment
//! directly.  The seams in [`traits`] are injected at construction:
//!
//! * [`traits::LayoutAuthority`]: the backend that persists the dashboard and
//!   may execute operations authoritatively.  [`backend`] has a JSON file
//!   implementation.
//! * [`traits::Scheduler`]: deferred callbacks, used to debounce saves.
//!   [`scheduler::ManualScheduler`] is a virtual clock.
//! * [`traits::PointerCapture`]: exclusive per-widget pointer sessions.
//! * [`traits::OperationSource`]: a transport delivering operations from
//!   another process ([`ipc`]).
//!
//! [`operation::apply_local`] and the functions in [`placement`] are pure and
//! hold the layout rules themselves.

pub mod backend;
pub mod capture;
pub mod config;
pub mod drag;
pub mod geometry;
pub mod intent;
pub mod ipc;
pub mod layout;
pub mod migration;
pub mod operation;
pub mod placement;
pub mod resize;
pub mod scheduler;
pub mod settings;
pub mod store;
pub mod traits;
pub mod validation;
