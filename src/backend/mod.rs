//! [`LayoutAuthority`] implementations.
//!
//! * [`file::FileAuthority`] persists the dashboard as a JSON file and can
//!   optionally act as the authority that executes operations.
//! * [`DetachedAuthority`] persists nothing; every operation is computed
//!   locally and saves are dropped.

pub mod file;

use crate::layout::LayoutState;
use crate::operation::LayoutOperation;
use crate::traits::{AuthorityError, LayoutAuthority};
use log::debug;

/// An authority with no backing store.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetachedAuthority;

impl LayoutAuthority for DetachedAuthority {
    fn load_dashboard(&self) -> Result<LayoutState, AuthorityError> {
        Err(AuthorityError::NotFound)
    }

    fn save_dashboard(&self, state: &LayoutState) -> Result<(), AuthorityError> {
        debug!("detached: dropping save of {} widgets", state.widgets.len());
        Ok(())
    }

    fn apply_layout_operation(&self, _op: &LayoutOperation) -> Result<LayoutState, AuthorityError> {
        Err(AuthorityError::Unavailable("detached".into()))
    }
}
