//! JSON file persistence.
//!
//! The dashboard lives in a single pretty-printed JSON file.  Writes go to a
//! sibling temp file that is renamed over the target, and the previous file
//! is copied to `<stem>.backup.json` first.  A corrupt primary file is
//! recovered from that backup on load.

use crate::layout::{GridConfig, LayoutState, WidgetRegistry};
use crate::migration;
use crate::operation::{apply_local, LayoutOperation};
use crate::traits::{AuthorityError, LayoutAuthority};
use log::{debug, error, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// File-backed [`LayoutAuthority`].
///
/// In *passive* mode it only loads and saves; operations are reported as
/// unavailable so the store computes them and debounces saves.  In
/// *authoritative* mode it executes each operation itself (load, apply,
/// save) and hands back the result.
#[derive(Debug, Clone)]
pub struct FileAuthority {
    path: PathBuf,
    authoritative: bool,
    registry: WidgetRegistry,
    grid: GridConfig,
}

impl FileAuthority {
    pub fn passive(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            authoritative: false,
            registry: WidgetRegistry::builtin(),
            grid: GridConfig::default(),
        }
    }

    pub fn authoritative(path: impl Into<PathBuf>) -> Self {
        Self {
            authoritative: true,
            ..Self::passive(path)
        }
    }

    /// Constraints used when executing operations authoritatively.
    pub fn with_registry(mut self, registry: WidgetRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Grid of the first-run dashboard created when nothing is stored.
    pub fn with_grid(mut self, grid: GridConfig) -> Self {
        if grid.columns > 0 && grid.rows > 0 {
            self.grid = grid;
        }
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_authoritative(&self) -> bool {
        self.authoritative
    }

    pub fn backup_path(&self) -> PathBuf {
        self.sibling("backup")
    }

    fn temp_path(&self) -> PathBuf {
        self.sibling("tmp")
    }

    /// `<dir>/<stem>.<tag>.json`
    fn sibling(&self, tag: &str) -> PathBuf {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "dashboard".into());
        self.path.with_file_name(format!("{}.{}.json", stem, tag))
    }

    fn read(path: &Path) -> Result<LayoutState, AuthorityError> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn load_backup(&self, primary_error: AuthorityError) -> Result<LayoutState, AuthorityError> {
        let backup = self.backup_path();
        if !backup.exists() {
            error!("{} is unreadable and there is no backup", self.path.display());
            return Err(primary_error);
        }
        warn!("loading backup {}", backup.display());
        match Self::read(&backup) {
            Ok(state) => {
                info!("recovered {} widgets from backup", state.widgets.len());
                Ok(state)
            }
            Err(e) => {
                error!("backup is unreadable too: {}", e);
                Err(e)
            }
        }
    }

    /// The layout operations are executed against: the stored one, or the
    /// first-run dashboard when nothing is stored.
    fn current(&self) -> Result<LayoutState, AuthorityError> {
        match self.load_dashboard() {
            Ok(state) => Ok(migration::migrate(state, &self.registry).state),
            Err(AuthorityError::NotFound) => {
                let mut state = LayoutState::with_default_widgets(self.grid);
                state.normalize(&self.registry);
                Ok(state)
            }
            Err(e) => Err(e),
        }
    }
}

impl LayoutAuthority for FileAuthority {
    fn load_dashboard(&self) -> Result<LayoutState, AuthorityError> {
        if !self.path.exists() {
            return Err(AuthorityError::NotFound);
        }
        match Self::read(&self.path) {
            Ok(state) => {
                debug!("loaded {} widgets from {}", state.widgets.len(), self.path.display());
                Ok(state)
            }
            Err(e) => {
                warn!("failed to load {}: {}", self.path.display(), e);
                self.load_backup(e)
            }
        }
    }

    fn save_dashboard(&self, state: &LayoutState) -> Result<(), AuthorityError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        if self.path.exists() {
            if let Err(e) = fs::copy(&self.path, self.backup_path()) {
                warn!("failed to back up {}: {}", self.path.display(), e);
            }
        }
        let json = serde_json::to_string_pretty(state)?;
        let temp = self.temp_path();
        fs::write(&temp, json)?;
        fs::rename(&temp, &self.path)?;
        debug!("saved {} widgets to {}", state.widgets.len(), self.path.display());
        Ok(())
    }

    fn apply_layout_operation(&self, op: &LayoutOperation) -> Result<LayoutState, AuthorityError> {
        if !self.authoritative {
            return Err(AuthorityError::Unavailable("file authority is passive".into()));
        }
        let current = self.current()?;
        let next = apply_local(&current, op, &self.registry)
            .map_err(|e| AuthorityError::Rejected(e.to_string()))?;
        self.save_dashboard(&next)?;
        Ok(next)
    }
}
