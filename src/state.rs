use std::io::ErrorKind;
use std::sync::{Arc, Mutex};

use crate::models::{Settings, SettingsFile};
use crate::storage::{Storage, StorageError};
use crate::store::TaskStore;
use crate::sync::SurfaceRegistry;

const SCHEMA_VERSION: u32 = 1;

/// Everything the desktop runtime shares between commands and windows.
#[derive(Clone)]
pub struct AppState {
    store: TaskStore,
    settings: Arc<Mutex<Settings>>,
    surfaces: SurfaceRegistry,
}

impl AppState {
    pub fn new(store: TaskStore, settings: Settings) -> Self {
        Self {
            store,
            settings: Arc::new(Mutex::new(settings)),
            surfaces: SurfaceRegistry::new(),
        }
    }

    /// Loads tasks and settings from `storage`. Like the store, settings fall
    /// back to defaults instead of failing.
    pub fn load(storage: Storage) -> Self {
        let settings = match storage.load_settings() {
            Ok(file) => file.settings,
            Err(StorageError::Io(err)) if err.kind() == ErrorKind::NotFound => Settings::default(),
            Err(err) => {
                log::warn!("state: failed to load settings, using defaults: {err}");
                Settings::default()
            }
        };
        Self::new(TaskStore::load(storage), settings)
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn surfaces(&self) -> &SurfaceRegistry {
        &self.surfaces
    }

    pub fn settings(&self) -> Settings {
        let guard = self.settings.lock().expect("state poisoned");
        guard.clone()
    }

    pub fn update_settings(&self, settings: Settings) {
        let mut guard = self.settings.lock().expect("state poisoned");
        *guard = settings;
    }

    pub fn settings_file(&self) -> SettingsFile {
        SettingsFile {
            schema_version: SCHEMA_VERSION,
            settings: self.settings(),
        }
    }

    pub fn save_settings(&self) -> Result<(), StorageError> {
        self.store.storage().save_settings(&self.settings_file())
    }
}
