//! Keeps every open window in step with the task store.
//!
//! A window attaches once when it is created and detaches when it closes.
//! While attached it is re-rendered from scratch after every store change:
//! the full list is pulled, projected for the window's kind, and handed to
//! its renderer, which throws away its old rows and draws the new ones.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::projection::{SurfaceKind, SurfaceView};
use crate::store::{SubscriptionId, TaskStore};

/// Draws a projection. Implementations replace everything they drew before.
pub trait SurfaceRenderer: Send + Sync {
    fn render(&self, view: SurfaceView);
}

/// A window's subscription to the store. Dropping it unsubscribes.
pub struct SurfaceBinding {
    store: TaskStore,
    kind: SurfaceKind,
    subscription: SubscriptionId,
}

impl SurfaceBinding {
    pub fn attach(store: &TaskStore, kind: SurfaceKind, renderer: Arc<dyn SurfaceRenderer>) -> Self {
        renderer.render(kind.project(&store.tasks()));
        let subscription = store.subscribe(move |store| {
            renderer.render(kind.project(&store.tasks()));
        });
        Self {
            store: store.clone(),
            kind,
            subscription,
        }
    }

    pub fn kind(&self) -> SurfaceKind {
        self.kind
    }

    pub fn detach(self) {}
}

impl Drop for SurfaceBinding {
    fn drop(&mut self) {
        self.store.unsubscribe(self.subscription);
    }
}

/// Attached windows keyed by window label.
#[derive(Clone, Default)]
pub struct SurfaceRegistry {
    bindings: Arc<Mutex<HashMap<String, SurfaceBinding>>>,
}

impl SurfaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches `label`, replacing any binding it already had.
    pub fn attach(
        &self,
        store: &TaskStore,
        label: &str,
        kind: SurfaceKind,
        renderer: Arc<dyn SurfaceRenderer>,
    ) {
        let binding = SurfaceBinding::attach(store, kind, renderer);
        let previous = self
            .bindings
            .lock()
            .expect("surfaces poisoned")
            .insert(label.to_string(), binding);
        if previous.is_some() {
            log::debug!("surfaces: replaced binding label={label}");
        }
        log::info!("surfaces: attached label={label} kind={kind:?}");
    }

    pub fn detach(&self, label: &str) -> bool {
        let removed = self
            .bindings
            .lock()
            .expect("surfaces poisoned")
            .remove(label);
        // Dropped outside the registry lock.
        match removed {
            Some(binding) => {
                binding.detach();
                log::info!("surfaces: detached label={label}");
                true
            }
            None => false,
        }
    }

    pub fn is_attached(&self, label: &str) -> bool {
        self.bindings
            .lock()
            .expect("surfaces poisoned")
            .contains_key(label)
    }

    pub fn kind_of(&self, label: &str) -> Option<SurfaceKind> {
        self.bindings
            .lock()
            .expect("surfaces poisoned")
            .get(label)
            .map(SurfaceBinding::kind)
    }
}
