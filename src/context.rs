//! Application context
//!
//! State shared by every table of one application: element id generation
//! and the snapshot registry.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::snapshot::SnapshotService;

/// Hands out unique element ids (lock-free counter)
#[derive(Debug, Default)]
pub struct ElementIdGenerator {
    next: AtomicU64,
}

impl ElementIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_new_id(&self) -> String {
        self.next.fetch_add(1, Ordering::SeqCst).to_string()
    }
}

/// Application-wide collaborators handed to `init`
pub struct AppContext {
    name: String,
    element_id_generator: ElementIdGenerator,
    snapshot_service: SnapshotService,
}

impl AppContext {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            element_id_generator: ElementIdGenerator::new(),
            snapshot_service: SnapshotService::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn element_id_generator(&self) -> &ElementIdGenerator {
        &self.element_id_generator
    }

    pub fn snapshot_service(&self) -> &SnapshotService {
        &self.snapshot_service
    }
}
