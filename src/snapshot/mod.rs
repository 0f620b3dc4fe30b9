//! Snapshot Module
//!
//! Checkpoint hooks for stateful elements and the app-wide registry that
//! drives them.
//!
//! ## Responsibilities
//! - [`Snapshotable`]: expose and restore an element's state as an opaque map
//! - [`SnapshotService`]: registry keyed by element name; snapshot/restore all
//! - Encode a full snapshot into a checksummed in-memory blob and back
//!
//! ## Consistency
//! A table's snapshot shares its live storage handle instead of copying it.
//! Writers copy-on-write while a snapshot still holds the handle, so taking a
//! snapshot only needs the read lock for an `Arc` clone and is never torn.

mod codec;

pub use codec::{decode, encode, SNAPSHOT_MAGIC, SNAPSHOT_VERSION};

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Weak};

use bytes::Bytes;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::error::{Result, TableError};
use crate::holder::{HolderHandle, HolderImage};

/// Key under which a table stores its holder
pub const HOLDER_KEY: &str = "EventHolder";

/// One entry of a [`StateSnapshot`]
#[derive(Debug, Clone)]
pub enum StateValue {
    /// Live storage handle (shared, copy-on-write)
    Holder(HolderHandle),
    /// Decoded storage contents, from a persisted blob
    Image(HolderImage),
}

impl StateValue {
    pub fn image(&self) -> HolderImage {
        match self {
            StateValue::Holder(handle) => handle.image(),
            StateValue::Image(image) => image.clone(),
        }
    }
}

/// Opaque state of one element
#[derive(Debug, Clone, Default)]
pub struct StateSnapshot {
    entries: HashMap<String, StateValue>,
}

impl StateSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: StateValue) {
        self.entries.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&StateValue> {
        self.entries.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<StateValue> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &StateValue)> {
        self.entries.iter()
    }
}

/// An element whose state is checkpointed by the [`SnapshotService`]
pub trait Snapshotable: Send + Sync {
    fn current_state(&self) -> StateSnapshot;

    /// Replace the element's state. A payload of the wrong shape, or one
    /// taken from a different table, fails with `StateMismatch` and leaves
    /// the element untouched.
    fn restore_state(&self, state: StateSnapshot) -> Result<()>;

    fn element_id(&self) -> &str;
}

/// App-wide registry of snapshotable elements.
///
/// Holds weak references: an element dropped at teardown simply stops
/// appearing in snapshots.
#[derive(Default)]
pub struct SnapshotService {
    registry: RwLock<BTreeMap<String, Weak<dyn Snapshotable>>>,
}

impl SnapshotService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `element` under `name`, replacing any earlier registration
    pub fn add_snapshotable(&self, name: impl Into<String>, element: &Arc<dyn Snapshotable>) {
        let name = name.into();
        debug!(element = %name, id = %element.element_id(), "registered snapshotable");
        self.registry.write().insert(name, Arc::downgrade(element));
    }

    /// Names of registered elements that are still alive
    pub fn registered(&self) -> Vec<String> {
        self.registry
            .read()
            .iter()
            .filter(|(_, weak)| weak.strong_count() > 0)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Current state of every live element, keyed by registration name
    pub fn snapshot(&self) -> BTreeMap<String, StateSnapshot> {
        self.live()
            .into_iter()
            .map(|(name, element)| (name, element.current_state()))
            .collect()
    }

    /// Restore each element named in `states`.
    ///
    /// Elements are restored one by one; an error stops the pass and earlier
    /// elements keep their restored state.
    pub fn restore(&self, states: BTreeMap<String, StateSnapshot>) -> Result<()> {
        let live: HashMap<String, Arc<dyn Snapshotable>> = self.live().into_iter().collect();
        for (name, state) in states {
            let element = live.get(&name).ok_or_else(|| {
                TableError::StateMismatch(format!("no snapshotable registered as '{}'", name))
            })?;
            element.restore_state(state)?;
        }
        Ok(())
    }

    /// Snapshot everything into a checksummed blob
    pub fn persist(&self) -> Result<Bytes> {
        let states = self.snapshot();
        let blob = encode(&states)?;
        info!(elements = states.len(), bytes = blob.len(), "persisted snapshot");
        Ok(blob)
    }

    /// Decode a blob from [`SnapshotService::persist`] and restore from it
    pub fn restore_from_bytes(&self, blob: &[u8]) -> Result<()> {
        let states = decode(blob)?;
        info!(elements = states.len(), "restoring snapshot");
        self.restore(states)
    }

    fn live(&self) -> Vec<(String, Arc<dyn Snapshotable>)> {
        self.registry
            .read()
            .iter()
            .filter_map(|(name, weak)| weak.upgrade().map(|element| (name.clone(), element)))
            .collect()
    }
}
