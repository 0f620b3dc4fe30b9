//! Event Holder Module
//!
//! Row storage backing a table.
//!
//! ## Responsibilities
//! - Own every stored row (callers only ever see clones)
//! - Expose the primitives compiled predicates match and mutate with
//! - Optionally answer index lookups (primary key, ordered secondary index)
//! - Export an image of itself for snapshot blobs
//!
//! ## Variants
//! The holder is a capability trait, not a base type. Which variant backs a
//! table is decided once from the definition's annotations:
//! - no annotations: [`ListEventHolder`] (insertion-ordered, scan only)
//! - `@PrimaryKey` and/or `@Index`: [`IndexedEventHolder`]
//!
//! Holders are not internally synchronized; the owning table's lock guards them.

mod indexed;
mod key;
mod list;

pub use indexed::IndexedEventHolder;
pub use key::{IndexKey, PrimaryKey};
pub use list::ListEventHolder;

use std::fmt::Debug;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TableError};
use crate::event::{Row, Value};
use crate::expression::CompareOp;
use crate::schema::TableDefinition;

/// Stable identifier of a stored row; ascending in insertion order
pub type RowId = u64;

/// Index probe issued by an operator
#[derive(Debug, Clone, Copy)]
pub enum IndexLookup<'a> {
    /// Full primary key, in declaration order
    PrimaryKey(&'a [Value]),
    /// `stored[position] <op> value` on a secondary index
    Compare {
        position: usize,
        op: CompareOp,
        value: &'a Value,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HolderKind {
    List,
    Indexed,
}

/// Physical shape of a holder; a snapshot can only be restored into a table
/// whose definition yields the same layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderLayout {
    pub kind: HolderKind,
    pub arity: usize,
    pub primary_key: Vec<usize>,
    pub indexes: Vec<usize>,
}

impl HolderLayout {
    pub fn for_definition(definition: &TableDefinition) -> Self {
        let primary_key = definition.primary_key_positions();
        let indexes = definition.index_positions();
        let kind = if primary_key.is_empty() && indexes.is_empty() {
            HolderKind::List
        } else {
            HolderKind::Indexed
        };
        Self {
            kind,
            arity: definition.arity(),
            primary_key,
            indexes,
        }
    }
}

/// Serializable copy of a holder's contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HolderImage {
    pub table_id: String,
    pub layout: HolderLayout,
    pub rows: Vec<Row>,
}

/// Storage capability consumed by compiled predicates
pub trait EventHolder: Debug + Send + Sync {
    /// Append rows in order. Not transactional: rows before a failing one stay.
    fn add(&mut self, rows: Vec<Row>) -> Result<()>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, id: RowId) -> Option<&Row>;

    /// All rows in insertion order
    fn scan(&self) -> Box<dyn Iterator<Item = (RowId, &Row)> + '_>;

    /// Replace a stored row in place, keeping its id. Unknown ids are ignored.
    fn overwrite(&mut self, id: RowId, row: Row) -> Result<()>;

    fn remove(&mut self, id: RowId) -> Option<Row>;

    /// Candidate ids for an index probe, ascending. `None` when this holder
    /// cannot serve the probe and the caller must scan.
    fn lookup(&self, _lookup: &IndexLookup<'_>) -> Option<Vec<RowId>> {
        None
    }

    /// Id of the table this holder stores rows for
    fn table_id(&self) -> &str;

    fn layout(&self) -> HolderLayout;

    /// Deep copy, used for copy-on-write when a snapshot shares the handle
    fn clone_holder(&self) -> Box<dyn EventHolder>;

    fn image(&self) -> HolderImage;
}

impl Clone for Box<dyn EventHolder> {
    fn clone(&self) -> Self {
        self.clone_holder()
    }
}

/// Shared storage handle. Snapshots hold a clone of the `Arc`; a writer that
/// finds the handle shared copies it first (`Arc::make_mut`), so a snapshot
/// never observes later writes.
pub type HolderHandle = Arc<Box<dyn EventHolder>>;

/// Build the empty holder a definition calls for
pub fn holder_for(definition: &TableDefinition) -> Box<dyn EventHolder> {
    let layout = HolderLayout::for_definition(definition);
    build(definition.id(), layout)
}

/// Rebuild a holder from an exported image
pub fn holder_from_image(image: HolderImage) -> Result<Box<dyn EventHolder>> {
    let mut holder = build(&image.table_id, image.layout);
    holder.add(image.rows)?;
    Ok(holder)
}

fn build(table_id: &str, layout: HolderLayout) -> Box<dyn EventHolder> {
    match layout.kind {
        HolderKind::List => Box::new(ListEventHolder::new(table_id, layout.arity)),
        HolderKind::Indexed => Box::new(IndexedEventHolder::new(
            table_id,
            layout.arity,
            layout.primary_key,
            layout.indexes,
        )),
    }
}

pub(crate) fn check_arity(expected: usize, row: &Row) -> Result<()> {
    if row.len() != expected {
        return Err(TableError::ArityMismatch {
            expected,
            actual: row.len(),
        });
    }
    Ok(())
}
