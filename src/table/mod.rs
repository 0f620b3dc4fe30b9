//! Table Module
//!
//! Named, schema-typed, mutable relations that running queries add to,
//! probe, update, delete from and upsert into concurrently.
//!
//! ## Concurrency Model: Single-Writer / Multiple-Reader
//!
//! - **Writes** (add/delete/update/update_or_add): exclusive lock for the
//!   whole batch. An upsert's updates and inserts share one guard.
//! - **Reads** (contains/find): shared lock; any number run together.
//! - **Compilation** (compile_expression/compile_update_set): no lock, works
//!   on schema metadata only.
//!
//! Guards are scoped and released on every exit path, including errors.
//! The lock is not reentrant: a compiled predicate that calls back into the
//! same table deadlocks.

mod in_memory;

pub use in_memory::InMemoryTable;

use crate::error::Result;
use crate::event::{Row, StateEvent};
use crate::expression::{Expression, UpdateSet};
use crate::operator::{CompiledCondition, CompiledUpdateSet, RowBuilder};
use crate::schema::{MatchingMeta, TableDefinition};

/// Operations a query may run against a table
pub trait Table: Send + Sync {
    fn definition(&self) -> &TableDefinition;

    /// Append every row. Not transactional across the batch.
    fn add(&self, rows: Vec<Row>) -> Result<()>;

    /// Remove every stored row matched by any batch item
    fn delete(&self, batch: &[StateEvent], condition: &CompiledCondition);

    /// Rewrite the attributes named in `update_set` on every matched row
    fn update(
        &self,
        batch: &[StateEvent],
        condition: &CompiledCondition,
        update_set: &CompiledUpdateSet,
    ) -> Result<()>;

    /// Update matched rows; insert rows built by `row_builder` for items
    /// that matched nothing. Items apply in batch order, so a later item
    /// sees rows inserted for earlier ones. Atomic with respect to readers.
    fn update_or_add(
        &self,
        batch: &[StateEvent],
        condition: &CompiledCondition,
        update_set: &CompiledUpdateSet,
        row_builder: &RowBuilder,
    ) -> Result<()>;

    /// True iff at least one stored row matches
    fn contains(&self, probe: &StateEvent, condition: &CompiledCondition) -> bool;

    /// Owned copies of the matching rows. Whether that is the first match or
    /// all of them is up to the compiled predicate.
    fn find(&self, probe: &StateEvent, condition: &CompiledCondition) -> Vec<Row>;

    /// Compile a filter against this table's layout
    fn compile_expression(
        &self,
        expression: &Expression,
        meta: &MatchingMeta,
    ) -> Result<CompiledCondition>;

    /// Compile a SET clause; `None` means "copy every attribute from the
    /// same-named incoming attribute"
    fn compile_update_set(
        &self,
        update_set: Option<&UpdateSet>,
        meta: &MatchingMeta,
    ) -> Result<CompiledUpdateSet>;
}
