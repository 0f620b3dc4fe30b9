//! Operator Module
//!
//! Compiled predicates and update-sets: the executable artifacts a query
//! builds once and hands to the table on every invocation.
//!
//! ## Responsibilities
//! - [`Operator`]: find/contains/delete/update/try-update over an [`EventHolder`]
//! - [`CompiledCondition`]: opaque handle around an operator, bound to one table
//! - [`CompiledUpdateSet`]: attribute ordinal -> executor (the SET clause)
//! - [`RowBuilder`]: materializes a table row from an unmatched upsert item
//!
//! ## Variants
//! [`OperatorParser`] picks the cheapest operator the holder can serve:
//! ```text
//! all primary-key attrs bound by ==   -> PrimaryKeyOperator
//! one @Index attr compared to probe   -> IndexOperator
//! otherwise                           -> CollectionOperator (full scan)
//! ```
//! Index-backed operators re-check the full condition on every candidate.

mod collection;
mod index;
mod parser;

pub use collection::CollectionOperator;
pub use index::{IndexOperator, PrimaryKeyOperator};
pub use parser::OperatorParser;

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

use crate::error::{Result, TableError};
use crate::event::{MatchingContext, Row, StateEvent, Value};
use crate::expression::ExpressionExecutor;
use crate::holder::{EventHolder, RowId};
use crate::schema::{AttributeType, MatchingMeta};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorKind {
    Collection,
    PrimaryKey,
    Index,
}

/// Compiled predicate contract.
///
/// Implementors only decide which stored rows an incoming row matches; the
/// mutation methods are shared. None of these take a lock: the table calls
/// them with its guard already held, so an operator must never call back
/// into the same table.
pub trait Operator: Debug + Send + Sync {
    fn kind(&self) -> OperatorKind;

    /// Ids of every stored row matching `incoming`, ascending
    fn matching_ids(&self, incoming: &Row, holder: &dyn EventHolder) -> Vec<RowId>;

    fn contains(&self, probe: &StateEvent, holder: &dyn EventHolder) -> bool {
        !self.matching_ids(probe.incoming(), holder).is_empty()
    }

    /// Owned copies of the matching rows
    fn find(&self, probe: &StateEvent, holder: &dyn EventHolder) -> Vec<Row> {
        self.matching_ids(probe.incoming(), holder)
            .into_iter()
            .filter_map(|id| holder.get(id).cloned())
            .collect()
    }

    /// Remove every row matched by any item; returns the number removed
    fn delete(&self, batch: &[StateEvent], holder: &mut dyn EventHolder) -> usize {
        let mut removed = 0;
        for event in batch {
            for id in self.matching_ids(event.incoming(), &*holder) {
                if holder.remove(id).is_some() {
                    removed += 1;
                }
            }
        }
        removed
    }

    /// Rewrite matched rows per `update_set`; returns the number rewritten
    fn update(
        &self,
        batch: &[StateEvent],
        holder: &mut dyn EventHolder,
        update_set: &CompiledUpdateSet,
    ) -> Result<usize> {
        let mut updated = 0;
        for event in batch {
            updated += update_matching(self, event, holder, update_set)?;
        }
        Ok(updated)
    }

    /// Upsert one item at a time: update what the item matches, or append
    /// the row built from it. Returns the rows appended for items that
    /// matched nothing.
    ///
    /// Each appended row is visible to the items after it, so two unmatched
    /// items with the same key insert once and then update.
    fn try_update(
        &self,
        batch: &[StateEvent],
        holder: &mut dyn EventHolder,
        update_set: &CompiledUpdateSet,
        row_builder: &RowBuilder,
    ) -> Result<Vec<Row>> {
        let mut unmatched = Vec::new();
        for event in batch {
            if update_matching(self, event, holder, update_set)? == 0 {
                let row = row_builder.build(event);
                holder.add(vec![row.clone()])?;
                unmatched.push(row);
            }
        }
        Ok(unmatched)
    }
}

fn update_matching<O: Operator + ?Sized>(
    operator: &O,
    event: &StateEvent,
    holder: &mut dyn EventHolder,
    update_set: &CompiledUpdateSet,
) -> Result<usize> {
    let ids = operator.matching_ids(event.incoming(), &*holder);
    for id in &ids {
        let updated = match holder.get(*id) {
            Some(stored) => update_set.apply(event.incoming(), stored),
            None => continue,
        };
        holder.overwrite(*id, updated)?;
    }
    Ok(ids.len())
}

/// Scan every stored row against `condition`
pub(crate) fn scan_matching(
    condition: &ExpressionExecutor,
    incoming: &Row,
    holder: &dyn EventHolder,
) -> Vec<RowId> {
    holder
        .scan()
        .filter(|(_, stored)| condition.is_true(&MatchingContext::with_stored(incoming, stored)))
        .map(|(id, _)| id)
        .collect()
}

// =============================================================================
// Compiled Condition
// =============================================================================

/// Opaque compiled predicate, bound to the table it was compiled for
#[derive(Debug, Clone)]
pub struct CompiledCondition {
    table_id: String,
    operator: Arc<dyn Operator>,
}

impl CompiledCondition {
    pub(crate) fn new(table_id: impl Into<String>, operator: Arc<dyn Operator>) -> Self {
        Self {
            table_id: table_id.into(),
            operator,
        }
    }

    pub fn table_id(&self) -> &str {
        &self.table_id
    }

    pub fn kind(&self) -> OperatorKind {
        self.operator.kind()
    }

    pub(crate) fn operator(&self) -> &dyn Operator {
        self.operator.as_ref()
    }
}

// =============================================================================
// Compiled Update Set
// =============================================================================

/// SET clause compiled to `table ordinal -> executor`.
///
/// Every executor sees the stored row as it was before the update, so
/// `SET a = b, b = a` swaps.
#[derive(Debug, Clone, Default)]
pub struct CompiledUpdateSet {
    executors: BTreeMap<usize, (ExpressionExecutor, AttributeType)>,
}

impl CompiledUpdateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `position` to `executor`, replacing any earlier mapping
    pub(crate) fn insert(
        &mut self,
        position: usize,
        executor: ExpressionExecutor,
        target_type: AttributeType,
    ) {
        self.executors.insert(position, (executor, target_type));
    }

    pub fn len(&self) -> usize {
        self.executors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.executors.is_empty()
    }

    /// Target ordinals, ascending
    pub fn positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.executors.keys().copied()
    }

    pub fn executor(&self, position: usize) -> Option<&ExpressionExecutor> {
        self.executors.get(&position).map(|(executor, _)| executor)
    }

    /// New row: `stored` with every mapped attribute re-evaluated
    pub fn apply(&self, incoming: &Row, stored: &Row) -> Row {
        let ctx = MatchingContext::with_stored(incoming, stored);
        let mut updated = stored.clone();
        for (position, (executor, target_type)) in &self.executors {
            updated.set(*position, executor.execute(&ctx).widen(*target_type));
        }
        updated
    }
}

// =============================================================================
// Row Builder
// =============================================================================

/// Builds table rows from incoming rows by attribute name
#[derive(Debug, Clone)]
pub struct RowBuilder {
    sources: Vec<(usize, AttributeType)>,
}

impl RowBuilder {
    /// Map each table attribute to the same-named incoming attribute
    pub fn compile(meta: &MatchingMeta) -> Result<Self> {
        let incoming = meta.incoming();
        let table = meta.table();
        let mut sources = Vec::with_capacity(table.arity());

        for attribute in table.attributes() {
            let position = incoming.attribute_position(&attribute.name).ok_or_else(|| {
                TableError::SchemaBinding(format!(
                    "'{}' has no attribute '{}' to insert into table '{}'",
                    incoming.id(),
                    attribute.name,
                    table.id()
                ))
            })?;
            let source_type = incoming.attributes()[position].attribute_type;
            if !source_type.assignable_to(attribute.attribute_type) {
                return Err(TableError::SchemaBinding(format!(
                    "cannot insert {} '{}.{}' into {} '{}.{}'",
                    source_type,
                    incoming.id(),
                    attribute.name,
                    attribute.attribute_type,
                    table.id(),
                    attribute.name
                )));
            }
            sources.push((position, attribute.attribute_type));
        }

        Ok(Self { sources })
    }

    pub fn build(&self, event: &StateEvent) -> Row {
        let incoming = event.incoming();
        Row::new(
            self.sources
                .iter()
                .map(|(position, target_type)| {
                    incoming
                        .get(*position)
                        .cloned()
                        .unwrap_or(Value::Null)
                        .widen(*target_type)
                })
                .collect(),
        )
    }
}
