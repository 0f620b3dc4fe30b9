//! Index-backed operators
//!
//! Both evaluate their key expressions once per probe (they never read the
//! stored row), ask the holder for candidates, then filter candidates with
//! the full condition. A holder that cannot serve the probe falls back to a
//! scan.

use crate::event::{MatchingContext, Row, StateEvent, Value};
use crate::expression::{CompareOp, ExpressionExecutor};
use crate::holder::{EventHolder, IndexLookup, RowId};
use crate::schema::AttributeType;

use super::{scan_matching, Operator, OperatorKind};

fn filter_candidates(
    condition: &ExpressionExecutor,
    incoming: &Row,
    holder: &dyn EventHolder,
    candidates: Vec<RowId>,
) -> Vec<RowId> {
    candidates
        .into_iter()
        .filter(|id| {
            holder.get(*id).map_or(false, |stored| {
                condition.is_true(&MatchingContext::with_stored(incoming, stored))
            })
        })
        .collect()
}

// =============================================================================
// Primary Key
// =============================================================================

/// Equality on every primary-key attribute: at most one candidate
#[derive(Debug, Clone)]
pub struct PrimaryKeyOperator {
    key: Vec<(ExpressionExecutor, AttributeType)>,
    condition: ExpressionExecutor,
}

impl PrimaryKeyOperator {
    /// `key` holds one probe-side executor per primary-key attribute, in
    /// declaration order, with the attribute's type
    pub fn new(key: Vec<(ExpressionExecutor, AttributeType)>, condition: ExpressionExecutor) -> Self {
        Self { key, condition }
    }

    fn key_values(&self, incoming: &Row) -> Option<Vec<Value>> {
        let ctx = MatchingContext::probe(incoming);
        self.key
            .iter()
            .map(|(executor, key_type)| {
                let value = executor.execute(&ctx).widen(*key_type);
                (!value.is_null()).then_some(value)
            })
            .collect()
    }
}

impl Operator for PrimaryKeyOperator {
    fn kind(&self) -> OperatorKind {
        OperatorKind::PrimaryKey
    }

    fn matching_ids(&self, incoming: &Row, holder: &dyn EventHolder) -> Vec<RowId> {
        let values = match self.key_values(incoming) {
            Some(values) => values,
            None => return Vec::new(),
        };
        match holder.lookup(&IndexLookup::PrimaryKey(&values)) {
            Some(candidates) => filter_candidates(&self.condition, incoming, holder, candidates),
            None => scan_matching(&self.condition, incoming, holder),
        }
    }

    /// The single matching row, if any
    fn find(&self, probe: &StateEvent, holder: &dyn EventHolder) -> Vec<Row> {
        self.matching_ids(probe.incoming(), holder)
            .first()
            .and_then(|id| holder.get(*id).cloned())
            .into_iter()
            .collect()
    }
}

// =============================================================================
// Secondary Index
// =============================================================================

/// `stored[position] <op> probe-expression` on an `@Index` attribute
#[derive(Debug, Clone)]
pub struct IndexOperator {
    position: usize,
    op: CompareOp,
    value: ExpressionExecutor,
    value_type: AttributeType,
    condition: ExpressionExecutor,
}

impl IndexOperator {
    pub fn new(
        position: usize,
        op: CompareOp,
        value: ExpressionExecutor,
        value_type: AttributeType,
        condition: ExpressionExecutor,
    ) -> Self {
        Self {
            position,
            op,
            value,
            value_type,
            condition,
        }
    }
}

impl Operator for IndexOperator {
    fn kind(&self) -> OperatorKind {
        OperatorKind::Index
    }

    fn matching_ids(&self, incoming: &Row, holder: &dyn EventHolder) -> Vec<RowId> {
        let value = self
            .value
            .execute(&MatchingContext::probe(incoming))
            .widen(self.value_type);
        let lookup = IndexLookup::Compare {
            position: self.position,
            op: self.op,
            value: &value,
        };
        match holder.lookup(&lookup) {
            Some(candidates) => filter_candidates(&self.condition, incoming, holder, candidates),
            None => scan_matching(&self.condition, incoming, holder),
        }
    }
}
