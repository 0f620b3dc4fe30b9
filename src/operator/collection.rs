//! Full-scan operator

use crate::event::{MatchingContext, Row, StateEvent};
use crate::expression::ExpressionExecutor;
use crate::holder::{EventHolder, RowId};

use super::{scan_matching, Operator, OperatorKind};

/// Evaluates the condition against every stored row
#[derive(Debug, Clone)]
pub struct CollectionOperator {
    condition: ExpressionExecutor,
}

impl CollectionOperator {
    pub fn new(condition: ExpressionExecutor) -> Self {
        Self { condition }
    }
}

impl Operator for CollectionOperator {
    fn kind(&self) -> OperatorKind {
        OperatorKind::Collection
    }

    fn matching_ids(&self, incoming: &Row, holder: &dyn EventHolder) -> Vec<RowId> {
        scan_matching(&self.condition, incoming, holder)
    }

    fn contains(&self, probe: &StateEvent, holder: &dyn EventHolder) -> bool {
        let incoming = probe.incoming();
        holder.scan().any(|(_, stored)| {
            self.condition
                .is_true(&MatchingContext::with_stored(incoming, stored))
        })
    }
}
