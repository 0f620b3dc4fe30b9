//! Operator compiler
//!
//! Turns a filter expression into the operator best served by the table's
//! holder layout. Works from the definition alone, never from live storage.

use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::expression::{CompareOp, Expression, ExpressionExecutor, ExpressionParser, Side};
use crate::schema::{AttributeType, MatchingMeta};

use super::{CollectionOperator, IndexOperator, Operator, PrimaryKeyOperator};

/// `stored[position] <op> probe` extracted from one conjunct
#[derive(Debug)]
struct KeyTerm {
    position: usize,
    op: CompareOp,
    value: ExpressionExecutor,
    value_type: AttributeType,
}

pub struct OperatorParser<'a> {
    meta: &'a MatchingMeta,
    index_lookups: bool,
}

impl<'a> OperatorParser<'a> {
    pub fn new(meta: &'a MatchingMeta) -> Self {
        Self {
            meta,
            index_lookups: true,
        }
    }

    /// Disable index-backed operators (every predicate scans)
    pub fn index_lookups(mut self, enabled: bool) -> Self {
        self.index_lookups = enabled;
        self
    }

    pub fn construct(&self, expression: &Expression) -> Result<Arc<dyn Operator>> {
        let parser = ExpressionParser::new(self.meta);
        let condition = parser.parse_condition(expression)?;

        if !self.index_lookups {
            return Ok(Arc::new(CollectionOperator::new(condition)));
        }

        let mut conjuncts = Vec::new();
        flatten_and(expression, &mut conjuncts);
        let terms: Vec<KeyTerm> = conjuncts
            .into_iter()
            .filter_map(|c| self.key_term(&parser, c))
            .collect();

        let table = self.meta.table();

        let primary_key = table.primary_key_positions();
        if !primary_key.is_empty() {
            let key: Option<Vec<_>> = primary_key
                .iter()
                .map(|p| {
                    terms
                        .iter()
                        .find(|t| t.position == *p && t.op == CompareOp::Equal)
                        .map(|t| (t.value.clone(), t.value_type))
                })
                .collect();
            if let Some(key) = key {
                debug!(table = %table.id(), "compiled primary-key operator");
                return Ok(Arc::new(PrimaryKeyOperator::new(key, condition)));
            }
        }

        let indexes = table.index_positions();
        if let Some(term) = terms
            .into_iter()
            .find(|t| indexes.contains(&t.position) && t.op != CompareOp::NotEqual)
        {
            debug!(table = %table.id(), position = term.position, "compiled index operator");
            return Ok(Arc::new(IndexOperator::new(
                term.position,
                term.op,
                term.value,
                term.value_type,
                condition,
            )));
        }

        Ok(Arc::new(CollectionOperator::new(condition)))
    }

    /// Recognize `table.attr <op> probe` or `probe <op> table.attr`
    fn key_term(&self, parser: &ExpressionParser<'_>, conjunct: &Expression) -> Option<KeyTerm> {
        let (left, op, right) = match conjunct {
            Expression::Compare { left, op, right } => (left.as_ref(), *op, right.as_ref()),
            _ => return None,
        };
        self.stored_vs_probe(parser, left, op, right)
            .or_else(|| self.stored_vs_probe(parser, right, op.flip(), left))
    }

    fn stored_vs_probe(
        &self,
        parser: &ExpressionParser<'_>,
        stored: &Expression,
        op: CompareOp,
        probe: &Expression,
    ) -> Option<KeyTerm> {
        let variable = match stored {
            Expression::Variable(v) => v,
            _ => return None,
        };
        let (side, position, attribute_type) = parser.resolve(variable).ok()?;
        if side != Side::Stored {
            return None;
        }
        let value = parser.parse(probe).ok()?;
        // A rounded lookup key can miss rows the full condition matches
        if value.uses_stored() || !value.return_type()?.widens_exactly_to(attribute_type) {
            return None;
        }
        Some(KeyTerm {
            position,
            op,
            value,
            value_type: attribute_type,
        })
    }
}

fn flatten_and<'e>(expression: &'e Expression, out: &mut Vec<&'e Expression>) {
    match expression {
        Expression::And(left, right) => {
            flatten_and(left, out);
            flatten_and(right, out);
        }
        other => out.push(other),
    }
}
