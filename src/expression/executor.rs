//! Compiled expression executors

use std::cmp::Ordering;

use crate::event::{MatchingContext, Value};
use crate::schema::AttributeType;

use super::{CompareOp, MathOp};

/// Executable form of an [`Expression`](super::Expression).
///
/// Variable references are resolved to ordinals at compile time; evaluation
/// never looks at names. `return_type` is `None` only for a bare `null`.
#[derive(Debug, Clone)]
pub enum ExpressionExecutor {
    Constant {
        value: Value,
    },
    Incoming {
        position: usize,
        return_type: AttributeType,
    },
    Stored {
        position: usize,
        return_type: AttributeType,
    },
    Compare {
        left: Box<ExpressionExecutor>,
        op: CompareOp,
        right: Box<ExpressionExecutor>,
    },
    And(Box<ExpressionExecutor>, Box<ExpressionExecutor>),
    Or(Box<ExpressionExecutor>, Box<ExpressionExecutor>),
    Not(Box<ExpressionExecutor>),
    Math {
        left: Box<ExpressionExecutor>,
        op: MathOp,
        right: Box<ExpressionExecutor>,
        return_type: AttributeType,
    },
    IsNull(Box<ExpressionExecutor>),
}

impl ExpressionExecutor {
    /// Evaluate against the given context
    pub fn execute(&self, ctx: &MatchingContext<'_>) -> Value {
        match self {
            ExpressionExecutor::Constant { value } => value.clone(),
            ExpressionExecutor::Incoming { position, .. } => {
                ctx.incoming.get(*position).cloned().unwrap_or(Value::Null)
            }
            ExpressionExecutor::Stored { position, .. } => ctx
                .stored
                .and_then(|row| row.get(*position))
                .cloned()
                .unwrap_or(Value::Null),
            ExpressionExecutor::Compare { left, op, right } => {
                let (l, r) = (left.execute(ctx), right.execute(ctx));
                Value::Bool(compare_values(&l, &r).map_or(false, |ord| op.test(ord)))
            }
            ExpressionExecutor::And(left, right) => {
                Value::Bool(left.is_true(ctx) && right.is_true(ctx))
            }
            ExpressionExecutor::Or(left, right) => {
                Value::Bool(left.is_true(ctx) || right.is_true(ctx))
            }
            ExpressionExecutor::Not(inner) => match inner.execute(ctx) {
                Value::Bool(b) => Value::Bool(!b),
                _ => Value::Bool(false),
            },
            ExpressionExecutor::Math {
                left,
                op,
                right,
                return_type,
            } => {
                let l = left.execute(ctx).widen(*return_type);
                let r = right.execute(ctx).widen(*return_type);
                apply_math(l, *op, r)
            }
            ExpressionExecutor::IsNull(inner) => Value::Bool(inner.execute(ctx).is_null()),
        }
    }

    /// True iff this executor evaluates to `Bool(true)`; null and non-bool are false
    pub fn is_true(&self, ctx: &MatchingContext<'_>) -> bool {
        matches!(self.execute(ctx), Value::Bool(true))
    }

    pub fn return_type(&self) -> Option<AttributeType> {
        match self {
            ExpressionExecutor::Constant { value } => value.attribute_type(),
            ExpressionExecutor::Incoming { return_type, .. }
            | ExpressionExecutor::Stored { return_type, .. }
            | ExpressionExecutor::Math { return_type, .. } => Some(*return_type),
            ExpressionExecutor::Compare { .. }
            | ExpressionExecutor::And(..)
            | ExpressionExecutor::Or(..)
            | ExpressionExecutor::Not(_)
            | ExpressionExecutor::IsNull(_) => Some(AttributeType::Bool),
        }
    }

    /// Whether evaluation reads the stored row. Executors that don't can be
    /// evaluated once per probe and used as index keys.
    pub fn uses_stored(&self) -> bool {
        match self {
            ExpressionExecutor::Constant { .. } | ExpressionExecutor::Incoming { .. } => false,
            ExpressionExecutor::Stored { .. } => true,
            ExpressionExecutor::Compare { left, right, .. }
            | ExpressionExecutor::Math { left, right, .. }
            | ExpressionExecutor::And(left, right)
            | ExpressionExecutor::Or(left, right) => left.uses_stored() || right.uses_stored(),
            ExpressionExecutor::Not(inner) | ExpressionExecutor::IsNull(inner) => {
                inner.uses_stored()
            }
        }
    }
}

/// Order two values of compatible types; `None` when either is null or the
/// types cannot be compared.
pub(crate) fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => match (left.as_i64(), right.as_i64()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => left.as_f64()?.partial_cmp(&right.as_f64()?),
        },
    }
}

fn apply_math(left: Value, op: MathOp, right: Value) -> Value {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => match op {
            MathOp::Add => Value::Int(a.wrapping_add(b)),
            MathOp::Subtract => Value::Int(a.wrapping_sub(b)),
            MathOp::Multiply => Value::Int(a.wrapping_mul(b)),
            MathOp::Divide => a.checked_div(b).map_or(Value::Null, Value::Int),
            MathOp::Mod => a.checked_rem(b).map_or(Value::Null, Value::Int),
        },
        (Value::Long(a), Value::Long(b)) => match op {
            MathOp::Add => Value::Long(a.wrapping_add(b)),
            MathOp::Subtract => Value::Long(a.wrapping_sub(b)),
            MathOp::Multiply => Value::Long(a.wrapping_mul(b)),
            MathOp::Divide => a.checked_div(b).map_or(Value::Null, Value::Long),
            MathOp::Mod => a.checked_rem(b).map_or(Value::Null, Value::Long),
        },
        (Value::Float(a), Value::Float(b)) => Value::Float(match op {
            MathOp::Add => a + b,
            MathOp::Subtract => a - b,
            MathOp::Multiply => a * b,
            MathOp::Divide => a / b,
            MathOp::Mod => a % b,
        }),
        (Value::Double(a), Value::Double(b)) => Value::Double(match op {
            MathOp::Add => a + b,
            MathOp::Subtract => a - b,
            MathOp::Multiply => a * b,
            MathOp::Divide => a / b,
            MathOp::Mod => a % b,
        }),
        _ => Value::Null,
    }
}
