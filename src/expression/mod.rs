//! Expression Module
//!
//! Filter and SET-clause expressions, and their compilation into executors
//! bound to a [`MatchingMeta`](crate::schema::MatchingMeta).
//!
//! ## Responsibilities
//! - Expression AST (constants, variables, comparisons, logic, arithmetic)
//! - Update-set clauses (`SET table.attr = expr, ...`)
//! - Static resolution and type checking at compile time
//! - Evaluation against an incoming row paired with a stored row

mod executor;
mod parser;

pub use executor::ExpressionExecutor;
pub use parser::{ExpressionParser, Side};

use std::cmp::Ordering;

use crate::event::Value;

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Equal,
    NotEqual,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
}

impl CompareOp {
    /// Operator to use when the operands are swapped (`a < b` is `b > a`)
    pub fn flip(self) -> Self {
        match self {
            CompareOp::LessThan => CompareOp::GreaterThan,
            CompareOp::LessThanEqual => CompareOp::GreaterThanEqual,
            CompareOp::GreaterThan => CompareOp::LessThan,
            CompareOp::GreaterThanEqual => CompareOp::LessThanEqual,
            other => other,
        }
    }

    pub fn test(self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Equal => ordering == Ordering::Equal,
            CompareOp::NotEqual => ordering != Ordering::Equal,
            CompareOp::LessThan => ordering == Ordering::Less,
            CompareOp::LessThanEqual => ordering != Ordering::Greater,
            CompareOp::GreaterThan => ordering == Ordering::Greater,
            CompareOp::GreaterThanEqual => ordering != Ordering::Less,
        }
    }
}

/// Arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MathOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Mod,
}

/// A stream or table attribute reference, optionally qualified by the
/// stream/table id it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variable {
    pub stream_id: Option<String>,
    pub attribute: String,
}

impl Variable {
    pub fn new(attribute: impl Into<String>) -> Self {
        Self {
            stream_id: None,
            attribute: attribute.into(),
        }
    }

    pub fn of(stream_id: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            stream_id: Some(stream_id.into()),
            attribute: attribute.into(),
        }
    }
}

/// Expression AST as produced by the query front-end
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Constant(Value),
    Variable(Variable),
    Compare {
        left: Box<Expression>,
        op: CompareOp,
        right: Box<Expression>,
    },
    And(Box<Expression>, Box<Expression>),
    Or(Box<Expression>, Box<Expression>),
    Not(Box<Expression>),
    Math {
        left: Box<Expression>,
        op: MathOp,
        right: Box<Expression>,
    },
    IsNull(Box<Expression>),
}

impl Expression {
    pub fn value(value: impl Into<Value>) -> Self {
        Expression::Constant(value.into())
    }

    /// Unqualified attribute reference
    pub fn variable(attribute: impl Into<String>) -> Self {
        Expression::Variable(Variable::new(attribute))
    }

    /// Attribute reference qualified by stream or table id
    pub fn qualified(stream_id: impl Into<String>, attribute: impl Into<String>) -> Self {
        Expression::Variable(Variable::of(stream_id, attribute))
    }

    pub fn compare(left: Expression, op: CompareOp, right: Expression) -> Self {
        Expression::Compare {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn equal(left: Expression, right: Expression) -> Self {
        Self::compare(left, CompareOp::Equal, right)
    }

    pub fn and(left: Expression, right: Expression) -> Self {
        Expression::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: Expression, right: Expression) -> Self {
        Expression::Or(Box::new(left), Box::new(right))
    }

    pub fn not(inner: Expression) -> Self {
        Expression::Not(Box::new(inner))
    }

    pub fn math(left: Expression, op: MathOp, right: Expression) -> Self {
        Expression::Math {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn is_null(inner: Expression) -> Self {
        Expression::IsNull(Box::new(inner))
    }
}

/// One `SET` assignment
#[derive(Debug, Clone, PartialEq)]
pub struct SetAttribute {
    pub table_variable: Variable,
    pub value: Expression,
}

/// The SET clause of an update or upsert, in declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateSet {
    set_attributes: Vec<SetAttribute>,
}

impl UpdateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an assignment. Duplicate targets are kept; the later one wins
    /// at compile time.
    pub fn set(mut self, table_variable: Variable, value: Expression) -> Self {
        self.set_attributes.push(SetAttribute {
            table_variable,
            value,
        });
        self
    }

    pub fn set_attributes(&self) -> &[SetAttribute] {
        &self.set_attributes
    }

    pub fn is_empty(&self) -> bool {
        self.set_attributes.is_empty()
    }
}
