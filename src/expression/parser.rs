//! Expression compiler
//!
//! Resolves variables against a [`MatchingMeta`] and type checks the tree.
//! Never touches table storage, so it needs no lock.

use crate::error::{Result, TableError};
use crate::schema::{AttributeType, MatchingMeta};

use super::{CompareOp, Expression, ExpressionExecutor, Variable};

/// Which half of the matching context a variable resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Incoming,
    Stored,
}

/// Compiles expressions for one incoming-stream/table pairing
#[derive(Debug, Clone, Copy)]
pub struct ExpressionParser<'a> {
    meta: &'a MatchingMeta,
}

impl<'a> ExpressionParser<'a> {
    pub fn new(meta: &'a MatchingMeta) -> Self {
        Self { meta }
    }

    /// Compile a filter; the result must be boolean
    pub fn parse_condition(&self, expression: &Expression) -> Result<ExpressionExecutor> {
        let executor = self.parse(expression)?;
        match executor.return_type() {
            Some(AttributeType::Bool) => Ok(executor),
            other => Err(TableError::SchemaBinding(format!(
                "condition must be bool, found {}",
                describe(other)
            ))),
        }
    }

    /// Compile any scalar expression
    pub fn parse(&self, expression: &Expression) -> Result<ExpressionExecutor> {
        match expression {
            Expression::Constant(value) => Ok(ExpressionExecutor::Constant {
                value: value.clone(),
            }),
            Expression::Variable(variable) => self.parse_variable(variable),
            Expression::Compare { left, op, right } => {
                let left = self.parse(left)?;
                let right = self.parse(right)?;
                check_comparable(&left, *op, &right)?;
                Ok(ExpressionExecutor::Compare {
                    left: Box::new(left),
                    op: *op,
                    right: Box::new(right),
                })
            }
            Expression::And(left, right) => Ok(ExpressionExecutor::And(
                Box::new(self.parse_logical(left, "and")?),
                Box::new(self.parse_logical(right, "and")?),
            )),
            Expression::Or(left, right) => Ok(ExpressionExecutor::Or(
                Box::new(self.parse_logical(left, "or")?),
                Box::new(self.parse_logical(right, "or")?),
            )),
            Expression::Not(inner) => Ok(ExpressionExecutor::Not(Box::new(
                self.parse_logical(inner, "not")?,
            ))),
            Expression::Math { left, op, right } => {
                let left = self.parse(left)?;
                let right = self.parse(right)?;
                let return_type = match (left.return_type(), right.return_type()) {
                    (Some(l), Some(r)) => AttributeType::promote(l, r),
                    (Some(t), None) | (None, Some(t)) if t.is_numeric() => Some(t),
                    _ => None,
                }
                .ok_or_else(|| {
                    TableError::SchemaBinding(format!(
                        "cannot apply {:?} to {} and {}",
                        op,
                        describe(left.return_type()),
                        describe(right.return_type())
                    ))
                })?;
                Ok(ExpressionExecutor::Math {
                    left: Box::new(left),
                    op: *op,
                    right: Box::new(right),
                    return_type,
                })
            }
            Expression::IsNull(inner) => {
                Ok(ExpressionExecutor::IsNull(Box::new(self.parse(inner)?)))
            }
        }
    }

    /// Resolve a variable to a side and ordinal.
    ///
    /// Qualified variables bind to the named definition. Unqualified ones
    /// bind to the incoming stream first, then to the table.
    pub fn resolve(&self, variable: &Variable) -> Result<(Side, usize, AttributeType)> {
        let incoming = self.meta.incoming();
        let table = self.meta.table();
        let name = variable.attribute.as_str();

        let lookup_incoming = || {
            incoming.attribute_position(name).map(|p| {
                let ty = incoming.attributes()[p].attribute_type;
                (Side::Incoming, p, ty)
            })
        };
        let lookup_table = || {
            table.attribute_position(name).map(|p| {
                let ty = table.attributes()[p].attribute_type;
                (Side::Stored, p, ty)
            })
        };

        let resolved = match variable.stream_id.as_deref() {
            Some(id) if id == incoming.id() => lookup_incoming(),
            Some(id) if id == table.id() => lookup_table(),
            Some(id) => {
                return Err(TableError::SchemaBinding(format!(
                    "unknown stream or table '{}' in reference to '{}'",
                    id, name
                )))
            }
            None => lookup_incoming().or_else(lookup_table),
        };

        resolved.ok_or_else(|| {
            TableError::SchemaBinding(format!(
                "attribute '{}' is not defined in '{}' or '{}'",
                name,
                incoming.id(),
                table.id()
            ))
        })
    }

    /// Resolve the target of a SET assignment to a table ordinal
    pub fn resolve_table_attribute(&self, variable: &Variable) -> Result<(usize, AttributeType)> {
        let table = self.meta.table();
        if let Some(id) = variable.stream_id.as_deref() {
            if id != table.id() {
                return Err(TableError::SchemaBinding(format!(
                    "update target '{}.{}' does not belong to table '{}'",
                    id,
                    variable.attribute,
                    table.id()
                )));
            }
        }
        let position = table
            .attribute_position(&variable.attribute)
            .ok_or_else(|| {
                TableError::SchemaBinding(format!(
                    "table '{}' has no attribute '{}'",
                    table.id(),
                    variable.attribute
                ))
            })?;
        Ok((position, table.attributes()[position].attribute_type))
    }

    fn parse_variable(&self, variable: &Variable) -> Result<ExpressionExecutor> {
        let (side, position, return_type) = self.resolve(variable)?;
        Ok(match side {
            Side::Incoming => ExpressionExecutor::Incoming {
                position,
                return_type,
            },
            Side::Stored => ExpressionExecutor::Stored {
                position,
                return_type,
            },
        })
    }

    fn parse_logical(&self, expression: &Expression, op: &str) -> Result<ExpressionExecutor> {
        let executor = self.parse(expression)?;
        if executor.return_type() != Some(AttributeType::Bool) {
            return Err(TableError::SchemaBinding(format!(
                "'{}' requires bool operands, found {}",
                op,
                describe(executor.return_type())
            )));
        }
        Ok(executor)
    }
}

fn check_comparable(
    left: &ExpressionExecutor,
    op: CompareOp,
    right: &ExpressionExecutor,
) -> Result<()> {
    let ok = match (left.return_type(), right.return_type()) {
        (None, _) | (_, None) => true,
        (Some(l), Some(r)) if l.is_numeric() && r.is_numeric() => true,
        (Some(AttributeType::Bool), Some(AttributeType::Bool)) => {
            matches!(op, CompareOp::Equal | CompareOp::NotEqual)
        }
        (Some(l), Some(r)) => l == r,
    };
    if ok {
        Ok(())
    } else {
        Err(TableError::SchemaBinding(format!(
            "cannot compare {} with {} using {:?}",
            describe(left.return_type()),
            describe(right.return_type()),
            op
        )))
    }
}

fn describe(ty: Option<AttributeType>) -> String {
    ty.map_or_else(|| "null".to_string(), |t| t.to_string())
}
