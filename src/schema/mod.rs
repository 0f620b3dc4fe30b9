//! Schema Module
//!
//! Table and stream definitions plus the binding descriptor used when
//! compiling predicates and update-sets.
//!
//! ## Responsibilities
//! - Ordered, immutable attribute lists (ordinals are stable for the table's lifetime)
//! - `@PrimaryKey` / `@Index` annotations that select the storage variant
//! - Numeric promotion rules shared by the expression compiler

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TableError};

/// Attribute type of a table or stream column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeType {
    Int,
    Long,
    Float,
    Double,
    Bool,
    String,
}

impl AttributeType {
    pub fn is_numeric(self) -> bool {
        self.numeric_rank().is_some()
    }

    /// Position in the widening order `Int < Long < Float < Double`
    fn numeric_rank(self) -> Option<u8> {
        match self {
            AttributeType::Int => Some(0),
            AttributeType::Long => Some(1),
            AttributeType::Float => Some(2),
            AttributeType::Double => Some(3),
            _ => None,
        }
    }

    /// Result type of arithmetic between two numeric types
    pub fn promote(a: AttributeType, b: AttributeType) -> Option<AttributeType> {
        let (ra, rb) = (a.numeric_rank()?, b.numeric_rank()?);
        Some(if ra >= rb { a } else { b })
    }

    /// Whether a value of `self` may be stored in an attribute of type `target`
    pub fn assignable_to(self, target: AttributeType) -> bool {
        if self == target {
            return true;
        }
        match (self.numeric_rank(), target.numeric_rank()) {
            (Some(from), Some(to)) => from <= to,
            _ => false,
        }
    }

    /// Whether every value of `self` widens to `target` without rounding.
    /// `Float` holds 24 mantissa bits and `Double` 53, so `Int -> Float`,
    /// `Long -> Float` and `Long -> Double` can round.
    pub fn widens_exactly_to(self, target: AttributeType) -> bool {
        use AttributeType::*;
        match (self, target) {
            (Int, Float) | (Long, Float) | (Long, Double) => false,
            _ => self.assignable_to(target),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttributeType::Int => "int",
            AttributeType::Long => "long",
            AttributeType::Float => "float",
            AttributeType::Double => "double",
            AttributeType::Bool => "bool",
            AttributeType::String => "string",
        };
        f.write_str(name)
    }
}

/// A named, typed column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub attribute_type: AttributeType,
}

impl Attribute {
    pub fn new(name: impl Into<String>, attribute_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attribute_type,
        }
    }
}

fn position_of(attributes: &[Attribute], name: &str) -> Option<usize> {
    attributes.iter().position(|a| a.name == name)
}

fn check_unique(id: &str, attributes: &[Attribute]) -> Result<()> {
    let mut seen = HashSet::new();
    for attribute in attributes {
        if !seen.insert(attribute.name.as_str()) {
            return Err(TableError::SchemaBinding(format!(
                "'{}' defines attribute '{}' more than once",
                id, attribute.name
            )));
        }
    }
    Ok(())
}

// =============================================================================
// Table Definition
// =============================================================================

/// Immutable schema of a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDefinition {
    id: String,
    attributes: Vec<Attribute>,
    primary_key: Vec<String>,
    indexes: Vec<String>,
}

impl TableDefinition {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: Vec::new(),
            primary_key: Vec::new(),
            indexes: Vec::new(),
        }
    }

    /// Append an attribute
    pub fn attribute(mut self, name: impl Into<String>, attribute_type: AttributeType) -> Self {
        self.attributes.push(Attribute::new(name, attribute_type));
        self
    }

    /// Declare the `@PrimaryKey` attributes (order defines key layout)
    pub fn primary_key(mut self, names: &[&str]) -> Self {
        self.primary_key = names.iter().map(|n| n.to_string()).collect();
        self
    }

    /// Declare the `@Index` attributes
    pub fn index(mut self, names: &[&str]) -> Self {
        self.indexes = names.iter().map(|n| n.to_string()).collect();
        self
    }

    /// Check that attribute names are unique and annotations name real attributes
    pub fn validate(&self) -> Result<()> {
        check_unique(&self.id, &self.attributes)?;
        for name in self.primary_key.iter().chain(self.indexes.iter()) {
            if self.attribute_position(name).is_none() {
                return Err(TableError::SchemaBinding(format!(
                    "table '{}' annotates unknown attribute '{}'",
                    self.id, name
                )));
            }
        }
        Ok(())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn arity(&self) -> usize {
        self.attributes.len()
    }

    pub fn attribute_position(&self, name: &str) -> Option<usize> {
        position_of(&self.attributes, name)
    }

    pub fn attribute_type(&self, position: usize) -> Option<AttributeType> {
        self.attributes.get(position).map(|a| a.attribute_type)
    }

    /// Ordinals of the primary key attributes, empty when none is declared
    pub fn primary_key_positions(&self) -> Vec<usize> {
        self.primary_key
            .iter()
            .filter_map(|n| self.attribute_position(n))
            .collect()
    }

    /// Ordinals of the secondary index attributes
    pub fn index_positions(&self) -> Vec<usize> {
        self.indexes
            .iter()
            .filter_map(|n| self.attribute_position(n))
            .collect()
    }

    pub fn has_primary_key(&self) -> bool {
        !self.primary_key.is_empty()
    }
}

// =============================================================================
// Stream Definition
// =============================================================================

/// Schema of the incoming stream whose rows probe or mutate a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDefinition {
    id: String,
    attributes: Vec<Attribute>,
}

impl StreamDefinition {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: Vec::new(),
        }
    }

    pub fn attribute(mut self, name: impl Into<String>, attribute_type: AttributeType) -> Self {
        self.attributes.push(Attribute::new(name, attribute_type));
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn attribute_position(&self, name: &str) -> Option<usize> {
        position_of(&self.attributes, name)
    }

    pub fn attribute_type(&self, position: usize) -> Option<AttributeType> {
        self.attributes.get(position).map(|a| a.attribute_type)
    }
}

impl From<&TableDefinition> for StreamDefinition {
    /// Stream with the same id and layout as the table
    fn from(table: &TableDefinition) -> Self {
        Self {
            id: table.id.clone(),
            attributes: table.attributes.clone(),
        }
    }
}

// =============================================================================
// Matching Meta
// =============================================================================

/// Schema-binding descriptor: which stream probes which table.
///
/// Expressions compiled against a `MatchingMeta` address incoming attributes
/// by stream ordinal and stored attributes by table ordinal.
#[derive(Debug, Clone)]
pub struct MatchingMeta {
    incoming: StreamDefinition,
    table: TableDefinition,
}

impl MatchingMeta {
    pub fn new(incoming: StreamDefinition, table: TableDefinition) -> Result<Self> {
        check_unique(incoming.id(), incoming.attributes())?;
        Ok(Self { incoming, table })
    }

    pub fn incoming(&self) -> &StreamDefinition {
        &self.incoming
    }

    pub fn table(&self) -> &TableDefinition {
        &self.table
    }
}
