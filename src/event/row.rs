//! Rows and probe events

use serde::{Deserialize, Serialize};

use super::Value;

/// An ordered tuple of values laid out per a table or stream definition.
///
/// Rows handed out by a table are always owned copies; mutating one never
/// reaches storage.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, position: usize) -> Option<&Value> {
        self.values.get(position)
    }

    /// Overwrite the value at `position`. Out-of-range positions are ignored.
    pub fn set(&mut self, position: usize, value: impl Into<Value>) {
        if let Some(slot) = self.values.get_mut(position) {
            *slot = value.into();
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

impl From<Vec<Value>> for Row {
    fn from(values: Vec<Value>) -> Self {
        Self { values }
    }
}

/// Build a [`Row`] from a list of values convertible into [`Value`].
///
/// ```
/// use eventtable::{row, Value};
///
/// let r = row![1, "a"];
/// assert_eq!(r.get(1), Some(&Value::from("a")));
/// ```
#[macro_export]
macro_rules! row {
    () => {
        $crate::event::Row::default()
    };
    ($($value:expr),+ $(,)?) => {
        $crate::event::Row::new(vec![$($crate::event::Value::from($value)),+])
    };
}

/// One item of an incoming batch: the triggering stream row plus its timestamp.
///
/// Predicates evaluate against a [`MatchingContext`] that pairs this row with
/// each candidate stored row.
#[derive(Debug, Clone, PartialEq)]
pub struct StateEvent {
    timestamp: i64,
    incoming: Row,
}

impl StateEvent {
    pub fn new(timestamp: i64, incoming: Row) -> Self {
        Self {
            timestamp,
            incoming,
        }
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn incoming(&self) -> &Row {
        &self.incoming
    }
}

impl From<Row> for StateEvent {
    fn from(incoming: Row) -> Self {
        Self::new(0, incoming)
    }
}

/// Borrowed evaluation context: the incoming row and, while matching, the
/// stored row under test.
#[derive(Debug, Clone, Copy)]
pub struct MatchingContext<'a> {
    pub incoming: &'a Row,
    pub stored: Option<&'a Row>,
}

impl<'a> MatchingContext<'a> {
    pub fn probe(incoming: &'a Row) -> Self {
        Self {
            incoming,
            stored: None,
        }
    }

    pub fn with_stored(incoming: &'a Row, stored: &'a Row) -> Self {
        Self {
            incoming,
            stored: Some(stored),
        }
    }
}
