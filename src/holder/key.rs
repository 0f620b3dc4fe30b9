//! Totally ordered, hashable wrapper over [`Value`] for index maps

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::event::Value;

/// Index key. Floats order by `total_cmp`, so NaN is a valid key. Signed
/// zeros are one key, matching `==` in conditions.
#[derive(Debug, Clone)]
pub struct IndexKey(pub Value);

fn unsigned_zero_f32(f: f32) -> f32 {
    if f == 0.0 {
        0.0
    } else {
        f
    }
}

fn unsigned_zero_f64(d: f64) -> f64 {
    if d == 0.0 {
        0.0
    } else {
        d
    }
}

impl IndexKey {
    fn rank(&self) -> u8 {
        match self.0 {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) => 2,
            Value::Long(_) => 3,
            Value::Float(_) => 4,
            Value::Double(_) => 5,
            Value::String(_) => 6,
        }
    }
}

impl Ord for IndexKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (&self.0, &other.0) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Long(a), Value::Long(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => {
                unsigned_zero_f32(*a).total_cmp(&unsigned_zero_f32(*b))
            }
            (Value::Double(a), Value::Double(b)) => {
                unsigned_zero_f64(*a).total_cmp(&unsigned_zero_f64(*b))
            }
            (Value::String(a), Value::String(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for IndexKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for IndexKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for IndexKey {}

impl Hash for IndexKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match &self.0 {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(i) => i.hash(state),
            Value::Long(l) => l.hash(state),
            Value::Float(f) => unsigned_zero_f32(*f).to_bits().hash(state),
            Value::Double(d) => unsigned_zero_f64(*d).to_bits().hash(state),
            Value::String(s) => s.hash(state),
        }
    }
}

/// Composite primary key, in `@PrimaryKey` declaration order
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrimaryKey(pub Vec<IndexKey>);

impl PrimaryKey {
    pub fn from_values<'a>(values: impl IntoIterator<Item = &'a Value>) -> Self {
        PrimaryKey(values.into_iter().cloned().map(IndexKey).collect())
    }
}

impl fmt::Display for PrimaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, key) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", key.0)?;
        }
        f.write_str(")")
    }
}
