//! Indexed holder
//!
//! Primary-key hash index plus ordered secondary indexes.
//!
//! ## Layout
//! ```text
//! rows:          BTreeMap<RowId, Row>                    (source of truth)
//! primary_index: HashMap<PrimaryKey, RowId>              (unique)
//! indexes:       attr ordinal -> BTreeMap<IndexKey, {RowId}>
//! ```
//! Every mutation keeps all three in step.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;

use crate::error::{Result, TableError};
use crate::event::Row;
use crate::expression::CompareOp;

use super::{
    check_arity, EventHolder, HolderImage, HolderKind, HolderLayout, IndexKey, IndexLookup,
    PrimaryKey, RowId,
};

type SecondaryIndex = BTreeMap<IndexKey, BTreeSet<RowId>>;

#[derive(Debug, Clone)]
pub struct IndexedEventHolder {
    table_id: String,
    arity: usize,
    rows: BTreeMap<RowId, Row>,
    next_id: RowId,
    primary_key: Vec<usize>,
    primary_index: HashMap<PrimaryKey, RowId>,
    index_positions: Vec<usize>,
    indexes: HashMap<usize, SecondaryIndex>,
}

impl IndexedEventHolder {
    pub fn new(
        table_id: impl Into<String>,
        arity: usize,
        primary_key: Vec<usize>,
        index_positions: Vec<usize>,
    ) -> Self {
        let indexes = index_positions
            .iter()
            .map(|p| (*p, SecondaryIndex::new()))
            .collect();
        Self {
            table_id: table_id.into(),
            arity,
            rows: BTreeMap::new(),
            next_id: 0,
            primary_key,
            primary_index: HashMap::new(),
            index_positions,
            indexes,
        }
    }

    fn key_of(&self, row: &Row) -> Option<PrimaryKey> {
        if self.primary_key.is_empty() {
            return None;
        }
        Some(PrimaryKey::from_values(
            self.primary_key.iter().filter_map(|p| row.get(*p)),
        ))
    }

    fn duplicate(&self, key: &PrimaryKey) -> TableError {
        TableError::DuplicatePrimaryKey {
            table: self.table_id.clone(),
            key: key.to_string(),
        }
    }

    fn index_row(&mut self, id: RowId, row: &Row) {
        for (position, index) in self.indexes.iter_mut() {
            if let Some(value) = row.get(*position) {
                index
                    .entry(IndexKey(value.clone()))
                    .or_default()
                    .insert(id);
            }
        }
    }

    fn unindex_row(&mut self, id: RowId, row: &Row) {
        for (position, index) in self.indexes.iter_mut() {
            if let Some(value) = row.get(*position) {
                let key = IndexKey(value.clone());
                if let Some(ids) = index.get_mut(&key) {
                    ids.remove(&id);
                    if ids.is_empty() {
                        index.remove(&key);
                    }
                }
            }
        }
    }

    fn range(index: &SecondaryIndex, op: CompareOp, key: IndexKey) -> Option<Vec<RowId>> {
        let bounds = match op {
            CompareOp::Equal => {
                return Some(index.get(&key).map_or_else(Vec::new, |ids| {
                    ids.iter().copied().collect()
                }))
            }
            CompareOp::NotEqual => return None,
            CompareOp::LessThan => (Bound::Unbounded, Bound::Excluded(key)),
            CompareOp::LessThanEqual => (Bound::Unbounded, Bound::Included(key)),
            CompareOp::GreaterThan => (Bound::Excluded(key), Bound::Unbounded),
            CompareOp::GreaterThanEqual => (Bound::Included(key), Bound::Unbounded),
        };
        let mut ids: Vec<RowId> = index
            .range(bounds)
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect();
        ids.sort_unstable();
        Some(ids)
    }
}

impl EventHolder for IndexedEventHolder {
    fn add(&mut self, rows: Vec<Row>) -> Result<()> {
        for row in rows {
            check_arity(self.arity, &row)?;
            let id = self.next_id;
            if let Some(key) = self.key_of(&row) {
                if self.primary_index.contains_key(&key) {
                    return Err(self.duplicate(&key));
                }
                self.primary_index.insert(key, id);
            }
            self.index_row(id, &row);
            self.rows.insert(id, row);
            self.next_id += 1;
        }
        Ok(())
    }

    fn len(&self) -> usize {
        self.rows.len()
    }

    fn get(&self, id: RowId) -> Option<&Row> {
        self.rows.get(&id)
    }

    fn scan(&self) -> Box<dyn Iterator<Item = (RowId, &Row)> + '_> {
        Box::new(self.rows.iter().map(|(id, row)| (*id, row)))
    }

    fn overwrite(&mut self, id: RowId, row: Row) -> Result<()> {
        check_arity(self.arity, &row)?;
        let old = match self.rows.get(&id) {
            Some(old) => old.clone(),
            None => return Ok(()),
        };

        if let (Some(old_key), Some(new_key)) = (self.key_of(&old), self.key_of(&row)) {
            if old_key != new_key {
                if self.primary_index.contains_key(&new_key) {
                    return Err(self.duplicate(&new_key));
                }
                self.primary_index.remove(&old_key);
                self.primary_index.insert(new_key, id);
            }
        }

        self.unindex_row(id, &old);
        self.index_row(id, &row);
        self.rows.insert(id, row);
        Ok(())
    }

    fn remove(&mut self, id: RowId) -> Option<Row> {
        let row = self.rows.remove(&id)?;
        if let Some(key) = self.key_of(&row) {
            self.primary_index.remove(&key);
        }
        self.unindex_row(id, &row);
        Some(row)
    }

    fn lookup(&self, lookup: &IndexLookup<'_>) -> Option<Vec<RowId>> {
        match lookup {
            IndexLookup::PrimaryKey(values) => {
                if self.primary_key.is_empty() || values.len() != self.primary_key.len() {
                    return None;
                }
                let key = PrimaryKey::from_values(values.iter());
                Some(self.primary_index.get(&key).map_or_else(Vec::new, |id| vec![*id]))
            }
            IndexLookup::Compare {
                position,
                op,
                value,
            } => {
                let index = self.indexes.get(position)?;
                if value.is_null() {
                    return Some(Vec::new());
                }
                Self::range(index, *op, IndexKey((*value).clone()))
            }
        }
    }

    fn table_id(&self) -> &str {
        &self.table_id
    }

    fn layout(&self) -> HolderLayout {
        HolderLayout {
            kind: HolderKind::Indexed,
            arity: self.arity,
            primary_key: self.primary_key.clone(),
            indexes: self.index_positions.clone(),
        }
    }

    fn clone_holder(&self) -> Box<dyn EventHolder> {
        Box::new(self.clone())
    }

    fn image(&self) -> HolderImage {
        HolderImage {
            table_id: self.table_id.clone(),
            layout: self.layout(),
            rows: self.rows.values().cloned().collect(),
        }
    }
}
