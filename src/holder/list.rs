//! Unindexed holder
//!
//! BTreeMap keyed by row id: insertion-ordered iteration, O(log n) removal.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::event::Row;

use super::{check_arity, EventHolder, HolderImage, HolderKind, HolderLayout, RowId};

/// Scan-only storage for tables without `@PrimaryKey` or `@Index`
#[derive(Debug, Clone)]
pub struct ListEventHolder {
    table_id: String,
    arity: usize,
    rows: BTreeMap<RowId, Row>,
    next_id: RowId,
}

impl ListEventHolder {
    pub fn new(table_id: impl Into<String>, arity: usize) -> Self {
        Self {
            table_id: table_id.into(),
            arity,
            rows: BTreeMap::new(),
            next_id: 0,
        }
    }
}

impl EventHolder for ListEventHolder {
    fn add(&mut self, rows: Vec<Row>) -> Result<()> {
        for row in rows {
            check_arity(self.arity, &row)?;
            self.rows.insert(self.next_id, row);
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
        if let Some(slot) = self.rows.get_mut(&id) {
            *slot = row;
        }
        Ok(())
    }

    fn remove(&mut self, id: RowId) -> Option<Row> {
        self.rows.remove(&id)
    }

    fn table_id(&self) -> &str {
        &self.table_id
    }

    fn layout(&self) -> HolderLayout {
        HolderLayout {
            kind: HolderKind::List,
            arity: self.arity,
            primary_key: Vec::new(),
            indexes: Vec::new(),
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
