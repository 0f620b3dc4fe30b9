//! In-memory table
//!
//! A [`HolderHandle`] behind one `parking_lot::RwLock`.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::config::{ConfigReader, TableConfig};
use crate::context::AppContext;
use crate::error::{Result, TableError};
use crate::event::{Row, StateEvent};
use crate::expression::{Expression, ExpressionParser, UpdateSet, Variable};
use crate::holder::{holder_for, holder_from_image, EventHolder, HolderHandle, HolderLayout};
use crate::operator::{CompiledCondition, CompiledUpdateSet, OperatorParser, RowBuilder};
use crate::schema::{MatchingMeta, TableDefinition};
use crate::snapshot::{Snapshotable, StateSnapshot, StateValue, HOLDER_KEY};

use super::Table;

/// In-memory event table
///
/// ## Concurrency:
/// - `holder`: the only shared mutable state, behind a RwLock
/// - `definition`, `config`, `element_id`: immutable after init
pub struct InMemoryTable {
    definition: TableDefinition,
    config: TableConfig,
    element_id: String,
    holder: RwLock<HolderHandle>,
}

impl InMemoryTable {
    /// Create a table and register it with the app's snapshot service under
    /// the table id. Settings come from the extension-config reader.
    pub fn init(
        definition: TableDefinition,
        reader: &ConfigReader,
        context: &AppContext,
    ) -> Result<Arc<Self>> {
        let config = TableConfig::from_reader(reader)?;
        Self::with_config(definition, config, context)
    }

    /// Like [`InMemoryTable::init`] with an already-built config
    pub fn with_config(
        definition: TableDefinition,
        config: TableConfig,
        context: &AppContext,
    ) -> Result<Arc<Self>> {
        definition.validate()?;

        let element_id = match &config.element_id {
            Some(id) => id.clone(),
            None => format!(
                "{}-{}",
                config.element_id_prefix,
                context.element_id_generator().create_new_id()
            ),
        };
        let holder: HolderHandle = Arc::new(holder_for(&definition));

        let table = Arc::new(Self {
            definition,
            config,
            element_id,
            holder: RwLock::new(holder),
        });

        let snapshotable: Arc<dyn Snapshotable> = table.clone();
        context
            .snapshot_service()
            .add_snapshotable(table.definition.id(), &snapshotable);

        info!(
            app = %context.name(),
            table = %table.definition.id(),
            element_id = %table.element_id,
            layout = ?HolderLayout::for_definition(&table.definition).kind,
            "initialized in-memory table"
        );
        Ok(table)
    }

    pub fn element_id(&self) -> &str {
        &self.element_id
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// Number of stored rows
    pub fn len(&self) -> usize {
        self.holder.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Owned copies of every stored row, in insertion order
    pub fn rows(&self) -> Vec<Row> {
        self.holder
            .read()
            .scan()
            .map(|(_, row)| row.clone())
            .collect()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Run `f` with exclusive access to storage. A handle still shared with
    /// a snapshot is copied first.
    fn write<R>(&self, f: impl FnOnce(&mut dyn EventHolder) -> R) -> R {
        let mut guard = self.holder.write();
        let holder = Arc::make_mut(&mut *guard);
        f(&mut **holder)
    }

    /// Widen numeric values to their column types so index keys agree with
    /// widened probes. Rows of the wrong arity pass through for the holder
    /// to reject.
    fn conform(&self, row: Row) -> Row {
        let attributes = self.definition.attributes();
        if row.len() != attributes.len() {
            return row;
        }
        Row::new(
            row.into_values()
                .into_iter()
                .zip(attributes)
                .map(|(value, attribute)| value.widen(attribute.attribute_type))
                .collect(),
        )
    }

    fn check_binding(&self, condition: &CompiledCondition) {
        debug_assert_eq!(
            condition.table_id(),
            self.definition.id(),
            "compiled condition used against a foreign table"
        );
    }

    fn check_meta(&self, meta: &MatchingMeta) -> Result<()> {
        if meta.table().id() != self.definition.id() {
            return Err(TableError::SchemaBinding(format!(
                "matching meta targets table '{}', not '{}'",
                meta.table().id(),
                self.definition.id()
            )));
        }
        Ok(())
    }

    fn check_table_id(&self, table_id: &str) -> Result<()> {
        if table_id != self.definition.id() {
            return Err(TableError::StateMismatch(format!(
                "snapshot of table '{}' cannot restore table '{}'",
                table_id,
                self.definition.id()
            )));
        }
        Ok(())
    }

    fn check_layout(&self, layout: &HolderLayout) -> Result<()> {
        let expected = HolderLayout::for_definition(&self.definition);
        if *layout != expected {
            return Err(TableError::StateMismatch(format!(
                "table '{}' expects holder layout {:?}, snapshot has {:?}",
                self.definition.id(),
                expected,
                layout
            )));
        }
        Ok(())
    }

    /// Storage handle carried by `state`, checked against this table's
    /// layout. Runs before the write lock is taken.
    fn validated_handle(&self, mut state: StateSnapshot) -> Result<HolderHandle> {
        let value = state.remove(HOLDER_KEY).ok_or_else(|| {
            TableError::StateMismatch(format!(
                "snapshot for table '{}' has no '{}' entry",
                self.definition.id(),
                HOLDER_KEY
            ))
        })?;

        match value {
            StateValue::Holder(handle) => {
                self.check_table_id(handle.table_id())?;
                self.check_layout(&handle.layout())?;
                Ok(handle)
            }
            StateValue::Image(image) => {
                self.check_table_id(&image.table_id)?;
                self.check_layout(&image.layout)?;
                let rebuilt = holder_from_image(image).map_err(|e| {
                    TableError::StateMismatch(format!(
                        "snapshot rows do not fit table '{}': {}",
                        self.definition.id(),
                        e
                    ))
                })?;
                Ok(Arc::new(rebuilt))
            }
        }
    }
}

impl Table for InMemoryTable {
    fn definition(&self) -> &TableDefinition {
        &self.definition
    }

    fn add(&self, rows: Vec<Row>) -> Result<()> {
        let count = rows.len();
        let rows = rows.into_iter().map(|row| self.conform(row)).collect();
        self.write(|holder| holder.add(rows))?;
        debug!(table = %self.definition.id(), rows = count, "added rows");
        Ok(())
    }

    fn delete(&self, batch: &[StateEvent], condition: &CompiledCondition) {
        self.check_binding(condition);
        let removed = self.write(|holder| condition.operator().delete(batch, holder));
        debug!(
            table = %self.definition.id(),
            batch = batch.len(),
            removed,
            "deleted rows"
        );
    }

    fn update(
        &self,
        batch: &[StateEvent],
        condition: &CompiledCondition,
        update_set: &CompiledUpdateSet,
    ) -> Result<()> {
        self.check_binding(condition);
        let updated = self.write(|holder| condition.operator().update(batch, holder, update_set))?;
        debug!(
            table = %self.definition.id(),
            batch = batch.len(),
            updated,
            "updated rows"
        );
        Ok(())
    }

    fn update_or_add(
        &self,
        batch: &[StateEvent],
        condition: &CompiledCondition,
        update_set: &CompiledUpdateSet,
        row_builder: &RowBuilder,
    ) -> Result<()> {
        self.check_binding(condition);
        let inserted = self.write(|holder| -> Result<usize> {
            let unmatched =
                condition
                    .operator()
                    .try_update(batch, holder, update_set, row_builder)?;
            Ok(unmatched.len())
        })?;
        debug!(
            table = %self.definition.id(),
            batch = batch.len(),
            inserted,
            "upserted rows"
        );
        Ok(())
    }

    fn contains(&self, probe: &StateEvent, condition: &CompiledCondition) -> bool {
        self.check_binding(condition);
        let holder = self.holder.read();
        condition.operator().contains(probe, &***holder)
    }

    fn find(&self, probe: &StateEvent, condition: &CompiledCondition) -> Vec<Row> {
        self.check_binding(condition);
        let holder = self.holder.read();
        condition.operator().find(probe, &***holder)
    }

    fn compile_expression(
        &self,
        expression: &Expression,
        meta: &MatchingMeta,
    ) -> Result<CompiledCondition> {
        self.check_meta(meta)?;
        let operator = OperatorParser::new(meta)
            .index_lookups(self.config.index_lookups)
            .construct(expression)?;
        Ok(CompiledCondition::new(self.definition.id(), operator))
    }

    fn compile_update_set(
        &self,
        update_set: Option<&UpdateSet>,
        meta: &MatchingMeta,
    ) -> Result<CompiledUpdateSet> {
        self.check_meta(meta)?;
        let parser = ExpressionParser::new(meta);
        let mut compiled = CompiledUpdateSet::new();

        let default_set;
        let update_set = match update_set {
            Some(update_set) => update_set,
            None => {
                let incoming = meta.incoming();
                let mut identity = UpdateSet::new();
                for attribute in self.definition.attributes() {
                    if incoming.attribute_position(&attribute.name).is_none() {
                        return Err(TableError::SchemaBinding(format!(
                            "'{}' has no attribute '{}' for the default update of table '{}'",
                            incoming.id(),
                            attribute.name,
                            self.definition.id()
                        )));
                    }
                    identity = identity.set(
                        Variable::of(self.definition.id(), attribute.name.as_str()),
                        Expression::Variable(Variable::of(incoming.id(), attribute.name.as_str())),
                    );
                }
                default_set = identity;
                &default_set
            }
        };

        for set_attribute in update_set.set_attributes() {
            let (position, target_type) =
                parser.resolve_table_attribute(&set_attribute.table_variable)?;
            let executor = parser.parse(&set_attribute.value)?;
            if let Some(source_type) = executor.return_type() {
                if !source_type.assignable_to(target_type) {
                    return Err(TableError::SchemaBinding(format!(
                        "cannot assign {} to {} attribute '{}'",
                        source_type, target_type, set_attribute.table_variable.attribute
                    )));
                }
            }
            compiled.insert(position, executor, target_type);
        }

        Ok(compiled)
    }
}

impl Snapshotable for InMemoryTable {
    /// The live storage handle, shared rather than copied
    fn current_state(&self) -> StateSnapshot {
        let handle = self.holder.read().clone();
        let mut state = StateSnapshot::new();
        state.insert(HOLDER_KEY, StateValue::Holder(handle));
        state
    }

    fn restore_state(&self, state: StateSnapshot) -> Result<()> {
        let handle = match self.validated_handle(state) {
            Ok(handle) => handle,
            Err(e) => {
                warn!(table = %self.definition.id(), error = %e, "rejected snapshot");
                return Err(e);
            }
        };

        let rows = handle.len();
        *self.holder.write() = handle;
        info!(
            table = %self.definition.id(),
            element_id = %self.element_id,
            rows,
            "restored table state"
        );
        Ok(())
    }

    fn element_id(&self) -> &str {
        &self.element_id
    }
}
