//! Merges row descriptors into the catalogue.
//!
//! Rows are grouped into reconciliation units by (server, database, schema,
//! table). Each unit runs inside one [`CatalogueUnit`] and is committed (or,
//! for a dry run, rolled back) as a whole. Dry runs follow exactly the same
//! path as committing runs and only skip the store writes, so the tally of a
//! dry run is the tally the committing run will produce from the same state.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::database::entities::catalogue_columns;
use crate::errors::{CatalogueError, CatalogueResult};
use crate::ingestion::RowDescriptor;
use crate::services::catalogue_store::{CatalogueStore, CatalogueUnit, ColumnIntent, NewColumn};

/// Default gap between sort-order values of newly added columns
pub const DEFAULT_SORT_ORDER_STEP: i32 = 10;

/// How incoming rows interact with columns already in the catalogue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// Leave existing columns untouched; only add new ones
    SkipExisting,
    /// Add new columns and refresh intent on existing ones; never remove
    #[default]
    AddNewOnly,
    /// Add, update, and remove columns missing from the import
    FullSync,
}

impl ConflictPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SkipExisting => "skip-existing",
            Self::AddNewOnly => "add-new-only",
            Self::FullSync => "full-sync",
        }
    }

    fn updates_existing(&self) -> bool {
        !matches!(self, Self::SkipExisting)
    }
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConflictPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "skip-existing" | "skip" => Ok(Self::SkipExisting),
            "add-new-only" | "add-new" => Ok(Self::AddNewOnly),
            "full-sync" | "sync" => Ok(Self::FullSync),
            _ => Err(format!(
                "unknown conflict policy '{}' (expected skip-existing, add-new-only or full-sync)",
                s
            )),
        }
    }
}

/// Tally of an import, identical in shape for dry and committing runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    pub tables_added: usize,
    pub columns_added: usize,
    pub columns_updated: usize,
    pub columns_removed: usize,
    /// Existing columns left alone by the skip-existing policy
    pub columns_skipped: usize,
    /// Rows excluded before reconciliation because of a warning or empty column name
    pub rows_with_warnings: usize,
    pub errors: Vec<String>,
}

impl ImportResult {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Number of column-level mutations (applied or, for a dry run, pending)
    pub fn total_changes(&self) -> usize {
        self.columns_added + self.columns_updated + self.columns_removed
    }

    /// True when both tallies report the same counts, ignoring error text
    pub fn same_counts(&self, other: &ImportResult) -> bool {
        self.tables_added == other.tables_added
            && self.columns_added == other.columns_added
            && self.columns_updated == other.columns_updated
            && self.columns_removed == other.columns_removed
            && self.columns_skipped == other.columns_skipped
            && self.rows_with_warnings == other.rows_with_warnings
    }

    fn absorb(&mut self, unit: ImportResult) {
        self.tables_added += unit.tables_added;
        self.columns_added += unit.columns_added;
        self.columns_updated += unit.columns_updated;
        self.columns_removed += unit.columns_removed;
        self.columns_skipped += unit.columns_skipped;
        self.errors.extend(unit.errors);
    }
}

/// Owning path shared by every row of a reconciliation unit
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct UnitKey {
    pub server_name: String,
    pub database_name: String,
    pub schema_name: String,
    pub table_name: String,
}

impl From<&RowDescriptor> for UnitKey {
    fn from(row: &RowDescriptor) -> Self {
        Self {
            server_name: row.server_name.trim().to_string(),
            database_name: row.database_name.trim().to_string(),
            schema_name: row.schema_name.trim().to_string(),
            table_name: row.table_name.trim().to_string(),
        }
    }
}

impl fmt::Display for UnitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}.{}",
            self.server_name, self.database_name, self.schema_name, self.table_name
        )
    }
}

pub struct ReconciliationService<S: CatalogueStore> {
    store: S,
    sort_order_step: i32,
}

impl<S: CatalogueStore> ReconciliationService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            sort_order_step: DEFAULT_SORT_ORDER_STEP,
        }
    }

    pub fn with_sort_order_step(mut self, step: i32) -> Self {
        self.sort_order_step = if step > 0 { step } else { DEFAULT_SORT_ORDER_STEP };
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Reconcile a batch of rows under `policy`.
    ///
    /// Units are processed one after another. A unit that fails is rolled
    /// back and reported in `errors`; the remaining units still run.
    pub async fn reconcile(
        &self,
        rows: &[RowDescriptor],
        policy: ConflictPolicy,
        dry_run: bool,
    ) -> ImportResult {
        let mut result = ImportResult::default();
        let mut units: BTreeMap<UnitKey, Vec<&RowDescriptor>> = BTreeMap::new();

        for row in rows {
            if !row.is_reconcilable() {
                warn!(
                    "Excluding row {}.{}.{}: {}",
                    row.schema_name,
                    row.table_name,
                    row.column_name,
                    row.warning.as_deref().unwrap_or("column name is empty")
                );
                result.rows_with_warnings += 1;
                continue;
            }
            units.entry(UnitKey::from(row)).or_default().push(row);
        }

        info!(
            "Reconciling {} unit(s) with policy {} (dry run: {})",
            units.len(),
            policy,
            dry_run
        );

        for (key, unit_rows) in &units {
            match self.reconcile_unit(key, unit_rows, policy, dry_run).await {
                Ok(tally) => result.absorb(tally),
                Err(err) => {
                    error!("Reconciliation of {} failed: {}", key, err);
                    result.errors.push(format!("{}: {}", key, err));
                }
            }
        }

        info!(
            "Import {}: {} table(s) added, {} column(s) added, {} updated, {} removed, {} skipped, {} row(s) with warnings, {} error(s)",
            if dry_run { "preview" } else { "committed" },
            result.tables_added,
            result.columns_added,
            result.columns_updated,
            result.columns_removed,
            result.columns_skipped,
            result.rows_with_warnings,
            result.errors.len()
        );

        result
    }

    async fn reconcile_unit(
        &self,
        key: &UnitKey,
        rows: &[&RowDescriptor],
        policy: ConflictPolicy,
        dry_run: bool,
    ) -> CatalogueResult<ImportResult> {
        let unit = self.store.begin_unit().await?;

        match self.apply_unit(&unit, key, rows, policy, dry_run).await {
            Ok(tally) => {
                if dry_run {
                    unit.rollback().await?;
                } else {
                    unit.commit().await?;
                }
                Ok(tally)
            }
            Err(err) => {
                if let Err(rollback_err) = unit.rollback().await {
                    warn!("Rollback of {} failed: {}", key, rollback_err);
                }
                Err(err)
            }
        }
    }

    async fn apply_unit(
        &self,
        unit: &S::Unit,
        key: &UnitKey,
        rows: &[&RowDescriptor],
        policy: ConflictPolicy,
        dry_run: bool,
    ) -> CatalogueResult<ImportResult> {
        let mut tally = ImportResult::default();
        let row_count_hint = rows.iter().find_map(|row| row.estimated_row_count);

        // In a dry run missing parents stay virtual (None) instead of being created
        let server_id = match unit.find_server(&key.server_name).await? {
            Some(server) => Some(server.id),
            None if dry_run => None,
            None => Some(unit.create_server(&key.server_name).await?.id),
        };

        let database_id = match server_id {
            Some(server_id) => match unit.find_database(server_id, &key.database_name).await? {
                Some(database) => Some(database.id),
                None if dry_run => None,
                None => Some(
                    unit.create_database(server_id, &key.database_name)
                        .await?
                        .id,
                ),
            },
            None => None,
        };

        let existing_table = match database_id {
            Some(database_id) => {
                unit.find_table(database_id, &key.schema_name, &key.table_name)
                    .await?
            }
            None => None,
        };

        let (table_id, current) = match existing_table {
            Some(table) => {
                if let Some(hint) = row_count_hint {
                    if table.estimated_row_count != Some(hint) && !dry_run {
                        unit.set_estimated_row_count(table.id, hint).await?;
                    }
                }
                (Some(table.id), unit.columns(table.id).await?)
            }
            None => {
                tally.tables_added += 1;
                let table_id = if dry_run {
                    None
                } else {
                    let database_id = database_id.ok_or_else(|| {
                        CatalogueError::NotFound(format!("database for {}", key))
                    })?;
                    let table = unit
                        .create_table(
                            database_id,
                            &key.schema_name,
                            &key.table_name,
                            row_count_hint,
                        )
                        .await?;
                    Some(table.id)
                };
                (table_id, Vec::new())
            }
        };

        let existing: HashMap<String, &catalogue_columns::Model> = current
            .iter()
            .map(|column| (column.name.to_lowercase(), column))
            .collect();
        // None once the sort order would overflow; only an addition needs it
        let mut next_sort_order = match current.iter().map(|column| column.sort_order).max() {
            Some(max) => max.checked_add(self.sort_order_step),
            None => Some(self.sort_order_step),
        };
        let mut incoming: HashSet<String> = HashSet::new();

        for row in rows {
            let name = row.column_name.trim();
            let name_key = name.to_lowercase();
            if !incoming.insert(name_key.clone()) {
                tally.errors.push(format!(
                    "{}: column '{}' listed more than once; first occurrence used",
                    key, name
                ));
                continue;
            }

            let intent = ColumnIntent::from(*row);
            match existing.get(&name_key) {
                None => {
                    let sort_order = next_sort_order.ok_or_else(|| {
                        CatalogueError::Conflict(format!(
                            "no sort order left for column '{}' after the current maximum",
                            name
                        ))
                    })?;
                    debug!("{}: adding column '{}' at {}", key, name, sort_order);
                    if !dry_run {
                        let table_id = table_id.ok_or_else(|| {
                            CatalogueError::NotFound(format!("table for {}", key))
                        })?;
                        let column = NewColumn {
                            name: name.to_string(),
                            sort_order,
                            intent,
                        };
                        unit.insert_column(table_id, &column).await?;
                    }
                    next_sort_order = sort_order.checked_add(self.sort_order_step);
                    tally.columns_added += 1;
                }
                Some(_) if !policy.updates_existing() => {
                    tally.columns_skipped += 1;
                }
                Some(column) => {
                    if !dry_run && ColumnIntent::from_model(column) != intent {
                        unit.update_column_intent(column.id, &intent).await?;
                    }
                    tally.columns_updated += 1;
                }
            }
        }

        // Removal runs last against the pre-import snapshot
        if policy == ConflictPolicy::FullSync {
            for column in &current {
                if incoming.contains(&column.name.to_lowercase()) {
                    continue;
                }
                debug!("{}: removing column '{}'", key, column.name);
                if !dry_run {
                    unit.delete_column(column.id).await?;
                }
                tally.columns_removed += 1;
            }
        }

        Ok(tally)
    }
}
