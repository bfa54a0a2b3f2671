//! Runtime schema inference for introspection levels.
//!
//! Nothing is known about a level until its rows arrive: the column list comes
//! from the first row and at most one column is picked as the drill-down link.

use super::row::Row;

/// System functions that support drill-down at all.
pub const NESTABLE_FUNCTIONS: &[&str] = &[
    "transactions",
    "dbs",
    "catalog",
    "routine_loads",
    "stream_loads",
    "loads",
    "load_error_hub",
    "resources",
    "workload_groups",
    "workload_sched_policy",
    "compactions",
    "colocate_group",
    "bdbje",
    "small_files",
    "trash",
    "jobs",
    "repositories",
];

pub fn can_drill_down(function_name: &str) -> bool {
    NESTABLE_FUNCTIONS.contains(&function_name)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub key: String,
    pub navigable: bool,
}

/// Columns of one row batch plus the single navigable column, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    pub columns: Vec<String>,
    pub navigable_column: Option<String>,
}

impl Schema {
    pub fn column_specs(&self) -> Vec<ColumnSpec> {
        self.columns
            .iter()
            .map(|key| ColumnSpec {
                key: key.clone(),
                navigable: self.is_navigable(key),
            })
            .collect()
    }

    pub fn is_navigable(&self, key: &str) -> bool {
        self.navigable_column.as_deref() == Some(key)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Infer the schema of a row batch.
///
/// `depth_allows_drill` lets the caller cap navigation depth; when false no
/// column is navigable.
pub fn infer_schema(rows: &[Row], can_drill_down: bool, depth_allows_drill: bool) -> Schema {
    let columns: Vec<String> = match rows.first() {
        Some(first) => first.keys().cloned().collect(),
        None => return Schema::default(),
    };

    let navigable_column = navigable_column(&columns, can_drill_down && depth_allows_drill);

    Schema {
        columns,
        navigable_column,
    }
}

/// Pick the clickable column: the first whose name contains "id"
/// (case-insensitive), otherwise the first column.
pub fn navigable_column(columns: &[String], can_drill_down: bool) -> Option<String> {
    if !can_drill_down {
        return None;
    }

    columns
        .iter()
        .find(|c| c.to_lowercase().contains("id"))
        .or_else(|| columns.first())
        .cloned()
}
