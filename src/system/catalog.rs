//! The function catalog operators pick from.
//!
//! Built-in introspection functions and stored (user-defined) functions are
//! merged into one list and handled the same way; `is_system_defined` only
//! matters when a function is executed.

use crate::error::ApiError;
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Default number of functions shown per category in the compact view.
pub const COMPACT_CATEGORY_LIMIT: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FunctionKey {
    /// Hard-coded introspection function, identified by name.
    Builtin(String),
    /// Function persisted by the backend, identified by its id.
    Stored(i64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    pub key: FunctionKey,
    pub name: String,
    pub description: String,
    pub category: String,
    pub is_favorited: bool,
    pub is_system_defined: bool,
    pub category_order: i32,
    pub display_order: i32,
    /// Query run by user-defined functions.
    #[serde(default)]
    pub sql_query: Option<String>,
}

impl FunctionDescriptor {
    pub fn is_user_defined(&self) -> bool {
        !self.is_system_defined
    }
}

/// New ordering of one function, as persisted after a reorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionOrder {
    pub key: FunctionKey,
    pub category: String,
    pub category_order: i32,
    pub display_order: i32,
}

/// Fields an operator supplies when creating or editing a user-defined function.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FunctionDraft {
    pub category: String,
    pub name: String,
    pub description: String,
    pub sql_query: String,
}

impl FunctionDraft {
    pub fn from_descriptor(function: &FunctionDescriptor) -> Self {
        Self {
            category: function.category.clone(),
            name: function.name.clone(),
            description: function.description.clone(),
            sql_query: function.sql_query.clone().unwrap_or_default(),
        }
    }

    /// Trim every field and reject empty ones.
    pub fn validated(self) -> Result<Self, CatalogError> {
        let draft = Self {
            category: self.category.trim().to_string(),
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
            sql_query: self.sql_query.trim().to_string(),
        };
        for (field, value) in [
            ("category", &draft.category),
            ("name", &draft.name),
            ("description", &draft.description),
            ("SQL query", &draft.sql_query),
        ] {
            if value.is_empty() {
                return Err(CatalogError::Invalid(format!("{} cannot be empty", field)));
            }
        }
        Ok(draft)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryGroup {
    pub name: String,
    pub functions: Vec<FunctionDescriptor>,
    /// Number of functions in the category before any truncation.
    pub total: usize,
}

impl CategoryGroup {
    pub fn is_truncated(&self) -> bool {
        self.functions.len() < self.total
    }
}

/// Persistence behind catalog mutations. Every mutation goes through the
/// store first and is only applied locally when the store accepts it.
pub trait CatalogStore {
    /// Create a user-defined function; returns it as the store saved it.
    fn create_function(&mut self, draft: &FunctionDraft) -> Result<FunctionDescriptor, ApiError>;

    fn persist_orders(&mut self, orders: &[FunctionOrder]) -> Result<(), ApiError>;

    /// Set the favorite flag; returns the flag the store ended up with.
    fn set_favorite(&mut self, key: &FunctionKey, favorited: bool) -> Result<bool, ApiError>;

    /// Persist a changed descriptor (category moves, edits).
    fn update_function(&mut self, function: &FunctionDescriptor) -> Result<(), ApiError>;

    fn delete_function(&mut self, id: i64) -> Result<(), ApiError>;

    fn delete_category(&mut self, name: &str) -> Result<(), ApiError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("function not found")]
    NotFound,
    #[error("category '{0}' not found")]
    CategoryNotFound(String),
    #[error("built-in functions cannot be deleted")]
    BuiltinFunction,
    #[error("built-in functions cannot be edited")]
    ReadOnly,
    #[error("function '{name}' already exists in {category}")]
    Duplicate { category: String, name: String },
    #[error("{0}")]
    Invalid(String),
    #[error("category '{0}' is a built-in category")]
    BuiltinCategory(String),
    #[error("position {0} is out of range")]
    OutOfRange(usize),
    #[error(transparent)]
    Store(#[from] ApiError),
}

pub struct FunctionCatalog {
    functions: Vec<FunctionDescriptor>,
    compact_limit: usize,
}

impl FunctionCatalog {
    /// Merge both sources and sort them for display.
    ///
    /// A stored system-defined entry replaces the built-in one of the same name.
    pub fn load(system: Vec<FunctionDescriptor>, user: Vec<FunctionDescriptor>) -> Self {
        let mut functions: Vec<FunctionDescriptor> = system
            .into_iter()
            .filter(|builtin| {
                !user
                    .iter()
                    .any(|stored| stored.is_system_defined && stored.name == builtin.name)
            })
            .collect();
        functions.extend(user);

        let mut catalog = Self {
            functions,
            compact_limit: COMPACT_CATEGORY_LIMIT,
        };
        catalog.sort();
        debug!(target: "catalog", "loaded {} functions", catalog.functions.len());
        catalog
    }

    pub fn with_compact_limit(mut self, limit: usize) -> Self {
        self.compact_limit = limit;
        self
    }

    /// All functions: favorites first, then by category order, then display order.
    pub fn functions(&self) -> &[FunctionDescriptor] {
        &self.functions
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn get(&self, key: &FunctionKey) -> Option<&FunctionDescriptor> {
        self.functions.iter().find(|f| &f.key == key)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&FunctionDescriptor> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Group by category in first-seen order of the sorted list.
    pub fn groups(&self) -> Vec<CategoryGroup> {
        group_by_category(&self.functions)
    }

    /// Groups in persisted order, ignoring favorites.
    ///
    /// Reorder positions (`move_category`, `move_function`,
    /// `transfer_function`) index into this view.
    pub fn ordered_groups(&self) -> Vec<CategoryGroup> {
        let mut functions = self.functions.clone();
        functions.sort_by(|a, b| {
            a.category_order
                .cmp(&b.category_order)
                .then(a.display_order.cmp(&b.display_order))
        });
        group_by_category(&functions)
    }

    /// Groups with each category cut to the compact limit.
    pub fn compact_groups(&self) -> Vec<CategoryGroup> {
        let limit = self.compact_limit;
        self.groups()
            .into_iter()
            .map(|mut group| {
                group.functions.truncate(limit);
                group
            })
            .collect()
    }

    /// Fuzzy search over names and descriptions, best match first.
    pub fn search(&self, query: &str) -> Vec<&FunctionDescriptor> {
        if query.trim().is_empty() {
            return self.functions.iter().collect();
        }

        let matcher = SkimMatcherV2::default();
        let mut matches: Vec<(i64, &FunctionDescriptor)> = self
            .functions
            .iter()
            .filter_map(|f| {
                let by_name = matcher.fuzzy_match(&f.name, query);
                let by_description = matcher.fuzzy_match(&f.description, query).map(|s| s / 2);
                by_name.max(by_description).map(|score| (score, f))
            })
            .collect();

        matches.sort_by(|a, b| b.0.cmp(&a.0));
        matches.into_iter().map(|(_, f)| f).collect()
    }

    pub fn is_custom_category(&self, name: &str) -> bool {
        !BUILTIN_CATEGORIES.contains(&name)
    }

    /// Add a new function or replace the one with the same key.
    pub fn upsert(&mut self, function: FunctionDescriptor) {
        match self.functions.iter_mut().find(|f| f.key == function.key) {
            Some(existing) => *existing = function,
            None => self.functions.push(function),
        }
        self.sort();
    }

    /// Create a user-defined function through the store, then add it.
    pub fn create(
        &mut self,
        draft: FunctionDraft,
        store: &mut dyn CatalogStore,
    ) -> Result<FunctionDescriptor, CatalogError> {
        let draft = draft.validated()?;
        self.ensure_unique(&draft, None)?;

        let created = store.create_function(&draft)?;
        debug!(target: "catalog", "created {} in {}", created.name, created.category);
        self.upsert(created.clone());
        Ok(created)
    }

    /// Change the fields of a user-defined function, keeping its orders and favorite.
    pub fn edit(
        &mut self,
        key: &FunctionKey,
        draft: FunctionDraft,
        store: &mut dyn CatalogStore,
    ) -> Result<FunctionDescriptor, CatalogError> {
        let existing = self.get(key).ok_or(CatalogError::NotFound)?;
        if !existing.is_user_defined() {
            return Err(CatalogError::ReadOnly);
        }
        let draft = draft.validated()?;
        self.ensure_unique(&draft, Some(key))?;

        let mut updated = existing.clone();
        updated.category = draft.category;
        updated.name = draft.name;
        updated.description = draft.description;
        updated.sql_query = Some(draft.sql_query);

        store.update_function(&updated)?;
        self.upsert(updated.clone());
        Ok(updated)
    }

    pub fn toggle_favorite(
        &mut self,
        key: &FunctionKey,
        store: &mut dyn CatalogStore,
    ) -> Result<bool, CatalogError> {
        let current = self.get(key).ok_or(CatalogError::NotFound)?.is_favorited;
        let favorited = store.set_favorite(key, !current)?;

        if let Some(function) = self.functions.iter_mut().find(|f| &f.key == key) {
            function.is_favorited = favorited;
        }
        self.sort();
        Ok(favorited)
    }

    /// Move a whole category to another position.
    pub fn move_category(
        &mut self,
        from: usize,
        to: usize,
        store: &mut dyn CatalogStore,
    ) -> Result<(), CatalogError> {
        let mut groups = self.ordered_groups();
        move_item(&mut groups, from, to)?;
        self.commit_orders(&groups, store)
    }

    /// Move a function inside its category.
    pub fn move_function(
        &mut self,
        category: &str,
        from: usize,
        to: usize,
        store: &mut dyn CatalogStore,
    ) -> Result<(), CatalogError> {
        let mut groups = self.ordered_groups();
        let group = groups
            .iter_mut()
            .find(|g| g.name == category)
            .ok_or_else(|| CatalogError::CategoryNotFound(category.to_string()))?;
        move_item(&mut group.functions, from, to)?;
        self.commit_orders(&groups, store)
    }

    /// Move a function from one category into another at `to_index`.
    pub fn transfer_function(
        &mut self,
        from_category: &str,
        from_index: usize,
        to_category: &str,
        to_index: usize,
        store: &mut dyn CatalogStore,
    ) -> Result<(), CatalogError> {
        if from_category == to_category {
            return self.move_function(from_category, from_index, to_index, store);
        }

        let mut groups = self.ordered_groups();
        let source = position_of(&groups, from_category)?;
        let target = position_of(&groups, to_category)?;

        if from_index >= groups[source].functions.len() {
            return Err(CatalogError::OutOfRange(from_index));
        }
        if to_index > groups[target].functions.len() {
            return Err(CatalogError::OutOfRange(to_index));
        }

        let original = groups[source].functions.remove(from_index);
        let mut moved = original.clone();
        moved.category = to_category.to_string();
        store.update_function(&moved)?;
        groups[target].functions.insert(to_index, moved);
        groups.retain(|g| !g.functions.is_empty());

        if let Err(err) = self.commit_orders(&groups, store) {
            // Put the category back so the store matches the unchanged catalog.
            if let Err(e) = store.update_function(&original) {
                warn!(
                    target: "catalog",
                    "could not restore category of {} after failed reorder: {}",
                    original.name,
                    e
                );
            }
            return Err(err);
        }
        Ok(())
    }

    /// Delete a user-defined function.
    pub fn remove(
        &mut self,
        key: &FunctionKey,
        store: &mut dyn CatalogStore,
    ) -> Result<FunctionDescriptor, CatalogError> {
        let position = self
            .functions
            .iter()
            .position(|f| &f.key == key)
            .ok_or(CatalogError::NotFound)?;

        match &self.functions[position].key {
            FunctionKey::Stored(id) if self.functions[position].is_user_defined() => {
                store.delete_function(*id)?;
            }
            _ => return Err(CatalogError::BuiltinFunction),
        }

        Ok(self.functions.remove(position))
    }

    /// Delete a custom category together with its user-defined functions.
    pub fn remove_category(
        &mut self,
        name: &str,
        store: &mut dyn CatalogStore,
    ) -> Result<usize, CatalogError> {
        if !self.is_custom_category(name) {
            return Err(CatalogError::BuiltinCategory(name.to_string()));
        }
        if !self.functions.iter().any(|f| f.category == name) {
            return Err(CatalogError::CategoryNotFound(name.to_string()));
        }

        store.delete_category(name)?;
        let before = self.functions.len();
        self.functions
            .retain(|f| !(f.category == name && f.is_user_defined()));
        Ok(before - self.functions.len())
    }

    fn ensure_unique(
        &self,
        draft: &FunctionDraft,
        editing: Option<&FunctionKey>,
    ) -> Result<(), CatalogError> {
        let taken = self.functions.iter().any(|f| {
            Some(&f.key) != editing && f.category == draft.category && f.name == draft.name
        });
        if taken {
            return Err(CatalogError::Duplicate {
                category: draft.category.clone(),
                name: draft.name.clone(),
            });
        }
        Ok(())
    }

    fn commit_orders(
        &mut self,
        groups: &[CategoryGroup],
        store: &mut dyn CatalogStore,
    ) -> Result<(), CatalogError> {
        let orders = orders_for(groups);
        store.persist_orders(&orders)?;

        for order in &orders {
            if let Some(function) = self.functions.iter_mut().find(|f| f.key == order.key) {
                function.category = order.category.clone();
                function.category_order = order.category_order;
                function.display_order = order.display_order;
            }
        }
        self.sort();
        debug!(target: "catalog", "persisted {} function orders", orders.len());
        Ok(())
    }

    fn sort(&mut self) {
        self.functions.sort_by(|a, b| {
            b.is_favorited
                .cmp(&a.is_favorited)
                .then(a.category_order.cmp(&b.category_order))
                .then(a.display_order.cmp(&b.display_order))
        });
    }
}

fn group_by_category(functions: &[FunctionDescriptor]) -> Vec<CategoryGroup> {
    let mut groups: Vec<CategoryGroup> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for function in functions {
        let slot = *index.entry(function.category.as_str()).or_insert_with(|| {
            groups.push(CategoryGroup {
                name: function.category.clone(),
                functions: Vec::new(),
                total: 0,
            });
            groups.len() - 1
        });
        groups[slot].functions.push(function.clone());
        groups[slot].total += 1;
    }

    groups
}

/// Orders for every function in `groups`: category index and position within it.
pub fn orders_for(groups: &[CategoryGroup]) -> Vec<FunctionOrder> {
    groups
        .iter()
        .enumerate()
        .flat_map(|(category_index, group)| {
            group
                .functions
                .iter()
                .enumerate()
                .map(move |(display_index, function)| FunctionOrder {
                    key: function.key.clone(),
                    category: group.name.clone(),
                    category_order: category_index as i32,
                    display_order: display_index as i32,
                })
        })
        .collect()
}

fn position_of(groups: &[CategoryGroup], name: &str) -> Result<usize, CatalogError> {
    groups
        .iter()
        .position(|g| g.name == name)
        .ok_or_else(|| CatalogError::CategoryNotFound(name.to_string()))
}

fn move_item<T>(items: &mut Vec<T>, from: usize, to: usize) -> Result<(), CatalogError> {
    if from >= items.len() {
        return Err(CatalogError::OutOfRange(from));
    }
    if to >= items.len() {
        return Err(CatalogError::OutOfRange(to));
    }
    let item = items.remove(from);
    items.insert(to, item);
    Ok(())
}

pub const BUILTIN_CATEGORIES: &[&str] = &[
    "Cluster",
    "Database",
    "Transaction",
    "Task",
    "Metadata",
    "Storage",
    "Job",
];

const BUILTIN_FUNCTIONS: &[(&str, &str, &str)] = &[
    ("backends", "Backend node information", "Cluster"),
    ("frontends", "Frontend node information", "Cluster"),
    ("brokers", "Broker node information", "Cluster"),
    ("statistic", "Cluster statistics", "Cluster"),
    ("dbs", "Database information", "Database"),
    ("tables", "Table information", "Database"),
    ("tablet_schema", "Tablet schema", "Database"),
    ("partitions", "Partition information", "Database"),
    ("transactions", "Transaction information", "Transaction"),
    ("routine_loads", "Routine load jobs", "Task"),
    ("stream_loads", "Stream load jobs", "Task"),
    ("loads", "Load jobs", "Task"),
    ("load_error_hub", "Load error information", "Task"),
    ("catalog", "Catalog information", "Metadata"),
    ("resources", "Resource information", "Metadata"),
    ("workload_groups", "Workload groups", "Metadata"),
    ("workload_sched_policy", "Workload scheduling policies", "Metadata"),
    ("compactions", "Compaction tasks", "Storage"),
    ("colocate_group", "Colocate groups", "Storage"),
    ("bdbje", "BDBJE information", "Storage"),
    ("small_files", "Small file information", "Storage"),
    ("trash", "Trash", "Storage"),
    ("jobs", "Job information", "Job"),
    ("repositories", "Repository information", "Job"),
];

/// The hard-coded introspection functions, ordered by category then position.
pub fn builtin_functions() -> Vec<FunctionDescriptor> {
    let mut display_counters: HashMap<&str, i32> = HashMap::new();

    BUILTIN_FUNCTIONS
        .iter()
        .map(|(name, description, category)| {
            let category_order = BUILTIN_CATEGORIES
                .iter()
                .position(|c| c == category)
                .unwrap_or(BUILTIN_CATEGORIES.len()) as i32;
            let counter = display_counters.entry(category).or_insert(0);
            let display_order = *counter;
            *counter += 1;

            FunctionDescriptor {
                key: FunctionKey::Builtin(name.to_string()),
                name: name.to_string(),
                description: description.to_string(),
                category: category.to_string(),
                is_favorited: false,
                is_system_defined: true,
                category_order,
                display_order,
                sql_query: None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct MemoryStore {
        orders: Vec<FunctionOrder>,
        updated: Vec<FunctionDescriptor>,
        deleted: Vec<i64>,
        deleted_categories: Vec<String>,
        fail: bool,
        fail_orders: bool,
        next_id: i64,
    }

    impl MemoryStore {
        fn check(&self) -> Result<(), ApiError> {
            if self.fail {
                Err(ApiError::Transport("offline".to_string()))
            } else {
                Ok(())
            }
        }
    }

    impl CatalogStore for MemoryStore {
        fn create_function(
            &mut self,
            draft: &FunctionDraft,
        ) -> Result<FunctionDescriptor, ApiError> {
            self.check()?;
            self.next_id += 1;
            let mut created = stored(self.next_id, &draft.name, &draft.category, 9, 0);
            created.description = draft.description.clone();
            created.sql_query = Some(draft.sql_query.clone());
            Ok(created)
        }

        fn persist_orders(&mut self, orders: &[FunctionOrder]) -> Result<(), ApiError> {
            self.check()?;
            if self.fail_orders {
                return Err(ApiError::Transport("orders rejected".to_string()));
            }
            self.orders = orders.to_vec();
            Ok(())
        }

        fn set_favorite(&mut self, _key: &FunctionKey, favorited: bool) -> Result<bool, ApiError> {
            self.check()?;
            Ok(favorited)
        }

        fn update_function(&mut self, function: &FunctionDescriptor) -> Result<(), ApiError> {
            self.check()?;
            self.updated.push(function.clone());
            Ok(())
        }

        fn delete_function(&mut self, id: i64) -> Result<(), ApiError> {
            self.check()?;
            self.deleted.push(id);
            Ok(())
        }

        fn delete_category(&mut self, name: &str) -> Result<(), ApiError> {
            self.check()?;
            self.deleted_categories.push(name.to_string());
            Ok(())
        }
    }

    fn stored(id: i64, name: &str, category: &str, category_order: i32, display_order: i32) -> FunctionDescriptor {
        FunctionDescriptor {
            key: FunctionKey::Stored(id),
            name: name.to_string(),
            description: format!("{} query", name),
            category: category.to_string(),
            is_favorited: false,
            is_system_defined: false,
            category_order,
            display_order,
            sql_query: Some("SELECT 1".to_string()),
        }
    }

    fn names(functions: &[FunctionDescriptor]) -> Vec<&str> {
        functions.iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn test_builtins() {
        let builtins = builtin_functions();
        assert_eq!(builtins.len(), 24);
        assert!(builtins.iter().all(|f| f.is_system_defined));

        let transactions = builtins.iter().find(|f| f.name == "transactions").unwrap();
        assert_eq!(transactions.category, "Transaction");
        assert_eq!(transactions.category_order, 2);
        assert_eq!(transactions.display_order, 0);

        let trash = builtins.iter().find(|f| f.name == "trash").unwrap();
        assert_eq!(trash.display_order, 4);
    }

    #[test]
    fn test_sort_favorites_then_orders() {
        let mut fav = stored(3, "fav", "Zed", 9, 9);
        fav.is_favorited = true;
        let catalog = FunctionCatalog::load(
            vec![],
            vec![
                stored(1, "b", "A", 0, 1),
                stored(2, "a", "A", 0, 0),
                fav,
                stored(4, "c", "B", 1, 0),
            ],
        );
        assert_eq!(names(catalog.functions()), vec!["fav", "a", "b", "c"]);

        let groups = catalog.groups();
        let group_names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(group_names, vec!["Zed", "A", "B"]);
    }

    #[test]
    fn test_compact_groups_truncate() {
        let catalog = FunctionCatalog::load(builtin_functions(), vec![]);
        let compact = catalog.compact_groups();
        let storage = compact.iter().find(|g| g.name == "Storage").unwrap();
        assert_eq!(storage.functions.len(), 4);
        assert_eq!(storage.total, 5);
        assert!(storage.is_truncated());

        let full = catalog.groups();
        let storage = full.iter().find(|g| g.name == "Storage").unwrap();
        assert_eq!(storage.functions.len(), 5);
    }

    #[test]
    fn test_stored_system_entry_replaces_builtin() {
        let mut backends = stored(10, "backends", "Cluster", 0, 0);
        backends.is_system_defined = true;
        let catalog = FunctionCatalog::load(builtin_functions(), vec![backends]);
        assert_eq!(catalog.len(), 24);
        assert_eq!(
            catalog.find_by_name("backends").unwrap().key,
            FunctionKey::Stored(10)
        );
    }

    #[test]
    fn test_toggle_favorite_moves_to_front() {
        let mut store = MemoryStore::default();
        let mut catalog = FunctionCatalog::load(builtin_functions(), vec![]);
        let key = FunctionKey::Builtin("jobs".to_string());

        assert!(catalog.toggle_favorite(&key, &mut store).unwrap());
        assert_eq!(catalog.functions()[0].name, "jobs");
        assert_eq!(catalog.groups()[0].name, "Job");

        assert!(!catalog.toggle_favorite(&key, &mut store).unwrap());
        assert_eq!(catalog.functions()[0].name, "backends");
    }

    #[test]
    fn test_move_category_rewrites_every_order() {
        let mut store = MemoryStore::default();
        let mut catalog = FunctionCatalog::load(builtin_functions(), vec![]);

        catalog.move_category(6, 0, &mut store).unwrap();
        assert_eq!(store.orders.len(), 24);
        assert_eq!(catalog.groups()[0].name, "Job");
        assert_eq!(catalog.groups()[1].name, "Cluster");

        let repositories = catalog.find_by_name("repositories").unwrap();
        assert_eq!(repositories.category_order, 0);
        assert_eq!(repositories.display_order, 1);
        let backends = catalog.find_by_name("backends").unwrap();
        assert_eq!(backends.category_order, 1);
    }

    #[test]
    fn test_move_function_within_category() {
        let mut store = MemoryStore::default();
        let mut catalog = FunctionCatalog::load(builtin_functions(), vec![]);

        catalog.move_function("Cluster", 0, 2, &mut store).unwrap();
        let cluster = catalog.groups().into_iter().find(|g| g.name == "Cluster").unwrap();
        assert_eq!(
            names(&cluster.functions),
            vec!["frontends", "brokers", "backends", "statistic"]
        );
    }

    #[test]
    fn test_failed_persist_leaves_catalog_untouched() {
        let mut store = MemoryStore {
            fail: true,
            ..Default::default()
        };
        let mut catalog = FunctionCatalog::load(builtin_functions(), vec![]);
        let before = catalog.functions().to_vec();

        assert!(matches!(
            catalog.move_category(0, 3, &mut store),
            Err(CatalogError::Store(_))
        ));
        assert_eq!(catalog.functions(), before.as_slice());
    }

    #[test]
    fn test_transfer_function_across_categories() {
        let mut store = MemoryStore::default();
        let mut catalog = FunctionCatalog::load(
            builtin_functions(),
            vec![stored(1, "slow_queries", "Custom", 7, 0)],
        );

        catalog
            .transfer_function("Custom", 0, "Job", 1, &mut store)
            .unwrap();

        assert_eq!(store.updated.len(), 1);
        assert_eq!(store.updated[0].category, "Job");
        let moved = catalog.find_by_name("slow_queries").unwrap();
        assert_eq!(moved.category, "Job");
        assert_eq!(moved.display_order, 1);
        assert!(catalog.groups().iter().all(|g| g.name != "Custom"));
    }

    #[test]
    fn test_reorder_ignores_favorite_position() {
        let mut store = MemoryStore::default();
        let mut catalog = FunctionCatalog::load(builtin_functions(), vec![]);
        let repositories = FunctionKey::Builtin("repositories".to_string());

        catalog.toggle_favorite(&repositories, &mut store).unwrap();
        assert_eq!(catalog.groups()[0].name, "Job");

        catalog.move_function("Cluster", 0, 1, &mut store).unwrap();
        catalog.toggle_favorite(&repositories, &mut store).unwrap();

        let groups = catalog.groups();
        assert_eq!(groups[0].name, "Cluster");
        assert_eq!(groups[6].name, "Job");
        assert_eq!(names(&groups[6].functions), vec!["jobs", "repositories"]);
        assert_eq!(catalog.find_by_name("repositories").unwrap().display_order, 1);
        assert_eq!(
            names(&groups[0].functions),
            vec!["frontends", "backends", "brokers", "statistic"]
        );
    }

    #[test]
    fn test_ordered_groups_skip_favorites() {
        let mut store = MemoryStore::default();
        let mut catalog = FunctionCatalog::load(builtin_functions(), vec![]);
        catalog
            .toggle_favorite(&FunctionKey::Builtin("trash".to_string()), &mut store)
            .unwrap();

        let ordered = catalog.ordered_groups();
        assert_eq!(ordered[0].name, "Cluster");
        assert_eq!(ordered[5].name, "Storage");
        assert_eq!(ordered[5].functions.last().unwrap().name, "trash");
    }

    #[test]
    fn test_failed_transfer_restores_category() {
        let mut store = MemoryStore {
            fail_orders: true,
            ..Default::default()
        };
        let mut catalog = FunctionCatalog::load(builtin_functions(), vec![]);

        let result = catalog.transfer_function("Cluster", 0, "Job", 0, &mut store);
        assert!(matches!(result, Err(CatalogError::Store(_))));

        let categories: Vec<(&str, &str)> = store
            .updated
            .iter()
            .map(|f| (f.name.as_str(), f.category.as_str()))
            .collect();
        assert_eq!(categories, vec![("backends", "Job"), ("backends", "Cluster")]);
        assert_eq!(catalog.find_by_name("backends").unwrap().category, "Cluster");
        assert!(store.orders.is_empty());
    }

    #[test]
    fn test_remove_only_user_defined() {
        let mut store = MemoryStore::default();
        let mut catalog = FunctionCatalog::load(
            builtin_functions(),
            vec![stored(5, "slow_queries", "Custom", 7, 0)],
        );

        let builtin = FunctionKey::Builtin("dbs".to_string());
        assert_eq!(
            catalog.remove(&builtin, &mut store),
            Err(CatalogError::BuiltinFunction)
        );

        let removed = catalog.remove(&FunctionKey::Stored(5), &mut store).unwrap();
        assert_eq!(removed.name, "slow_queries");
        assert_eq!(store.deleted, vec![5]);
        assert_eq!(catalog.len(), 24);
    }

    #[test]
    fn test_remove_category() {
        let mut store = MemoryStore::default();
        let mut catalog = FunctionCatalog::load(
            builtin_functions(),
            vec![stored(1, "q1", "Custom", 7, 0), stored(2, "q2", "Custom", 7, 1)],
        );

        assert_eq!(
            catalog.remove_category("Storage", &mut store),
            Err(CatalogError::BuiltinCategory("Storage".to_string()))
        );
        assert_eq!(catalog.remove_category("Custom", &mut store).unwrap(), 2);
        assert_eq!(store.deleted_categories, vec!["Custom".to_string()]);
        assert!(!catalog.is_custom_category("Job"));
    }

    #[test]
    fn test_search() {
        let catalog = FunctionCatalog::load(builtin_functions(), vec![]);
        let results = catalog.search("txn");
        assert!(results.is_empty() || results[0].name == "transactions");

        let results = catalog.search("routine");
        assert_eq!(results[0].name, "routine_loads");

        assert_eq!(catalog.search("  ").len(), 24);
    }

    fn draft(category: &str, name: &str) -> FunctionDraft {
        FunctionDraft {
            category: category.to_string(),
            name: name.to_string(),
            description: "long running queries".to_string(),
            sql_query: "SELECT * FROM information_schema.processlist".to_string(),
        }
    }

    #[test]
    fn test_create_validates_and_adds() {
        let mut store = MemoryStore::default();
        let mut catalog = FunctionCatalog::load(builtin_functions(), vec![]);

        let mut blank = draft("Diagnostics", "slow_queries");
        blank.sql_query = "   ".to_string();
        assert_eq!(
            catalog.create(blank, &mut store),
            Err(CatalogError::Invalid("SQL query cannot be empty".to_string()))
        );

        let created = catalog
            .create(draft(" Diagnostics ", "slow_queries"), &mut store)
            .unwrap();
        assert_eq!(created.category, "Diagnostics");
        assert!(created.is_user_defined());
        assert_eq!(catalog.len(), 25);
        assert!(catalog.groups().iter().any(|g| g.name == "Diagnostics"));

        assert!(matches!(
            catalog.create(draft("Diagnostics", "slow_queries"), &mut store),
            Err(CatalogError::Duplicate { .. })
        ));
    }

    #[test]
    fn test_create_failure_adds_nothing() {
        let mut store = MemoryStore {
            fail: true,
            ..Default::default()
        };
        let mut catalog = FunctionCatalog::load(builtin_functions(), vec![]);
        assert!(matches!(
            catalog.create(draft("Diagnostics", "slow_queries"), &mut store),
            Err(CatalogError::Store(_))
        ));
        assert_eq!(catalog.len(), 24);
    }

    #[test]
    fn test_edit_keeps_orders_and_favorite() {
        let mut store = MemoryStore::default();
        let mut query = stored(1, "q", "Custom", 7, 3);
        query.is_favorited = true;
        let mut catalog = FunctionCatalog::load(builtin_functions(), vec![query]);

        let mut changes = draft("Custom", "q_renamed");
        changes.description = "edited".to_string();
        let edited = catalog
            .edit(&FunctionKey::Stored(1), changes, &mut store)
            .unwrap();

        assert_eq!(edited.name, "q_renamed");
        assert_eq!(edited.display_order, 3);
        assert!(edited.is_favorited);
        assert_eq!(store.updated, vec![edited.clone()]);
        assert_eq!(catalog.functions()[0], edited);

        assert_eq!(
            catalog.edit(
                &FunctionKey::Builtin("dbs".to_string()),
                draft("Database", "dbs"),
                &mut store
            ),
            Err(CatalogError::ReadOnly)
        );
    }

    #[test]
    fn test_upsert_replaces_by_key() {
        let mut catalog = FunctionCatalog::load(vec![], vec![stored(1, "q", "Custom", 0, 0)]);
        let mut edited = stored(1, "q_renamed", "Custom", 0, 0);
        edited.description = "edited".to_string();
        catalog.upsert(edited);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.functions()[0].name, "q_renamed");

        catalog.upsert(stored(2, "other", "Custom", 0, 1));
        assert_eq!(catalog.len(), 2);
    }
}
