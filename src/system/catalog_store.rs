//! Write-through persistence for the function catalog.
//!
//! Stored functions live in the backend. Built-in functions have no backend
//! record, so their favorite flag and ordering are kept in a local JSON file.

use super::catalog::{
    builtin_functions, CatalogStore, FunctionCatalog, FunctionDescriptor, FunctionDraft,
    FunctionKey, FunctionOrder,
};
use crate::api_client::{ApiClient, FunctionRequest};
use crate::error::ApiError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuiltinPreference {
    #[serde(default)]
    pub favorited: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_order: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_order: Option<i32>,
}

/// Per-name preferences for the built-in functions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuiltinPreferences {
    #[serde(default)]
    pub functions: BTreeMap<String, BuiltinPreference>,
}

impl BuiltinPreferences {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Built-in functions with these preferences applied.
    pub fn apply(&self, mut functions: Vec<FunctionDescriptor>) -> Vec<FunctionDescriptor> {
        for function in functions.iter_mut() {
            if let Some(pref) = self.functions.get(&function.name) {
                function.is_favorited = pref.favorited;
                if let Some(category) = &pref.category {
                    function.category = category.clone();
                }
                if let Some(order) = pref.category_order {
                    function.category_order = order;
                }
                if let Some(order) = pref.display_order {
                    function.display_order = order;
                }
            }
        }
        functions
    }

    fn entry(&mut self, name: &str) -> &mut BuiltinPreference {
        self.functions.entry(name.to_string()).or_default()
    }
}

/// Catalog store backed by the REST API plus the local preferences file.
pub struct ConsoleCatalogStore {
    api: ApiClient,
    prefs: BuiltinPreferences,
    prefs_path: PathBuf,
}

impl ConsoleCatalogStore {
    pub fn new(api: ApiClient, prefs_path: PathBuf) -> Result<Self> {
        let prefs = BuiltinPreferences::load(&prefs_path)?;
        Ok(Self {
            api,
            prefs,
            prefs_path,
        })
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn prefs(&self) -> &BuiltinPreferences {
        &self.prefs
    }

    /// Built-ins plus the stored functions of the active cluster. When the
    /// stored list cannot be fetched the catalog still holds the built-ins
    /// and the error is returned alongside.
    pub fn load_catalog(&self, compact_limit: usize) -> (FunctionCatalog, Option<ApiError>) {
        let system = self.prefs.apply(builtin_functions());

        let (user, error) = match self.api.list_functions() {
            Ok(stored) => (stored.into_iter().map(FunctionDescriptor::from).collect(), None),
            Err(e) => {
                warn!(target: "catalog", "could not load stored functions: {}", e);
                (Vec::new(), Some(e))
            }
        };

        (
            FunctionCatalog::load(system, user).with_compact_limit(compact_limit),
            error,
        )
    }

    fn save_prefs(&self) -> Result<(), ApiError> {
        self.prefs
            .save(&self.prefs_path)
            .map_err(|e| ApiError::Transport(format!("could not save preferences: {}", e)))
    }
}

impl CatalogStore for ConsoleCatalogStore {
    fn create_function(&mut self, draft: &FunctionDraft) -> Result<FunctionDescriptor, ApiError> {
        let stored = self.api.create_function(&FunctionRequest::from_draft(draft))?;
        Ok(FunctionDescriptor::from(stored))
    }

    fn persist_orders(&mut self, orders: &[FunctionOrder]) -> Result<(), ApiError> {
        self.api.update_orders(orders)?;

        let mut touched = false;
        for order in orders {
            if let FunctionKey::Builtin(name) = &order.key {
                let pref = self.prefs.entry(name);
                pref.category = Some(order.category.clone());
                pref.category_order = Some(order.category_order);
                pref.display_order = Some(order.display_order);
                touched = true;
            }
        }
        if touched {
            self.save_prefs()?;
        }
        debug!(target: "catalog", "stored {} orders", orders.len());
        Ok(())
    }

    fn set_favorite(&mut self, key: &FunctionKey, favorited: bool) -> Result<bool, ApiError> {
        match key {
            FunctionKey::Stored(id) => Ok(self.api.toggle_favorite(*id)?.is_favorited),
            FunctionKey::Builtin(name) => {
                self.prefs.entry(name).favorited = favorited;
                self.save_prefs()?;
                Ok(favorited)
            }
        }
    }

    fn update_function(&mut self, function: &FunctionDescriptor) -> Result<(), ApiError> {
        match &function.key {
            FunctionKey::Stored(id) => {
                self.api
                    .update_function(*id, &FunctionRequest::from_descriptor(function))?;
            }
            FunctionKey::Builtin(name) => {
                self.prefs.entry(name).category = Some(function.category.clone());
                self.save_prefs()?;
            }
        }
        Ok(())
    }

    fn delete_function(&mut self, id: i64) -> Result<(), ApiError> {
        self.api.delete_function(id)
    }

    fn delete_category(&mut self, name: &str) -> Result<(), ApiError> {
        self.api.delete_category(name)
    }
}
