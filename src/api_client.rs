use crate::config::config::ServerConfig;
use crate::error::ApiError;
use crate::system::catalog::{FunctionDescriptor, FunctionDraft, FunctionKey, FunctionOrder};
use crate::system::row::Row;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// One introspection level as returned by the backend.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LevelResponse {
    #[serde(default)]
    pub function_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub data: Vec<Row>,
    #[serde(default)]
    pub total_count: usize,
    #[serde(default)]
    pub last_updated: String,
}

/// A function persisted by the backend for the active cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFunction {
    pub id: i64,
    #[serde(default)]
    pub cluster_id: i64,
    pub category_name: String,
    pub function_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sql_query: String,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default)]
    pub category_order: i32,
    #[serde(default)]
    pub is_favorited: bool,
    #[serde(default)]
    pub is_system: bool,
    #[serde(default)]
    pub created_by: Option<i64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl From<StoredFunction> for FunctionDescriptor {
    fn from(stored: StoredFunction) -> Self {
        FunctionDescriptor {
            key: FunctionKey::Stored(stored.id),
            name: stored.function_name,
            description: stored.description,
            category: stored.category_name,
            is_favorited: stored.is_favorited,
            is_system_defined: stored.is_system,
            category_order: stored.category_order,
            display_order: stored.display_order,
            sql_query: if stored.sql_query.is_empty() {
                None
            } else {
                Some(stored.sql_query)
            },
        }
    }
}

/// Body for creating or editing a stored function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionRequest {
    pub category_name: String,
    pub function_name: String,
    pub description: String,
    pub sql_query: String,
}

impl FunctionRequest {
    pub fn from_draft(draft: &FunctionDraft) -> Self {
        Self {
            category_name: draft.category.clone(),
            function_name: draft.name.clone(),
            description: draft.description.clone(),
            sql_query: draft.sql_query.clone(),
        }
    }

    pub fn from_descriptor(function: &FunctionDescriptor) -> Self {
        Self {
            category_name: function.category.clone(),
            function_name: function.name.clone(),
            description: function.description.clone(),
            sql_query: function.sql_query.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize)]
struct OrderEntry {
    id: i64,
    #[serde(rename = "displayOrder")]
    display_order: i32,
    #[serde(rename = "categoryOrder")]
    category_order: i32,
}

#[derive(Debug, Serialize)]
struct OrderRequest {
    functions: Vec<OrderEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Cluster {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub fe_host: String,
    #[serde(default)]
    pub is_active: bool,
}

pub fn level_url(base_url: &str, function_name: &str) -> String {
    format!("{}/api/clusters/system/{}", base_url, function_name)
}

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    token: Option<String>,
    client: Client,
}

impl ApiClient {
    pub fn new(server: &ServerConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(server.timeout_secs))
            .build()?;

        Ok(Self {
            base_url: server.base_url.trim_end_matches('/').to_string(),
            token: server.token.clone(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch one level synchronously. Used by the non-interactive commands.
    pub fn fetch_level(
        &self,
        function_name: &str,
        nested_path: Option<&str>,
    ) -> Result<LevelResponse, ApiError> {
        let mut request = self.client.get(level_url(&self.base_url, function_name));
        if let Some(path) = nested_path {
            request = request.query(&[("path", path)]);
        }
        self.send_json(request)
    }

    pub fn list_functions(&self) -> Result<Vec<StoredFunction>, ApiError> {
        self.send_json(self.client.get(self.url("/api/clusters/system-functions")))
    }

    pub fn create_function(&self, request: &FunctionRequest) -> Result<StoredFunction, ApiError> {
        info!(target: "api", "creating function '{}'", request.function_name);
        self.send_json(
            self.client
                .post(self.url("/api/clusters/system-functions"))
                .json(request),
        )
    }

    pub fn update_function(
        &self,
        id: i64,
        request: &FunctionRequest,
    ) -> Result<StoredFunction, ApiError> {
        self.send_json(
            self.client
                .put(self.url(&format!("/api/clusters/system-functions/{}", id)))
                .json(request),
        )
    }

    pub fn delete_function(&self, id: i64) -> Result<(), ApiError> {
        self.send_empty(
            self.client
                .delete(self.url(&format!("/api/clusters/system-functions/{}", id))),
        )
    }

    pub fn toggle_favorite(&self, id: i64) -> Result<StoredFunction, ApiError> {
        self.send_json(
            self.client
                .put(self.url(&format!("/api/clusters/system-functions/{}/favorite", id)))
                .json(&serde_json::json!({})),
        )
    }

    /// Persist orders of stored functions. Built-in entries are skipped.
    pub fn update_orders(&self, orders: &[FunctionOrder]) -> Result<(), ApiError> {
        let functions: Vec<OrderEntry> = orders
            .iter()
            .filter_map(|order| match order.key {
                FunctionKey::Stored(id) => Some(OrderEntry {
                    id,
                    display_order: order.display_order,
                    category_order: order.category_order,
                }),
                FunctionKey::Builtin(_) => None,
            })
            .collect();

        if functions.is_empty() {
            return Ok(());
        }

        self.send_empty(
            self.client
                .put(self.url("/api/clusters/system-functions/orders"))
                .json(&OrderRequest { functions }),
        )
    }

    pub fn delete_category(&self, name: &str) -> Result<(), ApiError> {
        let mut url = reqwest::Url::parse(&self.url("/api/system-functions/category"))
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::Transport("base url cannot hold a path".to_string()))?
            .push(name);
        self.send_empty(self.client.delete(url))
    }

    /// Run a user-defined function's stored query.
    pub fn execute_function(&self, id: i64) -> Result<Vec<Row>, ApiError> {
        self.send_json(
            self.client
                .post(self.url(&format!("/api/clusters/system-functions/{}/execute", id)))
                .json(&serde_json::json!({})),
        )
    }

    pub fn touch_access_time(&self, function_name: &str) -> Result<(), ApiError> {
        self.send_empty(
            self.client
                .put(self.url(&format!(
                    "/api/system-functions/{}/access-time",
                    function_name
                )))
                .json(&serde_json::json!({})),
        )
    }

    pub fn list_clusters(&self) -> Result<Vec<Cluster>, ApiError> {
        self.send_json(self.client.get(self.url("/api/clusters")))
    }

    /// The active cluster, or `NoActiveCluster` when the backend has none.
    pub fn active_cluster(&self) -> Result<Cluster, ApiError> {
        match self.send_json(self.client.get(self.url("/api/clusters/active"))) {
            Err(ApiError::Status { status: 404, .. }) => Err(ApiError::NoActiveCluster),
            other => other,
        }
    }

    pub fn activate_cluster(&self, id: i64) -> Result<Cluster, ApiError> {
        self.send_json(
            self.client
                .put(self.url(&format!("/api/clusters/{}/activate", id)))
                .json(&serde_json::json!({})),
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn send(&self, mut request: RequestBuilder) -> Result<Response, ApiError> {
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send()?;
        let status = response.status();
        debug!(target: "api", "{} {}", status.as_u16(), response.url());

        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ApiError::from_response(status.as_u16(), &body));
        }
        Ok(response)
    }

    fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = self.send(request)?;
        let body = response.text()?;
        Ok(serde_json::from_str(&body)?)
    }

    fn send_empty(&self, request: RequestBuilder) -> Result<(), ApiError> {
        self.send(request).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_level_url() {
        assert_eq!(
            level_url("http://localhost:8081", "transactions"),
            "http://localhost:8081/api/clusters/system/transactions"
        );
    }

    #[test]
    fn test_level_response_defaults() {
        let level: LevelResponse = serde_json::from_value(json!({
            "function_name": "dbs",
            "data": [{"DbId": "10", "DbName": "sales"}]
        }))
        .unwrap();
        assert_eq!(level.function_name, "dbs");
        assert_eq!(level.data.len(), 1);
        assert_eq!(level.total_count, 0);

        let empty: LevelResponse = serde_json::from_value(json!({})).unwrap();
        assert!(empty.data.is_empty());
    }

    #[test]
    fn test_level_rows_keep_backend_column_order() {
        let level: LevelResponse = serde_json::from_str(
            r#"{"data": [{"TransactionId": "5001", "Label": "l", "Coordinator": "fe"}]}"#,
        )
        .unwrap();
        let keys: Vec<&str> = level.data[0].keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["TransactionId", "Label", "Coordinator"]);
    }

    #[test]
    fn test_stored_function_to_descriptor() {
        let stored: StoredFunction = serde_json::from_value(json!({
            "id": 42,
            "clusterId": 1,
            "categoryName": "Custom",
            "functionName": "slow_queries",
            "description": "Queries over 10s",
            "sqlQuery": "SELECT * FROM information_schema.queries",
            "displayOrder": 3,
            "categoryOrder": 7,
            "isFavorited": true,
            "isSystem": false,
            "createdBy": 1,
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z"
        }))
        .unwrap();

        let descriptor = FunctionDescriptor::from(stored);
        assert_eq!(descriptor.key, FunctionKey::Stored(42));
        assert_eq!(descriptor.category, "Custom");
        assert!(descriptor.is_favorited);
        assert!(descriptor.is_user_defined());
        assert_eq!(descriptor.category_order, 7);
        assert_eq!(descriptor.display_order, 3);
        assert!(descriptor.sql_query.is_some());
    }

    #[test]
    fn test_order_payload_shape() {
        let body = OrderRequest {
            functions: vec![OrderEntry {
                id: 3,
                display_order: 1,
                category_order: 2,
            }],
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"functions": [{"id": 3, "displayOrder": 1, "categoryOrder": 2}]})
        );
    }

    #[test]
    fn test_create_request_body() {
        let draft = FunctionDraft {
            category: "Diagnostics".to_string(),
            name: "slow_queries".to_string(),
            description: "Queries over 10s".to_string(),
            sql_query: "SELECT 1".to_string(),
        };
        assert_eq!(
            serde_json::to_value(FunctionRequest::from_draft(&draft)).unwrap(),
            json!({
                "category_name": "Diagnostics",
                "function_name": "slow_queries",
                "description": "Queries over 10s",
                "sql_query": "SELECT 1"
            })
        );
    }

    #[test]
    fn test_builtin_only_orders_skip_request() {
        let client = ApiClient::new(&ServerConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            token: None,
            timeout_secs: 1,
        })
        .unwrap();
        let orders = vec![FunctionOrder {
            key: FunctionKey::Builtin("dbs".to_string()),
            category: "Database".to_string(),
            category_order: 0,
            display_order: 0,
        }];
        assert_eq!(client.update_orders(&orders), Ok(()));
    }

    #[test]
    fn test_unreachable_server() {
        let client = ApiClient::new(&ServerConfig {
            base_url: "http://127.0.0.1:9/".to_string(),
            token: Some("t".to_string()),
            timeout_secs: 1,
        })
        .unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:9");
        assert!(matches!(
            client.list_clusters(),
            Err(ApiError::Transport(_))
        ));
    }
}
