//! Routes an executed function to the right style of result.
//!
//! System-defined functions are browsed level by level through the
//! navigation controller. User-defined functions run their stored query and
//! come back as a flat table that never offers drill-down.

use super::catalog::{FunctionDescriptor, FunctionKey};
use super::fetcher::DataFetcher;
use super::navigation::{FetchRequest, NavigationController};
use super::row::Row;
use super::schema::{infer_schema, Schema};
use crate::api_client::ApiClient;
use crate::error::ApiError;
use tracing::{info, warn};

/// Backend calls needed to execute functions.
pub trait FunctionRunner {
    fn execute(&self, id: i64) -> Result<Vec<Row>, ApiError>;

    /// Record that a system function was opened.
    fn touch_access_time(&self, function_name: &str) -> Result<(), ApiError>;
}

impl FunctionRunner for ApiClient {
    fn execute(&self, id: i64) -> Result<Vec<Row>, ApiError> {
        self.execute_function(id)
    }

    fn touch_access_time(&self, function_name: &str) -> Result<(), ApiError> {
        ApiClient::touch_access_time(self, function_name)
    }
}

/// Result of a user-defined function: rows plus a schema with no link column.
#[derive(Debug, Clone)]
pub struct FlatResult {
    pub function_name: String,
    pub rows: Vec<Row>,
    pub schema: Schema,
    pub error: Option<ApiError>,
}

#[derive(Debug, Clone)]
pub enum Dispatch {
    /// Browsing started; the root level fetch is in flight.
    Browse(FetchRequest),
    Flat(FlatResult),
}

pub fn dispatch<F, R>(
    function: &FunctionDescriptor,
    navigation: &mut NavigationController<F>,
    runner: &R,
) -> Dispatch
where
    F: DataFetcher,
    R: FunctionRunner + ?Sized,
{
    match (&function.key, function.is_system_defined) {
        (FunctionKey::Stored(id), false) => {
            navigation.close();
            info!(target: "dispatch", "running stored query of {}", function.name);

            let (rows, error) = match runner.execute(*id) {
                Ok(rows) => (rows, None),
                Err(e) => {
                    warn!(target: "dispatch", "{} failed: {}", function.name, e);
                    (Vec::new(), Some(e))
                }
            };
            let schema = infer_schema(&rows, false, false);

            Dispatch::Flat(FlatResult {
                function_name: function.name.clone(),
                rows,
                schema,
                error,
            })
        }
        _ => {
            if let Err(e) = runner.touch_access_time(&function.name) {
                warn!(target: "dispatch", "could not record access to {}: {}", function.name, e);
            }
            Dispatch::Browse(navigation.select_root(&function.name))
        }
    }
}
