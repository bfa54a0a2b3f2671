//! System introspection: function catalog, level navigation and the
//! schema inferred for each level at runtime.

pub mod catalog;
pub mod catalog_store;
pub mod dispatch;
pub mod fetcher;
pub mod navigation;
pub mod render_spec;
pub mod row;
pub mod schema;

pub use catalog::{FunctionCatalog, FunctionDescriptor, FunctionKey};
pub use fetcher::{DataFetcher, FetchInbox, HttpFetcher};
pub use navigation::{
    FetchOutcome, FetchRequest, LevelView, NavigationController, NavigationFrame,
    NavigationState, Resolution,
};
pub use row::Row;
pub use schema::Schema;
