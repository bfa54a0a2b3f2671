pub mod api_client;
pub mod cluster_context;
pub mod config;
pub mod error;
pub mod help_text;
pub mod system;
pub mod table_display;
pub mod ui;
pub mod utils;
