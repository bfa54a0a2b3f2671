//! User interface layer
//!
//! The interactive console and the ratatui table rendering it uses.

pub mod console_app;
pub mod table_renderer;
