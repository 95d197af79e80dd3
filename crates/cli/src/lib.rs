pub mod app;
pub mod channel;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod fake;
pub mod launcher;
pub mod logging;
pub mod mcp;
pub mod output;
pub mod session;
