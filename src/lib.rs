//! KoboToolbox MCP server
//!
//! Exposes survey management on a KoboToolbox forms server as Model Context
//! Protocol tools: listing and inspecting forms, deploying and replacing
//! XLSForm definitions, fetching submissions, and exporting data. Each tool
//! is a thin adapter over the KoboToolbox v2 HTTP API; the one piece of real
//! control flow is the bounded polling loop that waits for asynchronous
//! import/export jobs to settle before dependent steps run.

pub mod config;
pub mod error;
pub mod kobo;
pub mod mcp;

pub use config::KoboConfig;
pub use error::{ConfigError, HttpError, KoboError, Result};
pub use mcp::KoboMcpServer;
