//! Adapter for the KoboToolbox HTTP API
//!
//! Three pieces: the authenticated request executor, the fixed-interval job
//! polling coordinator, and the pure response shapers. Tool operations in
//! [`crate::mcp`] compose these; nothing here knows about MCP.

pub mod client;
pub mod jobs;
pub mod shape;

pub use client::KoboClient;
pub use jobs::{JobOutcome, JobStatus};
