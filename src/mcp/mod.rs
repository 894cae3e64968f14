//! MCP tool surface for KoboToolbox survey management

use serde::{Deserialize, Serialize};

pub mod data_tools;
pub mod form_tools;
pub mod help;
pub mod server;

pub use server::KoboMcpServer;

// MCP request types

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct ListFormsRequest {
    /// Optional search term matched against form names
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct GetFormRequest {
    /// Unique identifier (uid) of the form
    pub form_uid: String,
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct ResolveFormRequest {
    /// Enketo data-collection URL to look up, e.g. https://ee.kobotoolbox.org/x/abcd
    pub enketo_url: String,
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct ExportFormRequest {
    /// Unique identifier (uid) of the form
    pub form_uid: String,
    /// Local path to write the XLSForm to; parent directories are created
    pub output_path: String,
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct GetSubmissionsRequest {
    /// Unique identifier (uid) of the form
    pub form_uid: String,
    /// Maximum number of submissions to return (default 100)
    pub limit: Option<u32>,
    /// Offset for pagination (default 0)
    pub start: Option<u32>,
    /// Optional JSON query string to filter submissions, passed through
    /// verbatim, e.g. '{"field": "value"}'
    pub query: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct DeployFormRequest {
    /// Path to the XLSForm (.xlsx) file to upload
    pub file_path: String,
    /// Optional name for the form (defaults to the file name)
    pub form_name: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct ReplaceFormRequest {
    /// Unique identifier (uid) of the form to replace; the uid is preserved
    pub form_uid: String,
    /// Path to the new XLSForm (.xlsx) file
    pub file_path: String,
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct ExportDataRequest {
    /// Unique identifier (uid) of the form
    pub form_uid: String,
    /// Export format, "csv" or "xls" (default "csv")
    pub export_type: Option<String>,
    /// Include question labels in headers (default true)
    pub include_labels: Option<bool>,
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct InfoRequest {
    /// Help topic: overview, translate, deploy, or data (default overview)
    pub topic: Option<String>,
}
