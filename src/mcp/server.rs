//! MCP server wiring: tool registration and the stdio transport

use std::sync::Arc;

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};
use serde_json::json;
use tracing::{error, info};

use super::data_tools::DataTools;
use super::form_tools::FormTools;
use super::help;
use super::{
    DeployFormRequest, ExportDataRequest, ExportFormRequest, GetFormRequest,
    GetSubmissionsRequest, InfoRequest, ListFormsRequest, ReplaceFormRequest,
    ResolveFormRequest,
};
use crate::config::KoboConfig;
use crate::error::{HttpError, KoboError};
use crate::kobo::client::KoboClient;

const INSTRUCTIONS: &str = "\
Tools for managing surveys on a KoboToolbox forms server: list and inspect
forms, deploy or replace XLSForm definitions, fetch submission records, and
export data to CSV/XLS. Forms are identified by an opaque uid; call
list_forms first to discover them, or info for usage notes.";

/// MCP server exposing the KoboToolbox survey tools
#[derive(Clone)]
pub struct KoboMcpServer {
    form_tools: FormTools,
    data_tools: DataTools,
    tool_router: ToolRouter<Self>,
}

impl KoboMcpServer {
    pub fn new(config: &KoboConfig) -> crate::error::Result<Self> {
        let client = Arc::new(KoboClient::new(config)?);

        Ok(Self {
            form_tools: FormTools {
                client: Arc::clone(&client),
            },
            data_tools: DataTools { client },
            tool_router: Self::tool_router(),
        })
    }

    /// Run the MCP server on the stdio transport
    pub async fn run_stdio(self) -> miette::Result<()> {
        info!("Starting KoboToolbox MCP server on stdio transport");

        let service = self
            .serve(rmcp::transport::io::stdio())
            .await
            .map_err(|e| miette::miette!("Failed to start server: {}", e))?;

        let quit_reason = service
            .waiting()
            .await
            .map_err(|e| miette::miette!("Server error: {}", e))?;

        info!("Server stopped: {:?}", quit_reason);
        Ok(())
    }
}

/// Render a tool result as pretty-printed JSON text, translating hard
/// failures into MCP protocol errors
fn render(
    result: crate::error::Result<serde_json::Value>,
    operation: &str,
) -> Result<CallToolResult, McpError> {
    match result {
        Ok(value) => {
            let text = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
            Ok(CallToolResult::success(vec![Content::text(text)]))
        }
        Err(err) => {
            error!("{} failed: {}", operation, err);
            Err(protocol_error(operation, err))
        }
    }
}

fn protocol_error(operation: &str, err: KoboError) -> McpError {
    match &err {
        KoboError::Http(HttpError::Status { status, body, path, .. }) => McpError::internal_error(
            format!("KoboToolbox API error during {operation}"),
            Some(json!({"status": status, "path": path, "body": body})),
        ),
        _ => McpError::internal_error(
            format!("{operation} failed"),
            Some(json!({"details": err.to_string()})),
        ),
    }
}

#[tool_router]
impl KoboMcpServer {
    #[tool(description = "List KoboToolbox survey forms, optionally filtered by a name search term")]
    async fn list_forms(
        &self,
        Parameters(req): Parameters<ListFormsRequest>,
    ) -> Result<CallToolResult, McpError> {
        render(
            self.form_tools.list_forms(req.search.as_deref()).await,
            "list_forms",
        )
    }

    #[tool(
        description = "Get detailed information about a form, including its questionnaire content and deployment links"
    )]
    async fn get_form(
        &self,
        Parameters(req): Parameters<GetFormRequest>,
    ) -> Result<CallToolResult, McpError> {
        render(self.form_tools.get_form(&req.form_uid).await, "get_form")
    }

    #[tool(description = "Find the form behind an Enketo data-collection URL")]
    async fn resolve_form(
        &self,
        Parameters(req): Parameters<ResolveFormRequest>,
    ) -> Result<CallToolResult, McpError> {
        render(
            self.form_tools.resolve_form(&req.enketo_url).await,
            "resolve_form",
        )
    }

    #[tool(description = "Download a form's XLSForm definition to a local file")]
    async fn export_form(
        &self,
        Parameters(req): Parameters<ExportFormRequest>,
    ) -> Result<CallToolResult, McpError> {
        render(
            self.form_tools
                .export_form(&req.form_uid, &req.output_path)
                .await,
            "export_form",
        )
    }

    #[tool(description = "Get submissions (responses) for a form, with pagination and optional filtering")]
    async fn get_submissions(
        &self,
        Parameters(req): Parameters<GetSubmissionsRequest>,
    ) -> Result<CallToolResult, McpError> {
        render(
            self.data_tools
                .get_submissions(
                    &req.form_uid,
                    req.limit.unwrap_or(100),
                    req.start.unwrap_or(0),
                    req.query.as_deref(),
                )
                .await,
            "get_submissions",
        )
    }

    #[tool(description = "Upload and deploy an XLSForm file as a new survey")]
    async fn deploy_form(
        &self,
        Parameters(req): Parameters<DeployFormRequest>,
    ) -> Result<CallToolResult, McpError> {
        render(
            self.form_tools
                .deploy_form(&req.file_path, req.form_name.as_deref())
                .await,
            "deploy_form",
        )
    }

    #[tool(
        description = "Replace an existing form with a new XLSForm version, preserving its uid and submissions"
    )]
    async fn replace_form(
        &self,
        Parameters(req): Parameters<ReplaceFormRequest>,
    ) -> Result<CallToolResult, McpError> {
        render(
            self.form_tools
                .replace_form(&req.form_uid, &req.file_path)
                .await,
            "replace_form",
        )
    }

    #[tool(description = "Create and poll a data export for a form, returning its download URL")]
    async fn export_data(
        &self,
        Parameters(req): Parameters<ExportDataRequest>,
    ) -> Result<CallToolResult, McpError> {
        render(
            self.data_tools
                .export_data(
                    &req.form_uid,
                    req.export_type.as_deref().unwrap_or("csv"),
                    req.include_labels.unwrap_or(true),
                )
                .await,
            "export_data",
        )
    }

    #[tool(description = "Usage notes for this server. Topics: overview, translate, deploy, data")]
    async fn info(
        &self,
        Parameters(req): Parameters<InfoRequest>,
    ) -> Result<CallToolResult, McpError> {
        let text = match help::topic_text(req.topic.as_deref()) {
            Ok(text) => text.to_string(),
            Err(message) => message,
        };
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }
}

#[tool_handler]
impl ServerHandler for KoboMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "kobo-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
