//! Submission data tools: paging and flat-file export

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{info, warn};

use crate::error::Result;
use crate::kobo::client::KoboClient;
use crate::kobo::jobs::{self, classify_status, poll_job, JobOutcome};
use crate::kobo::shape;

/// Handler for the submission-facing tools
#[derive(Clone)]
pub struct DataTools {
    pub client: Arc<KoboClient>,
}

impl DataTools {
    /// GET one page of submission records, passed through verbatim
    pub async fn get_submissions(
        &self,
        form_uid: &str,
        limit: u32,
        start: u32,
        query: Option<&str>,
    ) -> Result<Value> {
        let mut params = vec![("limit", limit.to_string()), ("start", start.to_string())];
        if let Some(filter) = query {
            params.push(("query", filter.to_string()));
        }

        let data = self
            .client
            .get_json_long(&format!("/api/v2/assets/{form_uid}/data/"), &params)
            .await?;

        let page = shape::submission_page(&data);
        info!(uid = form_uid, count = page["count"].as_u64().unwrap_or(0), "fetched submissions");
        Ok(page)
    }

    /// Create a server-side export job and poll it for the download URL
    pub async fn export_data(
        &self,
        form_uid: &str,
        export_type: &str,
        include_labels: bool,
    ) -> Result<Value> {
        // Fixed settings: slash group separator, multi-selects in both
        // single- and split-column form, labels from every form version.
        let settings = json!({
            "fields_from_all_versions": true,
            "group_sep": "/",
            "hierarchy_in_labels": include_labels,
            "multiple_select": "both",
            "type": export_type,
        });

        let export = self
            .client
            .post_json(&format!("/api/v2/assets/{form_uid}/exports/"), &settings)
            .await?;
        let export_uid = export
            .get("uid")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        info!(uid = form_uid, export_uid, export_type, "export created, polling status");

        let status_path = format!("/api/v2/assets/{form_uid}/exports/{export_uid}/");
        let outcome = poll_job(
            || {
                let client = Arc::clone(&self.client);
                let path = status_path.clone();
                async move { client.get_json(&path, &[]).await }
            },
            classify_status,
            jobs::EXPORT_POLL_LIMIT,
            jobs::POLL_INTERVAL,
        )
        .await?;

        Ok(match outcome {
            JobOutcome::Complete(payload) => json!({
                "status": "complete",
                "download_url": payload.get("result").cloned().unwrap_or(Value::Null),
                "type": export_type,
            }),
            JobOutcome::Failed(messages) => {
                warn!(uid = form_uid, "export failed");
                json!({"status": "error", "messages": messages})
            }
            JobOutcome::TimedOut => json!({
                "status": "pending",
                "message": "Export is still processing. Try again later.",
            }),
        })
    }
}
