//! Form lifecycle tools: listing, inspection, download, deploy, replace

use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::error::{KoboError, Result};
use crate::kobo::client::KoboClient;
use crate::kobo::jobs::{self, classify_status, poll_job, JobOutcome};
use crate::kobo::shape;

/// Handler for the form-facing tools, sharing one executor with
/// [`super::data_tools::DataTools`]
#[derive(Clone)]
pub struct FormTools {
    pub client: Arc<KoboClient>,
}

fn asset_path(form_uid: &str) -> String {
    format!("/api/v2/assets/{form_uid}/")
}

fn deployment_path(form_uid: &str) -> String {
    format!("/api/v2/assets/{form_uid}/deployment/")
}

/// Soft payload for a missing local file; returned as a successful tool
/// result so the calling agent branches on content instead of exceptions
fn file_not_found(file_path: &str) -> Value {
    json!({"error": format!("File not found: {file_path}")})
}

impl FormTools {
    /// GET the survey asset list, with an optional name search
    pub async fn list_forms(&self, search: Option<&str>) -> Result<Value> {
        let mut params = vec![("asset_type", "survey".to_string())];
        if let Some(term) = search {
            params.push(("q", term.to_string()));
        }

        let data = self.client.get_json("/api/v2/assets/", &params).await?;
        let forms: Vec<Value> = data
            .get("results")
            .and_then(Value::as_array)
            .map(|assets| assets.iter().map(shape::form_summary).collect())
            .unwrap_or_default();

        info!(count = forms.len(), "listed forms");
        Ok(Value::Array(forms))
    }

    /// GET one asset, shaped as a form detail
    pub async fn get_form(&self, form_uid: &str) -> Result<Value> {
        let asset = self.client.get_json(&asset_path(form_uid), &[]).await?;
        Ok(shape::form_detail(&asset))
    }

    /// Find the survey whose deployment links contain `enketo_url`.
    ///
    /// Linear scan over every survey's link values with trailing-slash
    /// normalization. Form counts are small and this runs once per call, so
    /// no index is built.
    pub async fn resolve_form(&self, enketo_url: &str) -> Result<Value> {
        let data = self
            .client
            .get_json("/api/v2/assets/", &[("asset_type", "survey".to_string())])
            .await?;

        let matched = data
            .get("results")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .find(|asset| shape::has_deployment_link(asset, enketo_url));

        match matched {
            Some(asset) => {
                let mut summary = shape::form_summary(asset);
                if let Some(map) = summary.as_object_mut() {
                    map.insert(
                        "enketo_url".to_string(),
                        shape::enketo_url(asset).map(Value::from).unwrap_or(Value::Null),
                    );
                }
                Ok(summary)
            }
            None => {
                debug!(enketo_url, "no deployment link matched");
                Ok(json!({
                    "error": format!("No form found with deployment link: {enketo_url}"),
                }))
            }
        }
    }

    /// Download a form's XLSForm definition to a local file
    pub async fn export_form(&self, form_uid: &str, output_path: &str) -> Result<Value> {
        let asset = self.client.get_json(&asset_path(form_uid), &[]).await?;
        let name = asset
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(form_uid)
            .to_string();

        let bytes = self
            .client
            .get_bytes(&format!("/api/v2/assets/{form_uid}.xls"))
            .await?;

        let path = Path::new(output_path);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|source| KoboError::Io {
                        action: "create directory",
                        path: parent.display().to_string(),
                        source,
                    })?;
            }
        }
        tokio::fs::write(path, &bytes)
            .await
            .map_err(|source| KoboError::Io {
                action: "write",
                path: output_path.to_string(),
                source,
            })?;

        info!(uid = form_uid, bytes = bytes.len(), path = output_path, "exported form");
        Ok(json!({
            "uid": form_uid,
            "name": name,
            "path": output_path,
            "bytes": bytes.len(),
        }))
    }

    /// Upload an XLSForm as a new survey asset and activate its deployment
    pub async fn deploy_form(&self, file_path: &str, form_name: Option<&str>) -> Result<Value> {
        let path = Path::new(file_path);
        if !path.exists() {
            warn!(file_path, "deploy requested for missing file");
            return Ok(file_not_found(file_path));
        }

        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("form.xlsx")
            .to_string();
        let name = match form_name {
            Some(name) => name.to_string(),
            None => path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or("form")
                .to_string(),
        };

        let bytes = tokio::fs::read(path).await.map_err(|source| KoboError::Io {
            action: "read",
            path: file_path.to_string(),
            source,
        })?;

        let asset = self
            .client
            .post_multipart("/api/v2/assets/", &file_name, bytes, &[("name", name.clone())])
            .await?;
        let uid = asset
            .get("uid")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        info!(uid, name, "asset created, activating deployment");

        self.client
            .post_json(&deployment_path(&uid), &json!({"active": true}))
            .await?;

        let refreshed = self.client.get_json(&asset_path(&uid), &[]).await?;
        Ok(json!({
            "uid": uid,
            "name": name,
            "status": "deployed",
            "enketo_url": shape::enketo_url(&refreshed),
            "url": shape::management_url(self.client.base_url(), &uid),
        }))
    }

    /// Upload a new XLSForm version onto an existing asset and redeploy it.
    ///
    /// The upload creates a server-side import job; the new content is only
    /// safe to redeploy once that job reports complete, so the job status is
    /// polled before the deployment PATCH.
    pub async fn replace_form(&self, form_uid: &str, file_path: &str) -> Result<Value> {
        let path = Path::new(file_path);
        if !path.exists() {
            warn!(file_path, "replace requested for missing file");
            return Ok(file_not_found(file_path));
        }

        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("form.xlsx")
            .to_string();
        let bytes = tokio::fs::read(path).await.map_err(|source| KoboError::Io {
            action: "read",
            path: file_path.to_string(),
            source,
        })?;

        let destination = format!("{}{}", self.client.base_url(), asset_path(form_uid));
        let import = self
            .client
            .post_multipart(
                "/api/v2/imports/",
                &file_name,
                bytes,
                &[("destination", destination)],
            )
            .await?;
        let import_uid = import
            .get("uid")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        info!(uid = form_uid, import_uid, "import created, polling status");

        let import_path = format!("/api/v2/imports/{import_uid}/");
        let outcome = poll_job(
            || {
                let client = Arc::clone(&self.client);
                let path = import_path.clone();
                async move { client.get_json(&path, &[]).await }
            },
            classify_status,
            jobs::IMPORT_POLL_LIMIT,
            jobs::POLL_INTERVAL,
        )
        .await?;

        match outcome {
            JobOutcome::Failed(messages) => {
                warn!(uid = form_uid, "import failed");
                return Ok(json!({
                    "uid": form_uid,
                    "status": "error",
                    "messages": messages,
                }));
            }
            JobOutcome::TimedOut => {
                // Retry-later signal, not a failure: the job may still land.
                return Ok(json!({
                    "uid": form_uid,
                    "status": "timeout",
                    "message": "Import is still processing. Check again shortly.",
                }));
            }
            JobOutcome::Complete(_) => {}
        }

        // Redeploy onto the same uid. The version id is re-fetched here
        // rather than taken from the import payload: the PATCH must target
        // whatever the asset's latest version is at redeploy time.
        let asset = self.client.get_json(&asset_path(form_uid), &[]).await?;
        let version_id = asset.get("version_id").cloned().unwrap_or(Value::Null);
        self.client
            .patch_json(
                &deployment_path(form_uid),
                &json!({"active": true, "version_id": version_id}),
            )
            .await?;

        let refreshed = self.client.get_json(&asset_path(form_uid), &[]).await?;
        info!(uid = form_uid, "form redeployed");
        Ok(json!({
            "uid": form_uid,
            "name": refreshed.get("name").cloned().unwrap_or(Value::Null),
            "status": "redeployed",
            "submission_count": refreshed
                .get("deployment__submission_count")
                .and_then(Value::as_u64)
                .unwrap_or(0),
            "enketo_url": shape::enketo_url(&refreshed),
            "url": shape::management_url(self.client.base_url(), form_uid),
        }))
    }
}
