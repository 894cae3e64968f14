//! Response shaping for raw KoboToolbox payloads
//!
//! The remote API's JSON schema is an external, unversioned contract. Every
//! tool response passes through an explicit allow-list extractor here so
//! upstream schema churn never leaks to callers. These functions never fail:
//! missing fields default to `null`, `0`, or `[]` as documented per shape.

use serde_json::{json, Map, Value};

fn field(source: &Value, key: &str) -> Value {
    source.get(key).cloned().unwrap_or(Value::Null)
}

fn count_field(source: &Value, key: &str) -> u64 {
    source.get(key).and_then(Value::as_u64).unwrap_or(0)
}

/// Stable summary shape for one survey asset.
///
/// Exactly: uid, name, asset_type, deployment_status, submission_count
/// (default 0), date_created, date_modified, owner.
pub fn form_summary(asset: &Value) -> Value {
    json!({
        "uid": field(asset, "uid"),
        "name": field(asset, "name"),
        "asset_type": field(asset, "asset_type"),
        "deployment_status": field(asset, "deployment_status"),
        "submission_count": count_field(asset, "deployment__submission_count"),
        "date_created": field(asset, "date_created"),
        "date_modified": field(asset, "date_modified"),
        "owner": field(asset, "owner__username"),
    })
}

/// Detail shape: the summary fields plus the raw questionnaire `content`
/// (passed through verbatim) and the deployment link map.
pub fn form_detail(asset: &Value) -> Value {
    let mut detail = form_summary(asset);
    if let Some(map) = detail.as_object_mut() {
        map.insert("content".to_string(), field(asset, "content"));
        map.insert(
            "deployment_links".to_string(),
            field(asset, "deployment__links"),
        );
    }
    detail
}

/// Submission batch shape: `{count, results}` with pass-through records
pub fn submission_page(data: &Value) -> Value {
    json!({
        "count": count_field(data, "count"),
        "results": data.get("results").cloned().unwrap_or_else(|| json!([])),
    })
}

/// Deployment link map (`url`, `offline_url`, ...) for a deployed asset
pub fn deployment_links(asset: &Value) -> Option<&Map<String, Value>> {
    asset.get("deployment__links").and_then(Value::as_object)
}

/// Primary Enketo collection link: `url` if present, else `offline_url`
pub fn enketo_url(asset: &Value) -> Option<String> {
    let links = deployment_links(asset)?;
    ["url", "offline_url"]
        .iter()
        .find_map(|key| links.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

fn trim_trailing_slash(url: &str) -> &str {
    url.strip_suffix('/').unwrap_or(url)
}

/// True when any of the asset's deployment links equals `target`, ignoring
/// a single trailing slash on either side
pub fn has_deployment_link(asset: &Value, target: &str) -> bool {
    let target = trim_trailing_slash(target);
    deployment_links(asset).is_some_and(|links| {
        links
            .values()
            .filter_map(Value::as_str)
            .any(|link| trim_trailing_slash(link) == target)
    })
}

/// Management console URL for an asset
pub fn management_url(server: &str, uid: &str) -> String {
    format!("{server}/#/forms/{uid}")
}
