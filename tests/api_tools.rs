//! End-to-end tool tests against an in-process stand-in for the
//! KoboToolbox v2 API.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use kobo_mcp::kobo::client::KoboClient;
use kobo_mcp::mcp::data_tools::DataTools;
use kobo_mcp::mcp::form_tools::FormTools;
use kobo_mcp::KoboConfig;

const TEST_TOKEN: &str = "test-token";

/// Scriptable fake of the remote API, shared with every handler
#[derive(Default)]
struct MockApi {
    /// Job-status payloads handed out one per poll; empty means complete
    job_statuses: Mutex<VecDeque<Value>>,
    /// Bodies received by the deployment PATCH endpoint
    deployment_patches: Mutex<Vec<Value>>,
    /// Number of deployment activation POSTs received
    deployment_posts: AtomicUsize,
}

fn survey_fixtures() -> Vec<Value> {
    vec![
        json!({
            "uid": "aCensus1",
            "name": "Household Census 2025",
            "asset_type": "survey",
            "deployment_status": "deployed",
            "deployment__submission_count": 42,
            "date_created": "2025-01-10T08:00:00Z",
            "date_modified": "2025-02-01T12:00:00Z",
            "owner__username": "enumerator",
            "deployment__links": {
                "url": "https://ee.kobotoolbox.org/x/abcd",
                "offline_url": "https://ee.kobotoolbox.org/x/abcd/offline",
            },
        }),
        json!({
            "uid": "aCensus2",
            "name": "Census Pilot",
            "asset_type": "survey",
            "deployment_status": "draft",
            "owner__username": "enumerator",
        }),
        json!({
            "uid": "aHealth1",
            "name": "Clinic Intake",
            "asset_type": "survey",
            "deployment_status": "deployed",
            "deployment__submission_count": 7,
            "owner__username": "enumerator",
            "deployment__links": {
                "url": "https://ee.kobotoolbox.org/x/wxyz/",
            },
        }),
    ]
}

fn asset_detail(uid: &str) -> Value {
    json!({
        "uid": uid,
        "name": "Household Census 2025",
        "asset_type": "survey",
        "deployment_status": "deployed",
        "deployment__submission_count": 42,
        "owner__username": "enumerator",
        "version_id": "vLatest9",
        "content": {"survey": [{"type": "text", "name": "q1"}]},
        "deployment__links": {
            "url": "https://ee.kobotoolbox.org/x/abcd",
        },
    })
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        == Some(&format!("Token {TEST_TOKEN}"))
}

async fn list_assets(
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    if !authorized(&headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    assert_eq!(params.get("asset_type").map(String::as_str), Some("survey"));

    let results: Vec<Value> = survey_fixtures()
        .into_iter()
        .filter(|asset| match params.get("q") {
            Some(term) => asset["name"]
                .as_str()
                .is_some_and(|name| name.contains(term.as_str())),
            None => true,
        })
        .collect();

    Ok(Json(json!({"count": results.len(), "results": results})))
}

async fn create_asset() -> Json<Value> {
    Json(json!({"uid": "aNew777", "asset_type": "survey"}))
}

async fn get_asset(Path(uid): Path<String>) -> Json<Value> {
    Json(asset_detail(&uid))
}

async fn get_asset_xls() -> Vec<u8> {
    b"PK\x03\x04 fake xlsx bytes".to_vec()
}

async fn get_data(
    Path(uid): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    assert!(!uid.is_empty());
    assert!(params.contains_key("limit"));
    assert!(params.contains_key("start"));
    Json(json!({
        "count": 2,
        "results": [
            {"_id": 1, "q1": "yes"},
            {"_id": 2, "q1": "no"},
        ],
        "next": null,
    }))
}

async fn post_deployment(State(state): State<Arc<MockApi>>) -> Json<Value> {
    state.deployment_posts.fetch_add(1, Ordering::SeqCst);
    Json(json!({"asset": {}}))
}

async fn patch_deployment(
    State(state): State<Arc<MockApi>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    state.deployment_patches.lock().unwrap().push(body);
    Json(json!({"asset": {}}))
}

async fn create_import() -> Json<Value> {
    Json(json!({"uid": "iJob42", "status": "created"}))
}

async fn job_status(State(state): State<Arc<MockApi>>) -> Json<Value> {
    let next = state.job_statuses.lock().unwrap().pop_front();
    Json(next.unwrap_or_else(|| json!({
        "status": "complete",
        "uid": "iJob42",
        "result": "https://kobo.example.org/exports/eJob7.csv",
    })))
}

async fn create_export() -> Json<Value> {
    Json(json!({"uid": "eJob7", "status": "created"}))
}

async fn spawn_mock(state: Arc<MockApi>) -> String {
    let app = Router::new()
        .route("/api/v2/assets/", get(list_assets).post(create_asset))
        .route("/api/v2/assets/:uid/", get(get_asset))
        .route("/api/v2/assets/aCensus1.xls", get(get_asset_xls))
        .route("/api/v2/assets/:uid/data/", get(get_data))
        .route(
            "/api/v2/assets/:uid/deployment/",
            post(post_deployment).patch(patch_deployment),
        )
        .route("/api/v2/imports/", post(create_import))
        .route("/api/v2/imports/:uid/", get(job_status))
        .route("/api/v2/assets/:uid/exports/", post(create_export))
        .route("/api/v2/assets/:uid/exports/:export_uid/", get(job_status))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn tools(server: String, token: &str) -> (FormTools, DataTools) {
    let config = KoboConfig {
        api_token: token.to_string(),
        server,
    };
    let client = Arc::new(KoboClient::new(&config).unwrap());
    (
        FormTools {
            client: Arc::clone(&client),
        },
        DataTools { client },
    )
}

#[tokio::test]
async fn list_forms_shapes_matching_assets() {
    let server = spawn_mock(Arc::default()).await;
    let (forms, _) = tools(server, TEST_TOKEN);

    let result = forms.list_forms(Some("Census")).await.unwrap();
    let entries = result.as_array().unwrap();

    assert_eq!(entries.len(), 2);
    for entry in entries {
        let keys: Vec<&str> = entry.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys.len(), 8);
        for key in [
            "uid",
            "name",
            "asset_type",
            "deployment_status",
            "submission_count",
            "date_created",
            "date_modified",
            "owner",
        ] {
            assert!(keys.contains(&key), "missing {key}");
        }
    }
    assert_eq!(entries[0]["uid"], "aCensus1");
    assert_eq!(entries[0]["submission_count"], 42);
    // draft pilot has no submission count upstream
    assert_eq!(entries[1]["submission_count"], 0);
}

#[tokio::test]
async fn rejected_credentials_surface_status_and_body() {
    let server = spawn_mock(Arc::default()).await;
    let (forms, _) = tools(server, "wrong-token");

    let err = forms.list_forms(None).await.unwrap_err();
    match err {
        kobo_mcp::KoboError::Http(kobo_mcp::HttpError::Status { status, .. }) => {
            assert_eq!(status, 401);
        }
        other => panic!("expected HTTP status error, got {other:?}"),
    }
}

#[tokio::test]
async fn resolve_form_matches_across_trailing_slash() {
    let server = spawn_mock(Arc::default()).await;
    let (forms, _) = tools(server, TEST_TOKEN);

    // supplied URL has a trailing slash, stored link does not
    let resolved = forms
        .resolve_form("https://ee.kobotoolbox.org/x/abcd/")
        .await
        .unwrap();
    assert_eq!(resolved["uid"], "aCensus1");
    assert_eq!(resolved["enketo_url"], "https://ee.kobotoolbox.org/x/abcd");

    // stored link has a trailing slash, supplied URL does not
    let resolved = forms
        .resolve_form("https://ee.kobotoolbox.org/x/wxyz")
        .await
        .unwrap();
    assert_eq!(resolved["uid"], "aHealth1");

    let missed = forms
        .resolve_form("https://ee.kobotoolbox.org/x/nope")
        .await
        .unwrap();
    assert_eq!(
        missed["error"],
        "No form found with deployment link: https://ee.kobotoolbox.org/x/nope"
    );
}

#[tokio::test]
async fn get_submissions_shapes_the_page() {
    let server = spawn_mock(Arc::default()).await;
    let (_, data) = tools(server, TEST_TOKEN);

    let page = data
        .get_submissions("aCensus1", 100, 0, Some(r#"{"q1": "yes"}"#))
        .await
        .unwrap();

    assert_eq!(page["count"], 2);
    assert_eq!(page["results"].as_array().unwrap().len(), 2);
    // "next" is not part of the shaped page
    assert!(page.get("next").is_none());
}

#[tokio::test]
async fn deploy_form_missing_file_issues_no_request() {
    // unroutable server: any network attempt would fail loudly
    let (forms, _) = tools("http://127.0.0.1:1".to_string(), TEST_TOKEN);

    let result = forms
        .deploy_form("/no/such/dir/survey.xlsx", None)
        .await
        .unwrap();

    assert_eq!(result["error"], "File not found: /no/such/dir/survey.xlsx");
}

#[tokio::test]
async fn deploy_form_uploads_activates_and_shapes() {
    let state = Arc::new(MockApi::default());
    let server = spawn_mock(Arc::clone(&state)).await;
    let (forms, _) = tools(server.clone(), TEST_TOKEN);

    let dir = std::env::temp_dir().join(format!("kobo-mcp-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let file = dir.join("census_v1.xlsx");
    std::fs::write(&file, b"PK\x03\x04").unwrap();

    let result = forms
        .deploy_form(file.to_str().unwrap(), None)
        .await
        .unwrap();

    assert_eq!(result["uid"], "aNew777");
    assert_eq!(result["name"], "census_v1");
    assert_eq!(result["status"], "deployed");
    assert_eq!(result["enketo_url"], "https://ee.kobotoolbox.org/x/abcd");
    assert_eq!(
        result["url"],
        format!("{server}/#/forms/aNew777")
    );
    assert_eq!(state.deployment_posts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn replace_form_polls_import_then_redeploys_same_uid() {
    let state = Arc::new(MockApi::default());
    state
        .job_statuses
        .lock()
        .unwrap()
        .push_back(json!({"status": "processing", "uid": "iJob42"}));
    let server = spawn_mock(Arc::clone(&state)).await;
    let (forms, _) = tools(server, TEST_TOKEN);

    let dir = std::env::temp_dir().join(format!("kobo-mcp-test-{}-r", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let file = dir.join("census_v2.xlsx");
    std::fs::write(&file, b"PK\x03\x04").unwrap();

    let result = forms
        .replace_form("aCensus1", file.to_str().unwrap())
        .await
        .unwrap();

    assert_eq!(result["uid"], "aCensus1");
    assert_eq!(result["status"], "redeployed");
    assert_eq!(result["submission_count"], 42);
    assert_eq!(result["enketo_url"], "https://ee.kobotoolbox.org/x/abcd");

    // the redeploy PATCH targeted the just-fetched version id
    let patches = state.deployment_patches.lock().unwrap();
    assert_eq!(patches.len(), 1);
    assert_eq!(patches[0]["active"], true);
    assert_eq!(patches[0]["version_id"], "vLatest9");
}

#[tokio::test]
async fn replace_form_import_error_preserves_uid() {
    let state = Arc::new(MockApi::default());
    state.job_statuses.lock().unwrap().push_back(json!({
        "status": "error",
        "messages": {"detail": "column 'type' missing from survey sheet"},
    }));
    let server = spawn_mock(Arc::clone(&state)).await;
    let (forms, _) = tools(server, TEST_TOKEN);

    let dir = std::env::temp_dir().join(format!("kobo-mcp-test-{}-e", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let file = dir.join("broken.xlsx");
    std::fs::write(&file, b"PK\x03\x04").unwrap();

    let result = forms
        .replace_form("aCensus1", file.to_str().unwrap())
        .await
        .unwrap();

    assert_eq!(result["uid"], "aCensus1");
    assert_eq!(result["status"], "error");
    assert_eq!(
        result["messages"]["detail"],
        "column 'type' missing from survey sheet"
    );
    // no redeploy was attempted after the failed import
    assert!(state.deployment_patches.lock().unwrap().is_empty());
}

#[tokio::test]
async fn export_data_returns_download_url() {
    let state = Arc::new(MockApi::default());
    state
        .job_statuses
        .lock()
        .unwrap()
        .push_back(json!({"status": "processing", "uid": "eJob7"}));
    let server = spawn_mock(state).await;
    let (_, data) = tools(server, TEST_TOKEN);

    let result = data.export_data("aCensus1", "csv", true).await.unwrap();

    assert_eq!(result["status"], "complete");
    assert_eq!(
        result["download_url"],
        "https://kobo.example.org/exports/eJob7.csv"
    );
    assert_eq!(result["type"], "csv");
}

#[tokio::test]
async fn export_form_writes_the_workbook() {
    let server = spawn_mock(Arc::default()).await;
    let (forms, _) = tools(server, TEST_TOKEN);

    let dir = std::env::temp_dir().join(format!("kobo-mcp-test-{}-x", std::process::id()));
    let target = dir.join("nested/out/census.xls");

    let result = forms
        .export_form("aCensus1", target.to_str().unwrap())
        .await
        .unwrap();

    assert_eq!(result["uid"], "aCensus1");
    assert_eq!(result["name"], "Household Census 2025");
    let written = std::fs::read(&target).unwrap();
    assert_eq!(written, b"PK\x03\x04 fake xlsx bytes");
    assert_eq!(result["bytes"], written.len() as u64);
}
