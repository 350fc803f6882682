use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sheetsync_core::config::JOURNAL_SHEET_NAME;
use sheetsync_core::visibility::toggle_sheet_visibility;
use sheetsync_core::{
    ChangeRecord, EditEvent, EditJournal, EditTrigger, JournalContext, LibSqlWorkbook,
    PlatformEditEvent, RecordOutcome, SyncGate, Workbook,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    workbook: Arc<LibSqlWorkbook>,
    journal: EditJournal<LibSqlWorkbook>,
    gate: SyncGate<LibSqlWorkbook>,
    trigger: Arc<EditTrigger<LibSqlWorkbook>>,
}

impl AppState {
    pub async fn from_config(config: Arc<AppConfig>) -> sheetsync_core::Result<Self> {
        let workbook = if let Some(path) = config.database_path.as_deref() {
            tracing::info!("Opening journal database at {}", path.display());
            LibSqlWorkbook::open(path).await?
        } else {
            tracing::warn!("SHEETSYNC_DATABASE_PATH not set; journal is kept in memory");
            LibSqlWorkbook::open_in_memory().await?
        };
        let ctx = JournalContext::new(Arc::new(workbook));
        ctx.restore_activity().await?;
        Ok(Self::with_context(config, ctx))
    }

    pub fn with_context(config: Arc<AppConfig>, ctx: JournalContext<LibSqlWorkbook>) -> Self {
        let journal = EditJournal::new(ctx.clone());
        Self {
            config,
            workbook: Arc::clone(&ctx.workbook),
            trigger: Arc::new(EditTrigger::new(journal.clone())),
            gate: SyncGate::new(ctx),
            journal,
        }
    }
}

pub fn app_router(state: AppState) -> Router {
    let journal_routes = Router::new()
        .route("/sheets/{sheet}/edits", post(receive_edit))
        .route("/sheets/{sheet}/visibility", post(set_visibility))
        .route("/journal", get(list_journal))
        .route("/journal/drain", post(drain_journal));

    Router::new()
        .route("/healthz", get(healthz))
        .route("/poll", get(poll))
        .nest("/v1", journal_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
}

async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
    })
}

/// Plain-text readiness literal for the batch job's poller
async fn poll(State(state): State<AppState>) -> &'static str {
    let verdict = state.gate.check_readiness().await;
    tracing::debug!(endpoint = "poll", verdict = verdict.as_str(), "Readiness checked");
    verdict.as_str()
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum EditResponse {
    Recorded(RecordOutcome),
    Lost { outcome: &'static str },
}

async fn receive_edit(
    State(state): State<AppState>,
    Path(sheet): Path<String>,
    Json(event): Json<PlatformEditEvent>,
) -> Result<Json<EditResponse>, AppError> {
    if sheet == JOURNAL_SHEET_NAME {
        return Err(AppError::bad_request(
            "the journal sheet cannot be edited directly",
        ));
    }
    let edit = EditEvent::from_platform(sheet, event)?;

    ensure_sheet(&state.workbook, &edit.sheet_name).await?;
    state
        .workbook
        .set_cell_value(
            &edit.sheet_name,
            edit.row,
            edit.column,
            edit.new_value.as_deref().unwrap_or_default(),
        )
        .await?;

    let response = match state.trigger.handle(&edit).await {
        Some(outcome) => EditResponse::Recorded(outcome),
        None => EditResponse::Lost { outcome: "failed" },
    };
    Ok(Json(response))
}

/// Create the edited sheet on first sight, tolerating a concurrent creator
async fn ensure_sheet(workbook: &LibSqlWorkbook, sheet: &str) -> Result<(), AppError> {
    if workbook.sheet_exists(sheet).await? {
        return Ok(());
    }
    if let Err(error) = workbook.insert_sheet(sheet).await {
        if !workbook.sheet_exists(sheet).await? {
            return Err(error.into());
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct VisibilityRequest {
    hidden: bool,
}

async fn set_visibility(
    State(state): State<AppState>,
    Path(sheet): Path<String>,
    Json(request): Json<VisibilityRequest>,
) -> Result<StatusCode, AppError> {
    toggle_sheet_visibility(state.workbook.as_ref(), &sheet, request.hidden).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
struct RecordsResponse {
    records: Vec<ChangeRecord>,
}

async fn list_journal(State(state): State<AppState>) -> Result<Json<RecordsResponse>, AppError> {
    let records = state.journal.pending().await?;
    Ok(Json(RecordsResponse { records }))
}

async fn drain_journal(State(state): State<AppState>) -> Result<Json<RecordsResponse>, AppError> {
    let records = state.journal.drain().await?;
    tracing::info!(endpoint = "drain", drained = records.len(), "Journal drained");
    Ok(Json(RecordsResponse { records }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use sheetsync_core::clock::ManualClock;
    use sheetsync_core::config::INACTIVITY_DELAY_MS;
    use tower::ServiceExt;

    async fn setup() -> (Router, Arc<ManualClock>) {
        let config = Arc::new(AppConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            database_path: None,
        });
        let workbook = Arc::new(LibSqlWorkbook::open_in_memory().await.unwrap());
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let ctx = JournalContext::with_clock(workbook, clock.clone());
        (app_router(AppState::with_context(config, ctx)), clock)
    }

    async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, String) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn edit_body(column: u32, row: u32, a1: &str, old: Option<&str>, value: &str) -> Value {
        json!({
            "range": { "column": column, "row": row, "a1Notation": a1 },
            "oldValue": old,
            "value": value,
        })
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn poll_reports_missing_journal() {
        let (router, _) = setup().await;
        let (status, body) = send(&router, "GET", "/poll?action=check_inactivity", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "error: hidden sheet not found");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn edits_are_journaled_and_debounced() {
        let (router, clock) = setup().await;

        let (status, body) = send(
            &router,
            "POST",
            "/v1/sheets/Expenses/edits",
            Some(edit_body(9, 3, "I3", None, "7")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(serde_json::from_str::<Value>(&body).unwrap(), json!({ "outcome": "ignored" }));

        let (_, body) = send(
            &router,
            "POST",
            "/v1/sheets/Expenses/edits",
            Some(edit_body(6, 3, "F3", None, "Groceries")),
        )
        .await;
        assert_eq!(
            serde_json::from_str::<Value>(&body).unwrap(),
            json!({ "outcome": "appended", "row": 2 })
        );

        let (_, body) = send(&router, "GET", "/poll", None).await;
        assert_eq!(body, "false: waiting period not passed");

        clock.advance(INACTIVITY_DELAY_MS + 1);
        let (_, body) = send(&router, "GET", "/poll", None).await;
        assert_eq!(body, "true: ready to process");

        let (status, body) = send(&router, "GET", "/v1/journal", None).await;
        assert_eq!(status, StatusCode::OK);
        let records = serde_json::from_str::<Value>(&body).unwrap();
        assert_eq!(records["records"][0]["new_value"], "Groceries");
        assert_eq!(records["records"][0]["record_id"], 7);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn drain_empties_journal() {
        let (router, clock) = setup().await;
        send(
            &router,
            "POST",
            "/v1/sheets/Expenses/edits",
            Some(edit_body(9, 2, "I2", None, "11")),
        )
        .await;
        send(
            &router,
            "POST",
            "/v1/sheets/Expenses/edits",
            Some(edit_body(6, 2, "F2", Some("Food"), "Transport")),
        )
        .await;

        let (status, body) = send(&router, "POST", "/v1/journal/drain", None).await;
        assert_eq!(status, StatusCode::OK);
        let drained = serde_json::from_str::<Value>(&body).unwrap();
        assert_eq!(drained["records"].as_array().map(Vec::len), Some(1));
        assert_eq!(drained["records"][0]["old_value"], "Food");

        clock.advance(INACTIVITY_DELAY_MS * 2);
        let (_, body) = send(&router, "GET", "/poll", None).await;
        assert_eq!(body, "false: no changes detected");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn malformed_edit_is_bad_request() {
        let (router, _) = setup().await;
        let (status, _) = send(
            &router,
            "POST",
            "/v1/sheets/Expenses/edits",
            Some(edit_body(6, 3, "G3", None, "x")),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &router,
            "POST",
            "/v1/sheets/HiddenChanges/edits",
            Some(edit_body(6, 3, "F3", None, "x")),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn visibility_toggle_requires_existing_sheet() {
        let (router, _) = setup().await;
        let (status, _) = send(
            &router,
            "POST",
            "/v1/sheets/HiddenChanges/visibility",
            Some(json!({ "hidden": false })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        send(
            &router,
            "POST",
            "/v1/sheets/Expenses/edits",
            Some(edit_body(6, 4, "F4", None, "x")),
        )
        .await;
        let (status, _) = send(
            &router,
            "POST",
            "/v1/sheets/Expenses/visibility",
            Some(json!({ "hidden": true })),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn healthz_is_ok() {
        let (router, _) = setup().await;
        let (status, body) = send(&router, "GET", "/healthz", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("\"status\":\"ok\""));
    }
}
