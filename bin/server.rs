// Ledger Insights - Web Server
// JSON API over the report catalog with Axum

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use ledger_insights::{
    get_report_runs, load_dataset, record_report_run, setup_database, AnalyticsError, FlowStep,
    InsightsConfig, ReportKind, ReportRun, ReportSettings, ReportTable, TransactionFlow,
};
use rusqlite::Connection;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

/// Shared application state
#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Connection>>,
    settings: ReportSettings,
}

impl AppState {
    fn conn(&self) -> Result<MutexGuard<'_, Connection>, ApiError> {
        self.db
            .lock()
            .map_err(|_| ApiError::internal("database lock poisoned"))
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Error half of every handler: a status plus a message in the envelope
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::internal(format!("{:#}", err))
    }
}

/// Bad input data, not a server fault
impl From<AnalyticsError> for ApiError {
    fn from(err: AnalyticsError) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        log::warn!("API error {}: {}", self.status, self.message);
        let body = ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(self.message),
        };
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

#[derive(Serialize)]
struct ReportSummary {
    slug: &'static str,
    title: &'static str,
}

#[derive(Serialize)]
struct ReportResponse {
    run: ReportRun,
    table: ReportTable,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/reports - Report catalog
async fn list_reports() -> ApiResult<Vec<ReportSummary>> {
    let reports = ReportKind::ALL
        .into_iter()
        .map(|kind| ReportSummary {
            slug: kind.slug(),
            title: kind.title(),
        })
        .collect();

    Ok(Json(ApiResponse::ok(reports)))
}

/// GET /api/reports/:slug - Run one report against the current database
async fn get_report(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<ReportResponse> {
    let kind = ReportKind::from_slug(&slug)
        .ok_or_else(|| ApiError::not_found(format!("Unknown report: {}", slug)))?;

    let conn = state.conn()?;
    let dataset = load_dataset(&conn)?;
    let table = kind.run(&dataset, &state.settings)?;
    let run = record_report_run(&conn, &table)?;

    Ok(Json(ApiResponse::ok(ReportResponse { run, table })))
}

/// GET /api/flows/:transaction_id - Transactions reachable from a transaction
async fn get_flow(
    State(state): State<AppState>,
    Path(transaction_id): Path<i64>,
) -> ApiResult<Vec<FlowStep>> {
    let conn = state.conn()?;
    let dataset = load_dataset(&conn)?;

    if dataset.transaction(transaction_id).is_none() {
        return Err(ApiError::not_found(format!(
            "Unknown transaction: {}",
            transaction_id
        )));
    }

    let flow = TransactionFlow::new(&dataset.flows);
    Ok(Json(ApiResponse::ok(flow.reachable_from(transaction_id).collect())))
}

/// GET /api/runs - Recent report runs, newest first
async fn get_runs(State(state): State<AppState>) -> ApiResult<Vec<ReportRun>> {
    let conn = state.conn()?;
    Ok(Json(ApiResponse::ok(get_report_runs(&conn, 100)?)))
}

fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/reports", get(list_reports))
        .route("/reports/:slug", get(get_report))
        .route("/flows/:transaction_id", get(get_flow))
        .route("/runs", get(get_runs))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = InsightsConfig::from_env();
    config.init_logging();

    println!("🌐 Ledger Insights - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    if !config.db_path.exists() {
        eprintln!("❌ Database not found at {:?}", config.db_path);
        eprintln!("   Run: ledger-insights import <data_dir>");
        std::process::exit(1);
    }

    let conn = Connection::open(&config.db_path)?;
    setup_database(&conn)?;
    log::info!("Database opened: {:?}", config.db_path);

    let state = AppState {
        db: Arc::new(Mutex::new(conn)),
        settings: config.report,
    };

    let listener = tokio::net::TcpListener::bind(&config.server_addr).await?;

    println!("\n🚀 Server running on http://{}", config.server_addr);
    println!("   API: http://{}/api/reports", config.server_addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, build_router(state)).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::NaiveDate;
    use ledger_insights::{
        import_dataset, Account, AccountType, Customer, Dataset, FlowEdge, Transaction,
        TransactionType,
    };
    use tower::ServiceExt;

    fn create_test_state() -> AppState {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        let date = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
        let dataset = Dataset::new(
            vec![Customer::new(1, "Ana", "Diaz", "ana@example.com", date)],
            vec![Account::new(10, 1, AccountType::Checking, 250.0)],
            vec![
                Transaction::new(1, 10, date, Some(400.0), TransactionType::Deposit, "Salary"),
                Transaction::new(2, 10, date, Some(50.0), TransactionType::Withdrawal, "Food"),
            ],
        )
        .with_flows(vec![FlowEdge::new(1, 2)]);
        import_dataset(&conn, &dataset).unwrap();

        AppState {
            db: Arc::new(Mutex::new(conn)),
            settings: ReportSettings::default(),
        }
    }

    async fn get_json(state: AppState, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = build_router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health_and_catalog() {
        let (status, body) = get_json(create_test_state(), "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], "OK");

        let (_, body) = get_json(create_test_state(), "/api/reports").await;
        assert_eq!(body["data"].as_array().unwrap().len(), 10);
    }

    #[tokio::test]
    async fn test_report_runs_and_is_recorded() {
        let state = create_test_state();

        let (status, body) = get_json(state.clone(), "/api/reports/account-activity").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["table"]["rows"][0][5], "350.00");
        assert_eq!(body["data"]["run"]["slug"], "account-activity");

        let (_, runs) = get_json(state, "/api/runs").await;
        assert_eq!(runs["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_report_is_404() {
        let (status, body) = get_json(create_test_state(), "/api/reports/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_flow_endpoint() {
        let (status, body) = get_json(create_test_state(), "/api/flows/1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][1]["transaction_id"], 2);
        assert_eq!(body["data"][1]["depth"], 1);

        let (status, _) = get_json(create_test_state(), "/api/flows/99").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
