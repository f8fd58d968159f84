//! # API REST
//!
//! REST API for the ward census.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI documentation
//! - REST-specific concerns (JSON serialization, CORS, `?demo=true` namespace selection)
//!
//! All census semantics live in `census-core`; handlers only translate between HTTP and
//! [`CensusService`] calls.

#![warn(rust_2018_idioms)]

use axum::{
    extract::{Path as AxumPath, Query, State},
    http::{header, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use census_core::{
    backup::ImportError,
    config::{flag_from_env_value, resolve_bed_catalog},
    record::parse_date_key,
    service::{CudyrRow, DemoPeriod},
    BedCatalog, CensusAction, CensusConfig, CensusEditor, CensusError, CensusService,
    DailyRecord, InMemoryRemote, JsonFileRepository, Notification, NurseRosterStore, RemoteStore, Statistics,
    StorageNamespace, SyncStatus,
};
use chrono::NaiveDate;
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::{IntoParams, OpenApi, ToSchema};

/// Application state for the REST API server
///
/// Holds one census service per storage namespace and the nurse roster. Handlers pick the
/// production or demo service from the `demo` query flag.
#[derive(Clone)]
pub struct AppState {
    production: Arc<CensusService>,
    demo: Arc<CensusService>,
    roster: Arc<NurseRosterStore>,
}

impl AppState {
    /// Build the state from resolved configuration.
    ///
    /// # Arguments
    /// * `cfg` - Core configuration (data directory, namespace, sync timings)
    /// * `catalog` - Bed catalog shared by both namespaces
    /// * `remote` - Optional remote mirror; only the production service uses it
    pub fn new(
        cfg: &CensusConfig,
        catalog: BedCatalog,
        remote: Option<Arc<dyn RemoteStore>>,
    ) -> Self {
        let editor = CensusEditor::with_system_clock(Arc::new(catalog));
        let service = |ns: StorageNamespace| {
            CensusService::new(
                Arc::new(JsonFileRepository::new(cfg, ns)),
                editor.clone(),
            )
            .with_config(cfg)
        };

        let mut production = service(StorageNamespace::Production);
        if let Some(remote) = remote {
            production = production.with_remote(remote);
        }

        Self {
            production: Arc::new(production),
            demo: Arc::new(service(StorageNamespace::Demo)),
            roster: Arc::new(NurseRosterStore::new(cfg)),
        }
    }

    /// Build the state from environment variables.
    ///
    /// Reads `CENSUS_DATA_DIR`, `CENSUS_NAMESPACE`, `CENSUS_BED_CATALOG` and
    /// `CENSUS_REMOTE_SYNC`. Call `dotenvy::dotenv()` first if a `.env` file should apply.
    ///
    /// # Errors
    /// Returns an error if the namespace is invalid, the data directory cannot be created, or
    /// the bed catalog override cannot be loaded.
    pub fn from_env() -> anyhow::Result<Self> {
        let data_dir = std::env::var("CENSUS_DATA_DIR")
            .unwrap_or_else(|_| census_core::constants::DEFAULT_DATA_DIR.into());
        let data_dir = PathBuf::from(data_dir);
        std::fs::create_dir_all(&data_dir)?;

        let namespace = std::env::var("CENSUS_NAMESPACE")
            .unwrap_or_else(|_| census_core::constants::DEFAULT_NAMESPACE.into());
        let cfg = CensusConfig::new(data_dir, namespace)?;

        let catalog_override = std::env::var("CENSUS_BED_CATALOG").ok().map(PathBuf::from);
        let catalog = resolve_bed_catalog(catalog_override)?;

        let remote: Option<Arc<dyn RemoteStore>> =
            if flag_from_env_value(std::env::var("CENSUS_REMOTE_SYNC").ok()) {
                tracing::info!("remote mirroring enabled (in-process store)");
                Some(Arc::new(InMemoryRemote::new()))
            } else {
                None
            };

        Ok(Self::new(&cfg, catalog, remote))
    }

    pub fn production(&self) -> Arc<CensusService> {
        self.production.clone()
    }

    fn service(&self, demo: bool) -> &CensusService {
        if demo {
            &self.demo
        } else {
            &self.production
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ModeQuery {
    /// Use the isolated demo records instead of production.
    #[serde(default)]
    pub demo: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DatesRes {
    pub dates: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecordRes {
    #[schema(value_type = Object)]
    pub record: DailyRecord,
    #[schema(value_type = Object)]
    pub statistics: Statistics,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InitialiseReq {
    #[serde(default)]
    pub copy_previous: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CommitRes {
    #[schema(value_type = Object)]
    pub record: DailyRecord,
    #[schema(value_type = Object)]
    pub statistics: Statistics,
    #[schema(value_type = String)]
    pub sync: SyncStatus,
    #[schema(value_type = Object)]
    pub notification: Option<Notification>,
}

/// A census action, tagged by its `action` field.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ActionReq(#[schema(value_type = Object)] pub CensusAction);

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CudyrRes {
    #[schema(value_type = Vec<Object>)]
    pub rows: Vec<CudyrRow>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ImportRes {
    pub imported: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ImportErrorRes {
    pub message: String,
    pub errors: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NursesRes {
    pub nurses: Vec<String>,
}

/// Span of demo data, tagged by `period`: `day`, `week` or `month`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DemoReq(#[schema(value_type = Object)] pub DemoPeriod);

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DemoRes {
    pub dates: Vec<String>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        list_records,
        wipe_records,
        get_record,
        initialise_record,
        apply_action,
        cudyr_report,
        export_csv,
        export_json,
        import_json,
        get_nurses,
        put_nurses,
        generate_demo,
        openapi_json,
    ),
    components(schemas(
        HealthRes,
        DatesRes,
        RecordRes,
        InitialiseReq,
        CommitRes,
        ActionReq,
        CudyrRes,
        ImportRes,
        ImportErrorRes,
        NursesRes,
        DemoReq,
        DemoRes,
    ))
)]
pub struct ApiDoc;

/// Build the REST router with CORS and state attached.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/records", get(list_records).delete(wipe_records))
        .route("/records/:date", get(get_record))
        .route("/records/:date/initialise", post(initialise_record))
        .route("/records/:date/actions", post(apply_action))
        .route("/records/:date/cudyr", get(cudyr_report))
        .route("/records/:date/export.csv", get(export_csv))
        .route("/export.json", get(export_json))
        .route("/import", post(import_json))
        .route("/nurses", get(get_nurses).put(put_nurses))
        .route("/demo/generate", post(generate_demo))
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

type ApiError = (StatusCode, &'static str);

fn parse_date(raw: &str) -> Result<NaiveDate, ApiError> {
    parse_date_key(raw).ok_or((StatusCode::BAD_REQUEST, "Invalid date (expected YYYY-MM-DD)"))
}

/// Map a core error onto a status code, logging it with `context`.
fn census_error(context: &str, e: CensusError) -> ApiError {
    match e {
        CensusError::RecordNotFound(_) => (StatusCode::NOT_FOUND, "Record not found"),
        CensusError::NoPreviousRecord(_) => (StatusCode::NOT_FOUND, "No earlier record to copy"),
        CensusError::Rejected(rejection) => {
            tracing::warn!("{} rejected: {}", context, rejection);
            (StatusCode::UNPROCESSABLE_ENTITY, "Change rejected")
        }
        CensusError::InvalidDate(_) | CensusError::InvalidInput(_) => {
            (StatusCode::BAD_REQUEST, "Bad request")
        }
        other => {
            tracing::error!("{} error: {:?}", context, other);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        }
    }
}

fn commit_res(service: &CensusService, commit: census_core::Commit) -> CommitRes {
    CommitRes {
        statistics: service.statistics(&commit.record),
        sync: commit.sync,
        notification: commit.notification,
        record: commit.record,
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// # Returns
/// * `Json<HealthRes>` - Health status response
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "Census REST API is alive".into(),
    })
}

#[utoipa::path(
    get,
    path = "/records",
    params(ModeQuery),
    responses(
        (status = 200, description = "Stored dates, ascending", body = DatesRes),
        (status = 500, description = "Internal server error")
    )
)]
/// List the dates that have a record
///
/// # Errors
/// Returns `500 Internal Server Error` if the store cannot be read.
#[axum::debug_handler]
async fn list_records(
    State(state): State<AppState>,
    Query(mode): Query<ModeQuery>,
) -> Result<Json<DatesRes>, ApiError> {
    let dates = state
        .service(mode.demo)
        .dates()
        .map_err(|e| census_error("List records", e))?;
    Ok(Json(DatesRes {
        dates: dates.iter().map(|d| d.to_string()).collect(),
    }))
}

#[utoipa::path(
    delete,
    path = "/records",
    params(ModeQuery),
    responses(
        (status = 204, description = "All records of the namespace deleted"),
        (status = 500, description = "Internal server error")
    )
)]
/// Delete every record of the selected namespace
#[axum::debug_handler]
async fn wipe_records(
    State(state): State<AppState>,
    Query(mode): Query<ModeQuery>,
) -> Result<StatusCode, ApiError> {
    state
        .service(mode.demo)
        .wipe()
        .map_err(|e| census_error("Wipe records", e))?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/records/{date}",
    params(("date" = String, Path, description = "Day as YYYY-MM-DD"), ModeQuery),
    responses(
        (status = 200, description = "Record with occupancy statistics", body = RecordRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Record not found"),
        (status = 500, description = "Internal server error")
    )
)]
/// Read one day's record and its occupancy statistics
///
/// # Errors
/// Returns `404 Not Found` if the day was never initialised.
#[axum::debug_handler]
async fn get_record(
    State(state): State<AppState>,
    AxumPath(date): AxumPath<String>,
    Query(mode): Query<ModeQuery>,
) -> Result<Json<RecordRes>, ApiError> {
    let date = parse_date(&date)?;
    let service = state.service(mode.demo);
    let record = service
        .require(date)
        .map_err(|e| census_error("Get record", e))?;
    Ok(Json(RecordRes {
        statistics: service.statistics(&record),
        record,
    }))
}

#[utoipa::path(
    post,
    path = "/records/{date}/initialise",
    params(("date" = String, Path, description = "Day as YYYY-MM-DD"), ModeQuery),
    request_body = InitialiseReq,
    responses(
        (status = 200, description = "Day initialised (or already present)", body = CommitRes),
        (status = 404, description = "No earlier record to copy"),
        (status = 500, description = "Internal server error")
    )
)]
/// Initialise a day, blank or copied from the nearest earlier record
///
/// # Arguments
/// * `req` - Whether to carry over the previous day's patients
#[axum::debug_handler]
async fn initialise_record(
    State(state): State<AppState>,
    AxumPath(date): AxumPath<String>,
    Query(mode): Query<ModeQuery>,
    Json(req): Json<InitialiseReq>,
) -> Result<Json<CommitRes>, ApiError> {
    let date = parse_date(&date)?;
    let service = state.service(mode.demo);
    let commit = service
        .initialise_day(date, req.copy_previous)
        .map_err(|e| census_error("Initialise record", e))?;
    Ok(Json(commit_res(service, commit)))
}

#[utoipa::path(
    post,
    path = "/records/{date}/actions",
    params(("date" = String, Path, description = "Day as YYYY-MM-DD"), ModeQuery),
    request_body = ActionReq,
    responses(
        (status = 200, description = "Action applied and committed", body = CommitRes),
        (status = 404, description = "Record not found"),
        (status = 422, description = "Action rejected; record unchanged"),
        (status = 500, description = "Internal server error")
    )
)]
/// Apply one census action to a day's record
///
/// A rejected action leaves the stored record untouched. A failed remote sync still returns
/// `200` with `sync = "error"` and a notification, since the local write succeeded.
#[axum::debug_handler]
async fn apply_action(
    State(state): State<AppState>,
    AxumPath(date): AxumPath<String>,
    Query(mode): Query<ModeQuery>,
    Json(ActionReq(action)): Json<ActionReq>,
) -> Result<Json<CommitRes>, ApiError> {
    let date = parse_date(&date)?;
    let service = state.service(mode.demo);
    let commit = service
        .mutate(date, &action)
        .map_err(|e| census_error("Apply action", e))?;
    Ok(Json(commit_res(service, commit)))
}

#[utoipa::path(
    get,
    path = "/records/{date}/cudyr",
    params(("date" = String, Path, description = "Day as YYYY-MM-DD"), ModeQuery),
    responses(
        (status = 200, description = "CUDYR categorisation per occupant", body = CudyrRes),
        (status = 404, description = "Record not found")
    )
)]
#[axum::debug_handler]
async fn cudyr_report(
    State(state): State<AppState>,
    AxumPath(date): AxumPath<String>,
    Query(mode): Query<ModeQuery>,
) -> Result<Json<CudyrRes>, ApiError> {
    let date = parse_date(&date)?;
    let service = state.service(mode.demo);
    let record = service
        .require(date)
        .map_err(|e| census_error("CUDYR report", e))?;
    Ok(Json(CudyrRes {
        rows: service.cudyr_report(&record),
    }))
}

#[utoipa::path(
    get,
    path = "/records/{date}/export.csv",
    params(("date" = String, Path, description = "Day as YYYY-MM-DD"), ModeQuery),
    responses(
        (status = 200, description = "Census spreadsheet", body = String, content_type = "text/csv"),
        (status = 404, description = "Record not found")
    )
)]
#[axum::debug_handler]
async fn export_csv(
    State(state): State<AppState>,
    AxumPath(date): AxumPath<String>,
    Query(mode): Query<ModeQuery>,
) -> Result<([(header::HeaderName, String); 2], String), ApiError> {
    let date = parse_date(&date)?;
    let csv = state
        .service(mode.demo)
        .export_csv(date)
        .map_err(|e| census_error("Export CSV", e))?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"Censo_HangaRoa_{date}.csv\""),
            ),
        ],
        csv,
    ))
}

#[utoipa::path(
    get,
    path = "/export.json",
    params(ModeQuery),
    responses(
        (status = 200, description = "Every stored record keyed by date", body = String, content_type = "application/json"),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
async fn export_json(
    State(state): State<AppState>,
    Query(mode): Query<ModeQuery>,
) -> Result<([(header::HeaderName, &'static str); 1], String), ApiError> {
    let json = state
        .service(mode.demo)
        .export_json()
        .map_err(|e| census_error("Export JSON", e))?;
    Ok(([(header::CONTENT_TYPE, "application/json")], json))
}

#[utoipa::path(
    post,
    path = "/import",
    params(ModeQuery),
    request_body(content = String, description = "Backup produced by /export.json", content_type = "application/json"),
    responses(
        (status = 200, description = "Backup merged", body = ImportRes),
        (status = 400, description = "Backup rejected; nothing merged", body = ImportErrorRes),
        (status = 500, description = "Internal server error")
    )
)]
/// Validate a JSON backup and merge it into the selected namespace
///
/// Imported dates overwrite stored ones. Validation failures report at most five messages.
#[axum::debug_handler]
async fn import_json(
    State(state): State<AppState>,
    Query(mode): Query<ModeQuery>,
    body: String,
) -> Result<Json<ImportRes>, (StatusCode, Json<ImportErrorRes>)> {
    match state.service(mode.demo).import_json(&body) {
        Ok(imported) => Ok(Json(ImportRes { imported })),
        Err(CensusError::Import(e)) => {
            let message = match &e {
                ImportError::Malformed(_) => "Error al procesar el archivo JSON.",
                ImportError::Invalid { .. } => {
                    "El archivo JSON no cumple con el formato requerido"
                }
            };
            Err((
                StatusCode::BAD_REQUEST,
                Json(ImportErrorRes {
                    message: message.into(),
                    errors: e.shown_errors(),
                }),
            ))
        }
        Err(e) => {
            tracing::error!("Import error: {:?}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ImportErrorRes {
                    message: "Internal error".into(),
                    errors: Vec::new(),
                }),
            ))
        }
    }
}

#[utoipa::path(
    get,
    path = "/nurses",
    responses(
        (status = 200, description = "Nurse roster", body = NursesRes),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
async fn get_nurses(State(state): State<AppState>) -> Result<Json<NursesRes>, ApiError> {
    let nurses = state
        .roster
        .load()
        .map_err(|e| census_error("Load nurses", e))?;
    Ok(Json(NursesRes { nurses }))
}

#[utoipa::path(
    put,
    path = "/nurses",
    request_body = NursesRes,
    responses(
        (status = 200, description = "Nurse roster saved", body = NursesRes),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
async fn put_nurses(
    State(state): State<AppState>,
    Json(req): Json<NursesRes>,
) -> Result<Json<NursesRes>, ApiError> {
    state
        .roster
        .save(&req.nurses)
        .map_err(|e| census_error("Save nurses", e))?;
    Ok(Json(req))
}

#[utoipa::path(
    post,
    path = "/demo/generate",
    request_body = DemoReq,
    responses(
        (status = 200, description = "Demo records generated", body = DemoRes),
        (status = 400, description = "Bad request"),
        (status = 500, description = "Internal server error")
    )
)]
/// Generate demo records for a day, week or month
///
/// Always writes to the demo namespace, whatever the `demo` flag says.
#[axum::debug_handler]
async fn generate_demo(
    State(state): State<AppState>,
    Json(DemoReq(period)): Json<DemoReq>,
) -> Result<Json<DemoRes>, ApiError> {
    let dates = state
        .demo
        .generate_demo(period, StdRng::from_entropy())
        .map_err(|e| census_error("Generate demo", e))?;
    Ok(Json(DemoRes {
        dates: dates.iter().map(|d| d.to_string()).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/api-docs/openapi.json",
    responses(
        (status = 200, description = "OpenAPI document")
    )
)]
#[axum::debug_handler]
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
