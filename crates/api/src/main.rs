use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use availcal_core::calendar::grid::CalendarGrid;
use availcal_core::calendar::render::{render_page, PageContext};
use availcal_core::config::Settings;
use availcal_core::domain::preset::{PresetsDocument, SortingMethod};
use availcal_core::error::LoadError;
use availcal_core::load::{CalendarLoader, LoadCoordinator, LoadProgress, LoadRequest};
use availcal_core::remote::build_http_client;
use availcal_core::remote::presets::load_presets;
use availcal_core::time::month::{month_options, MonthSelection, MONTH_OPTIONS};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let loader = match CalendarLoader::from_settings(&settings, 1) {
        Ok(loader) => Some(Arc::new(loader)),
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "booking clients unavailable; starting API in degraded mode");
            None
        }
    };

    let presets = match startup_presets(&settings).await {
        Ok(doc) => {
            tracing::info!(count = doc.presets.len(), source = %settings.presets_path, "presets loaded");
            doc
        }
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %format!("{e:#}"), "presets unavailable; continuing without presets");
            PresetsDocument::default()
        }
    };

    let state = AppState {
        loader,
        coordinator: LoadCoordinator::new(),
        presets: Arc::new(presets),
    };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/months", get(get_months))
        .route("/presets", get(get_presets))
        .route("/calendar", get(calendar_page))
        .route("/api/calendar", get(calendar_json))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn startup_presets(settings: &Settings) -> anyhow::Result<PresetsDocument> {
    let http = build_http_client(settings)?;
    load_presets(&http, &settings.presets_path).await
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    loader: Option<Arc<CalendarLoader>>,
    coordinator: LoadCoordinator,
    presets: Arc<PresetsDocument>,
}

#[derive(Debug, Serialize)]
struct MonthEntry {
    label: String,
    value: String,
    current: bool,
}

async fn get_months() -> Json<Vec<MonthEntry>> {
    let today = today();
    let current = MonthSelection::containing(today);
    Json(
        month_options(today, MONTH_OPTIONS)
            .into_iter()
            .map(|m| MonthEntry {
                label: m.label(),
                value: format!("{:04}-{:02}", m.year(), m.month()),
                current: m == current,
            })
            .collect(),
    )
}

async fn get_presets(State(state): State<AppState>) -> Json<PresetsDocument> {
    Json(state.presets.as_ref().clone())
}

#[derive(Debug, Default, Deserialize)]
struct CalendarQuery {
    month: Option<String>,
    products: Option<String>,
    preset: Option<String>,
    sorting: Option<String>,
    session: Option<String>,
}

impl CalendarQuery {
    fn month(&self, today: NaiveDate) -> Result<MonthSelection, ApiError> {
        match non_empty(self.month.as_deref()) {
            None => Ok(MonthSelection::containing(today)),
            Some(s) => s
                .parse::<MonthSelection>()
                .map_err(|e| ApiError::bad_request(format!("Invalid month: {e:#}"))),
        }
    }

    /// Reuses the caller's session key, or mints one for a first visit.
    fn session(&self) -> String {
        non_empty(self.session.as_deref())
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
    }

    fn preset_id(&self) -> Option<&str> {
        non_empty(self.preset.as_deref())
    }

    /// A plain page visit shows the controls only.
    fn wants_load(&self) -> bool {
        self.products.is_some() || self.preset_id().is_some()
    }

    fn request(&self, month: MonthSelection, presets: &PresetsDocument) -> Result<LoadRequest, ApiError> {
        let preset = match self.preset_id() {
            None => None,
            Some(id) => Some(
                presets
                    .find(id)
                    .ok_or_else(|| ApiError::not_found(format!("Unknown preset: {id}")))?,
            ),
        };
        let sorting = non_empty(self.sorting.as_deref())
            .map(|s| s.parse::<SortingMethod>().unwrap_or_default());

        Ok(LoadRequest::resolve(
            month,
            self.products.as_deref(),
            preset,
            sorting,
        ))
    }
}

#[derive(Debug, Serialize)]
struct CalendarResponse {
    session: String,
    progress: LoadProgress,
    grid: CalendarGrid,
}

async fn calendar_json(
    State(state): State<AppState>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<CalendarResponse>, ApiError> {
    let today = today();
    let month = query.month(today)?;
    let request = query.request(month, &state.presets)?;
    let session = query.session();

    let (grid, progress) = run_load(&state, &request, &session, today).await?;
    Ok(Json(CalendarResponse {
        session,
        progress,
        grid,
    }))
}

async fn calendar_page(
    State(state): State<AppState>,
    Query(query): Query<CalendarQuery>,
) -> Result<Html<String>, StatusCode> {
    let today = today();
    let months = month_options(today, MONTH_OPTIONS);
    let session = query.session();
    let mut product_ids = query.products.clone().unwrap_or_default();
    let mut message = None;
    let mut grid = None;

    let month = match query.month(today) {
        Ok(m) => m,
        Err(e) => {
            message = Some(e.message);
            MonthSelection::containing(today)
        }
    };

    if message.is_none() && query.wants_load() {
        match query.request(month, &state.presets) {
            Ok(request) => {
                if product_ids.trim().is_empty() {
                    product_ids = request.product_ids.join(", ");
                }
                match run_load(&state, &request, &session, today).await {
                    Ok((g, _)) => grid = Some(g),
                    Err(e) => message = Some(e.message),
                }
            }
            Err(e) => message = Some(e.message),
        }
    }

    let html = render_page(&PageContext {
        month,
        months: &months,
        presets: &state.presets.presets,
        product_ids,
        preset_id: query.preset_id().map(str::to_string),
        session: Some(session),
        message,
        grid: grid.as_ref(),
    })
    .map_err(|e| {
        sentry_anyhow::capture_anyhow(&e);
        tracing::error!(error = %format!("{e:#}"), "calendar page render failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Html(html))
}

async fn run_load(
    state: &AppState,
    request: &LoadRequest,
    session: &str,
    today: NaiveDate,
) -> Result<(CalendarGrid, LoadProgress), ApiError> {
    let Some(loader) = &state.loader else {
        return Err(ApiError::unavailable());
    };

    let ticket = state.coordinator.begin(session);
    tracing::debug!(
        session,
        active_sessions = state.coordinator.active_sessions(),
        "calendar load started"
    );
    let mut progress = LoadProgress {
        processed: 0,
        total: 0,
    };
    let result = loader
        .load(request, today, &ticket, &mut |p| progress = p)
        .await;

    match result {
        Ok(grid) => {
            tracing::info!(
                session,
                month = %request.month,
                rows = grid.rows.len(),
                states = ?grid.state_counts(),
                "calendar load finished"
            );
            Ok((grid, progress))
        }
        Err(LoadError::Superseded) => {
            tracing::info!(session, processed = progress.processed, "calendar load superseded");
            Err(LoadError::Superseded.into())
        }
        Err(e) => {
            tracing::warn!(session, kind = e.kind(), error = %e, "calendar load failed");
            Err(e.into())
        }
    }
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    kind: &'a str,
    message: &'a str,
}

impl ApiError {
    fn bad_request(message: String) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "bad_request",
            message,
        }
    }

    fn not_found(message: String) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            kind: "not_found",
            message,
        }
    }

    fn unavailable() -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            kind: "unavailable",
            message: "Error: booking service is not configured.".to_string(),
        }
    }
}

impl From<LoadError> for ApiError {
    fn from(e: LoadError) -> Self {
        let status = match e {
            LoadError::Auth(_) | LoadError::Fetch(_) => StatusCode::BAD_GATEWAY,
            LoadError::NoData => StatusCode::NOT_FOUND,
            LoadError::PastMonth => StatusCode::UNPROCESSABLE_ENTITY,
            LoadError::Superseded => StatusCode::CONFLICT,
        };
        Self {
            status,
            kind: e.kind(),
            message: e.user_message(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            kind: self.kind,
            message: &self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

fn non_empty(v: Option<&str>) -> Option<&str> {
    v.map(str::trim).filter(|s| !s.is_empty())
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
