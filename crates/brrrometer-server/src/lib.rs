//! HTTP heatmap server.
//!
//! Serves the GPU activity calendar as an SVG suitable for embedding in a
//! GitHub profile README, plus health and index endpoints. Data-layer
//! failures never surface as error statuses: the heatmap endpoint degrades to
//! an empty canvas instead.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router,
    extract::{Query, State},
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::get,
};
use chrono::{Local, NaiveDate};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, CorsLayer};

use brrrometer_core::render::{DEFAULT_WEEKS, MAX_WEEKS, Theme, fallback_svg, render_from_store};
use brrrometer_core::{ActivityStore, RenderError};

/// Path of the heatmap endpoint.
pub const SVG_PATH: &str = "/gpu-activity.svg";

const SVG_CONTENT_TYPE: &str = "image/svg+xml";

/// Server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Freshness window for successful heatmap responses, in seconds.
    pub cache_max_age: u32,
    /// Origins allowed to fetch the heatmap cross-origin.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cache_max_age: 1800,
            allowed_origins: vec![
                "https://github.com".to_string(),
                "https://raw.githubusercontent.com".to_string(),
            ],
        }
    }
}

/// Shared server state.
struct AppState {
    store: Arc<dyn ActivityStore>,
    cache_max_age: u32,
    today: fn() -> NaiveDate,
}

#[derive(Deserialize)]
struct ActivityParams {
    theme: Option<String>,
    /// History fetch window in weeks; unparseable values fall back to the default.
    weeks: Option<String>,
}

impl ActivityParams {
    fn theme(&self) -> Theme {
        self.theme.as_deref().map_or(Theme::Light, Theme::from_param)
    }

    fn weeks(&self) -> u32 {
        self.weeks
            .as_deref()
            .and_then(|w| w.trim().parse().ok())
            .unwrap_or(DEFAULT_WEEKS)
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

fn svg_response(body: String, cache_control: String) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, SVG_CONTENT_TYPE.to_string()),
            (header::CACHE_CONTROL, cache_control),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff".to_string()),
        ],
        body,
    )
        .into_response()
}

async fn handle_activity_svg(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ActivityParams>,
) -> Response {
    let theme = params.theme();
    let weeks = params.weeks();
    let today = (state.today)();
    let store = Arc::clone(&state.store);
    let started = Instant::now();

    let rendered: Result<String, String> = match tokio::task::spawn_blocking(move || {
        render_from_store(store.as_ref(), today, theme, weeks)
    })
    .await
    {
        Ok(result) => result.map_err(|e: RenderError| e.to_string()),
        Err(e) => Err(format!("render task failed: {e}")),
    };

    match rendered {
        Ok(svg) => {
            debug!(
                "Rendered {theme} heatmap ({weeks} weeks) in {:.1}ms",
                started.elapsed().as_secs_f64() * 1000.0
            );
            svg_response(svg, format!("public, max-age={}", state.cache_max_age))
        }
        Err(e) => {
            error!("Error generating SVG: {e}");
            svg_response(fallback_svg(theme), "no-cache".to_string())
        }
    }
}

async fn handle_health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let store = Arc::clone(&state.store);
    let healthy = tokio::task::spawn_blocking(move || store.ping().is_ok())
        .await
        .unwrap_or(false);
    if healthy {
        (StatusCode::OK, Json(HealthResponse { status: "healthy" }))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse { status: "unhealthy" }),
        )
    }
}

async fn handle_index() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "GPU Activity SVG Generator",
        "version": brrrometer_core::VERSION,
        "endpoints": {
            "/gpu-activity.svg": "Generate GitHub-style contribution graph",
            "/health": "Health check",
            "/": "This help message",
        },
        "usage": {
            "svg": format!("{SVG_PATH}?theme=light&weeks={DEFAULT_WEEKS}"),
            "themes": ["light", "dark"],
            "weeks": format!(
                "Weeks of history to load, 1-{MAX_WEEKS} (default: {DEFAULT_WEEKS}); the calendar always shows the last year"
            ),
        }
    }))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET])
}

fn build_router_with_clock(
    store: Arc<dyn ActivityStore>,
    config: &ServerConfig,
    today: fn() -> NaiveDate,
) -> Router {
    let state = Arc::new(AppState {
        store,
        cache_max_age: config.cache_max_age,
        today,
    });

    Router::new()
        .route("/", get(handle_index))
        .route(SVG_PATH, get(handle_activity_svg))
        .route("/health", get(handle_health))
        .layer(cors_layer(&config.allowed_origins))
        .with_state(state)
}

/// Build the axum router.
pub fn build_router(store: Arc<dyn ActivityStore>, config: &ServerConfig) -> Router {
    build_router_with_clock(store, config, local_today)
}

/// Run the HTTP heatmap server until Ctrl+C.
pub async fn run_server(store: Arc<dyn ActivityStore>, config: ServerConfig) -> std::io::Result<()> {
    let app = build_router(store, &config);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Serving GPU activity heatmap on http://{addr}{SVG_PATH}");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down heatmap server");
        })
        .await
}
