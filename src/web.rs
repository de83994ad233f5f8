use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};

use crate::{
    config::Config,
    error::AppError,
    fetch::{HttpFetcher, PageFetcher},
    preview::{LinkPreview, PreviewStore},
    render::{self, ExportOptions},
    service::PreviewService,
    store::MemoryStore,
    styles::{PreviewStyle, StyleCreate, StyleStore},
};

const FETCH_FAILED_MESSAGE: &str =
    "Unable to generate preview for this URL. The site may be blocking requests or is temporarily unavailable.";

pub struct SharedState {
    pub service: PreviewService,
    pub store: Arc<MemoryStore>,
    pub fetcher: Arc<dyn PageFetcher>,
}

impl SharedState {
    pub fn new(store: Arc<MemoryStore>, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            service: PreviewService::new(store.clone(), fetcher.clone()),
            store,
            fetcher,
        }
    }
}

pub fn router(state: Arc<SharedState>) -> Router {
    Router::new()
        .route("/api/preview", post(preview))
        .route("/api/styles", get(list_styles))
        .route("/api/styles", post(create_style))
        .route("/api/export", post(export))
        .layer(
            // the reference frontend is a browser app on another origin
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(state)
}

async fn start_app(config: Config) {
    let store = Arc::new(MemoryStore::new());
    let fetcher = Arc::new(HttpFetcher::new(config.fetch.clone()));
    let state = Arc::new(SharedState::new(store, fetcher));

    async fn shutdown_signal() {
        let ctrl_c = async {
            signal::ctrl_c()
                .await
                .expect("failed to install Ctrl+C handler");
        };

        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("failed to install signal handler")
                .recv()
                .await;
        };

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }
    }

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .unwrap();
    log::info!("listening on {}", config.bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();
}

pub fn start_daemon(config: Config) {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(async { start_app(config).await });
}

// Wraps `AppError` so axum knows how to turn it into a response.
#[derive(Debug)]
struct HttpError(AppError);

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        match self.0 {
            AppError::Validation(message) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": message })),
            ),
            AppError::Fetch(detail) => {
                // detail stays in the log; clients get the generic message
                log::error!("fetch failed: {detail}");
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "message": FETCH_FAILED_MESSAGE })),
                )
            }
            AppError::NotFound => (
                StatusCode::NOT_FOUND,
                Json(json!({ "message": "Preview not found" })),
            ),
            AppError::Other(err) => {
                log::error!("{err:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": "Internal server error" })),
                )
            }
        }
        .into_response()
    }
}

// This enables using `?` on functions that return `Result<_, AppError>` to
// turn them into `Result<_, HttpError>` without manual mapping.
impl<E> From<E> for HttpError
where
    E: Into<AppError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRequest {
    pub url: String,

    /// Bypass the cache and re-fetch even when a record exists.
    #[serde(default)]
    pub force_refresh: bool,
}

async fn preview(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<PreviewRequest>,
) -> Result<Json<LinkPreview>, HttpError> {
    log::debug!("payload: {payload:?}");

    tokio::task::block_in_place(move || {
        state
            .service
            .get_or_fetch(&payload.url, payload.force_refresh)
            .map(Json)
            .map_err(Into::into)
    })
}

async fn list_styles(
    State(state): State<Arc<SharedState>>,
) -> Result<Json<Vec<PreviewStyle>>, HttpError> {
    Ok(Json(state.store.styles()))
}

async fn create_style(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<StyleCreate>,
) -> Result<Json<PreviewStyle>, HttpError> {
    log::debug!("payload: {payload:?}");

    payload.validate()?;
    Ok(Json(state.store.create_style(payload)))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    pub preview_id: u64,

    /// Style to render with; defaults to the first catalog entry.
    pub style_id: Option<u64>,

    #[serde(flatten)]
    pub options: ExportOptions,
}

async fn export(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<ExportRequest>,
) -> Result<Response, HttpError> {
    log::debug!("payload: {payload:?}");

    payload.options.validate()?;

    tokio::task::block_in_place(move || {
        let preview = state
            .store
            .get_by_id(payload.preview_id)
            .ok_or(AppError::NotFound)?;

        let style = match payload.style_id {
            Some(id) => state.store.style(id).ok_or(AppError::NotFound)?,
            None => state.store.styles().into_iter().next().ok_or(AppError::NotFound)?,
        };

        let image_bytes = if style.show_image && !preview.image.is_empty() {
            state.fetcher.fetch_bytes(&preview.image)
        } else {
            None
        };
        let favicon_bytes = if style.show_favicon && !preview.favicon.is_empty() {
            state.fetcher.fetch_bytes(&preview.favicon)
        } else {
            None
        };

        let card = render::render_card(
            &style,
            payload.options,
            image_bytes.as_deref(),
            favicon_bytes.as_deref(),
        );
        let bytes = render::encode(&card, payload.options)?;

        let format = payload.options.format;
        let headers = [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"preview.{}\"", format.extension()),
            ),
        ];

        Ok((headers, bytes).into_response())
    })
}
