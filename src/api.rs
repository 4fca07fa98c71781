//! HTTP API for the control and display pages.
//!
//! Every mutating endpoint answers with the resulting scoreboard so the
//! caller can re-render without a second request.

use axum::{
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, FromRequest, Multipart, Path, Request, State},
    http::{header, Response, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::error::{GameError, GameResult};
use crate::source::WordSource;
use crate::state::AppState;
use crate::types::*;

/// Scoreboard plus a few endpoint-specific fields
#[derive(Debug, Clone, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_path: Option<String>,
    #[serde(flatten)]
    pub state: GameState,
}

impl ActionResponse {
    fn ok(state: GameState) -> Self {
        Self {
            success: true,
            word_count: None,
            image_path: None,
            audio_path: None,
            state,
        }
    }
}

/// `Json` body whose rejections answer like every other client error
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = GameError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}

/// Build the full router: API, pages and static files
pub fn router(state: Arc<AppState>) -> Router {
    let config = &state.config;
    let max_upload_bytes = config.max_upload_bytes;

    let mut router = Router::new()
        .route("/", get(serve_control))
        .route("/control", get(serve_control))
        .route("/display", get(serve_display))
        .route("/api/state", get(get_state).post(update_state))
        .route("/api/words", post(load_words))
        .route("/api/word/{index}", post(set_word_image))
        .route("/api/upload/{index}", post(upload_image))
        .route("/api/audio/{index}", post(set_word_audio))
        .route("/api/upload-audio/{index}", post(upload_audio))
        .route("/api/reset", post(reset_game))
        .route("/api/mark-result", post(mark_result))
        .route("/api/steal", post(steal))
        .route("/api/start-round", post(start_round))
        .nest_service("/static", ServeDir::new(&config.static_dir));

    if !config.uploads_under_static() {
        router = router.nest_service("/uploads", ServeDir::new(&config.upload_dir));
    }

    router
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /api/state
pub async fn get_state(State(state): State<Arc<AppState>>) -> Json<GameState> {
    Json(state.get_state().await)
}

/// POST /api/state
///
/// Overwrites only the allow-listed fields present in the body.
pub async fn update_state(
    State(state): State<Arc<AppState>>,
    ApiJson(update): ApiJson<StateUpdate>,
) -> GameResult<Json<GameState>> {
    Ok(Json(state.set_fields(update).await?))
}

/// POST /api/words
///
/// Loads from `csv_url`, `csv_file` or `csv_text` (in that order), or the
/// sample sheet when none is given.
pub async fn load_words(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LoadWordsRequest>,
) -> GameResult<Json<ActionResponse>> {
    let source = WordSource::from_request(req.csv_url, req.csv_file, req.csv_text);
    let game = state.load_words(source).await?;

    Ok(Json(ActionResponse {
        word_count: Some(game.words.len()),
        ..ActionResponse::ok(game)
    }))
}

/// POST /api/word/{index}
pub async fn set_word_image(
    State(state): State<Arc<AppState>>,
    Path(index): Path<WordIndex>,
    ApiJson(req): ApiJson<ImageUrlRequest>,
) -> GameResult<Json<ActionResponse>> {
    let game = state
        .set_media_url(MediaSlot::Image, index, req.image_url)
        .await?;
    Ok(Json(ActionResponse::ok(game)))
}

/// POST /api/audio/{index}
pub async fn set_word_audio(
    State(state): State<Arc<AppState>>,
    Path(index): Path<WordIndex>,
    ApiJson(req): ApiJson<AudioUrlRequest>,
) -> GameResult<Json<ActionResponse>> {
    let game = state
        .set_media_url(MediaSlot::Audio, index, req.audio_url)
        .await?;
    Ok(Json(ActionResponse::ok(game)))
}

/// POST /api/upload/{index} (multipart, field `file`)
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    Path(index): Path<WordIndex>,
    multipart: Multipart,
) -> GameResult<Json<ActionResponse>> {
    let (game, path) = handle_upload(&state, MediaSlot::Image, index, multipart).await?;
    Ok(Json(ActionResponse {
        image_path: Some(path),
        ..ActionResponse::ok(game)
    }))
}

/// POST /api/upload-audio/{index} (multipart, field `file`)
pub async fn upload_audio(
    State(state): State<Arc<AppState>>,
    Path(index): Path<WordIndex>,
    multipart: Multipart,
) -> GameResult<Json<ActionResponse>> {
    let (game, path) = handle_upload(&state, MediaSlot::Audio, index, multipart).await?;
    Ok(Json(ActionResponse {
        audio_path: Some(path),
        ..ActionResponse::ok(game)
    }))
}

async fn handle_upload(
    state: &AppState,
    slot: MediaSlot,
    index: WordIndex,
    multipart: Multipart,
) -> GameResult<(GameState, String)> {
    let upload = read_file_field(multipart).await?;
    let (file_name, bytes) = match &upload {
        Some((name, bytes)) => (Some(name.as_str()), &bytes[..]),
        None => (None, &[][..]),
    };
    state.upload_media(slot, index, file_name, bytes).await
}

/// First multipart field named `file`, as (client file name, contents)
async fn read_file_field(mut multipart: Multipart) -> GameResult<Option<(String, Bytes)>> {
    let invalid = |e: axum::extract::multipart::MultipartError| {
        GameError::InvalidInput(format!("Invalid upload: {}", e))
    };

    while let Some(field) = multipart.next_field().await.map_err(invalid)? {
        if field.name() == Some("file") {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let bytes = field.bytes().await.map_err(invalid)?;
            return Ok(Some((file_name, bytes)));
        }
    }
    Ok(None)
}

/// POST /api/reset
pub async fn reset_game(State(state): State<Arc<AppState>>) -> GameResult<Json<ActionResponse>> {
    Ok(Json(ActionResponse::ok(state.reset().await?)))
}

/// POST /api/mark-result
pub async fn mark_result(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<MarkResultRequest>,
) -> GameResult<Json<GameState>> {
    let outcome = req.result.unwrap_or_default();
    Ok(Json(state.mark_result(outcome).await?))
}

/// POST /api/steal
pub async fn steal(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<StealRequest>,
) -> GameResult<Json<GameState>> {
    Ok(Json(state.steal(req.team, req.success).await?))
}

/// POST /api/start-round
pub async fn start_round(State(state): State<Arc<AppState>>) -> GameResult<Json<GameState>> {
    Ok(Json(state.start_round().await?))
}

pub async fn serve_control(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    serve_page(&state, "control.html").await
}

pub async fn serve_display(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    serve_page(&state, "display.html").await
}

async fn serve_page(state: &AppState, page: &str) -> Response<Body> {
    let path = state.config.static_dir.join(page);
    match tokio::fs::read_to_string(&path).await {
        Ok(content) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            content,
        )
            .into_response(),
        Err(e) => {
            tracing::warn!("Page {} unavailable: {}", path.display(), e);
            (StatusCode::NOT_FOUND, format!("{} not found", page)).into_response()
        }
    }
}
