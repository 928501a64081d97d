//! HTTP surface.
//!
//! Handlers do blocking filesystem work inline; every request touches at most
//! a handful of small files, so there is nothing worth offloading. All
//! failures leave through [`AppError`] as `{"error": ...}` bodies.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use remote_image::ImageCache;

use crate::catalog;
use crate::config::Config;
use crate::error::AppError;
use crate::filter::{self, FilterCriteria};
use crate::model::ChapterRef;
use crate::preview;
use crate::progress::ProgressStore;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

struct Inner {
    templates_dir: PathBuf,
    progress: ProgressStore,
    cache: ImageCache,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let cache = ImageCache::open(&config.remote_cache_dir)?;
        Ok(Self {
            inner: Arc::new(Inner {
                templates_dir: config.templates_dir(),
                progress: ProgressStore::new(config.progress_file()),
                cache,
            }),
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/learningcenter/chapters", get(list_chapters))
        .route("/api/learningcenter/chapters/{id}", get(chapter_detail))
        .route(
            "/api/learningcenter/chapters/{id}/preview",
            get(chapter_preview),
        )
        .route(
            "/api/learningcenter/chapters/{id}/complete",
            post(complete_chapter),
        )
        .route(
            "/api/learningcenter/chapters/{id}/delete",
            post(delete_chapter),
        )
        .route(
            "/api/learningcenter/chapters/{id}/{workflow}",
            get(chapter_detail_modeled),
        )
        .route(
            "/api/learningcenter/chapters/{id}/{workflow}/preview",
            get(chapter_preview_modeled),
        )
        .route(
            "/api/learningcenter/chapters/{id}/{workflow}/complete",
            post(complete_chapter_modeled),
        )
        .route(
            "/api/learningcenter/chapters/{id}/{workflow}/delete",
            post(delete_chapter_modeled),
        )
        .route("/api/learningcenter/reset-progress", post(reset_progress))
        .route("/api/remote_image/clear_cache", post(clear_cache))
        .route("/api/remote_image/cache_status", get(cache_status))
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
struct DetailQuery {
    #[serde(default)]
    preview_answer: bool,
}

async fn list_chapters(
    State(state): State<AppState>,
    Query(criteria): Query<FilterCriteria>,
) -> Json<Value> {
    let progress = state.inner.progress.load();
    let chapters = catalog::list_chapters(&state.inner.templates_dir, &progress);
    let chapters = filter::apply(chapters, &criteria);
    Json(Value::Array(chapters.iter().map(|c| c.to_json()).collect()))
}

async fn chapter_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<DetailQuery>,
) -> Result<Json<Value>, AppError> {
    detail(&state, &id, query.preview_answer)
}

async fn chapter_detail_modeled(
    State(state): State<AppState>,
    Path((id, workflow)): Path<(String, String)>,
    Query(query): Query<DetailQuery>,
) -> Result<Json<Value>, AppError> {
    detail(&state, &format!("{id}/{workflow}"), query.preview_answer)
}

fn detail(state: &AppState, id: &str, preview_answer: bool) -> Result<Json<Value>, AppError> {
    let chapter_ref = ChapterRef::parse(id)?;
    let progress = state.inner.progress.load();
    let detail = catalog::get_chapter(
        &state.inner.templates_dir,
        &chapter_ref,
        &progress,
        preview_answer,
    )?;
    Ok(Json(detail.to_json()))
}

async fn chapter_preview(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    serve_preview(&state, &id)
}

async fn chapter_preview_modeled(
    State(state): State<AppState>,
    Path((id, workflow)): Path<(String, String)>,
) -> Result<Response, AppError> {
    serve_preview(&state, &format!("{id}/{workflow}"))
}

fn serve_preview(state: &AppState, id: &str) -> Result<Response, AppError> {
    let chapter_ref = ChapterRef::parse(id)?;
    let dir = chapter_ref.dir(&state.inner.templates_dir);
    let preview = preview::resolve_preview(&dir, id)?;
    Ok((
        [
            (header::CONTENT_TYPE, preview.content_type.to_string()),
            (
                header::CACHE_CONTROL,
                format!("max-age={}", preview.cache_max_age),
            ),
        ],
        preview.bytes,
    )
        .into_response())
}

async fn complete_chapter(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<Value>>,
) -> Result<Response, AppError> {
    complete(&state, &id, body)
}

async fn complete_chapter_modeled(
    State(state): State<AppState>,
    Path((id, workflow)): Path<(String, String)>,
    body: Option<Json<Value>>,
) -> Result<Response, AppError> {
    complete(&state, &format!("{id}/{workflow}"), body)
}

/// Mark a chapter completed. The submitted workflow is the proof of work; it
/// is required but not inspected beyond being non-empty.
fn complete(state: &AppState, id: &str, body: Option<Json<Value>>) -> Result<Response, AppError> {
    let chapter_ref = ChapterRef::parse(id)?;
    if !chapter_ref.dir(&state.inner.templates_dir).is_dir() {
        return Err(AppError::chapter_not_found());
    }

    let workflow = body
        .as_ref()
        .and_then(|Json(v)| v.get("workflow"))
        .map(|v| match v {
            Value::String(s) => !s.trim().is_empty(),
            Value::Object(map) => !map.is_empty(),
            _ => false,
        })
        .unwrap_or(false);
    if !workflow {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "No workflow submitted"})),
        )
            .into_response());
    }

    state.inner.progress.mark_completed(id)?;
    info!(chapter = %id, "chapter completed");
    Ok(Json(json!({"success": true, "message": "Chapter marked as completed"})).into_response())
}

async fn delete_chapter(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    delete(&state, &id)
}

async fn delete_chapter_modeled(
    State(state): State<AppState>,
    Path((id, workflow)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    delete(&state, &format!("{id}/{workflow}"))
}

fn delete(state: &AppState, id: &str) -> Result<Json<Value>, AppError> {
    let chapter_ref = ChapterRef::parse(id)?;
    let dir = chapter_ref.dir(&state.inner.templates_dir);
    if !dir.is_dir() {
        return Err(AppError::chapter_not_found());
    }

    std::fs::remove_dir_all(&dir).map_err(lc_common::error::CommonError::Io)?;
    state.inner.progress.remove(id)?;
    info!(chapter = %id, "chapter deleted");
    Ok(Json(json!({"success": true, "message": "Chapter deleted"})))
}

async fn reset_progress(
    State(state): State<AppState>,
    body: Option<Json<Value>>,
) -> Result<Response, AppError> {
    let confirmed = body
        .as_ref()
        .and_then(|Json(v)| v.get("confirm"))
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if !confirmed {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "message": "Confirmation required to reset progress",
                "require_confirmation": true,
            })),
        )
            .into_response());
    }

    state.inner.progress.clear_completed()?;
    info!("user progress reset");
    Ok(Json(json!({"success": true, "message": "User progress reset"})).into_response())
}

async fn clear_cache(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let cleared = state.inner.cache.clear()?;
    info!(cleared, "remote image cache cleared");
    Ok(Json(json!({"success": true, "cleared": cleared})))
}

async fn cache_status(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let status = state.inner.cache.status()?;
    Ok(Json(json!({
        "success": true,
        "cache_count": status.cache_count,
        "cache_size": status.cache_size,
        "files": status.files,
    })))
}
