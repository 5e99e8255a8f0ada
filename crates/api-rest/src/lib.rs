//! # API REST
//!
//! REST API and demo form for sticky uploads.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - Multipart decoding into a [`FormSubmission`]
//! - A demo form whose file field survives validation errors
//!
//! Store work is synchronous filesystem I/O and always runs on the blocking pool.

#![warn(rust_2018_idioms)]

use axum::{
    extract::{multipart::MultipartError, Multipart, Query, State},
    http::StatusCode,
    response::{Html, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use sticky_core::html::{escape, hidden_input};
use sticky_core::sticky_files::{EvictionReport, StickyStore, StoreStats};
use sticky_core::{CoreConfig, FormSubmission, StickyFileInput, StickyResult, UploadedFile};
use tower_http::cors::CorsLayer;
use utoipa::{IntoParams, OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

/// Text field on the demo form.
pub const TITLE_FIELD: &str = "title";

/// Sticky file field on the demo form.
pub const ATTACHMENT_FIELD: &str = "attachment";

/// Application state for the REST API server
///
/// Holds the configuration resolved at startup and the one store shared by every request.
#[derive(Clone)]
pub struct AppState {
    cfg: Arc<CoreConfig>,
    store: Arc<StickyStore>,
}

impl AppState {
    pub fn new(cfg: CoreConfig) -> Self {
        let store = StickyStore::new(cfg.store().clone());
        Self {
            cfg: Arc::new(cfg),
            store: Arc::new(store),
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    pub fn store(&self) -> &StickyStore {
        &self.store
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FlushParams {
    /// Remove every staged file regardless of age
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FlushRes {
    pub root_purged: bool,
    pub users_removed: usize,
    pub sessions_removed: usize,
}

impl From<EvictionReport> for FlushRes {
    fn from(report: EvictionReport) -> Self {
        Self {
            root_purged: report.root_purged,
            users_removed: report.users_removed,
            sessions_removed: report.sessions_removed,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatsRes {
    pub files: usize,
    pub users: usize,
    pub sessions: usize,
}

impl From<StoreStats> for StatsRes {
    fn from(stats: StoreStats) -> Self {
        Self {
            files: stats.files,
            users: stats.users,
            sessions: stats.sessions,
        }
    }
}

/// Multipart body accepted by `POST /form`.
#[allow(dead_code)]
#[derive(ToSchema)]
struct FormUpload {
    title: String,
    csrf_token: String,
    #[schema(value_type = Option<String>, format = Binary)]
    attachment: Option<Vec<u8>>,
    attachment_sticky_file: Option<String>,
    attachment_sticky_session_id: Option<String>,
}

#[derive(OpenApi)]
#[openapi(
    paths(health, show_form, submit_form, flush, stats),
    components(schemas(HealthRes, FlushRes, StatsRes, FormUpload))
)]
struct ApiDoc;

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/form", get(show_form).post(submit_form))
        .route("/admin/flush", post(flush))
        .route("/admin/stats", get(stats))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds `addr` and serves the router until the process is stopped.
///
/// # Errors
/// Returns an error if the address cannot be bound or the server fails while running.
pub async fn serve(addr: &str, state: AppState) -> anyhow::Result<()> {
    tracing::info!("-- Starting sticky uploads REST API on {}", addr);
    tracing::info!("-- Staging uploads in {}", state.store.root().display());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "Sticky uploads REST API is alive".into(),
    })
}

#[utoipa::path(
    get,
    path = "/form",
    responses(
        (status = 200, description = "Empty demo form", content_type = "text/html", body = String)
    )
)]
/// Renders the demo form with a fresh anti-forgery token.
#[axum::debug_handler]
async fn show_form(State(state): State<AppState>) -> Html<String> {
    let attachment = StickyFileInput::sticky(state.store.clone(), &state.cfg);
    Html(form_page(
        state.cfg.token_field(),
        &new_token(),
        "",
        &attachment.render(ATTACHMENT_FIELD),
        &[],
    ))
}

#[utoipa::path(
    post,
    path = "/form",
    request_body(content = FormUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Submission accepted", content_type = "text/html", body = String),
        (status = 400, description = "Malformed multipart body"),
        (status = 422, description = "Form re-rendered with errors; any upload is kept", content_type = "text/html", body = String),
        (status = 500, description = "Internal server error")
    )
)]
/// Validates a submission of the demo form.
///
/// A new attachment is staged even when validation fails, and the re-rendered form carries
/// the hidden fields needed to use it on the next attempt.
///
/// # Errors
/// Returns `400 Bad Request` if the multipart body cannot be decoded and
/// `500 Internal Server Error` if the upload cannot be staged.
#[axum::debug_handler]
async fn submit_form(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Html<String>), (StatusCode, &'static str)> {
    let submission = read_submission(multipart).await.map_err(|e| {
        tracing::warn!("Multipart decode error: {}", e);
        (StatusCode::BAD_REQUEST, "Invalid multipart body")
    })?;

    let outcome = tokio::task::spawn_blocking(move || process_submission(&state, &submission))
        .await
        .map_err(|e| {
            tracing::error!("Form worker failed: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        })?;

    match outcome {
        Ok(page) => Ok(page),
        Err(e) => {
            tracing::error!("Sticky upload error: {:?}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Internal error"))
        }
    }
}

#[utoipa::path(
    post,
    path = "/admin/flush",
    params(FlushParams),
    responses(
        (status = 200, description = "Eviction sweep report", body = FlushRes),
        (status = 500, description = "Internal server error")
    )
)]
/// Runs an eviction sweep now.
#[axum::debug_handler]
async fn flush(
    State(state): State<AppState>,
    Query(params): Query<FlushParams>,
) -> Result<Json<FlushRes>, (StatusCode, &'static str)> {
    let force = params.force;
    let store = state.store.clone();
    let report = tokio::task::spawn_blocking(move || store.evict(force))
        .await
        .map_err(|e| {
            tracing::error!("Flush worker failed: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        })?;

    tracing::info!(
        force,
        root_purged = report.root_purged,
        users_removed = report.users_removed,
        sessions_removed = report.sessions_removed,
        "manual flush"
    );

    Ok(Json(report.into()))
}

#[utoipa::path(
    get,
    path = "/admin/stats",
    responses(
        (status = 200, description = "Current store usage", body = StatsRes),
        (status = 500, description = "Internal server error")
    )
)]
/// Counts what is currently staged.
#[axum::debug_handler]
async fn stats(State(state): State<AppState>) -> Result<Json<StatsRes>, (StatusCode, &'static str)> {
    let store = state.store.clone();
    let stats = tokio::task::spawn_blocking(move || store.stats())
        .await
        .map_err(|e| {
            tracing::error!("Stats worker failed: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        })?;

    Ok(Json(stats.into()))
}

/// Collects text fields and files from a multipart body. Parts with a file name are files.
async fn read_submission(mut multipart: Multipart) -> Result<FormSubmission, MultipartError> {
    let mut submission = FormSubmission::new();

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };

        match field.file_name().map(str::to_owned) {
            Some(file_name) => {
                let content_type = field.content_type().map(str::to_owned);
                let bytes = field.bytes().await?;
                submission.insert_file(
                    name,
                    UploadedFile::submitted(file_name, content_type, bytes.to_vec()),
                );
            }
            None => {
                let value = field.text().await?;
                submission.insert_field(name, value);
            }
        }
    }

    Ok(submission)
}

fn process_submission(
    state: &AppState,
    submission: &FormSubmission,
) -> StickyResult<(StatusCode, Html<String>)> {
    let mut attachment = StickyFileInput::sticky(state.store.clone(), &state.cfg);
    attachment.bind(ATTACHMENT_FIELD, submission)?;

    let title = submission.field(TITLE_FIELD).unwrap_or_default().trim();

    if let (false, Some(file)) = (title.is_empty(), attachment.value()) {
        tracing::info!(
            title,
            file = file.name(),
            size = file.size(),
            staged = file.staged_path().is_some(),
            "form accepted"
        );
        return Ok((StatusCode::OK, Html(success_page(title, file))));
    }

    let mut errors = Vec::new();
    if title.is_empty() {
        errors.push("Title is required.");
    }
    if attachment.value().is_none() {
        errors.push("Attachment is required.");
    }

    let token = submission
        .field(state.cfg.token_field())
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(new_token);

    let page = form_page(
        state.cfg.token_field(),
        &token,
        title,
        &attachment.render(ATTACHMENT_FIELD),
        &errors,
    );
    Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(page)))
}

/// Stand-in for the anti-forgery token a real framework would issue.
fn new_token() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn form_page(
    token_field: &str,
    token: &str,
    title: &str,
    attachment: &str,
    errors: &[&str],
) -> String {
    let mut errors_html = String::new();
    if !errors.is_empty() {
        errors_html.push_str(r#"<ul class="errors">"#);
        for error in errors {
            errors_html.push_str(&format!("<li>{}</li>", escape(error)));
        }
        errors_html.push_str("</ul>");
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Sticky uploads</title></head>
<body>
<h1>Upload a file</h1>
{errors}
<form method="post" action="/form" enctype="multipart/form-data">
{token}
<p><label>Title <input type="text" name="{title_field}" value="{title}"></label></p>
<p><label>Attachment {attachment}</label></p>
<p><button type="submit">Submit</button></p>
</form>
</body>
</html>
"#,
        errors = errors_html,
        token = hidden_input(token_field, token),
        title_field = TITLE_FIELD,
        title = escape(title),
        attachment = attachment,
    )
}

fn success_page(title: &str, file: &UploadedFile) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Sticky uploads</title></head>
<body>
<h1>{title}</h1>
<p>Received <strong>{name}</strong> ({size} bytes).</p>
<p><a href="/form">Upload another</a></p>
</body>
</html>
"#,
        title = escape(title),
        name = escape(file.name()),
        size = file.size(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_page_escapes_title_and_lists_errors() {
        let page = form_page(
            "csrf_token",
            "tok",
            r#"<b>"x"</b>"#,
            r#"<input type="file" name="attachment">"#,
            &["Title is required."],
        );

        assert!(page.contains(r#"value="&lt;b&gt;&quot;x&quot;&lt;/b&gt;""#));
        assert!(page.contains("<li>Title is required.</li>"));
        assert!(page.contains(r#"<input type="hidden" name="csrf_token" value="tok">"#));
    }

    #[test]
    fn form_page_without_errors_has_no_list() {
        let page = form_page("csrf_token", "tok", "", "", &[]);
        assert!(!page.contains("errors"));
    }

    #[test]
    fn success_page_names_file_and_size() {
        let file = UploadedFile::submitted("a&b.txt", None, b"12345".to_vec());
        let page = success_page("Report", &file);

        assert!(page.contains("<strong>a&amp;b.txt</strong> (5 bytes)"));
    }

    #[test]
    fn new_tokens_are_path_safe_and_distinct() {
        let a = new_token();
        let b = new_token();
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
