//! HTTP surface of the converter.
//!
//! - `GET /` - Home page (with `?url=`, redirects to `/convert`)
//! - `GET /convert?url=` / `POST /convert` (form or JSON body) - Convert and redirect to `/view/:id`
//! - `GET /view/:id` - Cached codelab HTML
//! - `GET /views` - Most recent conversions
//! - `GET /healthz` - Liveness

use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::app::converter::Converter;
use crate::error::ConvertError;

#[derive(Clone)]
pub struct AppState {
    pub converter: Arc<Converter>,
    pub recent_limit: usize,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/convert", get(convert_query).post(convert_body))
        .route("/view/:converted_id", get(view))
        .route("/views", get(records))
        .route("/healthz", get(|| async { "ok\n" }))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
struct UrlParams {
    url: Option<String>,
}

async fn home(State(state): State<AppState>, Query(q): Query<UrlParams>) -> Response {
    if let Some(url) = q.url.as_deref().filter(|u| !u.trim().is_empty()) {
        let encoded: String = url::form_urlencoded::byte_serialize(url.as_bytes()).collect();
        return Redirect::to(&format!("/convert?url={encoded}")).into_response();
    }
    Html(crate::render::render_home(
        &state.converter.config().required_prefix,
    ))
    .into_response()
}

async fn convert_query(
    State(state): State<AppState>,
    Query(q): Query<UrlParams>,
) -> Result<Redirect, ConvertError> {
    convert(&state, q.url.as_deref()).await
}

async fn convert_body(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Redirect, ConvertError> {
    let params = url_params_from_body(&headers, &body);
    convert(&state, params.url.as_deref()).await
}

/// Reads `url` from a JSON or urlencoded body. A missing or malformed body
/// yields no url, which the converter reports as missing input.
fn url_params_from_body(headers: &HeaderMap, body: &[u8]) -> UrlParams {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.trim_start().starts_with("application/json"));

    if is_json {
        return serde_json::from_slice(body).unwrap_or_else(|err| {
            tracing::debug!(%err, "ignoring malformed json body");
            UrlParams::default()
        });
    }

    UrlParams {
        url: url::form_urlencoded::parse(body)
            .find(|(key, _)| key == "url")
            .map(|(_, value)| value.into_owned()),
    }
}

async fn convert(state: &AppState, url: Option<&str>) -> Result<Redirect, ConvertError> {
    let target = state.converter.convert(url).await?;
    Ok(Redirect::to(&target.location()))
}

async fn view(
    State(state): State<AppState>,
    Path(converted_id): Path<String>,
) -> Result<Response, ConvertError> {
    match state.converter.view(&converted_id).await? {
        Some(html) => Ok(Html(html).into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Html(crate::render::render_not_found(&converted_id)),
        )
            .into_response()),
    }
}

async fn records(State(state): State<AppState>) -> Result<Html<String>, ConvertError> {
    let records = state
        .converter
        .store()
        .list_recent(state.recent_limit)
        .await?;
    Ok(Html(crate::render::render_records(&records)))
}
