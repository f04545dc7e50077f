//! `GET /subtitle/{id}/{index}`: proxy an embedded subtitle track, per
//! §4.2 — try the catalog's candidate upstream URLs in order until one
//! returns something other than an HTML error page, else fall back to a
//! one-cue "no subtitles available" SRT.

use axum::body::Bytes;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

const FALLBACK_SRT: &str = "1\n00:00:00,000 --> 00:00:05,000\nNo subtitles available\n";

pub async fn fetch_subtitle(http: &reqwest::Client, candidate_urls: &[String]) -> Response {
    for url in candidate_urls {
        let Ok(upstream) = http.get(url).send().await else {
            continue;
        };
        if !upstream.status().is_success() {
            continue;
        }
        let content_type = upstream
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if content_type.contains("text/html") {
            continue;
        }
        let Ok(body) = upstream.bytes().await else {
            continue;
        };
        return Response::builder()
            .status(StatusCode::OK)
            .header(
                "content-type",
                HeaderValue::from_str(&content_type).unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
            )
            .body(axum::body::Body::from(body))
            .unwrap_or_else(|_| fallback_response());
    }
    fallback_response()
}

fn fallback_response() -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header("content-type", HeaderValue::from_static("application/x-subrip"))
        .body(axum::body::Body::from(Bytes::from_static(FALLBACK_SRT.as_bytes())))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
