//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: method validation, path decoding and
//! resolution, then dispatch to the directory lister or the file responder.

use crate::config::AppState;
use crate::error::ServeError;
use crate::handler::listing;
use crate::handler::resolve::ResolvedTarget;
use crate::handler::static_files;
use crate::http::encoding::percent_decode;
use crate::http::{self, response, ResponseBody};
use crate::logger::{self, AccessLogEntry};
use hyper::header::{HeaderMap, HeaderName, ACCEPT, CONTENT_LENGTH, REFERER, USER_AGENT};
use hyper::http::request::Parts;
use hyper::{Method, Request, Response, StatusCode, Version};
use std::convert::Infallible;
use std::io;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Main entry point for HTTP request handling.
///
/// Request bodies are never read; they are dropped before any filesystem work.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<ResponseBody>, Infallible> {
    let started = Instant::now();
    let (parts, _) = req.into_parts();

    let response = route_request(&parts, &state).await;

    if state.config.logging.access_log {
        let entry = access_entry(&parts, &response, peer_addr, started);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Check HTTP method; `Err` carries the response for anything but GET/HEAD
fn check_http_method(method: &Method) -> Result<bool, Response<ResponseBody>> {
    match *method {
        Method::GET => Ok(false),
        Method::HEAD => Ok(true),
        Method::OPTIONS => Err(http::build_options_response()),
        _ => {
            logger::log_warning(&format!("Method not allowed: {method}"));
            Err(http::build_405_response())
        }
    }
}

async fn route_request(parts: &Parts, state: &AppState) -> Response<ResponseBody> {
    let is_head = match check_http_method(&parts.method) {
        Ok(is_head) => is_head,
        Err(resp) => return resp,
    };

    let raw_path = parts.uri.path();
    let Some(path) = percent_decode(raw_path) else {
        logger::log_debug(&format!("Malformed percent-encoding in {raw_path:?}"));
        return http::build_error_response(StatusCode::NOT_FOUND);
    };

    match state.resolver.resolve(&path).await {
        ResolvedTarget::Directory(dir) => {
            // Relative links in the listing need the trailing slash
            if !raw_path.ends_with('/') {
                let location = slash_redirect_location(raw_path, parts.uri.query());
                return http::build_redirect_response(&location, StatusCode::MOVED_PERMANENTLY);
            }
            serve_listing(&dir, &path, prefers_json(&parts.headers), is_head).await
        }
        ResolvedTarget::File(file) => serve_file(&file, is_head).await,
        ResolvedTarget::NotFound => http::build_error_response(StatusCode::NOT_FOUND),
        ResolvedTarget::Forbidden => http::build_error_response(StatusCode::FORBIDDEN),
    }
}

/// `raw_path` with a trailing slash and exactly one leading slash.
///
/// A leading `//` would make the `Location` protocol-relative, pointing at another host.
fn slash_redirect_location(raw_path: &str, query: Option<&str>) -> String {
    let trimmed = raw_path.trim_start_matches(['/', '\\']);
    match query {
        Some(query) => format!("/{trimmed}/?{query}"),
        None => format!("/{trimmed}/"),
    }
}

async fn serve_listing(
    dir: &Path,
    request_path: &str,
    as_json: bool,
    is_head: bool,
) -> Response<ResponseBody> {
    let entries = match listing::list(dir).await {
        Ok(entries) => entries,
        Err(e) => return io_error_response(e, dir),
    };

    if !as_json {
        let html = listing::render_html(request_path, &entries);
        return http::build_text_response(html, "text/html; charset=utf-8", is_head);
    }

    match listing::render_json(request_path, &entries) {
        Ok(json) => http::build_text_response(json, "application/json", is_head),
        Err(e) => {
            logger::log_error(&format!("Failed to serialize listing of '{}': {e}", dir.display()));
            http::build_error_response(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn serve_file(file: &Path, is_head: bool) -> Response<ResponseBody> {
    match static_files::respond(file).await {
        Ok(found) => {
            let body = if is_head { response::empty() } else { found.body };
            http::build_file_response(body, found.content_type, found.size_bytes)
        }
        Err(e) => io_error_response(e, file),
    }
}

/// Map a post-resolution filesystem failure to a status; only unexpected ones are logged
fn io_error_response(err: io::Error, path: &Path) -> Response<ResponseBody> {
    let err = ServeError::from_io(err);
    if let ServeError::Server(ref e) = err {
        logger::log_error(&format!("Failed to read '{}': {e}", path.display()));
    }
    http::build_error_response(err.status())
}

/// Whether the client ranks `application/json` above `text/html`
fn prefers_json(headers: &HeaderMap) -> bool {
    let Some(accept) = headers.get(ACCEPT).and_then(|v| v.to_str().ok()) else {
        return false;
    };

    let mut json = 0.0_f32;
    let mut html = 0.0_f32;
    for range in accept.split(',') {
        let mut params = range.split(';').map(str::trim);
        let media = params.next().unwrap_or_default().to_ascii_lowercase();
        let quality = params
            .find_map(|p| p.strip_prefix("q=").or_else(|| p.strip_prefix("Q=")))
            .and_then(|q| q.parse::<f32>().ok())
            .unwrap_or(1.0);

        match media.as_str() {
            "application/json" => json = json.max(quality),
            "text/html" => html = html.max(quality),
            _ => {}
        }
    }

    json > 0.0 && json > html
}

fn access_entry(
    parts: &Parts,
    response: &Response<ResponseBody>,
    peer_addr: SocketAddr,
    started: Instant,
) -> AccessLogEntry {
    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        parts.method.to_string(),
        parts.uri.path().to_string(),
    );
    entry.query = parts.uri.query().map(ToString::to_string);
    entry.http_version = match parts.version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2.0",
        Version::HTTP_3 => "3.0",
        _ => "1.1",
    }
    .to_string();
    entry.status = response.status().as_u16();
    entry.body_bytes = if parts.method == Method::HEAD {
        0
    } else {
        header_string(response.headers(), &CONTENT_LENGTH)
            .and_then(|len| len.parse().ok())
            .unwrap_or(0)
    };
    entry.referer = header_string(&parts.headers, &REFERER);
    entry.user_agent = header_string(&parts.headers, &USER_AGENT);
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
    entry
}

fn header_string(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}
