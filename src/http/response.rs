//! HTTP response building module
//!
//! Provides builders for the responses the file server sends. Every builder returns
//! the same boxed body type so generated pages and streamed files share one signature.

use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full};
use hyper::body::Bytes;
use hyper::header::{ALLOW, CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use hyper::{Response, StatusCode};

/// Body type for every response; file streams fail with `io::Error`
pub type ResponseBody = UnsyncBoxBody<Bytes, std::io::Error>;

const ALLOWED_METHODS: &str = "GET, HEAD, OPTIONS";

/// Wrap a complete in-memory body
pub fn full(chunk: impl Into<Bytes>) -> ResponseBody {
    Full::new(chunk.into())
        .map_err(|never| match never {})
        .boxed_unsync()
}

/// An empty body
pub fn empty() -> ResponseBody {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed_unsync()
}

/// Build a plain-text error page such as `404 Not Found`
pub fn build_error_response(status: StatusCode) -> Response<ResponseBody> {
    let text = format!(
        "{} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Error")
    );

    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(CONTENT_LENGTH, text.len())
        .body(full(text.clone()))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            Response::new(full(text))
        })
}

/// Build 405 Method Not Allowed response
pub fn build_405_response() -> Response<ResponseBody> {
    let mut response = build_error_response(StatusCode::METHOD_NOT_ALLOWED);
    response
        .headers_mut()
        .insert(ALLOW, hyper::header::HeaderValue::from_static(ALLOWED_METHODS));
    response
}

/// Build OPTIONS response
pub fn build_options_response() -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header(ALLOW, ALLOWED_METHODS)
        .body(empty())
        .unwrap_or_else(|e| {
            log_build_error("OPTIONS", &e);
            Response::new(empty())
        })
}

/// Build redirect response with a specific status code
pub fn build_redirect_response(location: &str, status: StatusCode) -> Response<ResponseBody> {
    Response::builder()
        .status(status)
        .header(LOCATION, location)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(full("Redirecting..."))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            build_error_response(StatusCode::NOT_FOUND)
        })
}

/// Build generic 200 response for generated text such as a listing page
pub fn build_text_response(
    content: String,
    content_type: &'static str,
    is_head: bool,
) -> Response<ResponseBody> {
    let content_length = content.len();
    let body = if is_head { empty() } else { full(content) };

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type)
        .header(CONTENT_LENGTH, content_length)
        .body(body)
        .unwrap_or_else(|e| {
            log_build_error("200", &e);
            build_error_response(StatusCode::INTERNAL_SERVER_ERROR)
        })
}

/// Build 200 response around a streamed file body
pub fn build_file_response(
    body: ResponseBody,
    content_type: &'static str,
    size_bytes: u64,
) -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type)
        .header(CONTENT_LENGTH, size_bytes)
        .body(body)
        .unwrap_or_else(|e| {
            log_build_error("200", &e);
            build_error_response(StatusCode::INTERNAL_SERVER_ERROR)
        })
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
