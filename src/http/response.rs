//! HTTP response builders
//!
//! Builders for the response shapes this server produces. None of these
//! set caching headers; the no-cache injector owns that header set and
//! overwrites whatever is queued here.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};

/// Build 404 Not Found response
pub fn build_404_response() -> Response<Full<Bytes>> {
    const BODY: &str = "404 Not Found";
    Response::builder()
        .status(404)
        .header("Content-Type", "text/plain; charset=utf-8")
        .header("Content-Length", BODY.len())
        .body(Full::new(Bytes::from(BODY)))
        .unwrap_or_else(|e| {
            log_build_error("404", &e);
            Response::new(Full::new(Bytes::from(BODY)))
        })
}

/// Build 405 Method Not Allowed response
pub fn build_405_response() -> Response<Full<Bytes>> {
    const BODY: &str = "405 Method Not Allowed";
    Response::builder()
        .status(405)
        .header("Content-Type", "text/plain; charset=utf-8")
        .header("Content-Length", BODY.len())
        .header("Allow", "GET, HEAD, POST")
        .body(Full::new(Bytes::from(BODY)))
        .unwrap_or_else(|e| {
            log_build_error("405", &e);
            Response::new(Full::new(Bytes::from(BODY)))
        })
}

/// Build 301 redirect, used for directory paths missing their trailing slash
pub fn build_redirect_response(location: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(301)
        .header("Location", location)
        .header("Content-Type", "text/plain; charset=utf-8")
        .header("Content-Length", 0)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error("301", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build 200 response carrying file bytes; HEAD sends headers only
pub fn build_file_response(
    data: Vec<u8>,
    content_type: &str,
    is_head: bool,
) -> Response<Full<Bytes>> {
    let content_length = data.len();
    let body = if is_head {
        Bytes::new()
    } else {
        Bytes::from(data)
    };

    Response::builder()
        .status(200)
        .header("Content-Type", content_type)
        .header("Content-Length", content_length)
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error("200", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build generic HTML response (directory listings)
pub fn build_html_response(content: String, is_head: bool) -> Response<Full<Bytes>> {
    let content_length = content.len();
    let body = if is_head {
        Bytes::new()
    } else {
        Bytes::from(content)
    };

    Response::builder()
        .status(200)
        .header("Content-Type", "text/html; charset=utf-8")
        .header("Content-Length", content_length)
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error("HTML", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build a JSON response with an accurate Content-Length
pub fn build_json_response(status: StatusCode, json: String) -> Response<Full<Bytes>> {
    let content_length = json.len();
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json; charset=utf-8")
        .header("Content-Length", content_length)
        .body(Full::new(Bytes::from(json)))
        .unwrap_or_else(|e| {
            log_build_error("JSON", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_plain_text_with_length() {
        let resp = build_404_response();
        assert_eq!(resp.status(), 404);
        assert_eq!(
            resp.headers().get("Content-Type").unwrap(),
            "text/plain; charset=utf-8"
        );
        assert_eq!(resp.headers().get("Content-Length").unwrap(), "13");
    }

    #[test]
    fn method_not_allowed_lists_supported_methods() {
        let resp = build_405_response();
        assert_eq!(resp.status(), 405);
        assert_eq!(resp.headers().get("Allow").unwrap(), "GET, HEAD, POST");
        assert_eq!(resp.headers().get("Content-Length").unwrap(), "22");
    }

    #[test]
    fn redirect_sets_location() {
        let resp = build_redirect_response("/songs/");
        assert_eq!(resp.status(), 301);
        assert_eq!(resp.headers().get("Location").unwrap(), "/songs/");
    }

    #[test]
    fn head_file_response_has_length_but_no_body() {
        let resp = build_file_response(b"abcdef".to_vec(), "text/plain; charset=utf-8", true);
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers().get("Content-Length").unwrap(), "6");
    }

    #[test]
    fn json_response_has_charset_and_length() {
        let resp = build_json_response(StatusCode::BAD_REQUEST, r#"{"ok":false}"#.to_string());
        assert_eq!(resp.status(), 400);
        assert_eq!(
            resp.headers().get("Content-Type").unwrap(),
            "application/json; charset=utf-8"
        );
        assert_eq!(resp.headers().get("Content-Length").unwrap(), "12");
    }
}
