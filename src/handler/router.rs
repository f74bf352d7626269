//! Request dispatch
//!
//! Entry point for HTTP request processing. Routes POSTs to the restart
//! endpoint, GET/HEAD to the static file handler, and funnels every
//! response through the no-cache injector before it leaves.

use crate::config::AppState;
use crate::handler::{restart, static_files};
use crate::http::{self, nocache};
use crate::logger::{self, AccessLogEntry};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Method, Request, Response, Version};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

/// Request context for the static file handler
pub struct RequestContext<'a> {
    pub path: &'a str,
    pub is_head: bool,
}

/// Main entry point for HTTP request handling
pub async fn handle_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    remote_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let mut entry = state.config.logging.access_log.then(|| {
        let mut entry = AccessLogEntry::new(
            remote_addr.ip().to_string(),
            method.to_string(),
            path.clone(),
        );
        entry.http_version = version_label(req.version()).to_string();
        entry.referer = header_value(&req, "referer");
        entry.user_agent = header_value(&req, "user-agent");
        entry
    });

    let response = respond(&method, &path, &state).await;

    if let Some(entry) = entry.as_mut() {
        entry.status = response.status().as_u16();
        entry.body_bytes = response
            .headers()
            .get("Content-Length")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        logger::log_access(entry, &state.config.logging.format);
    }

    Ok(response)
}

/// Dispatch a request and finalize its headers.
///
/// Single choke point: every response, whatever handler produced it,
/// passes through the no-cache injector here.
async fn respond(method: &Method, path: &str, state: &Arc<AppState>) -> Response<Full<Bytes>> {
    let mut response = dispatch(method, path, state).await;
    nocache::apply(&mut response);
    response
}

async fn dispatch(method: &Method, path: &str, state: &Arc<AppState>) -> Response<Full<Bytes>> {
    match method {
        &Method::POST => {
            if path == restart::RESTART_PATH {
                restart::handle_restart(&state.root).await
            } else {
                http::build_404_response()
            }
        }
        &Method::GET | &Method::HEAD => {
            let ctx = RequestContext {
                path,
                is_head: *method == Method::HEAD,
            };
            static_files::serve(&ctx, &state.root).await
        }
        _ => {
            logger::log_warning(&format!("Method not allowed: {method}"));
            http::build_405_response()
        }
    }
}

fn header_value(req: &Request<hyper::body::Incoming>, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        _ => "1.1",
    }
}
