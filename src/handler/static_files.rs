//! Static file serving
//!
//! Maps request paths onto the serving root (the process working
//! directory), with index file support and a generated HTML listing for
//! directories, the way a stock development file server behaves.

use crate::handler::router::RequestContext;
use crate::http::{self, mime};
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use std::path::{Path, PathBuf};
use tokio::fs;

const INDEX_FILES: [&str; 2] = ["index.html", "index.htm"];

/// Serve a GET/HEAD request from the serving root
pub async fn serve(ctx: &RequestContext<'_>, root: &Path) -> Response<Full<Bytes>> {
    let Some(decoded) = percent_decode(ctx.path) else {
        return http::build_404_response();
    };
    if decoded.contains('\0') {
        return http::build_404_response();
    }

    let Some(file_path) = resolve_under_root(root, &decoded, ctx.path) else {
        return http::build_404_response();
    };

    if file_path.is_dir() {
        // Directory URLs are canonical only with a trailing slash
        if !ctx.path.ends_with('/') {
            return http::build_redirect_response(&format!("{}/", ctx.path));
        }
        for index in INDEX_FILES {
            let candidate = file_path.join(index);
            if candidate.is_file() {
                return serve_file(ctx, &candidate).await;
            }
        }
        return serve_listing(ctx, &file_path, &decoded).await;
    }

    // Path resolution normalizes a trailing slash away; a file is only
    // addressable without one
    if ctx.path.ends_with('/') {
        return http::build_404_response();
    }

    serve_file(ctx, &file_path).await
}

/// Resolve a decoded request path to a file under `root`, rejecting
/// anything that escapes the root after symlink/.. resolution.
fn resolve_under_root(root: &Path, decoded_path: &str, raw_path: &str) -> Option<PathBuf> {
    let relative = decoded_path.trim_start_matches('/');
    let candidate = root.join(relative);

    let root_canonical = match root.canonicalize() {
        Ok(p) => p,
        Err(e) => {
            logger::log_error(&format!("Serving root is inaccessible: {e}"));
            return None;
        }
    };

    // Missing files are a plain 404, not worth a log line
    let candidate_canonical = candidate.canonicalize().ok()?;
    if !candidate_canonical.starts_with(&root_canonical) {
        logger::log_warning(&format!(
            "Path traversal attempt blocked: {} -> {}",
            raw_path,
            candidate_canonical.display()
        ));
        return None;
    }

    Some(candidate_canonical)
}

async fn serve_file(ctx: &RequestContext<'_>, file_path: &Path) -> Response<Full<Bytes>> {
    let content = match fs::read(file_path).await {
        Ok(c) => c,
        Err(e) => {
            logger::log_error(&format!(
                "Failed to read file '{}': {}",
                file_path.display(),
                e
            ));
            return http::build_404_response();
        }
    };
    let content_type = mime::content_type_for(file_path.extension().and_then(|e| e.to_str()));
    http::build_file_response(content, content_type, ctx.is_head)
}

/// Render a sorted HTML listing of a directory
async fn serve_listing(
    ctx: &RequestContext<'_>,
    dir: &Path,
    display_path: &str,
) -> Response<Full<Bytes>> {
    let mut entries = Vec::new();
    let mut read_dir = match fs::read_dir(dir).await {
        Ok(rd) => rd,
        Err(e) => {
            logger::log_error(&format!(
                "Failed to list directory '{}': {}",
                dir.display(),
                e
            ));
            return http::build_404_response();
        }
    };
    while let Ok(Some(entry)) = read_dir.next_entry().await {
        let mut name = entry.file_name().to_string_lossy().into_owned();
        if entry.path().is_dir() {
            name.push('/');
        }
        entries.push(name);
    }
    entries.sort();

    let title = html_escape(display_path);
    let mut html = format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Directory listing for {title}</title>\n</head>\n<body>\n\
         <h1>Directory listing for {title}</h1>\n<hr>\n<ul>\n"
    );
    for name in &entries {
        html.push_str(&format!(
            "<li><a href=\"{}\">{}</a></li>\n",
            percent_encode(name),
            html_escape(name)
        ));
    }
    html.push_str("</ul>\n<hr>\n</body>\n</html>\n");

    http::build_html_response(html, ctx.is_head)
}

/// Decode %XX escapes; returns None on malformed escapes or invalid UTF-8
pub fn percent_decode(path: &str) -> Option<String> {
    let bytes = path.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes.get(i + 1..i + 3)?;
            let hex = std::str::from_utf8(hex).ok()?;
            let value = u8::from_str_radix(hex, 16).ok()?;
            out.push(value);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

/// Percent-encode a listing entry name for use in an href
fn percent_encode(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for byte in name.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'/' => {
                out.push(byte as char);
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_passes_plain_paths_through() {
        assert_eq!(percent_decode("/songs/index.json").as_deref(), Some("/songs/index.json"));
    }

    #[test]
    fn decode_handles_escapes() {
        assert_eq!(percent_decode("/a%20b.txt").as_deref(), Some("/a b.txt"));
        assert_eq!(percent_decode("/%2e%2e/etc").as_deref(), Some("/../etc"));
    }

    #[test]
    fn decode_rejects_malformed_escapes() {
        assert!(percent_decode("/bad%2").is_none());
        assert!(percent_decode("/bad%zz").is_none());
        assert!(percent_decode("/bad%ff%fe").is_none());
    }

    #[test]
    fn encode_escapes_spaces_and_keeps_slashes() {
        assert_eq!(percent_encode("a b/"), "a%20b/");
        assert_eq!(percent_encode("plain-name_1.txt"), "plain-name_1.txt");
    }

    #[test]
    fn escape_neutralizes_markup() {
        assert_eq!(html_escape("<b>&\"x\""), "&lt;b&gt;&amp;&quot;x&quot;");
    }

    #[test]
    fn traversal_cannot_escape_root() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("root");
        std::fs::create_dir(&root).unwrap();
        std::fs::write(tmp.path().join("secret.txt"), "secret").unwrap();
        std::fs::write(root.join("ok.txt"), "ok").unwrap();

        assert!(resolve_under_root(&root, "/ok.txt", "/ok.txt").is_some());
        assert!(resolve_under_root(&root, "/../secret.txt", "/../secret.txt").is_none());
    }
}
