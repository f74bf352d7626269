//! Debug restart endpoint
//!
//! `POST /__debug/restart` fast-forwards the working copy the server is
//! running from. The pull shells out to the system `git` binary; when the
//! current branch has no tracking information configured, the pull is
//! retried against the `origin` and `upstream` remotes in turn.

use crate::http;
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::Serialize;
use std::io;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// Path the restart handler answers on; any other POST path is a 404.
pub const RESTART_PATH: &str = "/__debug/restart";

/// Remotes tried, in order, when the branch has no tracking information.
const FALLBACK_REMOTES: [&str; 2] = ["origin", "upstream"];

/// Captured outcome of one git invocation
#[derive(Debug, Clone)]
pub struct GitPullResult {
    pub returncode: i32,
    pub stdout: String,
    pub stderr: String,
}

impl GitPullResult {
    pub const fn ok(&self) -> bool {
        self.returncode == 0
    }
}

/// JSON body returned to the restart caller
#[derive(Debug, Serialize)]
struct RestartPayload {
    ok: bool,
    returncode: i32,
    stdout: String,
    stderr: String,
}

/// Run one git command in `root`, capturing exit code and output.
///
/// `GIT_TERMINAL_PROMPT=0` makes a remote that wants credentials fail
/// instead of hanging the request on a prompt.
async fn run_git(root: &Path, args: &[&str]) -> io::Result<GitPullResult> {
    let output = Command::new("git")
        .args(args)
        .current_dir(root)
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    Ok(GitPullResult {
        returncode: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// True when the pull failed because the branch has no upstream configured
pub fn needs_tracking_fallback(result: &GitPullResult) -> bool {
    !result.ok()
        && result
            .stderr
            .to_lowercase()
            .contains("no tracking information")
}

/// Attempt `git pull --ff-only`, with the remote fallback sequence.
///
/// The fallback is an ordered trial list that short-circuits on the first
/// remote whose pull exits 0; if none does, the original result stands.
pub async fn pull(root: &Path) -> io::Result<GitPullResult> {
    let mut result = run_git(root, &["pull", "--ff-only"]).await?;

    if needs_tracking_fallback(&result) {
        let branch_result = run_git(root, &["rev-parse", "--abbrev-ref", "HEAD"]).await?;
        let branch = branch_result.stdout.trim();
        if !branch.is_empty() {
            for remote in FALLBACK_REMOTES {
                let retry = run_git(root, &["pull", "--ff-only", remote, branch]).await?;
                if retry.ok() {
                    result = retry;
                    break;
                }
            }
        }
    }

    Ok(result)
}

/// Handle `POST /__debug/restart`
///
/// 200 with `ok: true` on a clean pull, 400 with the captured output on a
/// git failure, 500 if the orchestration itself failed (e.g. git not on
/// PATH). Every outcome is reported as JSON; nothing propagates out.
pub async fn handle_restart(root: &Path) -> Response<Full<Bytes>> {
    match pull(root).await {
        Ok(result) => {
            let payload = RestartPayload {
                ok: result.ok(),
                returncode: result.returncode,
                stdout: result.stdout,
                stderr: result.stderr,
            };
            let status = if payload.ok {
                StatusCode::OK
            } else {
                StatusCode::BAD_REQUEST
            };
            match serde_json::to_string(&payload) {
                Ok(json) => http::build_json_response(status, json),
                Err(e) => internal_error(&format!("Failed to serialize restart payload: {e}")),
            }
        }
        Err(e) => internal_error(&format!("git invocation failed: {e}")),
    }
}

fn internal_error(message: &str) -> Response<Full<Bytes>> {
    logger::log_error(message);
    let json = serde_json::json!({ "ok": false, "error": message }).to_string();
    http::build_json_response(StatusCode::INTERNAL_SERVER_ERROR, json)
}
