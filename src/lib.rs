//! devserve: local development HTTP server
//!
//! Serves static files from the working directory with client caching
//! disabled, and exposes `POST /__debug/restart` to fast-forward the
//! working copy from its git remote.

pub mod config;
pub mod handler;
pub mod http;
pub mod logger;
