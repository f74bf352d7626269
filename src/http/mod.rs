//! HTTP protocol layer
//!
//! Protocol-level building blocks shared by the static file handler and
//! the restart endpoint, decoupled from business logic.

pub mod mime;
pub mod nocache;
pub mod response;

pub use response::{
    build_404_response, build_405_response, build_file_response, build_html_response,
    build_json_response, build_redirect_response,
};
