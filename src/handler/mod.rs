//! Request handling layer

pub mod restart;
pub mod router;
pub mod static_files;

pub use router::handle_request;
