//! No-cache header injection
//!
//! Every response leaving this server carries headers telling clients and
//! intermediaries not to store or reuse it. The injector overwrites any
//! caching headers a response builder may have queued.

use hyper::header::{HeaderValue, CACHE_CONTROL, EXPIRES, PRAGMA};
use hyper::Response;

pub const CACHE_CONTROL_VALUE: &str = "no-store, no-cache, must-revalidate, max-age=0";
pub const PRAGMA_VALUE: &str = "no-cache";
pub const EXPIRES_VALUE: &str = "0";

/// Force the no-cache header set onto a response, replacing any existing
/// `Cache-Control`, `Pragma`, or `Expires` values.
pub fn apply<B>(response: &mut Response<B>) {
    let headers = response.headers_mut();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL_VALUE));
    headers.insert(PRAGMA, HeaderValue::from_static(PRAGMA_VALUE));
    headers.insert(EXPIRES, HeaderValue::from_static(EXPIRES_VALUE));
}
