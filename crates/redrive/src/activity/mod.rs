//! The HTTP action transport
//!
//! The one side-effecting piece of the loop. Reads the instance's input
//! payload, performs the HTTP call, and reports the raw result for
//! classification upstream.

mod http_action;

pub use http_action::HttpAction;
