//! HTTP plumbing for the mock listener

pub mod codec;

pub use codec::{HttpRequest, HttpResponse};
