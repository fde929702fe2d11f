//! Shared HTTP plumbing: response envelope, error mapping, extractors.

pub mod responses;
pub mod validated_json;

pub use responses::{domain_error_response, ApiResponse, EmptyData};
pub use validated_json::ValidatedJson;
