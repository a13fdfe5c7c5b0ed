//! Endpoint abstraction for the two extraction services.

pub mod base;
pub mod memory;

pub use base::Endpoint;

use crate::check_error;
use crate::error::{CheckError, ErrorKind};
use crate::types::EndpointRole;

/// Wraps an endpoint failure with the role of the endpoint that failed.
///
/// Dispatch failures are recoverable at the next scheduled run; the kind
/// records which side failed so operators can tell a broken source from a
/// broken sink.
pub fn dispatch_error(role: EndpointRole, source: CheckError) -> CheckError {
    let kind = match role {
        EndpointRole::Source => ErrorKind::SourceDispatchFailed,
        EndpointRole::Sink => ErrorKind::SinkDispatchFailed,
    };

    check_error!(
        kind,
        "Endpoint dispatch failed",
        format!("{role} endpoint request failed"),
        source: source
    )
}
