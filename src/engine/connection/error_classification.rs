//! Mapping of `bollard` transport errors onto semantic container errors.

use std::io::ErrorKind;
use std::path::Path;

use crate::error::ContainerError;

/// Return the filesystem path of a `unix://` or `npipe://` endpoint.
fn socket_path(endpoint: &str) -> Option<&Path> {
    endpoint
        .strip_prefix("unix://")
        .or_else(|| endpoint.strip_prefix("npipe://"))
        .map(Path::new)
}

fn from_io_kind(kind: ErrorKind, path: Option<&Path>, message: String) -> ContainerError {
    match (kind, path) {
        (ErrorKind::NotFound, Some(socket)) => ContainerError::SocketNotFound {
            path: socket.to_path_buf(),
        },
        (ErrorKind::PermissionDenied, Some(socket)) => ContainerError::PermissionDenied {
            path: socket.to_path_buf(),
        },
        _ => ContainerError::ConnectionFailed { message },
    }
}

/// Classify a runtime client error raised while talking to `endpoint`.
///
/// Socket-specific variants are only produced for endpoints with a
/// filesystem path; everything else becomes `ConnectionFailed`.
pub(super) fn classify_connection_error(
    error: &bollard::errors::Error,
    endpoint: &str,
) -> ContainerError {
    let path = socket_path(endpoint);
    let message = error.to_string();

    match error {
        bollard::errors::Error::SocketNotFoundError(_) => {
            from_io_kind(ErrorKind::NotFound, path, message)
        }
        bollard::errors::Error::IOError { err } => {
            let kind = io_error_kind_in_chain(err).unwrap_or_else(|| err.kind());
            from_io_kind(kind, path, message)
        }
        other => match io_error_kind_in_chain(other) {
            Some(kind) => from_io_kind(kind, path, message),
            None => ContainerError::ConnectionFailed { message },
        },
    }
}

/// Find the first `io::Error` below `error` in its source chain.
fn io_error_kind_in_chain(error: &dyn std::error::Error) -> Option<ErrorKind> {
    std::iter::successors(error.source(), |current| current.source())
        .find_map(|source| source.downcast_ref::<std::io::Error>())
        .map(std::io::Error::kind)
}
