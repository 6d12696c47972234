//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::{ApiError, BuildError, StoreError};

/// Map domain errors to the message printed on stderr.
pub fn map_error(e: &ApiError) -> String {
    match e {
        ApiError::Build(BuildError::Aborted { .. }) => {
            format!("error: {}\nhint: rerun with --collect to record unreadable entries", e)
        }
        ApiError::Store(StoreError::IncompatibleAlgorithmVersion { .. }) => {
            format!("error: {}\nhint: regenerate the tree from its directory", e)
        }
        _ => format!("error: {}", e),
    }
}
