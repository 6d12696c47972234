//! Process exit statuses

use crate::error::{ApiError, BuildError};

/// Successful termination
pub const OK: i32 = 0;

/// Any failure not covered below (I/O, malformed tree, bad subpath, config)
pub const FAILURE: i32 = 1;

/// Success, but the tree contains entries that could not be read
pub const COLLECTED_ERRORS: i32 = 2;

/// Generation aborted on the first unreadable entry (fail-fast)
pub const ABORTED: i32 = 3;

/// Exit status for a failed command.
pub fn for_error(err: &ApiError) -> i32 {
    match err {
        ApiError::Build(BuildError::Aborted { .. }) => ABORTED,
        _ => FAILURE,
    }
}
