//! Standard exit codes for emote binaries
//!
//! Shared by `emote-pack` and `emote-inspect` so scripts can tell failures apart.

use crate::exceptions::EmoteError;

/// Successful execution
pub const EXIT_SUCCESS: i32 = 0;

/// Generic error (avoid using - be more specific)
pub const EXIT_ERROR: i32 = 1;

/// Panic or unrecoverable error
pub const EXIT_PANIC: i32 = 101;

/// Container error (corrupt table, checksum mismatch, empty container)
pub const EXIT_CONTAINER_ERROR: i32 = 102;

/// Invalid command-line arguments
pub const EXIT_INVALID_ARGS: i32 = 105;

/// I/O error (file not found, permission denied, disk error)
pub const EXIT_IO_ERROR: i32 = 106;

/// Manifest error (missing index.json, malformed JSON)
pub const EXIT_MANIFEST_ERROR: i32 = 109;

/// Map a library error onto the exit code a binary should return
pub fn exit_code_for(err: &EmoteError) -> i32 {
    match err {
        EmoteError::ContainerIntegrity(_) => EXIT_CONTAINER_ERROR,
        EmoteError::IoError(_) => EXIT_IO_ERROR,
        EmoteError::Parse(_) | EmoteError::JsonError(_) | EmoteError::AssetNotFound(_) => {
            EXIT_MANIFEST_ERROR
        }
        EmoteError::InvalidArgument(_) => EXIT_INVALID_ARGS,
        _ => EXIT_ERROR,
    }
}
