//! Exit codes returned by `feedsync`. Every command maps its failures
//! onto these values and nothing else.
//!
//! | Code | Meaning                                             |
//! |------|-----------------------------------------------------|
//! | 0    | Success                                             |
//! | 1    | General error (unspecified)                         |
//! | 2    | CLI usage error (bad args, bad file name)           |
//! | 3    | IO error (missing or unreadable file, write failed) |
//! | 4    | Parse error reading a feed or upload CSV            |
//! | 5    | Invalid sync config                                 |
//! | 6    | Changes found (`diff --exit-code` only)             |

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, store file names that are paths.
pub const EXIT_USAGE: u8 = 2;

/// Filesystem error - input missing, output not writable.
pub const EXIT_IO: u8 = 3;

/// A feed or upload file could not be parsed as CSV.
pub const EXIT_PARSE: u8 = 4;

/// Sync config failed to parse or validate.
pub const EXIT_INVALID_CONFIG: u8 = 5;

/// Reconciliation produced at least one change record.
/// Like `diff(1)`, only reported when the caller asks for it.
pub const EXIT_CHANGES: u8 = 6;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_ERROR,
            EXIT_USAGE,
            EXIT_IO,
            EXIT_PARSE,
            EXIT_INVALID_CONFIG,
            EXIT_CHANGES,
        ];
        let unique: std::collections::HashSet<u8> = codes.iter().copied().collect();
        assert_eq!(unique.len(), codes.len());
    }
}
