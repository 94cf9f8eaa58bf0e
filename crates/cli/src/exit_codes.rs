//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success, every record matched exactly                |
//! | 1    | Reconciliation ran and found differences             |
//! | 2    | CLI usage error (bad args; clap also exits with 2)   |
//! | 3    | Invalid recon config                                 |
//! | 4    | Runtime failure (unreadable file, bad CSV, output)   |

/// Success - command completed, nothing to review.
pub const EXIT_SUCCESS: u8 = 0;

/// Partial matches or source-only records exist.
/// Like `diff(1)`, exit 1 means "inputs differ."
pub const EXIT_RECON_DIFFERENCES: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Config failed to parse or validate.
pub const EXIT_RECON_INVALID_CONFIG: u8 = 3;

/// IO, CSV decoding, or serialization failure during a run.
pub const EXIT_RECON_RUNTIME: u8 = 4;
