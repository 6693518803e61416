//! Exit codes following sysexits.h conventions.
//!
//! These codes give scripts and CI systems a semantic failure mode to act
//! on, beyond the generic exit 1.

#![allow(dead_code)] // Constants double as documentation of the exit contract

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// General error (catch-all).
pub const GENERAL_ERROR: i32 = 1;

/// Data format error (verification failed, tampered or forged content).
/// Maps to EX_DATAERR from sysexits.h.
pub const VERIFICATION_FAILED: i32 = 65;

/// Cannot open input file.
/// Maps to EX_NOINPUT from sysexits.h.
pub const INPUT_ERROR: i32 = 66;

/// Service unavailable (network, signing endpoint).
/// Maps to EX_UNAVAILABLE from sysexits.h.
pub const NETWORK_ERROR: i32 = 69;

/// I/O error (cannot write output file).
/// Maps to EX_IOERR from sysexits.h.
pub const IO_ERROR: i32 = 74;

/// An exit code with optional error context.
pub struct ExitCode {
    pub code: i32,
    pub message: Option<String>,
}

impl ExitCode {
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");

        // Classify by inspecting the error chain.
        let code = if message.contains("Failed to read") {
            INPUT_ERROR
        } else if message.contains("verification failed")
            || message.contains("not verified")
        {
            VERIFICATION_FAILED
        } else if message.contains("network error")
            || message.contains("authentication required")
            || message.contains("signing service error")
        {
            NETWORK_ERROR
        } else if message.contains("Failed to write") {
            IO_ERROR
        } else {
            GENERAL_ERROR
        };

        Self {
            code,
            message: Some(message),
        }
    }
}
