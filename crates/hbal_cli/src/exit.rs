//! Centralized exit-code mapping : every mode (balance, allocate, //! tiered allocate, evacuate) reports through the same three codes.

use std::process::ExitCode;

pub const OK: u8 = 0;
pub const ALGORITHMIC: u8 = 1;
pub const CLI_PARSE: u8 = 2;

pub fn success() -> ExitCode {
    ExitCode::from(OK)
}

pub fn algorithmic() -> ExitCode {
    ExitCode::from(ALGORITHMIC)
}

pub fn cli_parse() -> ExitCode {
    ExitCode::from(CLI_PARSE)
}
