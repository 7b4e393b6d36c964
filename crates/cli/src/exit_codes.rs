//! CLI Exit Code Registry
//!
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Description                                              |
//! |------|----------------------------------------------------------|
//! | 0    | Success                                                  |
//! | 1    | Runtime error (settings store unreadable or unwritable)  |
//! | 2    | Usage error (bad catalog file, timestamp, config, user)  |

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Runtime error - the settings store failed.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments or input files.
pub const EXIT_USAGE: u8 = 2;
