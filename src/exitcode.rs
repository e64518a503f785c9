//! Standard exit codes (BSD sysexits.h compatible)

/// Successful termination
pub const OK: i32 = 0;

/// Command line usage error
pub const USAGE: i32 = 64;

/// Data format error (no usable year in a series)
pub const DATAERR: i32 = 65;

/// Cannot open input (region code not in the tree)
pub const NOINPUT: i32 = 66;

/// Service unavailable (data source unreachable or malformed)
pub const UNAVAILABLE: i32 = 69;

/// Internal software error
pub const SOFTWARE: i32 = 70;

/// System error (e.g., can't start runtime)
pub const OSERR: i32 = 71;

/// Configuration error
pub const CONFIG: i32 = 78;
