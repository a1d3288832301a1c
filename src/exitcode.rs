/// Standard Unix exit codes for the tagblock CLI.
///
/// These codes follow the BSD convention where possible.
///
/// Successful termination
pub const SUCCESS: i32 = 0;

/// Command line usage error - invalid arguments, unreadable input, etc.
pub const USAGE: i32 = 64;

/// The page's origin has not been granted
pub const NOPERM: i32 = 77;
