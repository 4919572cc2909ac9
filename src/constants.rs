// Constants used in the project. These are "convention over configuration" for now.
// Everything a deployment needs to change lives in `command_line_interface` instead.

/// Lowercase; the uploaded filename's extension is compared case-insensitively.
pub const ALLOWED_IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

pub const DELETION_CODE_LENGTH: usize = 6;
pub const DELETION_CODE_ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub const RELAY_COOKIE: &str = "lostfound_posted";
pub const FLASH_COOKIE: &str = "lostfound_flash";

/// A relay older than this is treated as absent.
pub const RELAY_MAX_AGE_SECONDS: i64 = 10 * 60;

/// Shown on every failed deletion, whether the id or the code was wrong.
pub const DELETE_FAILED_MESSAGE: &str = "Invalid item ID or deletion code.";
pub const DELETE_SUCCEEDED_MESSAGE: &str = "Item successfully removed. Glad it was found!";
