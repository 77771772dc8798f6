//! Request-level validation and normalisation.
//!
//! Each check returns the cleaned value or a message suitable for a 422 body.

use std::sync::LazyLock;

use regex::Regex;

use soundvault_auth::{Permission, validate_permissions};

pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const MAX_PASSWORD_LENGTH: usize = 128;
pub const MAX_NAME_LENGTH: usize = 100;
pub const MAX_EMAIL_LENGTH: usize = 254;
pub const MAX_EMAIL_LOCAL_PART_LENGTH: usize = 64;
pub const PASSWORD_SPECIALS: &str = "@$!%*?&#";

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern compiles")
});

pub type Checked<T> = Result<T, String>;

/// Trim, lowercase and check an email address.
pub fn email(raw: &str) -> Checked<String> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() {
        return Err("Email cannot be empty or whitespace only".into());
    }
    if !EMAIL_PATTERN.is_match(&email) {
        return Err("Invalid email format".into());
    }
    if email.len() > MAX_EMAIL_LENGTH {
        return Err(format!(
            "Email address is too long (maximum {MAX_EMAIL_LENGTH} characters)"
        ));
    }
    let local = email.split('@').next().unwrap_or_default();
    if local.len() > MAX_EMAIL_LOCAL_PART_LENGTH {
        return Err(format!(
            "Email local part is too long (maximum {MAX_EMAIL_LOCAL_PART_LENGTH} characters)"
        ));
    }
    Ok(email)
}

/// Password strength: length bounds plus one each of upper, lower, digit and special.
pub fn password(raw: &str) -> Checked<String> {
    let password = raw.trim();
    if password.is_empty() {
        return Err("Password cannot be empty or whitespace only".into());
    }
    let len = password.chars().count();
    if len < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters long"
        ));
    }
    if len > MAX_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at most {MAX_PASSWORD_LENGTH} characters long"
        ));
    }

    let mut missing = Vec::new();
    if !password.chars().any(char::is_uppercase) {
        missing.push("one uppercase letter");
    }
    if !password.chars().any(char::is_lowercase) {
        missing.push("one lowercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        missing.push("one number");
    }
    if !password.chars().any(|c| PASSWORD_SPECIALS.contains(c)) {
        missing.push("one special character (@$!%*?&#)");
    }
    if !missing.is_empty() {
        return Err(format!("Password must contain at least {}", missing.join(", ")));
    }
    Ok(password.to_string())
}

/// `field` is the human label used in messages ("First name").
pub fn name(field: &str, raw: &str) -> Checked<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(format!("{field} cannot be empty or whitespace only"));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(format!("{field} cannot exceed {MAX_NAME_LENGTH} characters"));
    }
    Ok(name.to_string())
}

pub fn permissions(raw: &[String]) -> Checked<Vec<Permission>> {
    validate_permissions(raw).map_err(|e| e.to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Audio uploads
// ─────────────────────────────────────────────────────────────────────────────

pub const ALLOWED_AUDIO_MIME_TYPES: [&str; 10] = [
    "audio/mpeg",
    "audio/wav",
    "audio/wave",
    "audio/x-wav",
    "audio/aac",
    "audio/mp4",
    "audio/x-m4a",
    "audio/ogg",
    "audio/oga",
    "audio/opus",
];

pub const ALLOWED_AUDIO_EXTENSIONS: [&str; 7] =
    [".mp3", ".wav", ".m4a", ".aac", ".ogg", ".oga", ".opus"];

const SUPPORTED_FORMATS: &str = "MP3, WAV, AAC/M4A, OGG, OPUS";

/// MIME types a given extension may legitimately carry.
fn expected_mimes(extension: &str) -> &'static [&'static str] {
    match extension {
        ".mp3" => &["audio/mpeg"],
        ".wav" => &["audio/wav", "audio/wave", "audio/x-wav"],
        ".m4a" => &["audio/mp4", "audio/x-m4a", "audio/aac"],
        ".aac" => &["audio/aac", "audio/mp4"],
        ".ogg" | ".oga" => &["audio/ogg", "audio/oga"],
        ".opus" => &["audio/opus"],
        _ => &[],
    }
}

/// Lowercased extension including the dot, or `""` when there is none.
pub fn file_extension(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((_, ext)) => format!(".{}", ext.to_lowercase()),
        None => String::new(),
    }
}

/// Check an upload's name, declared content type and size.
pub fn audio_file(
    file_name: Option<&str>,
    content_type: Option<&str>,
    size: u64,
    max_size_bytes: u64,
) -> Checked<()> {
    let file_name = file_name
        .filter(|n| !n.trim().is_empty())
        .ok_or("File must have a filename")?;

    let extension = file_extension(file_name);
    if extension.is_empty() || extension == "." {
        return Err("File must have a valid extension".into());
    }
    if !ALLOWED_AUDIO_EXTENSIONS.contains(&extension.as_str()) {
        return Err(format!(
            "Invalid file extension. Supported formats: {SUPPORTED_FORMATS}"
        ));
    }

    let content_type = content_type
        .filter(|c| !c.trim().is_empty())
        .ok_or("File must have a content type")?;
    if !ALLOWED_AUDIO_MIME_TYPES.contains(&content_type) {
        return Err(format!(
            "Invalid audio format. Supported formats: {SUPPORTED_FORMATS}"
        ));
    }

    let expected = expected_mimes(&extension);
    if !expected.is_empty() && !expected.contains(&content_type) {
        return Err(format!(
            "File extension does not match MIME type. Expected one of: {}",
            expected.join(", ")
        ));
    }

    if size > max_size_bytes {
        return Err(format!(
            "File size exceeds maximum allowed size of {}MB",
            max_size_bytes / (1024 * 1024)
        ));
    }
    Ok(())
}

/// A rename must keep the original extension (case-insensitive).
pub fn rename(original: &str, new_name: &str) -> Checked<String> {
    let new_name = new_name.trim();
    if new_name.is_empty() {
        return Err("File name cannot be empty or whitespace only".into());
    }
    let original_ext = file_extension(original);
    let new_ext = file_extension(new_name);
    if original_ext != new_ext {
        return Err(format!(
            "File extension must match original file. Original extension: {original_ext}, provided: {new_ext}"
        ));
    }
    Ok(new_name.to_string())
}
