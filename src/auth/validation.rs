use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    // letters incl. diacritics, spaces, hyphen, apostrophe
    static ref NAME_RE: Regex = Regex::new(r"^[\p{L}\p{M}' \-]{1,50}$").unwrap();
    static ref HANDLE_RE: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_.]{2,29}$").unwrap();
    static ref TAG_RE: Regex = Regex::new(r"<[^>]*>").unwrap();
}

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_BIO_LEN: usize = 500;

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn is_valid_name(name: &str) -> bool {
    !name.trim().is_empty() && NAME_RE.is_match(name)
}

pub fn is_valid_handle(handle: &str) -> bool {
    HANDLE_RE.is_match(handle)
}

pub fn is_valid_password(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LEN
}

/// Strips HTML tags and surrounding whitespace; blank input becomes `None`.
pub fn sanitize_bio(raw: &str) -> Option<String> {
    let stripped = TAG_RE.replace_all(raw, "");
    let trimmed = stripped.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
