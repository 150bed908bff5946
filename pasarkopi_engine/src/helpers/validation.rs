use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // 8 to 15 digits with an optional leading +, which covers Indonesian mobile and landline numbers.
    static ref PHONE_REGEX: Regex = Regex::new(r"^\+?[0-9]{8,15}$").unwrap();
}

/// Checks a buyer-typed phone number. Spaces, dots and dashes are stripped before matching, since buyers
/// commonly group digits with them.
pub fn is_valid_phone(phone: &str) -> bool {
    let normalized: String = phone.chars().filter(|c| !matches!(c, ' ' | '-' | '.')).collect();
    PHONE_REGEX.is_match(&normalized)
}
