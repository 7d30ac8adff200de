//! Phone number masking for display.

use regex::Regex;
use std::sync::LazyLock;

/// Shown when a number does not have the expected international shape.
pub const MASK_PLACEHOLDER: &str = "your number";

static INTERNATIONAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\+\d{1,2})(\d{3})(\d{3})(\d{4})$").expect("valid masking regex")
});

/// Hide all but the country code and last four digits.
///
/// `+15551234567` becomes `+1-••-•••-4567`.
pub fn mask_phone_number(phone_number: &str) -> String {
    match INTERNATIONAL_RE.captures(phone_number.trim()) {
        Some(caps) => format!("{}-••-•••-{}", &caps[1], &caps[4]),
        None => MASK_PLACEHOLDER.to_string(),
    }
}
