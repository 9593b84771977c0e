use thiserror::Error;

const COUNTRY_CODE: char = '7';
const TRUNK_PREFIX: char = '8';
const NATIONAL_LENGTH: usize = 10;
const FULL_LENGTH: usize = 11;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PhoneError {
    #[error("Phone number is empty")]
    Empty,
    #[error("Invalid phone number format: {0}")]
    InvalidFormat(String),
}

/// Canonicalizes free-form phone input into `+<country><number>`.
///
/// Every phone-keyed lookup (users, pending codes) goes through this first.
pub fn normalize(raw: &str) -> Result<String, PhoneError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(PhoneError::Empty);
    }

    let mut digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.len() == FULL_LENGTH && digits.starts_with(TRUNK_PREFIX) {
        digits.replace_range(..1, &COUNTRY_CODE.to_string());
    } else if digits.len() == NATIONAL_LENGTH {
        digits.insert(0, COUNTRY_CODE);
    } else if digits.len() == FULL_LENGTH && !digits.starts_with(COUNTRY_CODE) {
        // foreign numbers are only trusted when written in international form
        if raw.starts_with('+') {
            return Ok(format!("+{}", digits));
        }
        return Err(PhoneError::InvalidFormat(raw.to_string()));
    }

    if digits.len() != FULL_LENGTH || !digits.starts_with(COUNTRY_CODE) {
        return Err(PhoneError::InvalidFormat(raw.to_string()));
    }

    Ok(format!("+{}", digits))
}

/// Canonical phone without the leading `+`, as voice providers expect it.
pub fn api_digits(phone: &str) -> String {
    phone.chars().filter(|c| c.is_ascii_digit()).collect()
}
