/// Input validators
///
/// Emails are checked for shape and length before they reach the store.
/// Chirp bodies are length-limited and run through the profanity filter.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MIN_EMAIL_LENGTH: usize = 3;
const MAX_LOCAL_PART_LENGTH: usize = 64;

/// Bodies must stay strictly under this many characters.
pub const MAX_CHIRP_LENGTH: usize = 140;

const CENSORED_WORDS: [&str; 3] = ["kerfuffle", "sharbert", "fornax"];
const CENSOR_MASK: &str = "****";

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap();
}

/// Validates an email address and returns it trimmed.
pub fn is_valid_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("email".to_string()));
    }
    if trimmed.len() < MIN_EMAIL_LENGTH {
        return Err(ValidationError::TooShort("email".to_string(), MIN_EMAIL_LENGTH));
    }
    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email".to_string(), MAX_EMAIL_LENGTH));
    }
    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("email".to_string()));
    }
    if has_suspicious_email_patterns(trimmed) {
        return Err(ValidationError::SuspiciousContent("email".to_string()));
    }

    Ok(trimmed.to_string())
}

fn has_suspicious_email_patterns(email: &str) -> bool {
    match email.split_once('@') {
        Some((local_part, _)) => local_part.len() > MAX_LOCAL_PART_LENGTH,
        None => true,
    }
}

/// Validates a chirp body and returns the censored text.
///
/// Length is counted in characters, not bytes.
pub fn validate_chirp(body: &str) -> Result<String, ValidationError> {
    if body.trim().is_empty() {
        return Err(ValidationError::EmptyField("body".to_string()));
    }
    if body.chars().count() >= MAX_CHIRP_LENGTH {
        return Err(ValidationError::TooLong("body".to_string(), MAX_CHIRP_LENGTH - 1));
    }

    Ok(censor(body))
}

/// Replace profane words. Words are split on single spaces, so punctuation
/// attached to a word keeps it from matching.
fn censor(body: &str) -> String {
    body.split(' ')
        .map(|word| {
            let lowered = word.to_lowercase();
            if CENSORED_WORDS.contains(&lowered.as_str()) {
                CENSOR_MASK
            } else {
                word
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_email() {
        assert_eq!(is_valid_email(" tim@apple.com ").unwrap(), "tim@apple.com");
        assert!(is_valid_email("test.email@domain.co.uk").is_ok());
        assert!(is_valid_email("user+tag@example.com").is_ok());
    }

    #[test]
    fn test_invalid_email_format() {
        assert!(is_valid_email("invalid").is_err());
        assert!(is_valid_email("user@").is_err());
        assert!(is_valid_email("@example.com").is_err());
        assert!(is_valid_email("user@@example.com").is_err());
        assert_eq!(
            is_valid_email(""),
            Err(ValidationError::EmptyField("email".to_string()))
        );
    }

    #[test]
    fn test_email_length_limits() {
        let too_long = format!("{}@example.com", "a".repeat(250));
        assert!(is_valid_email(&too_long).is_err());

        let long_local = format!("{}@example.com", "a".repeat(65));
        assert_eq!(
            is_valid_email(&long_local),
            Err(ValidationError::SuspiciousContent("email".to_string()))
        );
    }

    #[test]
    fn test_chirp_length_limit() {
        assert!(validate_chirp(&"a".repeat(139)).is_ok());
        assert!(validate_chirp(&"a".repeat(140)).is_err());
        // Multi-byte characters count once.
        assert!(validate_chirp(&"é".repeat(139)).is_ok());
    }

    #[test]
    fn test_empty_chirp() {
        assert!(validate_chirp("").is_err());
        assert!(validate_chirp("   ").is_err());
    }

    #[test]
    fn test_profanity_is_censored() {
        assert_eq!(
            validate_chirp("I had something interesting for breakfast").unwrap(),
            "I had something interesting for breakfast"
        );
        assert_eq!(
            validate_chirp("I hear Mastodon is better than Chirpy. sharbert I need to migrate")
                .unwrap(),
            "I hear Mastodon is better than Chirpy. **** I need to migrate"
        );
        assert_eq!(
            validate_chirp("I really need a kerfuffle to go to bed sooner, Fornax !").unwrap(),
            "I really need a **** to go to bed sooner, **** !"
        );
    }

    #[test]
    fn test_punctuation_prevents_censoring() {
        assert_eq!(validate_chirp("Sharbert!").unwrap(), "Sharbert!");
    }
}
