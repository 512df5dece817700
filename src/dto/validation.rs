//! Validation helpers for DTOs.

use validator::ValidationError;

use crate::state::room::ROOM_CODE_LENGTH;

const MAX_USER_ID_LENGTH: usize = 128;
const MAX_TOPIC_WORDS: usize = 3;
const MAX_TOPIC_LENGTH: usize = 60;

/// Validates that a user id is 1 to 128 characters of `[A-Za-z0-9-_.@:]`.
///
/// Ids end up inside storage keys, so separators and whitespace are refused.
pub fn validate_user_id(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() || id.len() > MAX_USER_ID_LENGTH {
        let mut err = ValidationError::new("user_id_length");
        err.message = Some(
            format!(
                "User ID must be between 1 and {MAX_USER_ID_LENGTH} characters (got {})",
                id.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@' | ':'))
    {
        let mut err = ValidationError::new("user_id_format");
        err.message = Some("User ID may only contain letters, digits and `-_.@:`".into());
        return Err(err);
    }

    Ok(())
}

/// Validates that a room code is exactly 6 uppercase alphanumeric characters.
///
/// # Examples
///
/// ```ignore
/// validate_room_code("AB12CD") // Ok
/// validate_room_code("ab12cd") // Err - lowercase
/// validate_room_code("AB12C")  // Err - too short
/// ```
pub fn validate_room_code(code: &str) -> Result<(), ValidationError> {
    if code.len() != ROOM_CODE_LENGTH {
        let mut err = ValidationError::new("room_code_length");
        err.message = Some(
            format!(
                "Room code must be exactly {ROOM_CODE_LENGTH} characters (got {})",
                code.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        let mut err = ValidationError::new("room_code_format");
        err.message = Some("Room code must contain only uppercase letters and digits".into());
        return Err(err);
    }

    Ok(())
}

/// Validates a topic: blank (meaning "not chosen yet") or one to three words.
pub fn validate_topic(topic: &str) -> Result<(), ValidationError> {
    let words = topic.split_whitespace().count();
    if words > MAX_TOPIC_WORDS {
        let mut err = ValidationError::new("topic_words");
        err.message = Some(format!("Topic must have at most {MAX_TOPIC_WORDS} words (got {words})").into());
        return Err(err);
    }
    if topic.trim().chars().count() > MAX_TOPIC_LENGTH {
        let mut err = ValidationError::new("topic_length");
        err.message = Some(format!("Topic must be at most {MAX_TOPIC_LENGTH} characters").into());
        return Err(err);
    }
    if topic.contains(',') {
        let mut err = ValidationError::new("topic_format");
        err.message = Some("Topic must not contain commas".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_user_id() {
        assert!(validate_user_id("user-42").is_ok());
        assert!(validate_user_id("auth0:abc.def@x_y").is_ok());
        assert!(validate_user_id("").is_err());
        assert!(validate_user_id(&"a".repeat(129)).is_err());
        assert!(validate_user_id("a b").is_err()); // space
        assert!(validate_user_id("a/b").is_err()); // separator
        assert!(validate_user_id("a\"b").is_err()); // quote
    }

    #[test]
    fn test_validate_room_code() {
        assert!(validate_room_code("AB12CD").is_ok());
        assert!(validate_room_code("000000").is_ok());
        assert!(validate_room_code("ab12cd").is_err()); // lowercase
        assert!(validate_room_code("AB12C").is_err()); // too short
        assert!(validate_room_code("AB12CDE").is_err()); // too long
        assert!(validate_room_code("AB-2CD").is_err());
    }

    #[test]
    fn test_validate_topic() {
        assert!(validate_topic("").is_ok());
        assert!(validate_topic("space").is_ok());
        assert!(validate_topic("  classic rock music ").is_ok());
        assert!(validate_topic("one two three four").is_err());
        assert!(validate_topic("space, history").is_err());
        assert!(validate_topic(&"x".repeat(61)).is_err());
    }
}
