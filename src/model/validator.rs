use validator::ValidationError;

/// Rejects names and titles made only of whitespace.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("blank");
        error.message = Some("can not be blank".into());
        Err(error)
    } else {
        Ok(())
    }
}
