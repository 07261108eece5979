use super::ApiError;

/// Rejects a missing or blank input field. The value is returned untouched.
pub fn require_field<'a>(field: &str, value: &'a str) -> Result<&'a str, ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::validation(format!("{field} is required")));
    }
    Ok(value)
}

pub fn validate_task_id(task_id: Option<&str>) -> Result<&str, ApiError> {
    let trimmed = task_id.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return Err(ApiError::validation("Missing taskId"));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_field() {
        assert_eq!(require_field("mediaRoot", "/srv/media").unwrap(), "/srv/media");
        assert_eq!(require_field("mediaRoot", " spaced ").unwrap(), " spaced ");
        assert!(require_field("mediaRoot", "").is_err());
        assert!(require_field("mediaRoot", "   ").is_err());
    }

    #[test]
    fn test_validate_task_id() {
        assert_eq!(validate_task_id(Some(" 17 ")).unwrap(), "17");
        assert!(validate_task_id(Some("")).is_err());
        assert!(validate_task_id(None).is_err());
    }
}
