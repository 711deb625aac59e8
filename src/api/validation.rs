use super::ApiError;

pub fn validate_id(resource: &str, id: i32) -> Result<i32, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid {} ID: {}. ID must be a positive integer",
            resource, id
        )));
    }
    Ok(id)
}

/// Highest page number accepted by the listings.
pub const MAX_PAGE: u64 = u32::MAX as u64;

/// Pages are 1-based; absent means the first page.
pub fn validate_page(page: Option<u64>) -> Result<u64, ApiError> {
    match page {
        None => Ok(1),
        Some(0) => Err(ApiError::validation("Invalid page: pages start at 1")),
        Some(page) if page > MAX_PAGE => Err(ApiError::validation(format!(
            "Invalid page: must be at most {MAX_PAGE}"
        ))),
        Some(page) => Ok(page),
    }
}

/// Trims an optional text filter; blank becomes `None`.
#[must_use]
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_id() {
        assert!(validate_id("course", 1).is_ok());
        assert!(validate_id("course", 12345).is_ok());
        assert!(validate_id("course", 0).is_err());
        assert!(validate_id("course", -1).is_err());
    }

    #[test]
    fn test_validate_page() {
        assert_eq!(validate_page(None).unwrap(), 1);
        assert_eq!(validate_page(Some(3)).unwrap(), 3);
        assert!(validate_page(Some(0)).is_err());
        assert_eq!(validate_page(Some(MAX_PAGE)).unwrap(), MAX_PAGE);
        assert!(validate_page(Some(MAX_PAGE + 1)).is_err());
        assert!(validate_page(Some(u64::MAX)).is_err());
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  al ".to_string())).as_deref(), Some("al"));
        assert_eq!(non_blank(Some("   ".to_string())), None);
        assert_eq!(non_blank(None), None);
    }
}
