//! Size limits applied at the callable surface.

use crate::error::PgVarsError;

/// Maximum length of a package or variable name, matching the host's
/// identifier-length bound (spec section 6, "Error conditions").
pub const MAX_NAME_LENGTH: usize = 63;

/// Validate a package or variable name: non-empty and within
/// [`MAX_NAME_LENGTH`].
pub fn validate_name(name: &str) -> Result<(), PgVarsError> {
    if name.is_empty() {
        return Err(PgVarsError::InvalidParameter(
            "name must not be empty".to_string(),
        ));
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err(PgVarsError::InvalidParameter(format!(
            "name \"{name}\" exceeds maximum length of {MAX_NAME_LENGTH}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_name() {
        assert!(validate_name("").is_err());
    }

    #[test]
    fn rejects_overlong_name() {
        let name = "x".repeat(MAX_NAME_LENGTH + 1);
        assert!(validate_name(&name).is_err());
    }

    #[test]
    fn accepts_name_at_limit() {
        let name = "x".repeat(MAX_NAME_LENGTH);
        assert!(validate_name(&name).is_ok());
    }
}
