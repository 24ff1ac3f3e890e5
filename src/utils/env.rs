/// Get environment variable with TIDEGATE_ prefix, falling back to the
/// unprefixed version
///
/// Checks `TIDEGATE_{key}` first, then `{key}`, so deployments can scope
/// their variables without breaking standard naming.
///
/// # Examples
///
/// ```rust
/// use tidegate::utils::get_env_with_prefix;
///
/// // Checks TIDEGATE_SESSION_SECRET_KEY first, then SESSION_SECRET_KEY
/// let secret = get_env_with_prefix("SESSION_SECRET_KEY");
/// ```
pub fn get_env_with_prefix(key: &str) -> Option<String> {
    std::env::var(format!("TIDEGATE_{}", key))
        .or_else(|_| std::env::var(key))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_env_with_prefix() {
        unsafe {
            std::env::set_var("TIDEGATE_TEST_VAR", "prefixed_value");
        }
        assert_eq!(
            get_env_with_prefix("TEST_VAR"),
            Some("prefixed_value".to_string())
        );
        unsafe {
            std::env::remove_var("TIDEGATE_TEST_VAR");
        }

        unsafe {
            std::env::set_var("FALLBACK_VAR", "unprefixed_value");
        }
        assert_eq!(
            get_env_with_prefix("FALLBACK_VAR"),
            Some("unprefixed_value".to_string())
        );
        unsafe {
            std::env::remove_var("FALLBACK_VAR");
        }

        assert_eq!(get_env_with_prefix("NON_EXISTENT_VAR"), None);
    }
}
