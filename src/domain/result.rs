//! Result type alias for Clinguard

use super::errors::GuardError;

/// Result type alias for Clinguard operations
///
/// # Examples
///
/// ```
/// use clinguard::domain::result::Result;
/// use clinguard::domain::errors::GuardError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(GuardError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, GuardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_with_question_mark() -> Result<()> {
        fn inner() -> Result<i32> {
            Ok(42)
        }

        let value = inner()?;
        assert_eq!(value, 42);
        Ok(())
    }
}
