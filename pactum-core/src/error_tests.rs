#[cfg(test)]
mod tests {
    use crate::error::*;

    // ===== Error Creation Tests =====

    #[test]
    fn test_invalid_term_error() {
        let err = Error::InvalidTerm("coefficient of x is NaN".to_string());
        assert_eq!(err.to_string(), "Invalid term: coefficient of x is NaN");
    }

    #[test]
    fn test_missing_assignment_error() {
        let err = Error::MissingAssignment("soc".to_string());
        assert_eq!(err.to_string(), "Missing assignment for variable: soc");
    }

    #[test]
    fn test_syntax_error() {
        let err = Error::Syntax("unexpected token `*`".to_string());
        assert_eq!(err.to_string(), "Syntax error: unexpected token `*`");
    }

    #[test]
    fn test_elimination_failed_error() {
        let err = Error::EliminationFailed("no multipliers for x <= 1".to_string());
        assert_eq!(
            err.to_string(),
            "Elimination failed: no multipliers for x <= 1"
        );
    }

    #[test]
    fn test_oracle_error() {
        let err = Error::Oracle("backend panicked".to_string());
        assert_eq!(err.to_string(), "Oracle error: backend panicked");
    }

    // ===== Classification Tests =====

    #[test]
    fn test_oracle_failure_classification() {
        assert!(Error::Oracle("timeout".to_string()).is_oracle_failure());
        assert!(!Error::InvalidTerm("inf".to_string()).is_oracle_failure());
        assert!(!Error::MissingAssignment("x".to_string()).is_oracle_failure());
    }

    #[test]
    fn test_result_propagation() {
        fn inner() -> Result<f64> {
            Err(Error::MissingAssignment("y".to_string()))
        }

        fn outer() -> Result<f64> {
            let value = inner()?;
            Ok(value + 1.0)
        }

        assert_eq!(
            outer(),
            Err(Error::MissingAssignment("y".to_string()))
        );
    }
}
