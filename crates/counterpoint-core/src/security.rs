use std::env;
use std::fmt;

use crate::PipelineError;

/// Credential that never prints its contents.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretValue(String);

impl SecretValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretValue(***)")
    }
}

impl fmt::Display for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// Read a credential from the environment; unset or blank is an error.
pub fn require_env(var: &str) -> Result<SecretValue, PipelineError> {
    env::var(var)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(SecretValue)
        .ok_or_else(|| PipelineError::MissingSecret(var.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_and_trims_scorer_token() {
        // SAFETY: test-only variable name, not read by any other test.
        unsafe {
            env::set_var("COUNTERPOINT_TEST_SCORER_TOKEN", "  tok-123\n");
        }
        let secret = require_env("COUNTERPOINT_TEST_SCORER_TOKEN").unwrap();
        assert_eq!(secret.expose(), "tok-123");
        assert_eq!(format!("{secret:?}"), "SecretValue(***)");
        assert_eq!(secret.to_string(), "***");
    }

    #[test]
    fn unset_variable_is_missing_secret() {
        let err = require_env("COUNTERPOINT_TEST_TOKEN_UNSET").unwrap_err();
        assert!(matches!(err, PipelineError::MissingSecret(var) if var == "COUNTERPOINT_TEST_TOKEN_UNSET"));
    }
}
