// ABOUTME: Secret values given literally or by reference to an environment variable.
// ABOUTME: Used for the push token so it need not be committed to the config file.

use crate::error::{Error, Result};
use serde::Deserialize;

#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum EnvValue {
    Literal(String),
    FromEnv {
        #[serde(rename = "env")]
        var: String,
        #[serde(default)]
        default: Option<String>,
    },
}

impl EnvValue {
    pub fn resolve(&self) -> Result<String> {
        match self {
            EnvValue::Literal(s) => Ok(s.clone()),
            EnvValue::FromEnv { var, default } => match std::env::var(var) {
                Ok(val) => Ok(val),
                Err(_) => default
                    .clone()
                    .ok_or_else(|| Error::MissingEnvVar(var.clone())),
            },
        }
    }
}

// Tokens end up in debug output of the config otherwise.
impl std::fmt::Debug for EnvValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnvValue::Literal(_) => f.write_str("Literal(***)"),
            EnvValue::FromEnv { var, .. } => f.debug_struct("FromEnv").field("env", var).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_resolves_to_itself() {
        let value = EnvValue::Literal("abc".to_string());
        assert_eq!(value.resolve().unwrap(), "abc");
    }

    #[test]
    fn env_reference_reads_variable() {
        let value: EnvValue = serde_yaml::from_str("env: PAGEPUSH_TEST_TOKEN_SET").unwrap();
        temp_env::with_var("PAGEPUSH_TEST_TOKEN_SET", Some("secret"), || {
            assert_eq!(value.resolve().unwrap(), "secret");
        });
    }

    #[test]
    fn missing_variable_uses_default_or_errors() {
        let with_default: EnvValue =
            serde_yaml::from_str("{ env: PAGEPUSH_TEST_TOKEN_UNSET, default: fb }").unwrap();
        let without: EnvValue = serde_yaml::from_str("env: PAGEPUSH_TEST_TOKEN_UNSET").unwrap();
        temp_env::with_var_unset("PAGEPUSH_TEST_TOKEN_UNSET", || {
            assert_eq!(with_default.resolve().unwrap(), "fb");
            assert!(matches!(without.resolve(), Err(Error::MissingEnvVar(_))));
        });
    }

    #[test]
    fn debug_hides_literal() {
        let value = EnvValue::Literal("hunter2".to_string());
        assert!(!format!("{value:?}").contains("hunter2"));
    }
}
