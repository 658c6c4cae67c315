//! Configuration loading from disk.

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::DoorkeeperConfig;
use crate::config::validation::ValidationError;

const ENV_PREFIX: &str = "${ENV:";
const ENV_SUFFIX: &str = "}$";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<Vec<ValidationError>> for ConfigError {
    fn from(errors: Vec<ValidationError>) -> Self {
        ConfigError::Validation(errors)
    }
}

/// Load a YAML configuration file, expanding `${ENV:NAME}$` placeholders.
///
/// The result is only parsed; `policy::Engine::from_config` validates and compiles it.
pub fn load_config(path: &Path) -> Result<DoorkeeperConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}

/// Parse a configuration document held in memory.
pub fn parse_config(content: &str) -> Result<DoorkeeperConfig, ConfigError> {
    let expanded = expand_env(content, |name| std::env::var(name).ok());
    let config: DoorkeeperConfig = serde_yaml::from_str(&expanded)?;
    Ok(config)
}

/// Replace every `${ENV:NAME}$` with `lookup(NAME)`; unknown names stay untouched.
pub fn expand_env<F>(content: &str, lookup: F) -> Cow<'_, str>
where
    F: Fn(&str) -> Option<String>,
{
    if !content.contains(ENV_PREFIX) {
        return Cow::Borrowed(content);
    }

    let mut out = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(start) = rest.find(ENV_PREFIX) {
        out.push_str(&rest[..start]);
        let after_prefix = &rest[start + ENV_PREFIX.len()..];

        let Some(end) = after_prefix.find(ENV_SUFFIX) else {
            // Unterminated placeholder: keep the remainder verbatim.
            out.push_str(&rest[start..]);
            return Cow::Owned(out);
        };

        let name = &after_prefix[..end];
        if !is_env_name(name) {
            out.push_str(ENV_PREFIX);
            rest = after_prefix;
            continue;
        }

        let placeholder_len = ENV_PREFIX.len() + end + ENV_SUFFIX.len();
        match lookup(name) {
            Some(value) => out.push_str(&value),
            None => out.push_str(&rest[start..start + placeholder_len]),
        }
        rest = &rest[start + placeholder_len..];
    }

    out.push_str(rest);
    Cow::Owned(out)
}

fn is_env_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "HMAC_KEY" => Some("deadbeef".to_string()),
            "PORT" => Some("9000".to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_expand_known_variables() {
        let out = expand_env("key: ${ENV:HMAC_KEY}$\nport: ${ENV:PORT}$", lookup);
        assert_eq!(out, "key: deadbeef\nport: 9000");
    }

    #[test]
    fn test_unknown_variable_left_untouched() {
        let out = expand_env("key: ${ENV:NOPE}$ tail", lookup);
        assert_eq!(out, "key: ${ENV:NOPE}$ tail");
    }

    #[test]
    fn test_shell_style_is_not_expanded() {
        let out = expand_env("a: ${HMAC_KEY} b: $HMAC_KEY", lookup);
        assert_eq!(out, "a: ${HMAC_KEY} b: $HMAC_KEY");
    }

    #[test]
    fn test_unterminated_placeholder() {
        let out = expand_env("a: ${ENV:HMAC_KEY} b", lookup);
        assert_eq!(out, "a: ${ENV:HMAC_KEY} b");
    }

    #[test]
    fn test_invalid_name_does_not_swallow_next_placeholder() {
        let out = expand_env("a: ${ENV:not valid} b: ${ENV:PORT}$", lookup);
        assert_eq!(out, "a: ${ENV:not valid} b: 9000");
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_config(Path::new("/nonexistent/doorkeeper.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "logLevel: debug\nport: \"8081\"\naddress: 127.0.0.1").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.bind_address(), "127.0.0.1:8081");
        assert_eq!(config.timeouts.request_secs, 10);
    }

    #[test]
    fn test_parse_error() {
        let err = parse_config("authorizations: {not: [a list}").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
