//! Request rewriting applied before any authorization check.
//!
//! # Responsibilities
//! - Rewrite the request path (PATH modifiers)
//! - Rewrite a named header value (HEADER modifiers)
//!
//! # Design Decisions
//! - Modifiers run in configured order, every one of them, every time
//! - Replace-all semantics with `$1` / `${name}` back-references
//! - Mutates the request view owned by the current evaluation only

use axum::http::{HeaderName, HeaderValue};
use regex::Regex;

use crate::policy::request::CheckRequest;

#[derive(Debug, Clone)]
pub enum Modifier {
    Path {
        pattern: Regex,
        replace: String,
    },
    Header {
        name: HeaderName,
        pattern: Regex,
        replace: String,
    },
}

impl Modifier {
    pub fn kind(&self) -> &'static str {
        match self {
            Modifier::Path { .. } => "Path",
            Modifier::Header { .. } => "Header",
        }
    }

    pub fn apply(&self, request: &mut CheckRequest) {
        match self {
            Modifier::Path { pattern, replace } => {
                let rewritten = pattern.replace_all(&request.path, replace.as_str());
                request.path = rewritten.into_owned();
            }
            Modifier::Header { name, pattern, replace } => {
                let current = request.headers.get(name).and_then(|v| v.to_str().ok());
                let was_present = current.is_some();
                let rewritten = pattern
                    .replace_all(current.unwrap_or_default(), replace.as_str())
                    .into_owned();

                if !was_present && rewritten.is_empty() {
                    return;
                }

                match HeaderValue::from_str(&rewritten) {
                    Ok(value) => {
                        request.headers.insert(name.clone(), value);
                    }
                    Err(_) => {
                        tracing::debug!(
                            header = %name,
                            value = %rewritten,
                            "Header modifier produced an invalid value, header left unchanged"
                        );
                    }
                }
            }
        }
    }
}

/// Ordered modifier list.
#[derive(Debug, Clone, Default)]
pub struct ModifierPipeline {
    modifiers: Vec<Modifier>,
}

impl ModifierPipeline {
    pub fn new(modifiers: Vec<Modifier>) -> Self {
        Self { modifiers }
    }

    pub fn len(&self) -> usize {
        self.modifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modifiers.is_empty()
    }

    pub fn apply(&self, request: &mut CheckRequest) {
        for modifier in &self.modifiers {
            modifier.apply(request);
            tracing::trace!(modifier = modifier.kind(), path = %request.path, "Modifier applied");
        }
    }
}
