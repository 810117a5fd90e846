//! Typed storage path templates.
//!
//! A template such as `mcdonalds-ttm/{agent_id}/{date_str}/{session_id}/` is
//! parsed once when the brand registry loads. Rendering takes typed values, so
//! a placeholder can never be left unsubstituted or filled with the wrong field.

use std::fmt::{Display, Formatter};

use chrono::NaiveDate;
use wipeout_core::{AppError, AppResult};

const AGENT_ID_PLACEHOLDER: &str = "agent_id";
const DATE_PLACEHOLDER: &str = "date_str";
const SESSION_ID_PLACEHOLDER: &str = "session_id";

/// Conversational agent identifier used as one storage path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AgentId(String);

impl AgentId {
    /// Creates a validated agent identifier.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        validate_segment("agent id", value.into()).map(Self)
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Conversation session identifier used as one storage path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Creates a validated session identifier.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        validate_segment("session id", value.into()).map(Self)
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

fn validate_segment(label: &str, value: String) -> AppResult<String> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{label} must not be empty")));
    }

    if value.contains('/') {
        return Err(AppError::Validation(format!(
            "{label} '{value}' must not contain '/'"
        )));
    }

    Ok(value)
}

/// Rendered object key prefix covering every artifact of one session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoragePrefix(String);

impl StoragePrefix {
    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for StoragePrefix {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TemplatePart {
    Literal(String),
    AgentId,
    Date,
    SessionId,
}

/// Parsed storage path template with named placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    source: String,
    parts: Vec<TemplatePart>,
}

impl PathTemplate {
    /// Parses a template with `{agent_id}`, `{date_str}` and `{session_id}`
    /// placeholders.
    ///
    /// Unknown placeholders, unbalanced braces and templates without
    /// `{session_id}` are rejected.
    pub fn parse(value: impl Into<String>) -> AppResult<Self> {
        let source = value.into();
        if source.trim().is_empty() {
            return Err(AppError::Validation(
                "path template must not be empty".to_owned(),
            ));
        }

        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars();

        while let Some(character) = chars.next() {
            match character {
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for inner in chars.by_ref() {
                        if inner == '}' {
                            closed = true;
                            break;
                        }
                        name.push(inner);
                    }

                    if !closed {
                        return Err(AppError::Validation(format!(
                            "path template '{source}' has an unclosed '{{'"
                        )));
                    }

                    let part = match name.as_str() {
                        AGENT_ID_PLACEHOLDER => TemplatePart::AgentId,
                        DATE_PLACEHOLDER => TemplatePart::Date,
                        SESSION_ID_PLACEHOLDER => TemplatePart::SessionId,
                        other => {
                            return Err(AppError::Validation(format!(
                                "path template '{source}' uses unknown placeholder '{{{other}}}'"
                            )));
                        }
                    };

                    if !literal.is_empty() {
                        parts.push(TemplatePart::Literal(std::mem::take(&mut literal)));
                    }
                    parts.push(part);
                }
                '}' => {
                    return Err(AppError::Validation(format!(
                        "path template '{source}' has an unmatched '}}'"
                    )));
                }
                other => literal.push(other),
            }
        }

        if !literal.is_empty() {
            parts.push(TemplatePart::Literal(literal));
        }

        if !parts.contains(&TemplatePart::SessionId) {
            return Err(AppError::Validation(format!(
                "path template '{source}' must contain '{{session_id}}'"
            )));
        }

        Ok(Self { source, parts })
    }

    /// Returns the template exactly as configured.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.source.as_str()
    }

    /// Substitutes the placeholders and returns the session's storage prefix.
    #[must_use]
    pub fn render(
        &self,
        agent_id: &AgentId,
        date: NaiveDate,
        session_id: &SessionId,
    ) -> StoragePrefix {
        let date_str = date.format("%Y-%m-%d").to_string();
        let mut rendered = String::with_capacity(self.source.len() + 32);

        for part in &self.parts {
            match part {
                TemplatePart::Literal(value) => rendered.push_str(value),
                TemplatePart::AgentId => rendered.push_str(agent_id.as_str()),
                TemplatePart::Date => rendered.push_str(date_str.as_str()),
                TemplatePart::SessionId => rendered.push_str(session_id.as_str()),
            }
        }

        StoragePrefix(rendered)
    }
}

impl Display for PathTemplate {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.source.as_str())
    }
}
