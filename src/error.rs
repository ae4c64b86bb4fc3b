use crate::selector::SelectorError;
use std::fmt;

#[derive(Debug)]
pub enum GlossaryError {
    /// A required element could not be located.
    MissingElement {
        role: &'static str,
        selector: String,
    },
    InvalidSelector(SelectorError),
    Terms(serde_json::Error),
    Io(std::io::Error),
    /// A call into the host DOM failed.
    Dom(String),
}

impl fmt::Display for GlossaryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GlossaryError::MissingElement { role, selector } => {
                write!(f, "no {role} element matches {selector:?}")
            }
            GlossaryError::InvalidSelector(err) => write!(f, "invalid selector: {err}"),
            GlossaryError::Terms(err) => write!(f, "invalid glossary data: {err}"),
            GlossaryError::Io(err) => write!(f, "io error: {err}"),
            GlossaryError::Dom(message) => write!(f, "dom error: {message}"),
        }
    }
}

impl std::error::Error for GlossaryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GlossaryError::InvalidSelector(err) => Some(err),
            GlossaryError::Terms(err) => Some(err),
            GlossaryError::Io(err) => Some(err),
            GlossaryError::MissingElement { .. } | GlossaryError::Dom(_) => None,
        }
    }
}

impl From<SelectorError> for GlossaryError {
    fn from(value: SelectorError) -> Self {
        GlossaryError::InvalidSelector(value)
    }
}

impl From<serde_json::Error> for GlossaryError {
    fn from(value: serde_json::Error) -> Self {
        GlossaryError::Terms(value)
    }
}

impl From<std::io::Error> for GlossaryError {
    fn from(value: std::io::Error) -> Self {
        GlossaryError::Io(value)
    }
}
