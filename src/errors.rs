use std::{io, str::Utf8Error, sync::Arc};

use quick_xml::events::attributes::AttrError;
use thiserror::Error;

/// Broad category of a failure, matching the three ways a parse session can end early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The byte source failed.
    Io,
    /// The bytes are not well-formed XML.
    MalformedXml,
    /// Well-formed XML that does not follow the OSM grammar, or values that violate
    /// a domain invariant.
    Grammar,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[source] Arc<io::Error>),

    #[error("malformed XML: {0}")]
    Xml(#[source] quick_xml::Error),

    #[error("malformed XML attribute: {0}")]
    Attribute(#[from] AttrError),

    #[error("invalid UTF-8 in XML: {0}")]
    Encoding(#[from] Utf8Error),

    #[error("document declares encoding `{encoding}`, only UTF-8 can be read")]
    UnsupportedEncoding { encoding: String },

    #[error("input ended inside element `{element}`")]
    Truncated { element: String },

    #[error("end element `{element}` does not close an open element")]
    UnmatchedEndElement { element: String },

    #[error("document has no root element")]
    NoRootElement,

    #[error("misplaced {content}")]
    MisplacedContent { content: String },

    #[error(transparent)]
    Grammar(#[from] GrammarError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(_) => ErrorKind::Io,
            Error::Xml(_)
            | Error::Attribute(_)
            | Error::Encoding(_)
            | Error::UnsupportedEncoding { .. }
            | Error::Truncated { .. }
            | Error::UnmatchedEndElement { .. }
            | Error::NoRootElement
            | Error::MisplacedContent { .. } => ErrorKind::MalformedXml,
            Error::Grammar(_) | Error::Validation(_) => ErrorKind::Grammar,
        }
    }
}

impl From<io::Error> for Error {
    fn from(value: io::Error) -> Self {
        Error::Io(Arc::new(value))
    }
}

// quick-xml wraps failures of the underlying reader; keep those apart from syntax errors.
impl From<quick_xml::Error> for Error {
    fn from(value: quick_xml::Error) -> Self {
        match value {
            quick_xml::Error::Io(err) => Error::Io(err),
            other => Error::Xml(other),
        }
    }
}

/// Well-formed XML that does not match the OSM XML grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    #[error("unexpected start element `{element}` while {state}")]
    UnexpectedStartElement { element: String, state: &'static str },

    #[error("unexpected end element `{element}` while {state}")]
    UnexpectedEndElement { element: String, state: &'static str },

    #[error("unexpected {event} while {state}")]
    UnexpectedEvent { event: &'static str, state: &'static str },

    #[error("element `{element}` is missing attribute `{attribute}`")]
    MissingAttribute { element: String, attribute: &'static str },

    #[error("element `{element}` has invalid value {value:?} for attribute `{attribute}`")]
    InvalidAttribute {
        element: String,
        attribute: &'static str,
        value: String,
    },

    #[error("unknown member type {value:?}")]
    UnknownMemberType { value: String },
}

/// A domain invariant rejected a value at construction time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("latitude {0} out of range (-90, 90)")]
    LatitudeOutOfRange(f64),

    #[error("longitude {0} out of range (-180, 180)")]
    LongitudeOutOfRange(f64),

    #[error("way has {count} node references, more than the limit of {limit}")]
    TooManyNodes { count: usize, limit: usize },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_wrapped_by_quick_xml_stay_io_errors() {
        let source = io::Error::new(io::ErrorKind::ConnectionReset, "peer went away");
        let err: Error = quick_xml::Error::Io(Arc::new(source)).into();

        assert_eq!(err.kind(), ErrorKind::Io);
        match err {
            Error::Io(cause) => assert_eq!(cause.kind(), io::ErrorKind::ConnectionReset),
            other => panic!("expected an I/O error, got {other:?}"),
        }
    }

    #[test]
    fn grammar_errors_name_element_and_attribute() {
        let err: Error = GrammarError::MissingAttribute {
            element: "bounds".to_string(),
            attribute: "minlat",
        }
        .into();

        assert_eq!(err.kind(), ErrorKind::Grammar);
        assert_eq!(err.to_string(), "element `bounds` is missing attribute `minlat`");
    }

    #[test]
    fn validation_errors_are_grammar_errors() {
        let err: Error = ValidationError::LatitudeOutOfRange(91.0).into();
        assert_eq!(err.kind(), ErrorKind::Grammar);
    }
}
