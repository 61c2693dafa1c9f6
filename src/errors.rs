use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::result::Result as StdResult;

/// An error triggered by the graph's underlying storage, indices, or
/// mutation entry points.
#[derive(Debug)]
pub enum Error {
    /// A property key was blank, reserved, or otherwise invalid.
    InvalidPropertyKey,
    /// A property value was absent and the graph is configured to reject
    /// null values.
    NullValueNotAllowed,
    /// An insert would violate `Cardinality::Set` by duplicating an existing
    /// value under the same key.
    DuplicateSetValue,
    /// Multi-properties are disabled for this graph.
    MultiPropertyNotSupported,
    /// Meta-properties are disabled for this graph.
    MetaPropertyNotSupported,
    /// A vertex or edge id is already taken.
    IdAlreadyExists,
    /// The operation targeted a tombstoned element.
    ElementRemoved,
    /// `other_vertex_id` was called with a vertex that the edge does not
    /// touch.
    VertexNotIncident,
    /// The referenced vertex is not in the graph.
    VertexNotFound,
    /// The referenced edge is not in the graph.
    EdgeNotFound,
    /// The range index received a value that cannot be ordered against the
    /// values already stored under the key.
    NonComparableRangeValue,
    /// Index creation was requested for a class that is not vertex or edge.
    IndexClassInvalid,
    /// A composite index definition had fewer than two keys, or duplicate
    /// keys.
    InvalidIndexDefinition,
    /// A lookup hit an index that does not cover the requested key(s).
    NotIndexed,
    /// External input (codec records, serialized images) could not be
    /// interpreted.
    MalformedExternalInput(String),
    /// A label or key failed validation.
    Validation(ValidationError),
    /// An I/O error from a storage backend.
    Io(io::Error),
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Validation(err) => Some(err),
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidPropertyKey => write!(f, "invalid or reserved property key"),
            Error::NullValueNotAllowed => write!(f, "null property values are not allowed"),
            Error::DuplicateSetValue => write!(f, "duplicate value for set cardinality property"),
            Error::MultiPropertyNotSupported => write!(f, "multi-properties are not supported"),
            Error::MetaPropertyNotSupported => write!(f, "meta-properties are not supported"),
            Error::IdAlreadyExists => write!(f, "id already exists"),
            Error::ElementRemoved => write!(f, "element has been removed"),
            Error::VertexNotIncident => write!(f, "vertex is not incident to this edge"),
            Error::VertexNotFound => write!(f, "vertex does not exist"),
            Error::EdgeNotFound => write!(f, "edge does not exist"),
            Error::NonComparableRangeValue => {
                write!(f, "value is not comparable to the values indexed under this key")
            }
            Error::IndexClassInvalid => write!(f, "indices may only be created for vertices or edges"),
            Error::InvalidIndexDefinition => {
                write!(f, "composite indices need at least two distinct keys")
            }
            Error::NotIndexed => write!(f, "queried key(s) are not indexed"),
            Error::MalformedExternalInput(msg) => write!(f, "malformed external input: {}", msg),
            Error::Validation(err) => write!(f, "validation failed: {}", err),
            Error::Io(err) => write!(f, "i/o error: {}", err),
        }
    }
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Self {
        Error::Validation(err)
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

pub type Result<T> = StdResult<T, Error>;

/// A validation failure on a label or property key.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ValidationError {
    /// The value is empty.
    Empty,
    /// The value is longer than 255 characters.
    ValueTooLong,
    /// The value contains characters outside `[A-Za-z0-9_-]`.
    InvalidValue,
}

impl StdError for ValidationError {}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Empty => write!(f, "value is empty"),
            ValidationError::ValueTooLong => write!(f, "value is longer than 255 characters"),
            ValidationError::InvalidValue => write!(f, "value contains invalid characters"),
        }
    }
}

pub type ValidationResult<T> = StdResult<T, ValidationError>;
