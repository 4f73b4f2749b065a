//! Element model errors

use thiserror::Error;

/// Errors raised while loading or querying elements
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ElementError {
    /// Metadata handed over by the front end could not be parsed
    #[error("Invalid annotation metadata: {message}")]
    InvalidMetadata {
        /// Parser message
        message: String,
    },

    /// Element description could not be parsed
    #[error("Invalid element: {message}")]
    InvalidElement {
        /// Parser message
        message: String,
    },

    /// Primitive name that does not exist
    #[error("Unknown primitive type: {name}")]
    UnknownPrimitive {
        /// Offending name
        name: String,
    },
}
