//! Writer errors

use beanforge_bytecode::ClassFileError;
use thiserror::Error;

/// Result alias for writer operations
pub type WriterResult<T> = Result<T, WriterError>;

/// Failures raised by the writers
///
/// Protocol violations by the front end surface as [`WriterError::IllegalState`].
/// Problems with user code are reported through the visitor context instead.
#[derive(Debug, Error)]
pub enum WriterError {
    /// The visitor protocol was violated
    #[error("Illegal state: {message}")]
    IllegalState {
        /// What went wrong
        message: String,
    },

    /// An input cannot be turned into a definition
    #[error("Illegal argument: {message}")]
    IllegalArgument {
        /// What went wrong
        message: String,
    },

    /// Writing class output failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding a class failed
    #[error("Class file error: {0}")]
    ClassFile(#[from] ClassFileError),

    /// Processor options could not be read
    #[error("Invalid options: {message}")]
    Options {
        /// Parser message
        message: String,
    },
}

impl WriterError {
    pub(crate) fn illegal_state(message: impl Into<String>) -> Self {
        WriterError::IllegalState {
            message: message.into(),
        }
    }

    pub(crate) fn illegal_argument(message: impl Into<String>) -> Self {
        WriterError::IllegalArgument {
            message: message.into(),
        }
    }
}
