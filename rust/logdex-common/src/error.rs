use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

pub type StdErrorBoxed = Box<dyn std::error::Error + Send + Sync + 'static>;

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    /// Returns `true` if the operation was abandoned because its cancellation
    /// token fired.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.kind(), ErrorKind::Cancelled)
    }

    pub fn invalid_format(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidFormat {
                element: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidArgument {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_pattern(message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidPattern {
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn capacity_exceeded(requested: usize, capacity: usize) -> Error {
        Error(
            ErrorKind::CapacityExceeded {
                requested,
                capacity,
            }
            .into(),
        )
    }

    pub fn cancelled() -> Error {
        Error(ErrorKind::Cancelled.into())
    }

    pub fn storage<E>(context: impl Into<String>, source: E) -> Error
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error(
            ErrorKind::Storage {
                context: context.into(),
                source: Box::new(source),
            }
            .into(),
        )
    }

    pub fn codec<E>(context: impl Into<String>, source: E) -> Error
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error(
            ErrorKind::Codec {
                context: context.into(),
                source: Box::new(source),
            }
            .into(),
        )
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("invalid pattern: {message}")]
    InvalidPattern { message: String },

    #[error("pattern needs {requested} worker slots, pool capacity is {capacity}")]
    CapacityExceeded { requested: usize, capacity: usize },

    #[error("operation cancelled")]
    Cancelled,

    #[error("invalid storage format for '{element}': {message}")]
    InvalidFormat { element: String, message: String },

    #[error("storage error: {context}")]
    Storage {
        context: String,
        source: StdErrorBoxed,
    },

    #[error("codec error: {context}")]
    Codec {
        context: String,
        source: StdErrorBoxed,
    },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}

impl From<bincode::error::EncodeError> for Error {
    fn from(e: bincode::error::EncodeError) -> Self {
        Error::codec("encode", e)
    }
}

impl From<bincode::error::DecodeError> for Error {
    fn from(e: bincode::error::DecodeError) -> Self {
        Error::codec("decode", e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::storage("io", e)
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, ErrorKind};

    #[test]
    fn test_error_kinds() {
        let e = Error::cancelled();
        assert!(e.is_cancelled());
        assert_eq!(e.to_string(), "operation cancelled");

        let e = Error::capacity_exceeded(12, 8);
        assert!(!e.is_cancelled());
        assert!(matches!(
            e.kind(),
            ErrorKind::CapacityExceeded {
                requested: 12,
                capacity: 8
            }
        ));

        let e = Error::invalid_pattern("all positions are wildcards");
        assert_eq!(
            e.to_string(),
            "invalid pattern: all positions are wildcards"
        );
    }
}
