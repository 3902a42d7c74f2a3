use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
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

    pub fn allocation_failed(name: impl Into<String>) -> Error {
        Error(ErrorKind::AllocationFailed { name: name.into() }.into())
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Error {
        Error(
            ErrorKind::Io {
                context: context.into(),
                source,
            }
            .into(),
        )
    }

    /// Returns `true` if this error reports a failed segment acquisition.
    pub fn is_allocation_failed(&self) -> bool {
        matches!(self.kind(), ErrorKind::AllocationFailed { .. })
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("failed to allocate storage segment '{name}'")]
    AllocationFailed { name: String },

    #[error("IO error for '{context}': {source}'")]
    Io {
        context: String,
        source: std::io::Error,
    },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::io("", e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let e = Error::allocation_failed("young-gen");
        assert!(e.is_allocation_failed());
        assert_eq!(
            e.to_string(),
            "failed to allocate storage segment 'young-gen'"
        );

        let e = Error::invalid_arg("segment_size", "must be a power of two");
        assert!(!e.is_allocation_failed());
        assert_eq!(
            e.to_string(),
            "invalid argument segment_size: must be a power of two"
        );

        let e: Error = std::io::Error::from(std::io::ErrorKind::OutOfMemory).into();
        match e.into_kind() {
            ErrorKind::Io { context, source } => {
                assert!(context.is_empty());
                assert_eq!(source.kind(), std::io::ErrorKind::OutOfMemory);
            }
            other => panic!("unexpected error kind: {other:?}"),
        }
    }
}
