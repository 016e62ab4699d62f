use std::error::Error as StdError;
use std::fmt;

#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The listening socket could not be bound.
    Bind,
    /// The server's async runtime could not be built.
    Runtime,
    /// The server thread could not be spawned.
    Spawn,
}

impl Error {
    pub(crate) fn wrap(error_kind: ErrorKind, source: impl StdError + Send + Sync + 'static) -> Self {
        Error {
            source: Some(Box::new(source)),
            error_kind,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.error_kind {
            ErrorKind::Bind => write!(f, "Failed to bind webhook listener")?,
            ErrorKind::Runtime => write!(f, "Failed to build webhook runtime")?,
            ErrorKind::Spawn => write!(f, "Failed to spawn webhook thread")?,
        }
        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}
