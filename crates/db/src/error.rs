use core::fmt::{self, Display};

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    /// The requested row does not exist.
    NotFound,
    /// A row exists but violates the model's invariants.
    Malformed,
    /// Unrecoverable database or connection error.
    Fatal,
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotFound => "row not found",
            Self::Malformed => "row violates model invariants",
            Self::Fatal => "unrecoverable database error",
        })
    }
}

pub type Result<T> = core::result::Result<T, Error>;
