use crate::transport::TransportError;
use core::fmt::{self, Display};

#[derive(Debug)]
pub enum Error {
    /// No subscriber is registered under the given ID.
    UnknownSubscriber,
    /// The subscriber's section has no loaded quiz.
    UnknownSection,
    /// The quiz cannot produce a well-formed question.
    DataQuality,
    Transport(TransportError),
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        Self::Transport(err)
    }
}

impl From<model::quiz::Error> for Error {
    fn from(_: model::quiz::Error) -> Self {
        Self::DataQuality
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSubscriber => f.write_str("unknown subscriber"),
            Self::UnknownSection => f.write_str("no quiz is loaded for this section"),
            Self::DataQuality => f.write_str("quiz cannot produce a well-formed question"),
            Self::Transport(err) => write!(f, "transport failure: {err}"),
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;
