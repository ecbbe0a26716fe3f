use core::fmt::{self, Display};

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    UnsupportedInteraction,
    UnknownCommandName,
    InvalidParams,
    UnknownChannel,
    NotRegistered,
    InvalidInterval,
    UnknownSection,
    Delivery,
    Fatal,
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::UnsupportedInteraction => "This interaction is not supported.",
            Self::UnknownCommandName => "This command does not exist.",
            Self::InvalidParams => "Invalid parameters. Please check the command arguments.",
            Self::UnknownChannel => "This command must be used in a channel.",
            Self::NotRegistered => "This channel is not subscribed yet. Use `/start` to begin receiving questions.",
            Self::InvalidInterval => "The interval must be between one hour and one year.",
            Self::UnknownSection => "That section does not exist.",
            Self::Delivery => "We could not send you a question right now. Please try again later.",
            Self::Fatal => "Oops! We encountered a logic error on our end. This is a bug.",
        })
    }
}

pub type Result<T> = core::result::Result<T, Error>;
