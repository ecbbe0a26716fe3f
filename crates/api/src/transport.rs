use alloc::{boxed::Box, string::String};
use async_trait::async_trait;
use core::{
    fmt::{self, Display},
    num::NonZeroU64,
};
use model::PollKind;

#[derive(Debug)]
pub enum TransportError {
    /// The platform refused the payload before sending it.
    Rejected,
    /// The request did not go through.
    Unreachable,
    /// The platform acknowledged with something we could not read.
    Malformed,
}

impl Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Rejected => "payload rejected by the chat platform",
            Self::Unreachable => "chat platform unreachable",
            Self::Malformed => "malformed acknowledgment from the chat platform",
        })
    }
}

pub type Result<T> = core::result::Result<T, TransportError>;

/// A question rendered for delivery.
pub struct Poll<'a> {
    pub prompt: &'a str,
    pub options: &'a [String],
    pub kind: PollKind,
}

/// Acknowledgment of a delivered poll.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    /// Identifier the platform assigned to the poll. Answers refer back to it.
    pub token: Box<str>,
    /// Name of the recipient, if the platform reported one.
    pub display_name: Option<String>,
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_message(&self, to: NonZeroU64, text: &str) -> Result<()>;
    async fn send_poll(&self, to: NonZeroU64, poll: &Poll<'_>) -> Result<Receipt>;
}
