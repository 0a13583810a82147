//! Error types for the ring exercises.

use crate::topology::Rank;
use thiserror::Error;
use tokio_util::codec::LinesCodecError;

/// Result type used across the crate.
pub type Result<T> = std::result::Result<T, RingError>;

/// Broad class of a [`RingError`]. Both are fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad ring size, rank or command-line argument.
    Configuration,
    /// Neighbor unreachable, channel closed or garbage on the wire.
    Transport,
}

#[derive(Error, Debug)]
pub enum RingError {
    #[error("invalid ring size {0}: a ring needs at least one participant")]
    InvalidRingSize(usize),

    #[error("rank {rank} is outside a ring of {size}")]
    InvalidRank { rank: Rank, size: usize },

    #[error("invalid value {value:?} for `{name}`: {reason}")]
    InvalidArgument {
        name: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("missing argument `{0}`")]
    MissingArgument(&'static str),

    #[error("unknown argument `{0}`")]
    UnknownArgument(String),

    #[error("rank {0} is not the coordinator")]
    NotCoordinator(Rank),

    #[error("neighbor at {address} is unreachable: {source}")]
    Unreachable {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("channel from rank {0} closed")]
    ChannelClosed(Rank),

    #[error("unexpected message: {0}")]
    UnexpectedMessage(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("framing error: {0}")]
    Codec(#[from] LinesCodecError),

    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("participant task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl RingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRingSize(_)
            | Self::InvalidRank { .. }
            | Self::InvalidArgument { .. }
            | Self::MissingArgument(_)
            | Self::UnknownArgument(_)
            | Self::NotCoordinator(_) => ErrorKind::Configuration,
            Self::Unreachable { .. }
            | Self::ChannelClosed(_)
            | Self::UnexpectedMessage(_)
            | Self::Io(_)
            | Self::Codec(_)
            | Self::Json(_)
            | Self::Join(_) => ErrorKind::Transport,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_errors() {
        assert_eq!(RingError::InvalidRingSize(0).kind(), ErrorKind::Configuration);
        assert_eq!(RingError::NotCoordinator(2).kind(), ErrorKind::Configuration);
        assert_eq!(RingError::ChannelClosed(1).kind(), ErrorKind::Transport);

        let json = serde_json::from_str::<u64>("not a number").unwrap_err();
        assert_eq!(RingError::from(json).kind(), ErrorKind::Transport);
    }

    #[test]
    fn messages_name_the_culprit() {
        let e = RingError::InvalidRank { rank: 4, size: 4 };
        assert_eq!(e.to_string(), "rank 4 is outside a ring of 4");
    }
}
