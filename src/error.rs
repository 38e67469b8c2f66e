//! Symbolic error kinds surfaced by the rendezvous (see the error handling
//! design section of the spec). Collective operations detect failure the
//! same way on every rank: each phase ends with an all-reduce of a local
//! failure flag, so a failure on any rank is observed on all of them.

/// Errors produced while building or querying a [`crate::Rendezvous`].
///
/// `PointNotFound` is intentionally absent here: it is not an exceptional
/// condition, and is instead encoded as the [`crate::SENTINEL`] ordinal
/// returned by `get_elements`.
#[derive(Debug, thiserror::Error)]
pub enum RendezvousError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("RCB partitioning failed: {0}")]
    PartitionError(String),

    #[error("communication failed: {0}")]
    CommunicationError(String),
}

pub type Result<T> = std::result::Result<T, RendezvousError>;
