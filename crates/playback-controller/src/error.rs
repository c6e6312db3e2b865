use thiserror::Error;

/// Failure reported by an [`AudioEngine`](crate::engine::AudioEngine).
///
/// Engines return these synchronously from `load`/`start`/`pause`, or hand them to
/// [`Completion::failed`](crate::engine::Completion::failed) when the failure is
/// discovered later (unreachable source, decoder error, lost output).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("resource unreachable: {0}")]
    Unreachable(String),
    #[error("decode failure: {0}")]
    Decode(String),
    #[error("output unavailable: {0}")]
    Output(String),
    #[error("engine offline")]
    Offline,
}

/// Errors returned by [`PlaybackController`](crate::PlaybackController) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    /// Malformed or unsupported identifier. Rejected before any state changes.
    #[error("invalid resource {input:?}: {reason}")]
    InvalidResource { input: String, reason: String },
    /// The identifier is already queued and duplicates are disabled.
    #[error("resource already queued: {0}")]
    Duplicate(String),
    /// The operation needs a current item but the queue is empty.
    #[error("queue is empty")]
    EmptyQueue,
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl ControllerError {
    pub(crate) fn invalid(input: impl Into<String>, reason: impl Into<String>) -> Self {
        ControllerError::InvalidResource {
            input: input.into(),
            reason: reason.into(),
        }
    }
}
