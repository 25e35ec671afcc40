//! Classified upstream failures

use thiserror::Error;

/// Why a single outbound call did not produce a JSON body.
///
/// Created at the transport boundary and consumed by the caller of the
/// dispatcher; it never outlives the request that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamFailure {
    /// The call exceeded its deadline
    #[error("upstream call timed out")]
    Timeout,

    /// The upstream answered with a non-2xx status; `body` is kept verbatim
    #[error("upstream returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Connection refused, undecodable body, or anything else
    #[error("unexpected upstream failure: {description}")]
    Unexpected { description: String },
}

impl UpstreamFailure {
    pub fn unexpected(description: impl Into<String>) -> Self {
        Self::Unexpected {
            description: description.into(),
        }
    }
}
