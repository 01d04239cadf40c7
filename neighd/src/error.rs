//! The crate's sole fallible-boundary error type.

use thiserror::Error;

/// Errors that can cross a public API boundary of this crate.
///
/// Parsing/validation failures inside reception paths are not represented
/// here — those are swallowed with a counter increment and a `warn` log,
/// never unwound to the caller (see `CacheStats` and the reception code in
/// `arp`/`ndp`). This enum is reserved for failures a caller must react to.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("no local handler for protocol {0:#x}")]
    ProtocolUnsupported(u16),

    #[error("protocol violation: {0}")]
    ProtocolViolation(&'static str),

    #[error("no default router for off-link destination")]
    NoGateway,

    #[error("framing error: {0}")]
    FramingError(#[from] std::io::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;
