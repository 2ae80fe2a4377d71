//! Purpose: Define the codec capability the dispatcher races and the cooperative cancel signal.
//! Exports: `Codec`, `CodecError`, `CancelToken`.
//! Role: Seam between the dispatcher core and concrete format adapters.
//! Invariants: Codecs report failure through `Err`, never by mutating shared state.
//! Invariants: A cancelled token stays cancelled; cancellation is advisory for codecs.
use std::error::Error as StdError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Failure produced by a single codec attempt.
pub type CodecError = Box<dyn StdError + Send + Sync + 'static>;

/// One data format able to encode and decode values of type `T`.
///
/// `unmarshal` returns a fresh value, so every attempt works on its own
/// instance and nothing is shared between concurrent attempts.
pub trait Codec<T>: Send + Sync {
    /// Stable identifier used in aggregated errors and `Committed::codec`.
    fn name(&self) -> &str;

    fn marshal(&self, value: &T) -> Result<Vec<u8>, CodecError>;

    fn unmarshal(&self, bytes: &[u8]) -> Result<T, CodecError>;

    /// Like `marshal`, for codecs able to stop early once `cancel` fires.
    fn marshal_with_cancel(&self, value: &T, _cancel: &CancelToken) -> Result<Vec<u8>, CodecError> {
        self.marshal(value)
    }

    /// Like `unmarshal`, for codecs able to stop early once `cancel` fires.
    fn unmarshal_with_cancel(&self, bytes: &[u8], _cancel: &CancelToken) -> Result<T, CodecError> {
        self.unmarshal(bytes)
    }
}

#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
