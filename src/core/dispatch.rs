//! Purpose: Provide the multi-codec dispatcher (construction, marshal, unmarshal).
//! Exports: `Dispatcher`, `Committed`.
//! Role: Public core of the crate; picks a scheduling policy and shapes the outcome.
//! Invariants: The codec list is non-empty and immutable after construction.
//! Invariants: Target validation happens before any codec runs.
//! Invariants: The caller's target is written once, after all attempts have joined.
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::core::codec::{CancelToken, Codec, CodecError};
use crate::core::error::{Error, ErrorKind, Operation};
use crate::core::options::{DispatchOptions, Policy};
use crate::core::race;

/// The single accepted result of a dispatcher call.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Committed<V> {
    codec: String,
    value: V,
}

impl<V> Committed<V> {
    /// Name of the codec whose result was committed.
    pub fn codec(&self) -> &str {
        &self.codec
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn into_value(self) -> V {
        self.value
    }

    pub fn into_parts(self) -> (String, V) {
        (self.codec, self.value)
    }
}

/// Races an ordered set of codecs against the same input.
///
/// Under [`Policy::Race`] every call runs all codecs concurrently and keeps the
/// first success, so with codecs of different formats the format of
/// [`Dispatcher::marshal`] output depends on which codec finishes first. Use
/// [`Policy::Sequential`] when the earliest registered codec must win.
pub struct Dispatcher<T> {
    codecs: Vec<Arc<dyn Codec<T>>>,
    options: DispatchOptions,
}

impl<T> Dispatcher<T> {
    pub fn new<I>(codecs: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = Arc<dyn Codec<T>>>,
    {
        Self::with_options(codecs, DispatchOptions::default())
    }

    pub fn with_options<I>(codecs: I, options: DispatchOptions) -> Result<Self, Error>
    where
        I: IntoIterator<Item = Arc<dyn Codec<T>>>,
    {
        let codecs: Vec<_> = codecs.into_iter().collect();
        if codecs.is_empty() {
            return Err(Error::new(ErrorKind::EmptyCodecList)
                .with_message("no codec passed, at least one required")
                .with_hint("Register at least one codec, e.g. `JsonCodec`."));
        }
        if options.timeout_ms == Some(0) {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("timeout_ms must be at least 1")
                .with_hint("Omit `timeout_ms` to wait for every codec."));
        }
        Ok(Self { codecs, options })
    }

    pub fn options(&self) -> &DispatchOptions {
        &self.options
    }

    /// Registered codec names, in registration order.
    pub fn codec_names(&self) -> Vec<&str> {
        self.codecs.iter().map(|codec| codec.name()).collect()
    }
}

impl<T> Dispatcher<T>
where
    T: Send + Sync,
{
    /// Encode `value` with the first codec to succeed.
    ///
    /// Returns after every attempt has joined; fails with `MarshalFailed` when
    /// all codecs error, or `Timeout` when none succeeded by the deadline.
    pub fn marshal(&self, value: &T) -> Result<Vec<u8>, Error> {
        self.marshal_committed(value).map(Committed::into_value)
    }

    /// Same as [`Dispatcher::marshal`], also naming the winning codec.
    pub fn marshal_committed(&self, value: &T) -> Result<Committed<Vec<u8>>, Error> {
        self.dispatch(Operation::Marshal, |codec, cancel| {
            codec.marshal_with_cancel(value, cancel)
        })
    }

    /// Decode `bytes` with the first codec to succeed.
    ///
    /// Returns after every attempt has joined; fails with `UnmarshalFailed` when
    /// all codecs error, or `Timeout` when none succeeded by the deadline.
    pub fn unmarshal(&self, bytes: &[u8]) -> Result<T, Error> {
        self.unmarshal_committed(bytes).map(Committed::into_value)
    }

    /// Same as [`Dispatcher::unmarshal`], also naming the winning codec.
    pub fn unmarshal_committed(&self, bytes: &[u8]) -> Result<Committed<T>, Error> {
        self.dispatch(Operation::Unmarshal, |codec, cancel| {
            codec.unmarshal_with_cancel(bytes, cancel)
        })
    }

    /// Parse `bytes` into `target`, which is left untouched on failure.
    ///
    /// A missing target is rejected with `InvalidTarget` before any codec runs.
    pub fn unmarshal_into(&self, bytes: &[u8], target: Option<&mut T>) -> Result<(), Error> {
        let Some(target) = target else {
            return Err(Error::new(ErrorKind::InvalidTarget)
                .with_message("unmarshal target must be a valid mutable reference"));
        };
        let committed = self.unmarshal_committed(bytes)?;
        *target = committed.into_value();
        Ok(())
    }

    fn dispatch<V, F>(&self, operation: Operation, invoke: F) -> Result<Committed<V>, Error>
    where
        V: Send,
        F: Fn(&dyn Codec<T>, &CancelToken) -> Result<V, CodecError> + Sync,
    {
        let span = tracing::debug_span!(
            "dispatch",
            op = operation.as_str(),
            policy = self.options.policy.as_str(),
            codecs = self.codecs.len()
        );
        let _entered = span.enter();

        let deadline = self
            .options
            .timeout()
            .and_then(|timeout| Instant::now().checked_add(timeout));
        let outcome = match self.options.policy {
            Policy::Race => race::race(&self.codecs, operation, deadline, invoke),
            Policy::Sequential => race::sequential(&self.codecs, operation, deadline, invoke),
        };

        if let Some(winner) = outcome.winner {
            let codec = self.codecs[winner.index].name().to_string();
            tracing::debug!(codec = %codec, "committed result");
            return Ok(Committed {
                codec,
                value: winner.value,
            });
        }

        if outcome.timed_out {
            let timeout_ms = self.options.timeout_ms.unwrap_or_default();
            tracing::warn!(
                op = operation.as_str(),
                timeout_ms,
                failed = outcome.failures.len(),
                "no codec succeeded before the deadline"
            );
            return Err(Error::new(ErrorKind::Timeout)
                .with_message(format!("no codec succeeded within {timeout_ms}ms"))
                .with_hint("Raise the timeout or remove slow codecs.")
                .with_failures(outcome.failures));
        }

        let (kind, message) = match operation {
            Operation::Marshal => (
                ErrorKind::MarshalFailed,
                "every codec failed to marshal the value",
            ),
            Operation::Unmarshal => (
                ErrorKind::UnmarshalFailed,
                "every codec failed to parse the input",
            ),
        };
        Err(Error::new(kind)
            .with_message(message)
            .with_failures(outcome.failures))
    }
}

impl<T> Clone for Dispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            codecs: self.codecs.clone(),
            options: self.options.clone(),
        }
    }
}

impl<T> fmt::Debug for Dispatcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("codecs", &self.codec_names())
            .field("options", &self.options)
            .finish()
    }
}
