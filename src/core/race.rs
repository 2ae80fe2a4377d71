//! Purpose: Run one operation against every codec and keep the first success.
//! Exports: `race`, `sequential`, `Outcome`, `Winner` (crate-internal).
//! Role: Scheduling engine behind `Dispatcher`; knows nothing about formats.
//! Invariants: Only the calling thread commits a winner; at most one is ever committed.
//! Invariants: Every spawned attempt is joined before `race` returns.
//! Invariants: Results keep being collected past the deadline, so a late success still commits.
//! Invariants: A panicking codec is recorded as that codec's failure.
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Instant;

use crate::core::codec::{CancelToken, Codec, CodecError};
use crate::core::error::{CodecFailure, CodecFailures, Operation};

pub(crate) struct Winner<V> {
    pub(crate) index: usize,
    pub(crate) value: V,
}

pub(crate) struct Outcome<V> {
    pub(crate) winner: Option<Winner<V>>,
    pub(crate) failures: CodecFailures,
    pub(crate) timed_out: bool,
}

impl<V> Outcome<V> {
    fn new() -> Self {
        Self {
            winner: None,
            failures: CodecFailures::new(),
            timed_out: false,
        }
    }

    fn record_failure<T>(&mut self, codec: &dyn Codec<T>, operation: Operation, err: CodecError) {
        tracing::debug!(
            codec = codec.name(),
            op = operation.as_str(),
            error = %err,
            "codec attempt failed"
        );
        self.failures
            .push(CodecFailure::new(codec.name(), operation, err));
    }
}

enum Attempt<V> {
    Finished(Result<V, CodecError>),
    Skipped,
}

/// Spawn one scoped thread per codec and commit the first `Ok` that arrives.
pub(crate) fn race<T, V, F>(
    codecs: &[Arc<dyn Codec<T>>],
    operation: Operation,
    deadline: Option<Instant>,
    invoke: F,
) -> Outcome<V>
where
    V: Send,
    F: Fn(&dyn Codec<T>, &CancelToken) -> Result<V, CodecError> + Sync,
{
    let cancel = CancelToken::new();
    let invoke = &invoke;
    let (event_tx, event_rx) = mpsc::channel::<(usize, Attempt<V>)>();

    thread::scope(|scope| {
        for (index, codec) in codecs.iter().enumerate() {
            let event_tx = event_tx.clone();
            let cancel = cancel.clone();
            scope.spawn(move || {
                let attempt = if cancel.is_cancelled() {
                    Attempt::Skipped
                } else {
                    Attempt::Finished(guarded(|| invoke(codec.as_ref(), &cancel)))
                };
                let _ = event_tx.send((index, attempt));
            });
        }
        drop(event_tx);

        let mut outcome = Outcome::new();
        loop {
            let received = match deadline.filter(|_| !outcome.timed_out) {
                Some(deadline) => {
                    let wait_for = deadline.saturating_duration_since(Instant::now());
                    match event_rx.recv_timeout(wait_for) {
                        Ok(event) => event,
                        Err(RecvTimeoutError::Timeout) => {
                            tracing::debug!("deadline passed, cancelling attempts in flight");
                            outcome.timed_out = true;
                            cancel.cancel();
                            continue;
                        }
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                None => match event_rx.recv() {
                    Ok(event) => event,
                    Err(_) => break,
                },
            };

            let (index, attempt) = received;
            let codec = codecs[index].as_ref();
            match attempt {
                Attempt::Finished(Ok(value)) => {
                    if outcome.winner.is_none() {
                        outcome.winner = Some(Winner { index, value });
                        cancel.cancel();
                    } else {
                        tracing::trace!(codec = codec.name(), "discarding late success");
                    }
                }
                Attempt::Finished(Err(err)) => outcome.record_failure(codec, operation, err),
                Attempt::Skipped => {
                    tracing::trace!(codec = codec.name(), "attempt skipped after cancel");
                }
            }
        }
        outcome
    })
}

/// Try codecs one at a time in registration order.
pub(crate) fn sequential<T, V, F>(
    codecs: &[Arc<dyn Codec<T>>],
    operation: Operation,
    deadline: Option<Instant>,
    invoke: F,
) -> Outcome<V>
where
    F: Fn(&dyn Codec<T>, &CancelToken) -> Result<V, CodecError>,
{
    let cancel = CancelToken::new();
    let mut outcome = Outcome::new();
    for (index, codec) in codecs.iter().enumerate() {
        // The first attempt always runs; the deadline only gates fallbacks.
        if index > 0 && deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            outcome.timed_out = true;
            break;
        }
        match guarded(|| invoke(codec.as_ref(), &cancel)) {
            Ok(value) => {
                outcome.winner = Some(Winner { index, value });
                break;
            }
            Err(err) => outcome.record_failure(codec.as_ref(), operation, err),
        }
    }
    outcome
}

fn guarded<V>(run: impl FnOnce() -> Result<V, CodecError>) -> Result<V, CodecError> {
    match panic::catch_unwind(AssertUnwindSafe(run)) {
        Ok(result) => result,
        Err(payload) => Err(panic_message(payload.as_ref()).into()),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("codec panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("codec panicked: {message}")
    } else {
        "codec panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::{guarded, panic_message};

    #[test]
    fn panic_payloads_become_errors() {
        let err = guarded::<()>(|| panic!("boom {}", 7)).unwrap_err();
        assert_eq!(err.to_string(), "codec panicked: boom 7");

        let payload: Box<dyn std::any::Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(payload.as_ref()), "codec panicked");
    }

    #[test]
    fn ok_results_pass_through() {
        let value = guarded(|| Ok::<_, super::CodecError>(5)).expect("ok");
        assert_eq!(value, 5);
    }
}
