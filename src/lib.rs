//! Purpose: Library crate behind the `multiparser` CLI: race serde codecs and keep the first success.
//! Exports: `api` (stable surface), `core` (dispatcher, codec trait, errors), `codecs`, `config`.
//! Role: Format-agnostic marshal/unmarshal over a caller-supplied, ordered codec list.
//! Invariants: No process-wide codec registry; callers construct and pass codecs explicitly.
//! Invariants: Per-codec failures are aggregated, never surfaced on success paths.
pub mod api;
pub mod codecs;
pub mod config;
pub mod core;
