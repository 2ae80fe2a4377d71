//! Purpose: Define the stable public Rust API boundary for multiparser.
//! Exports: Dispatcher, codec capability, stock codecs, options, and error types.
//! Role: Public, additive-only surface used by the CLI and library callers.
//! Invariants: The race engine stays internal; callers only see dispatcher outcomes.

pub use crate::codecs::{Format, JsonCodec, UnknownFormat, YamlCodec, json_and_yaml};
pub use crate::config::{load_options, parse_options};
pub use crate::core::codec::{CancelToken, Codec, CodecError};
pub use crate::core::dispatch::{Committed, Dispatcher};
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{CodecFailure, CodecFailures, Error, ErrorKind, Operation};
pub use crate::core::options::{DispatchOptions, Policy};
