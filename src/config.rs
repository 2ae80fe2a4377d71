//! Purpose: Load `DispatchOptions` from a JSON or YAML file.
//! Exports: `load_options`, `parse_options`.
//! Role: Config layer for the CLI and for library callers that keep policy on disk.
//! Invariants: Config bytes are parsed by a sequential JSON-then-YAML dispatcher.
//! Invariants: Failures surface as `Usage` errors carrying the file path.
use std::path::Path;
use std::sync::Arc;

use crate::codecs::{JsonCodec, YamlCodec};
use crate::core::codec::Codec;
use crate::core::dispatch::Dispatcher;
use crate::core::error::{Error, ErrorKind};
use crate::core::options::{DispatchOptions, Policy};

pub fn parse_options(bytes: &[u8]) -> Result<DispatchOptions, Error> {
    let codecs: [Arc<dyn Codec<DispatchOptions>>; 2] =
        [Arc::new(JsonCodec::new()), Arc::new(YamlCodec::new())];
    let dispatcher = Dispatcher::with_options(
        codecs,
        DispatchOptions::new().with_policy(Policy::Sequential),
    )?;
    let options = dispatcher.unmarshal(bytes).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("invalid dispatch config")
            .with_hint("Expected `policy: race|sequential` and optional `timeout_ms`.")
            .with_source(err)
    })?;
    if options.timeout_ms == Some(0) {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("invalid dispatch config: timeout_ms must be at least 1")
            .with_hint("Omit `timeout_ms` to wait for every codec."));
    }
    Ok(options)
}

pub fn load_options(path: &Path) -> Result<DispatchOptions, Error> {
    let bytes = std::fs::read(path).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to read dispatch config")
            .with_path(path)
            .with_source(err)
    })?;
    let options = parse_options(&bytes).map_err(|err| err.with_path(path))?;
    tracing::debug!(
        path = %path.display(),
        policy = options.policy.as_str(),
        timeout_ms = ?options.timeout_ms,
        "loaded dispatch config"
    );
    Ok(options)
}
