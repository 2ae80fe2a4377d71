//! Purpose: Hold top-level CLI command dispatch for `multiparser`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Parsing always goes through a dispatcher built from the active settings.
//! Invariants: `convert` re-encodes with exactly one codec so the output format is fixed.
use std::io::Write;
use std::sync::Arc;

use serde::de::{self, Deserialize, DeserializeOwned, Deserializer};
use serde::Serialize;

use super::*;
use multiparser::api::{Codec, Dispatcher, JsonCodec};

/// A parsed document whose top level is a mapping or a sequence.
#[derive(Serialize)]
#[serde(transparent)]
struct Structured(Value);

impl<'de> Deserialize<'de> for Structured {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        match value {
            Value::Object(_) | Value::Array(_) => Ok(Self(value)),
            other => Err(de::Error::custom(format!(
                "expected a mapping or sequence at the top level, found {}",
                value_kind(&other)
            ))),
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

pub(super) fn dispatch_command(command: Command, settings: &Settings) -> Result<RunOutcome, Error> {
    match command {
        Command::Codecs => {
            let names: Vec<&str> = settings.formats.iter().map(|format| format.name()).collect();
            emit_json(json!({
                "codecs": names,
                "policy": settings.options.policy.as_str(),
                "timeout_ms": settings.options.timeout_ms,
            }));
            Ok(RunOutcome::ok())
        }
        Command::Parse { structured, input } => {
            let bytes = read_input(input.as_deref())?;
            let (codec, data) = parse_input(&bytes, settings, structured)?;
            emit_json(json!({ "codec": codec, "data": data }));
            Ok(RunOutcome::ok())
        }
        Command::Convert {
            to,
            pretty,
            structured,
            input,
        } => {
            if pretty && to != CodecArg::Json {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message("--pretty only applies to --to json")
                    .with_hint("Drop --pretty; YAML output is always block style."));
            }
            let bytes = read_input(input.as_deref())?;
            let (codec, data) = parse_input(&bytes, settings, structured)?;
            tracing::debug!(from = %codec, to = Format::from(to).name(), "converting");
            let encoder: Arc<dyn Codec<Value>> = match (to, pretty) {
                (CodecArg::Json, true) => Arc::new(JsonCodec::pretty()),
                (to, _) => Format::from(to).codec(),
            };
            let mut output = Dispatcher::new([encoder])?.marshal(&data)?;
            if output.last() != Some(&b'\n') {
                output.push(b'\n');
            }
            io::stdout().write_all(&output).map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to write output")
                    .with_source(err)
            })?;
            Ok(RunOutcome::ok())
        }
    }
}

fn parse_input(
    bytes: &[u8],
    settings: &Settings,
    structured: bool,
) -> Result<(String, Value), Error> {
    if structured {
        let (codec, Structured(data)) = parse_as::<Structured>(bytes, settings)?;
        Ok((codec, data))
    } else {
        parse_as::<Value>(bytes, settings)
    }
}

fn parse_as<T>(bytes: &[u8], settings: &Settings) -> Result<(String, T), Error>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    let codecs = settings.formats.iter().map(|format| format.codec::<T>());
    let dispatcher = Dispatcher::with_options(codecs, settings.options.clone())?;
    let committed = dispatcher.unmarshal_committed(bytes)?;
    Ok(committed.into_parts())
}
