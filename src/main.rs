//! Purpose: `multiparser` CLI entry point.
//! Role: Binary crate root; parses args, builds a dispatcher, emits JSON on stdout.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: Flags override values loaded from `--config`.
use std::error::Error as StdError;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum, error::ErrorKind as ClapErrorKind};
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

mod command_dispatch;

use multiparser::api::{
    DispatchOptions, Error, ErrorKind, Format, Policy, load_options, to_exit_code,
};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(clap_error_summary(&err))
                        .with_hint("Try `multiparser --help`."),
                    ColorMode::Auto,
                ));
            }
        },
    };

    let color_mode = cli.color;
    let settings = Settings::from_cli(&cli).map_err(|err| (err, color_mode))?;
    command_dispatch::dispatch_command(cli.command, &settings).map_err(|err| (err, color_mode))
}

#[derive(Parser)]
#[command(
    name = "multiparser",
    version,
    about = "Parse data with whichever codec accepts it first",
    long_about = None,
    after_help = r#"EXAMPLES
  $ echo 'data: data' | multiparser parse
  $ multiparser --policy sequential parse config.json
  $ multiparser convert --to yaml settings.json
  $ multiparser --codec yaml codecs

NOTES
  - Default codecs: json, yaml (override with repeated --codec)
  - Config file keys: policy (race|sequential), timeout_ms"#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(long, help = "Dispatch config file (JSON or YAML)", value_hint = clap::ValueHint::FilePath)]
    config: Option<PathBuf>,
    #[arg(long, value_enum, help = "Scheduling policy: race|sequential")]
    policy: Option<PolicyArg>,
    #[arg(
        long,
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Report a timeout when no codec has succeeded after this many milliseconds (min 1)"
    )]
    timeout_ms: Option<u64>,
    #[arg(long = "codec", value_enum, help = "Codec to register (repeatable, order kept)")]
    codecs: Vec<CodecArg>,
    #[arg(
        long,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics: auto|always|never"
    )]
    color: ColorMode,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum PolicyArg {
    Race,
    Sequential,
}

impl From<PolicyArg> for Policy {
    fn from(value: PolicyArg) -> Self {
        match value {
            PolicyArg::Race => Policy::Race,
            PolicyArg::Sequential => Policy::Sequential,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CodecArg {
    Json,
    Yaml,
}

impl From<CodecArg> for Format {
    fn from(value: CodecArg) -> Self {
        match value {
            CodecArg::Json => Format::Json,
            CodecArg::Yaml => Format::Yaml,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    #[command(
        about = "Parse input and report which codec accepted it",
        after_help = r#"EXAMPLES
  $ multiparser parse data.yaml
  $ cat data.json | multiparser parse
  # {"codec":"json","data":{...}}

NOTES
  - YAML accepts a bare scalar, so plain text parses as a string and empty
    input as null. Pass --structured to require a mapping or sequence."#
    )]
    Parse {
        #[arg(long, help = "Reject input whose top level is not a mapping or sequence")]
        structured: bool,
        #[arg(help = "Input file (default: stdin; `-` also reads stdin)", value_hint = clap::ValueHint::FilePath)]
        input: Option<PathBuf>,
    },
    #[command(
        about = "Parse input with the registered codecs, then re-encode it in one format",
        after_help = r#"EXAMPLES
  $ multiparser convert --to yaml data.json
  $ multiparser convert --to json --pretty data.yaml"#
    )]
    Convert {
        #[arg(long, value_enum, help = "Output format")]
        to: CodecArg,
        #[arg(long, help = "Pretty-print JSON output (only valid with --to json)")]
        pretty: bool,
        #[arg(long, help = "Reject input whose top level is not a mapping or sequence")]
        structured: bool,
        #[arg(help = "Input file (default: stdin; `-` also reads stdin)", value_hint = clap::ValueHint::FilePath)]
        input: Option<PathBuf>,
    },
    #[command(about = "Show the active codecs and dispatch options")]
    Codecs,
}

struct Settings {
    formats: Vec<Format>,
    options: DispatchOptions,
}

impl Settings {
    fn from_cli(cli: &Cli) -> Result<Self, Error> {
        let base = match &cli.config {
            Some(path) => load_options(path)?,
            None => DispatchOptions::new(),
        };
        let options = merge_options(base, cli.policy, cli.timeout_ms);
        let formats = if cli.codecs.is_empty() {
            Format::ALL.to_vec()
        } else {
            cli.codecs.iter().copied().map(Format::from).collect()
        };
        Ok(Self { formats, options })
    }
}

fn merge_options(
    mut options: DispatchOptions,
    policy: Option<PolicyArg>,
    timeout_ms: Option<u64>,
) -> DispatchOptions {
    if let Some(policy) = policy {
        options.policy = policy.into();
    }
    if timeout_ms.is_some() {
        options.timeout_ms = timeout_ms;
    }
    options
}

fn read_input(input: Option<&Path>) -> Result<Vec<u8>, Error> {
    let mut bytes = Vec::new();
    match input {
        None => read_stdin(&mut bytes)?,
        Some(path) if path == Path::new("-") => read_stdin(&mut bytes)?,
        Some(path) => {
            bytes = std::fs::read(path).map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to read input file")
                    .with_path(path)
                    .with_source(err)
            })?;
        }
    }
    Ok(bytes)
}

fn read_stdin(bytes: &mut Vec<u8>) -> Result<(), Error> {
    io::stdin().read_to_end(bytes).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to read stdin")
            .with_source(err)
    })?;
    Ok(())
}

fn emit_json(value: Value) {
    let json = if io::stdout().is_terminal() {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    }
    .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

#[derive(Copy, Clone, Debug)]
enum AnsiColor {
    Red,
    Yellow,
}

fn colorize_label(label: &str, enabled: bool, color: AnsiColor) -> String {
    if !enabled {
        return label.to_string();
    }
    let code = match color {
        AnsiColor::Red => "31",
        AnsiColor::Yellow => "33",
    };
    format!("\u{1b}[{code}m{label}\u{1b}[0m")
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
        ErrorKind::EmptyCodecList => "no codecs registered".to_string(),
        ErrorKind::InvalidTarget => "invalid unmarshal target".to_string(),
        ErrorKind::MarshalFailed => "every codec failed to marshal".to_string(),
        ErrorKind::UnmarshalFailed => "every codec failed to parse".to_string(),
        ErrorKind::Timeout => "timed out".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    let failures: Vec<Value> = err
        .failures()
        .iter()
        .map(|failure| {
            json!({
                "codec": failure.codec(),
                "op": failure.operation().as_str(),
                "cause": failure.cause().to_string(),
            })
        })
        .collect();
    if !failures.is_empty() {
        inner.insert("failures".to_string(), Value::Array(failures));
    } else {
        let causes = error_causes(err);
        if !causes.is_empty() {
            inner.insert("causes".to_string(), json!(causes));
        }
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "{} {}",
        colorize_label("error:", use_color, AnsiColor::Red),
        error_message(err)
    ));
    if let Some(hint) = err.hint() {
        lines.push(format!(
            "{} {hint}",
            colorize_label("hint:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(path) = err.path() {
        lines.push(format!(
            "{} {}",
            colorize_label("path:", use_color, AnsiColor::Yellow),
            path.display()
        ));
    }
    let failures = err.failures();
    if failures.is_empty() {
        if let Some(cause) = error_causes(err).first() {
            lines.push(format!(
                "{} {cause}",
                colorize_label("caused by:", use_color, AnsiColor::Yellow)
            ));
        }
    } else {
        for failure in failures {
            lines.push(format!(
                "{} {failure}",
                colorize_label("caused by:", use_color, AnsiColor::Yellow)
            ));
        }
    }
    lines.join("\n")
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}

#[cfg(test)]
mod tests {
    use super::{Cli, CodecArg, PolicyArg, error_json, error_text, merge_options};
    use clap::Parser;
    use multiparser::api::{
        Codec, DispatchOptions, Dispatcher, Error, ErrorKind, JsonCodec, Policy, YamlCodec,
    };
    use serde_json::Value;
    use std::sync::Arc;

    #[test]
    fn flags_override_config_values() {
        let base = DispatchOptions::new()
            .with_policy(Policy::Sequential)
            .with_timeout(std::time::Duration::from_millis(500));
        let merged = merge_options(base.clone(), Some(PolicyArg::Race), None);
        assert_eq!(merged.policy, Policy::Race);
        assert_eq!(merged.timeout_ms, Some(500));

        let untouched = merge_options(base.clone(), None, None);
        assert_eq!(untouched, base);

        let timed = merge_options(base, None, Some(10));
        assert_eq!(timed.timeout_ms, Some(10));
    }

    #[test]
    fn repeated_codec_flags_keep_order() {
        let cli = Cli::try_parse_from([
            "multiparser",
            "--codec",
            "yaml",
            "--codec",
            "json",
            "codecs",
        ])
        .expect("parse");
        assert_eq!(cli.codecs, [CodecArg::Yaml, CodecArg::Json]);
    }

    #[test]
    fn error_json_lists_codec_failures() {
        let codecs: [Arc<dyn Codec<Value>>; 1] = [Arc::new(JsonCodec::new())];
        let dispatcher = Dispatcher::new(codecs).expect("dispatcher");
        let err = dispatcher.unmarshal(b"{").unwrap_err();

        let value = error_json(&err);
        let inner = &value["error"];
        assert_eq!(inner["kind"], "UnmarshalFailed");
        assert_eq!(inner["failures"][0]["codec"], "json");
        assert_eq!(inner["failures"][0]["op"], "unmarshal");
        assert!(inner.get("causes").is_none());
    }

    #[test]
    fn error_text_respects_color_flag() {
        let err = Error::new(ErrorKind::Usage).with_message("bad input");
        let colored = error_text(&err, true);
        let plain = error_text(&err, false);
        assert!(colored.contains("\u{1b}[31merror:\u{1b}[0m"));
        assert!(plain.contains("error: bad input"));
        assert!(!plain.contains("\u{1b}["));
    }

    #[test]
    fn error_text_prints_one_line_per_failure() {
        let codecs: [Arc<dyn Codec<Value>>; 2] =
            [Arc::new(JsonCodec::new()), Arc::new(YamlCodec::new())];
        let dispatcher = Dispatcher::new(codecs).expect("dispatcher");
        let err = dispatcher.unmarshal(b"{\"a\": [1,").unwrap_err();
        let text = error_text(&err, false);
        assert!(text.contains("caused by: parsing failed for json"));
        assert!(text.contains("caused by: parsing failed for yaml"));
    }
}
