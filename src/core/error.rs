//! Purpose: Define the dispatcher error model and the per-codec failure aggregate.
//! Exports: `Error`, `ErrorKind`, `Operation`, `CodecFailure`, `CodecFailures`, `to_exit_code`.
//! Role: Single error vocabulary shared by the dispatcher, config loading, and the CLI.
//! Invariants: Codec-level failures only reach callers wrapped in a dispatcher-level `Error`.
//! Invariants: Aggregate rendering is one greppable line per failed codec, in arrival order.
use std::error::Error as StdError;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::core::codec::CodecError;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Internal,
    Usage,
    Io,
    EmptyCodecList,
    InvalidTarget,
    MarshalFailed,
    UnmarshalFailed,
    Timeout,
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    hint: Option<String>,
    path: Option<PathBuf>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            hint: None,
            path: None,
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Per-codec causes when every codec failed; empty otherwise.
    pub fn failures(&self) -> &[CodecFailure] {
        self.source
            .as_deref()
            .and_then(|source| source.downcast_ref::<CodecFailures>())
            .map(CodecFailures::as_slice)
            .unwrap_or(&[])
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub(crate) fn with_failures(self, failures: CodecFailures) -> Self {
        if failures.is_empty() {
            return self;
        }
        self.with_source(failures)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        if let Some(path) = &self.path {
            write!(f, " (path: {})", path.display())?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Operation {
    Marshal,
    Unmarshal,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Marshal => "marshal",
            Operation::Unmarshal => "unmarshal",
        }
    }

    fn failure_verb(self) -> &'static str {
        match self {
            Operation::Marshal => "marshaling",
            Operation::Unmarshal => "parsing",
        }
    }
}

/// One codec's failed attempt, tagged with the codec that produced it.
#[derive(Debug)]
pub struct CodecFailure {
    codec: String,
    operation: Operation,
    cause: CodecError,
}

impl CodecFailure {
    pub fn new(codec: impl Into<String>, operation: Operation, cause: CodecError) -> Self {
        Self {
            codec: codec.into(),
            operation,
            cause,
        }
    }

    pub fn codec(&self) -> &str {
        &self.codec
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn cause(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.cause.as_ref()
    }
}

impl fmt::Display for CodecFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} failed for {}: {}",
            self.operation.failure_verb(),
            self.codec,
            self.cause
        )
    }
}

impl StdError for CodecFailure {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.cause.as_ref() as &(dyn StdError + 'static))
    }
}

/// Every failed attempt of one dispatcher call, joined into a single error.
#[derive(Debug, Default)]
pub struct CodecFailures {
    failures: Vec<CodecFailure>,
}

impl CodecFailures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, failure: CodecFailure) {
        self.failures.push(failure);
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn as_slice(&self) -> &[CodecFailure] {
        &self.failures
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CodecFailure> {
        self.failures.iter()
    }
}

impl<'a> IntoIterator for &'a CodecFailures {
    type Item = &'a CodecFailure;
    type IntoIter = std::slice::Iter<'a, CodecFailure>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for CodecFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, failure) in self.failures.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}

impl StdError for CodecFailures {}

pub fn to_exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Internal => 1,
        ErrorKind::Usage => 2,
        ErrorKind::EmptyCodecList => 3,
        ErrorKind::InvalidTarget => 4,
        ErrorKind::MarshalFailed => 5,
        ErrorKind::UnmarshalFailed => 6,
        ErrorKind::Timeout => 7,
        ErrorKind::Io => 8,
    }
}
