//! Purpose: Ship the stock codec adapters and a name-based selector for them.
//! Exports: `JsonCodec`, `YamlCodec`, `Format`, `json_and_yaml`.
//! Role: Concrete collaborators for `Dispatcher`; callers may bring their own `Codec` impls.
//! Invariants: Every call builds fresh codec handles; there is no process-wide registry.
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::core::codec::Codec;

mod json;
mod yaml;

pub use json::JsonCodec;
pub use yaml::YamlCodec;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    pub const ALL: [Format; 2] = [Format::Json, Format::Yaml];

    pub fn name(self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Yaml => "yaml",
        }
    }

    pub fn codec<T>(self) -> Arc<dyn Codec<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        match self {
            Format::Json => Arc::new(JsonCodec::new()),
            Format::Yaml => Arc::new(YamlCodec::new()),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnknownFormat(pub String);

impl fmt::Display for UnknownFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown format `{}` (expected json or yaml)", self.0)
    }
}

impl std::error::Error for UnknownFormat {}

impl FromStr for Format {
    type Err = UnknownFormat;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "json" => Ok(Format::Json),
            "yaml" | "yml" => Ok(Format::Yaml),
            _ => Err(UnknownFormat(value.to_string())),
        }
    }
}

/// JSON then YAML, the usual pair for config-style input.
pub fn json_and_yaml<T>() -> Vec<Arc<dyn Codec<T>>>
where
    T: Serialize + DeserializeOwned,
{
    Format::ALL.iter().map(|format| format.codec()).collect()
}
