//! Purpose: YAML codec adapter backed by `serde_yaml`.
//! Exports: `YamlCodec`.
//! Notes: YAML is a JSON superset, so this codec also accepts most JSON documents.
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::core::codec::{Codec, CodecError};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct YamlCodec;

impl YamlCodec {
    pub fn new() -> Self {
        Self
    }
}

impl<T> Codec<T> for YamlCodec
where
    T: Serialize + DeserializeOwned,
{
    fn name(&self) -> &str {
        "yaml"
    }

    fn marshal(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        Ok(serde_yaml::to_string(value)?.into_bytes())
    }

    fn unmarshal(&self, bytes: &[u8]) -> Result<T, CodecError> {
        Ok(serde_yaml::from_slice(bytes)?)
    }
}
