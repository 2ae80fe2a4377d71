//! Purpose: JSON codec adapter backed by `serde_json`.
//! Exports: `JsonCodec`.
//! Invariants: Compact output unless built with `JsonCodec::pretty`.
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::core::codec::{Codec, CodecError};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct JsonCodec {
    pretty: bool,
}

impl JsonCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl<T> Codec<T> for JsonCodec
where
    T: Serialize + DeserializeOwned,
{
    fn name(&self) -> &str {
        "json"
    }

    fn marshal(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(value)?
        } else {
            serde_json::to_vec(value)?
        };
        Ok(bytes)
    }

    fn unmarshal(&self, bytes: &[u8]) -> Result<T, CodecError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
