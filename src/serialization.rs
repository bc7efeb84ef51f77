/// Serialization format options for grids, stretchings and solver settings.
///
/// Each format has both a plain and an LZ4 compressed variant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SerializationFormat {
    /// bincode (standard configuration), compact binary
    Bincode,
    /// bincode with LZ4 compression (default)
    #[default]
    BincodeLz4,
}

impl SerializationFormat {
    /// Returns true if this format uses LZ4 compression
    pub fn is_compressed(&self) -> bool {
        matches!(self, SerializationFormat::BincodeLz4)
    }
}

use crate::errors::SGError;
use serde::{de::DeserializeOwned, Serialize};

fn encode<T: Serialize>(data: &T) -> Result<Vec<u8>, SGError> {
    bincode::serde::encode_to_vec(data, bincode::config::standard()).map_err(|_| SGError::SerializationFailed)
}

fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T, SGError> {
    let (value, read) = bincode::serde::decode_from_slice(data, bincode::config::standard())
        .map_err(|_| SGError::DeserializationFailed)?;
    if read != data.len() {
        return Err(SGError::DeserializationFailed);
    }
    Ok(value)
}

/// Serialize data to bytes using the specified format.
/// Compressed formats store the uncompressed size in front of the LZ4 block.
pub fn serialize<T: Serialize>(data: &T, format: SerializationFormat) -> Result<Vec<u8>, SGError> {
    let bytes = encode(data)?;
    if format.is_compressed() {
        Ok(lz4_flex::compress_prepend_size(&bytes))
    } else {
        Ok(bytes)
    }
}

/// Deserialize data from bytes using the specified format.
pub fn deserialize<T: DeserializeOwned>(data: &[u8], format: SerializationFormat) -> Result<T, SGError> {
    if format.is_compressed() {
        let decompressed = lz4_flex::decompress_size_prepended(data)
            .map_err(|_| SGError::LZ4DecompressionFailed)?;
        decode(&decompressed)
    } else {
        decode(data)
    }
}
