//! Uniform Resource payload

use serde::{Deserialize, Serialize};

use crate::codec::CodecError;

/// A type-tagged payload.
///
/// The type is lowercase ASCII letters, digits and dashes, as carried in the
/// `ur:<type>/...` prefix of every part.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ur {
    ur_type: String,
    data: Vec<u8>,
}

impl Ur {
    /// Create a UR with a validated type tag
    pub fn new(ur_type: impl Into<String>, data: impl Into<Vec<u8>>) -> Result<Self, CodecError> {
        let ur_type = ur_type.into();
        if !is_valid_type(&ur_type) {
            return Err(CodecError::InvalidType { ur_type });
        }
        Ok(Self { ur_type, data: data.into() })
    }

    /// Create a UR of type `bytes`
    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        Self { ur_type: "bytes".to_string(), data: data.into() }
    }

    pub fn ur_type(&self) -> &str {
        &self.ur_type
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

/// Check a UR type tag
pub fn is_valid_type(ur_type: &str) -> bool {
    !ur_type.is_empty()
        && ur_type.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}
