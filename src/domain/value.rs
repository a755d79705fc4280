//! Registry value union and its raw byte encoding.

use crate::error::{ParameterError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Value Kinds
// =============================================================================

/// Registry value type, numbered as the host registry numbers them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    None,
    String,
    ExpandString,
    Binary,
    Dword,
    DwordBigEndian,
    Link,
    MultiString,
    ResourceList,
    FullResourceDescriptor,
    ResourceRequirementsList,
    Qword,
    Unknown(u32),
}

impl ValueKind {
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::None => 0,
            Self::String => 1,
            Self::ExpandString => 2,
            Self::Binary => 3,
            Self::Dword => 4,
            Self::DwordBigEndian => 5,
            Self::Link => 6,
            Self::MultiString => 7,
            Self::ResourceList => 8,
            Self::FullResourceDescriptor => 9,
            Self::ResourceRequirementsList => 10,
            Self::Qword => 11,
            Self::Unknown(code) => code,
        }
    }

    #[must_use]
    pub const fn from_code(code: u32) -> Self {
        match code {
            0 => Self::None,
            1 => Self::String,
            2 => Self::ExpandString,
            3 => Self::Binary,
            4 => Self::Dword,
            5 => Self::DwordBigEndian,
            6 => Self::Link,
            7 => Self::MultiString,
            8 => Self::ResourceList,
            9 => Self::FullResourceDescriptor,
            10 => Self::ResourceRequirementsList,
            11 => Self::Qword,
            other => Self::Unknown(other),
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "REG_NONE",
            Self::String => "REG_SZ",
            Self::ExpandString => "REG_EXPAND_SZ",
            Self::Binary => "REG_BINARY",
            Self::Dword => "REG_DWORD",
            Self::DwordBigEndian => "REG_DWORD_BIG_ENDIAN",
            Self::Link => "REG_LINK",
            Self::MultiString => "REG_MULTI_SZ",
            Self::ResourceList => "REG_RESOURCE_LIST",
            Self::FullResourceDescriptor => "REG_FULL_RESOURCE_DESCRIPTOR",
            Self::ResourceRequirementsList => "REG_RESOURCE_REQUIREMENTS_LIST",
            Self::Qword => "REG_QWORD",
            Self::Unknown(_) => "REG_UNKNOWN",
        }
    }
}

// =============================================================================
// Values
// =============================================================================

/// A typed registry value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryValue {
    /// REG_NONE. Also stands in for "no value" when constructing parameters.
    None,
    String(String),
    ExpandString(String),
    MultiString(Vec<String>),
    Dword(u32),
    Qword(u64),
    Binary(Vec<u8>),
    /// Any kind without a dedicated variant, kept as raw bytes.
    Other { kind: ValueKind, bytes: Vec<u8> },
}

impl RegistryValue {
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::None => ValueKind::None,
            Self::String(_) => ValueKind::String,
            Self::ExpandString(_) => ValueKind::ExpandString,
            Self::MultiString(_) => ValueKind::MultiString,
            Self::Dword(_) => ValueKind::Dword,
            Self::Qword(_) => ValueKind::Qword,
            Self::Binary(_) => ValueKind::Binary,
            Self::Other { kind, .. } => *kind,
        }
    }

    /// Integers are never empty; everything else is empty when it carries no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::None => true,
            Self::String(s) | Self::ExpandString(s) => s.is_empty(),
            Self::MultiString(items) => items.is_empty(),
            Self::Dword(_) | Self::Qword(_) => false,
            Self::Binary(bytes) | Self::Other { bytes, .. } => bytes.is_empty(),
        }
    }

    /// Check that the value survives the registry's on-disk encoding.
    ///
    /// Strings are NUL-terminated there, so an interior NUL would truncate
    /// the stored text and an empty multi-string item would end the list.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for empty values, strings containing NUL and
    /// multi-strings with empty or NUL-containing items.
    pub fn check_writable(&self) -> Result {
        if self.is_empty() {
            return Err(ParameterError::invalid("An empty value was passed"));
        }
        match self {
            Self::String(s) | Self::ExpandString(s) if s.contains('\0') => Err(
                ParameterError::invalid("A string value cannot contain NUL characters"),
            ),
            Self::MultiString(items) if items.iter().any(|s| s.is_empty()) => Err(
                ParameterError::invalid("A multi-string value cannot hold empty items"),
            ),
            Self::MultiString(items) if items.iter().any(|s| s.contains('\0')) => Err(
                ParameterError::invalid("A multi-string item cannot contain NUL characters"),
            ),
            _ => Ok(()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::ExpandString(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_u32(&self) -> Option<u32> {
        match self {
            Self::Dword(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Dword(v) => Some(*v as u64),
            Self::Qword(v) => Some(*v),
            _ => None,
        }
    }

    /// Encode the value the way the registry stores it on disk.
    #[must_use]
    pub fn to_raw(&self) -> (ValueKind, Vec<u8>) {
        let bytes = match self {
            Self::None => Vec::new(),
            Self::String(s) | Self::ExpandString(s) => encode_utf16(s),
            Self::MultiString(items) => {
                let mut bytes: Vec<u8> = items.iter().flat_map(|s| encode_utf16(s)).collect();
                bytes.extend_from_slice(&[0, 0]);
                bytes
            }
            Self::Dword(v) => v.to_le_bytes().to_vec(),
            Self::Qword(v) => v.to_le_bytes().to_vec(),
            Self::Binary(bytes) | Self::Other { bytes, .. } => bytes.clone(),
        };
        (self.kind(), bytes)
    }

    /// Decode raw registry data. Malformed integers are kept as raw bytes.
    #[must_use]
    pub fn from_raw(kind: ValueKind, bytes: &[u8]) -> Self {
        match kind {
            ValueKind::None => Self::None,
            ValueKind::String => Self::String(decode_utf16(bytes)),
            ValueKind::ExpandString => Self::ExpandString(decode_utf16(bytes)),
            ValueKind::MultiString => Self::MultiString(decode_multi(bytes)),
            ValueKind::Binary => Self::Binary(bytes.to_vec()),
            ValueKind::Dword => match <[u8; 4]>::try_from(bytes) {
                Ok(b) => Self::Dword(u32::from_le_bytes(b)),
                Err(_) => Self::Other {
                    kind,
                    bytes: bytes.to_vec(),
                },
            },
            ValueKind::Qword => match <[u8; 8]>::try_from(bytes) {
                Ok(b) => Self::Qword(u64::from_le_bytes(b)),
                Err(_) => Self::Other {
                    kind,
                    bytes: bytes.to_vec(),
                },
            },
            _ => Self::Other {
                kind,
                bytes: bytes.to_vec(),
            },
        }
    }

    /// Build a value of `kind` from its textual form.
    ///
    /// Integers accept decimal or `0x` hex, binary takes hex digits,
    /// multi-strings are separated by `;`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the text does not fit the kind.
    pub fn parse(kind: ValueKind, text: &str) -> Result<Self> {
        let value = match kind {
            ValueKind::None => Self::None,
            ValueKind::String => Self::String(text.to_string()),
            ValueKind::ExpandString => Self::ExpandString(text.to_string()),
            ValueKind::MultiString => Self::MultiString(
                text.split(';')
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
            ValueKind::Dword => {
                let v = parse_int(text)?;
                Self::Dword(u32::try_from(v).map_err(|_| {
                    ParameterError::invalid(format!("DWORD out of range: {text}"))
                })?)
            }
            ValueKind::Qword => Self::Qword(parse_int(text)?),
            ValueKind::Binary => Self::Binary(decode_hex(text)?),
            other => {
                return Err(ParameterError::invalid(format!(
                    "cannot parse {} from text",
                    other.as_str()
                )))
            }
        };
        Ok(value)
    }
}

impl fmt::Display for RegistryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => Ok(()),
            Self::String(s) | Self::ExpandString(s) => f.write_str(s),
            Self::MultiString(items) => f.write_str(&items.join(";")),
            Self::Dword(v) => write!(f, "{v}"),
            Self::Qword(v) => write!(f, "{v}"),
            Self::Binary(bytes) | Self::Other { bytes, .. } => {
                bytes.iter().try_for_each(|b| write!(f, "{b:02x}"))
            }
        }
    }
}

impl From<&str> for RegistryValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for RegistryValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<u32> for RegistryValue {
    fn from(v: u32) -> Self {
        Self::Dword(v)
    }
}

impl From<u64> for RegistryValue {
    fn from(v: u64) -> Self {
        Self::Qword(v)
    }
}

impl From<Vec<String>> for RegistryValue {
    fn from(items: Vec<String>) -> Self {
        Self::MultiString(items)
    }
}

impl From<Vec<u8>> for RegistryValue {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Binary(bytes)
    }
}

// =============================================================================
// Encoding helpers
// =============================================================================

fn encode_utf16(s: &str) -> Vec<u8> {
    s.encode_utf16()
        .chain(Some(0))
        .flat_map(u16::to_le_bytes)
        .collect()
}

fn utf16_units(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

fn decode_utf16(bytes: &[u8]) -> String {
    let units = utf16_units(bytes);
    let end = units.iter().position(|&u| u == 0).unwrap_or(units.len());
    String::from_utf16_lossy(&units[..end])
}

fn decode_multi(bytes: &[u8]) -> Vec<String> {
    utf16_units(bytes)
        .split(|&u| u == 0)
        .filter(|part| !part.is_empty())
        .map(String::from_utf16_lossy)
        .collect()
}

fn parse_int(text: &str) -> Result<u64> {
    let text = text.trim();
    let parsed = match text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse::<u64>(),
    };
    parsed.map_err(|e| ParameterError::invalid(format!("not an integer '{text}': {e}")))
}

fn decode_hex(text: &str) -> Result<Vec<u8>> {
    let digits: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.len() % 2 != 0 {
        return Err(ParameterError::invalid(format!(
            "odd number of hex digits: {text}"
        )));
    }
    digits
        .chunks(2)
        .map(|pair| {
            let hi = pair[0].to_digit(16);
            let lo = pair[1].to_digit(16);
            match (hi, lo) {
                (Some(hi), Some(lo)) => Ok((hi * 16 + lo) as u8),
                _ => Err(ParameterError::invalid(format!("invalid hex: {text}"))),
            }
        })
        .collect()
}
