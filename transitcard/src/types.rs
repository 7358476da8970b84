// transitcard-rs/transitcard/src/types.rs

use crate::Error;
use derive_more::{Display, From};
use std::convert::TryFrom;

/// Tag UID as reported by the transport. Opaque, any length.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, From)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TagId(Vec<u8>);

impl TagId {
    pub fn new(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        crate::utils::bytes_to_hex(&self.0)
    }
}

/// Manufacture ID (8 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Idm([u8; 8]);

impl Idm {
    pub const fn from_bytes(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        crate::utils::bytes_to_hex(self.as_bytes())
    }

    /// IDm addressing the `system_number`-th system of a multi-system card:
    /// the upper nibble of the first byte carries the system number.
    pub fn for_system(&self, system_number: u8) -> Self {
        let mut bytes = self.0;
        bytes[0] = (bytes[0] & 0x0f) | (system_number << 4);
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for Idm {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() != 8 {
            return Err(Error::InvalidLength {
                expected: 8,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 8];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }
}

/// Manufacture parameters (8 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pmm([u8; 8]);

impl Pmm {
    pub const fn from_bytes(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for Pmm {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() != 8 {
            return Err(Error::InvalidLength {
                expected: 8,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 8];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }
}

/// FeliCa system code. Big-endian on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display(fmt = "{:04x}", _0)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SystemCode(u16);

impl SystemCode {
    pub const ANY: Self = Self(0xffff);
    pub const COMMON: Self = Self(0xfe00);
    pub const FELICA_LITE: Self = Self(0x88b4);
    pub const NDEF: Self = Self(0x4000);

    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    pub fn as_u16(&self) -> u16 {
        self.0
    }

    pub fn to_be_bytes(&self) -> [u8; 2] {
        self.0.to_be_bytes()
    }
}

/// FeliCa service code. Little-endian on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display(fmt = "{:04x}", _0)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ServiceCode(u16);

impl ServiceCode {
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    pub fn as_u16(&self) -> u16 {
        self.0
    }

    pub fn to_le_bytes(&self) -> [u8; 2] {
        self.0.to_le_bytes()
    }

    /// Services with the low bit set can be read without authentication.
    pub fn is_open(&self) -> bool {
        self.0 & 0x0001 == 0x0001
    }
}

/// DESFire application id (24 bits), kept in the byte order the card
/// transmits so hex rendering matches vendor tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display(fmt = "{:06x}", _0)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DesfireAppId(u32);

impl DesfireAppId {
    pub const fn new(id: u32) -> Self {
        Self(id & 0x00ff_ffff)
    }

    pub fn from_bytes(bytes: [u8; 3]) -> Self {
        Self(u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]))
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }

    pub fn to_bytes(&self) -> [u8; 3] {
        let b = self.0.to_be_bytes();
        [b[1], b[2], b[3]]
    }
}

/// MIFARE Classic key type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum KeyType {
    #[display(fmt = "A")]
    A,
    #[display(fmt = "B")]
    B,
}

impl KeyType {
    pub fn inverse(&self) -> Self {
        match self {
            KeyType::A => KeyType::B,
            KeyType::B => KeyType::A,
        }
    }
}

/// MIFARE Classic key (6 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClassicKey([u8; 6]);

impl ClassicKey {
    pub const fn from_bytes(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        crate::utils::bytes_to_hex(&self.0)
    }

    pub fn from_hex(s: &str) -> crate::Result<Self> {
        let bytes = crate::utils::parse_hex(s).map_err(Error::UnsupportedOperation)?;
        Self::try_from(&bytes[..])
    }
}

impl TryFrom<&[u8]> for ClassicKey {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() != 6 {
            return Err(Error::InvalidLength {
                expected: 6,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 6];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }
}

/// A key together with the type it was issued as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClassicSectorKey {
    pub key: ClassicKey,
    pub key_type: KeyType,
}

impl ClassicSectorKey {
    pub fn new(key: ClassicKey, key_type: KeyType) -> Self {
        Self { key, key_type }
    }

    pub fn key_a(key: ClassicKey) -> Self {
        Self::new(key, KeyType::A)
    }

    pub fn key_b(key: ClassicKey) -> Self {
        Self::new(key, KeyType::B)
    }

    /// Same key, other type.
    pub fn inverted(&self) -> Self {
        Self::new(self.key, self.key_type.inverse())
    }
}

/// Card families this crate can acquire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CardKind {
    #[display(fmt = "MIFARE Classic")]
    MifareClassic,
    #[display(fmt = "MIFARE DESFire")]
    MifareDesfire,
    #[display(fmt = "FeliCa")]
    Felica,
    #[display(fmt = "CEPAS")]
    Cepas,
    #[display(fmt = "ISO7816")]
    Iso7816,
}
