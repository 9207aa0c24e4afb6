use std::fmt;
use thiserror::Error;

/// Width of the canonical amount byte encoding
pub const AMOUNT_LENGTH: usize = 32;

#[derive(Error, Debug)]
pub enum AmountError {
    #[error("Invalid hex amount: {0}")]
    InvalidHex(String),

    #[error("Amount too wide: {got} bytes exceed the 32-byte width")]
    TooWide { got: usize },
}

/// 256-bit unsigned token amount, stored big-endian
///
/// No big-integer crate is involved; the byte layout is the canonical
/// encoding, so ordering and equality fall out of byte comparison.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenAmount([u8; AMOUNT_LENGTH]);

impl TokenAmount {
    /// The zero amount
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn from_u64(value: u64) -> Self {
        Self::from_u128(value as u128)
    }

    pub fn from_u128(value: u128) -> Self {
        let mut bytes = [0u8; AMOUNT_LENGTH];
        bytes[AMOUNT_LENGTH - 16..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }

    /// Create an amount from big-endian bytes, left-padding to 32 bytes
    pub fn from_be_bytes(bytes: &[u8]) -> Result<Self, AmountError> {
        if bytes.len() > AMOUNT_LENGTH {
            return Err(AmountError::TooWide { got: bytes.len() });
        }
        let mut out = [0u8; AMOUNT_LENGTH];
        out[AMOUNT_LENGTH - bytes.len()..].copy_from_slice(bytes);
        Ok(Self(out))
    }

    /// Parse from the hex wire form
    pub fn from_hex(s: &str) -> Result<Self, AmountError> {
        let padded = if s.len() % 2 == 1 {
            format!("0{s}")
        } else {
            s.to_string()
        };
        let bytes = hex::decode(&padded).map_err(|e| AmountError::InvalidHex(e.to_string()))?;
        Self::from_be_bytes(&bytes)
    }

    /// Get the canonical big-endian byte form
    pub fn to_be_bytes(&self) -> &[u8; AMOUNT_LENGTH] {
        &self.0
    }

    /// Get the full-width hex wire form
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; AMOUNT_LENGTH]
    }

    /// Add, returning None on overflow past 256 bits
    pub fn checked_add(&self, other: &Self) -> Option<Self> {
        let mut out = [0u8; AMOUNT_LENGTH];
        let mut carry = 0u16;
        for i in (0..AMOUNT_LENGTH).rev() {
            let sum = self.0[i] as u16 + other.0[i] as u16 + carry;
            out[i] = sum as u8;
            carry = sum >> 8;
        }
        if carry != 0 {
            None
        } else {
            Some(Self(out))
        }
    }

    /// Subtract, returning None on underflow
    pub fn checked_sub(&self, other: &Self) -> Option<Self> {
        let mut out = [0u8; AMOUNT_LENGTH];
        let mut borrow = 0i16;
        for i in (0..AMOUNT_LENGTH).rev() {
            let mut diff = self.0[i] as i16 - other.0[i] as i16 - borrow;
            if diff < 0 {
                diff += 256;
                borrow = 1;
            } else {
                borrow = 0;
            }
            out[i] = diff as u8;
        }
        if borrow != 0 {
            None
        } else {
            Some(Self(out))
        }
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl fmt::Debug for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenAmount(0x{})", self.to_hex())
    }
}
