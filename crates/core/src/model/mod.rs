//! Core data model for recovered signatures.
//!
//! - `Address`: binary location used as the join key between the recovered
//!   symbol table and the compiled header.
//! - `FuncSig`: a recovered symbol name plus its informational C signature.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Virtual address of a function in the analysed binary.
///
/// The canonical string form is upper-case hexadecimal with a `0x` prefix,
/// which is also what ends up in the `!addr` metadata of emitted declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(pub u64);

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}

impl From<u64> for Address {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Error returned when an address string cannot be interpreted.
#[derive(Debug, Error)]
#[error("Invalid address {input:?}: {source}")]
pub struct AddressParseError {
    pub input: String,
    #[source]
    pub source: ParseIntError,
}

impl FromStr for Address {
    type Err = AddressParseError;

    /// Parse decimal, or hexadecimal when prefixed with `0x`/`0X`. Surrounding
    /// whitespace is rejected.
    ///
    /// Negative values that fit an `i64` are accepted and reinterpreted as
    /// their two's-complement bit pattern.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (digits, radix) = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => (hex, 16),
            None => (s, 10),
        };
        match u64::from_str_radix(digits, radix) {
            Ok(v) => Ok(Self(v)),
            Err(unsigned_err) => match i64::from_str_radix(digits, radix) {
                Ok(v) => Ok(Self(v as u64)),
                Err(_) => Err(AddressParseError { input: s.to_string(), source: unsigned_err }),
            },
        }
    }
}

impl Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Function signature recovered by the disassembler for one address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuncSig {
    /// Symbol name as recorded by the disassembler (may be decorated).
    pub name: String,
    /// C signature text. Informational only; never checked against the
    /// compiled declaration.
    #[serde(rename = "sig", default)]
    pub signature: String,
}

impl FuncSig {
    pub fn new(name: impl Into<String>, signature: impl Into<String>) -> Self {
        Self { name: name.into(), signature: signature.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_display_is_upper_hex() {
        assert_eq!(Address(0x401000).to_string(), "0x401000");
        assert_eq!(Address(0xdeadbeef).to_string(), "0xDEADBEEF");
        assert_eq!(Address(0).to_string(), "0x0");
    }

    #[test]
    fn address_parses_hex_and_decimal() {
        assert_eq!("0x401000".parse::<Address>().unwrap(), Address(0x401000));
        assert_eq!("0XFF".parse::<Address>().unwrap(), Address(255));
        assert_eq!("4096".parse::<Address>().unwrap(), Address(4096));
    }

    #[test]
    fn address_accepts_negative_as_twos_complement() {
        assert_eq!("-1".parse::<Address>().unwrap(), Address(u64::MAX));
    }

    #[test]
    fn address_rejects_garbage() {
        let err = "0xZZ".parse::<Address>().unwrap_err();
        assert!(err.to_string().contains("0xZZ"));
    }

    #[test]
    fn address_rejects_surrounding_whitespace() {
        assert!(" 0x10 ".parse::<Address>().is_err());
        assert!("16\n".parse::<Address>().is_err());
    }

    #[test]
    fn func_sig_reads_sig_field() {
        let sig: FuncSig =
            serde_json::from_str(r#"{"name":"_WinMain@16","sig":"int WinMain()"}"#).unwrap();
        assert_eq!(sig.name, "_WinMain@16");
        assert_eq!(sig.signature, "int WinMain()");
    }
}
