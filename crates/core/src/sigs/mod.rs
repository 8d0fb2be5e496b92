//! Address-keyed function signatures recovered from a binary.
//!
//! The on-disk form is a JSON object mapping address strings to
//! `{ "name": ..., "sig": ... }` records, as produced by the disassembler
//! export scripts.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::model::{Address, AddressParseError, FuncSig};

/// Error type for reading a signature file.
#[derive(Debug, Error)]
pub enum SigsError {
    #[error("Failed to read signature file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse signature JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    InvalidAddress(#[from] AddressParseError),

    /// Two keys (e.g. `"0x10"` and `"16"`) denote the same address.
    #[error("Address {addr} is listed more than once (as {first:?} and {second:?})")]
    DuplicateAddress { addr: Address, first: String, second: String },
}

/// Mapping from address to recovered signature.
///
/// Iteration and [`AddressTable::addresses`] are in ascending address order,
/// which is the order of the emitted module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressTable {
    sigs: BTreeMap<Address, FuncSig>,
}

impl AddressTable {
    pub fn new(sigs: BTreeMap<Address, FuncSig>) -> Self {
        Self { sigs }
    }

    pub fn get(&self, addr: Address) -> Option<&FuncSig> {
        self.sigs.get(&addr)
    }

    /// Addresses in ascending order.
    pub fn addresses(&self) -> Vec<Address> {
        self.sigs.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Address, &FuncSig)> {
        self.sigs.iter().map(|(addr, sig)| (*addr, sig))
    }

    pub fn len(&self) -> usize {
        self.sigs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sigs.is_empty()
    }
}

impl FromIterator<(Address, FuncSig)> for AddressTable {
    fn from_iter<I: IntoIterator<Item = (Address, FuncSig)>>(iter: I) -> Self {
        Self { sigs: iter.into_iter().collect() }
    }
}

/// Parse a signature table from JSON text.
pub fn parse_sigs_str(json: &str) -> Result<AddressTable, SigsError> {
    let raw: BTreeMap<String, FuncSig> = serde_json::from_str(json)?;
    let mut sigs = BTreeMap::new();
    let mut spelling: BTreeMap<Address, String> = BTreeMap::new();
    for (key, sig) in raw {
        let addr: Address = key.parse()?;
        if let Some(first) = spelling.get(&addr) {
            return Err(SigsError::DuplicateAddress { addr, first: first.clone(), second: key });
        }
        spelling.insert(addr, key);
        sigs.insert(addr, sig);
    }
    log::debug!("parsed {} function signatures", sigs.len());
    Ok(AddressTable::new(sigs))
}

/// Read and parse a signature table from a JSON file.
pub fn load_sigs(path: &Path) -> Result<AddressTable, SigsError> {
    let body = std::fs::read_to_string(path)
        .map_err(|source| SigsError::Io { path: path.to_path_buf(), source })?;
    parse_sigs_str(&body)
}
