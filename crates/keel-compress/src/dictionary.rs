//! Precompiled dictionary binding
//!
//! A dictionary is precompiled once per factory configuration and shared,
//! read-only, by every stream the factory creates. The compression level is
//! baked into the precompiled form, so a bound dictionary overrides the
//! configured level. Fetching dictionary bytes and watching for updates is
//! the host's concern; this module only binds bytes it is given.

use std::fmt;

use zstd::dict::EncoderDictionary;

use crate::{Error, Result};

/// Magic number opening a formatted zstd dictionary
pub const DICTIONARY_MAGIC: u32 = 0xEC30_A437;

/// One precompiled dictionary and its numeric identifier
pub struct Dictionary {
    prepared: EncoderDictionary<'static>,
    id: u32,
}

impl Dictionary {
    /// Precompile `bytes` at `level`
    ///
    /// # Errors
    /// Returns [`Error::Dictionary`] when `bytes` is empty.
    pub fn precompile(bytes: &[u8], level: i32) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::Dictionary("dictionary is empty".into()));
        }
        Ok(Self {
            prepared: EncoderDictionary::copy(bytes, level),
            id: parse_dictionary_id(bytes),
        })
    }

    /// Identifier every frame compressed with this dictionary references.
    /// Raw-content dictionaries carry no identifier and report 0.
    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    pub(crate) fn prepared(&self) -> &EncoderDictionary<'static> {
        &self.prepared
    }
}

impl fmt::Debug for Dictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dictionary").field("id", &self.id).finish()
    }
}

/// Dictionary identifier from the blob header: formatted dictionaries open
/// with the dictionary magic followed by a little-endian identifier; any
/// other blob is a raw-content dictionary with identifier 0.
fn parse_dictionary_id(bytes: &[u8]) -> u32 {
    if bytes.len() < 8 {
        return 0;
    }
    let magic = u32::from_le_bytes(bytes[0..4].try_into().expect("slice length"));
    if magic != DICTIONARY_MAGIC {
        return 0;
    }
    u32::from_le_bytes(bytes[4..8].try_into().expect("slice length"))
}

/// Retains exactly one precompiled dictionary for one configuration.
///
/// The manager outlives every engine bound to it; engines hold a shared
/// handle rather than a raw reference.
#[derive(Debug)]
pub struct DictionaryManager {
    first: Dictionary,
}

impl DictionaryManager {
    /// Precompile and retain one dictionary
    ///
    /// # Errors
    /// Returns [`Error::Dictionary`] when the bytes cannot be bound.
    pub fn precompile(bytes: &[u8], level: i32) -> Result<Self> {
        Ok(Self {
            first: Dictionary::precompile(bytes, level)?,
        })
    }

    /// Get the retained dictionary
    #[must_use]
    pub fn first_dictionary(&self) -> &Dictionary {
        &self.first
    }
}
