//! In-memory address space backed by a byte dump

use std::path::Path;

use goldrl_core::MemorySource;

/// Snapshot of (part of) the address space, starting at `base`.
///
/// Reads outside the captured window return 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryImage {
    base: u16,
    bytes: Vec<u8>,
}

impl MemoryImage {
    /// Wrap `bytes` as the memory starting at `base`
    #[must_use]
    pub fn new(base: u16, bytes: Vec<u8>) -> Self {
        let max_len = 0x1_0000 - usize::from(base);
        let mut bytes = bytes;
        bytes.truncate(max_len);
        Self { base, bytes }
    }

    /// A zero-filled full 64 KiB address space
    #[must_use]
    pub fn zeroed() -> Self {
        Self { base: 0, bytes: vec![0; 0x1_0000] }
    }

    /// Load a dump file mapped at `base`
    pub fn from_file(path: impl AsRef<Path>, base: u16) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(Self::new(base, bytes))
    }

    /// First mapped address
    #[must_use]
    pub fn base(&self) -> u16 {
        self.base
    }

    /// Number of mapped bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether no byte is mapped
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The mapped bytes, starting at [`MemoryImage::base`]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn offset(&self, address: u16) -> Option<usize> {
        address
            .checked_sub(self.base)
            .map(usize::from)
            .filter(|&off| off < self.bytes.len())
    }

    /// Overwrite one byte; writes outside the window are ignored
    pub fn write_byte(&mut self, address: u16, value: u8) {
        if let Some(off) = self.offset(address) {
            self.bytes[off] = value;
        }
    }

    /// Overwrite consecutive bytes starting at `address`
    pub fn write_bytes(&mut self, address: u16, values: &[u8]) {
        for (i, &v) in values.iter().enumerate() {
            if let Ok(i) = u16::try_from(i) {
                self.write_byte(address.wrapping_add(i), v);
            }
        }
    }

    /// Write a big-endian 16-bit word
    pub fn write_word_be(&mut self, address: u16, value: u16) {
        self.write_bytes(address, &value.to_be_bytes());
    }
}

impl MemorySource for MemoryImage {
    fn read_byte(&self, address: u16) -> u8 {
        self.offset(address).map_or(0, |off| self.bytes[off])
    }
}
