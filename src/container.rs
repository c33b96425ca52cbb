//! Archive container records and the codec seam.
//!
//! The engine never parses archive bytes itself; it works on [`Container`]
//! record lists and hands (de)serialization of containers, event tracks and
//! meshes to an [`AssetCodec`] implementation supplied by the caller.

use anyhow::Result;

use crate::flver::Flver;
use crate::tae::Tae;

/// One entry of an archive container.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryEntry {
    pub id: i32,
    pub flags: u8,
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Flag value every emitted entry carries in the target generation.
pub const DEFAULT_ENTRY_FLAGS: u8 = 0x40;

impl BinaryEntry {
    pub fn new(id: i32, name: &str, bytes: Vec<u8>) -> Self {
        Self {
            id,
            flags: DEFAULT_ENTRY_FLAGS,
            name: name.to_string(),
            bytes,
        }
    }

    /// File name without the archive-internal directory part.
    pub fn file_name(&self) -> &str {
        self.name
            .rsplit(['\\', '/'])
            .next()
            .unwrap_or(self.name.as_str())
    }
}

/// An archive container: an ordered list of named entries.
#[derive(Debug, Clone, Default)]
pub struct Container {
    pub entries: Vec<BinaryEntry>,
}

impl Container {
    /// First entry whose name contains `needle`.
    pub fn find(&self, needle: &str) -> Option<&BinaryEntry> {
        self.entries.iter().find(|e| e.name.contains(needle))
    }

    /// True if any entry name contains `needle` (case-insensitive).
    pub fn contains_name(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.entries
            .iter()
            .any(|e| e.name.to_lowercase().contains(&needle))
    }

    /// Moves the entry named `source_name` (exact file name match) into
    /// `self` under a new archive path, keeping its id. Companion files
    /// such as physics wind/cloth data ride along with their converted HKX.
    pub fn transfer_from(&mut self, source: &Container, source_name: &str, new_path: &str) {
        if let Some(entry) = source.entries.iter().find(|e| e.file_name() == source_name) {
            self.entries
                .push(BinaryEntry::new(entry.id, new_path, entry.bytes.clone()));
        }
    }

    /// Sorts entries ascending by id; the target format requires it.
    pub fn sort_by_id(&mut self) {
        self.entries.sort_by_key(|e| e.id);
    }
}

/// Black-box (de)serialization of the binary formats the engine rewrites.
///
/// Implementations wrap whatever format library the host application uses;
/// tests substitute an in-memory stub.
pub trait AssetCodec {
    fn read_container(&self, bytes: &[u8]) -> Result<Container>;
    fn write_container(&self, container: &Container) -> Result<Vec<u8>>;

    fn read_tae(&self, bytes: &[u8]) -> Result<Tae>;
    fn write_tae(&self, tae: &Tae) -> Result<Vec<u8>>;

    /// Cheap magic-number probe, used to pick geometry entries out of
    /// object binders.
    fn is_flver(&self, bytes: &[u8]) -> bool;
    fn read_flver(&self, bytes: &[u8]) -> Result<Flver>;
    fn write_flver(&self, flver: &Flver) -> Result<Vec<u8>>;
}
