use crate::error::Result;
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

/// Map a file into memory read-only.
///
/// The caller must not truncate the file while the map is alive.
pub fn mmap_file(path: &Path) -> Result<Mmap> {
    let file = File::open(path)?;
    // SAFETY: read-only mapping of a file this process does not modify
    let mmap = unsafe { Mmap::map(&file)? };
    Ok(mmap)
}
