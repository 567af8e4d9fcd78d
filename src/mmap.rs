use memmap2::MmapOptions;
use std::fs::File;
use std::path::Path;

use crate::{CsvInferError, CsvProcessor, CsvResult, ProcessorOptions};

impl CsvProcessor {
    /// Parses an uncompressed local file through a memory map instead of buffered reads.
    #[cfg_attr(docsrs, doc(cfg(feature = "fast_local")))]
    pub fn from_mmap_path(path: impl AsRef<Path>, options: ProcessorOptions) -> CsvResult<Self> {
        let file = File::open(path.as_ref())?;
        if file.metadata()?.len() == 0 {
            return Err(CsvInferError::EmptyInput);
        }
        let mmap = unsafe { MmapOptions::new().map(&file)? };
        Self::with_options(&mmap[..], options)
    }
}
