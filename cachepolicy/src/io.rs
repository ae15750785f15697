use std::fs::File;
use std::io::BufRead;

/// Opens a trace for sequential line-by-line reading
pub fn get_reader(file: File) -> Result<Box<dyn BufRead>, String> {
    // Compatibility on other systems
    #[cfg(not(unix))]
    {
        use std::io::BufReader;
        const BUFFER_SIZE: usize = 64 * 4096;
        Ok(Box::new(BufReader::with_capacity(BUFFER_SIZE, file)))
    }
    // Memory map the file for speed on unix systems
    #[cfg(unix)]
    {
        use std::io::Cursor;
        use memmap2::{Advice, Mmap};
        // Empty files can't be mapped
        let is_empty = file.metadata().map_err(|e| format!("Couldn't read the trace's metadata: {e}"))?.len() == 0;
        if is_empty {
            return Ok(Box::new(Cursor::new(Vec::new())));
        }
        // Safety: the trace must not be truncated by another process while it is mapped
        unsafe {
            let m = Mmap::map(&file).map_err(|e| format!("Couldn't memory map the file: {e}"))?;
            m.advise(Advice::Sequential).map_err(|e| format!("Failed to provide access advice to the OS, {e}"))?;
            Ok(Box::new(Cursor::new(m)))
        }
    }
}
