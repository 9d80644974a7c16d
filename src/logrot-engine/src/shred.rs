//! Secure deletion: overwrite with random bytes, then unlink.

use std::fs::{self, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;

use rand::Rng;
use tracing::debug;

const CHUNK: usize = 64 * 1024;

/// Overwrite `path` `cycles` times with random data, syncing after each
/// pass, and remove it.
pub fn shred_file(path: &Path, cycles: u32) -> io::Result<()> {
    let len = fs::metadata(path)?.len();
    let mut file = OpenOptions::new().write(true).open(path)?;
    let mut rng = rand::rng();
    let mut buf = vec![0u8; CHUNK];

    for pass in 0..cycles {
        file.seek(SeekFrom::Start(0))?;
        let mut remaining = len;
        while remaining > 0 {
            let n = remaining.min(CHUNK as u64) as usize;
            rng.fill(&mut buf[..n]);
            file.write_all(&buf[..n])?;
            remaining -= n as u64;
        }
        file.sync_all()?;
        debug!(path = %path.display(), pass = pass + 1, "Shred pass complete");
    }
    drop(file);

    fs::remove_file(path)
}
