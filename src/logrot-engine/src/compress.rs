//! Compression of rotated files.
//!
//! Without `compresscmd` the built-in gzip encoder is used. An external
//! compressor reads the file on stdin and its stdout becomes the target.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::process::{Command, Stdio};

use flate2::Compression as GzLevel;
use flate2::write::GzEncoder;
use tracing::debug;

use logrot_config::Compression;

use crate::error::{Result, RotateError};

/// First two bytes of every gzip stream.
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Whether `path` starts with the gzip magic number.
pub fn is_gzip(path: &Path) -> io::Result<bool> {
    let mut magic = [0u8; 2];
    let mut file = File::open(path)?;
    match file.read_exact(&mut magic) {
        Ok(()) => Ok(magic == GZIP_MAGIC),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

fn gzip(src: &Path, dst: &Path) -> Result<()> {
    let input = File::open(src).map_err(RotateError::io("open", src))?;
    let output = File::create(dst).map_err(RotateError::io("create", dst))?;

    let mut encoder = GzEncoder::new(BufWriter::new(output), GzLevel::default());
    io::copy(&mut BufReader::new(input), &mut encoder).map_err(RotateError::io("compress", src))?;
    let mut writer = encoder.finish().map_err(RotateError::io("compress", dst))?;
    writer.flush().map_err(RotateError::io("write", dst))?;
    Ok(())
}

fn external(command: &str, options: &[String], src: &Path, dst: &Path) -> Result<()> {
    let input = File::open(src).map_err(RotateError::io("open", src))?;
    let output = File::create(dst).map_err(RotateError::io("create", dst))?;

    debug!(command, ?options, src = %src.display(), "Running external compressor");
    let result = Command::new(command)
        .args(options)
        .stdin(Stdio::from(input))
        .stdout(Stdio::from(output))
        .stderr(Stdio::piped())
        .output()
        .map_err(RotateError::io("run compressor on", src))?;

    if !result.status.success() {
        let _ = fs::remove_file(dst);
        return Err(RotateError::Compressor {
            command: command.to_string(),
            path: src.to_path_buf(),
            status: result.status.code(),
            stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
        });
    }
    Ok(())
}

/// Compress `src` into `dst`, copy its permissions and remove `src`.
pub fn compress_file(src: &Path, dst: &Path, settings: &Compression) -> Result<()> {
    let outcome = match settings.command.as_deref() {
        Some(command) => external(command, &settings.options, src, dst),
        None => gzip(src, dst),
    };
    if let Err(e) = outcome {
        let _ = fs::remove_file(dst);
        return Err(e);
    }

    if let Ok(meta) = fs::metadata(src) {
        let _ = fs::set_permissions(dst, meta.permissions());
    }
    fs::remove_file(src).map_err(RotateError::io("remove", src))?;

    debug!(src = %src.display(), dst = %dst.display(), "Compressed rotated file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_gzip_roundtrip() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("app.log.1");
        let dst = dir.path().join("app.log.1.gz");
        fs::write(&src, "line one\nline two\n").unwrap();

        compress_file(&src, &dst, &Compression::default()).unwrap();

        assert!(!src.exists());
        assert!(is_gzip(&dst).unwrap());
        let mut text = String::new();
        GzDecoder::new(File::open(&dst).unwrap())
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, "line one\nline two\n");
    }

    #[test]
    fn test_is_gzip_on_short_and_plain_files() {
        let dir = TempDir::new().unwrap();
        let empty = dir.path().join("empty");
        let plain = dir.path().join("plain");
        fs::write(&empty, "").unwrap();
        fs::write(&plain, "hello").unwrap();
        assert!(!is_gzip(&empty).unwrap());
        assert!(!is_gzip(&plain).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn test_external_compressor() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("app.log.1");
        let dst = dir.path().join("app.log.1.z");
        fs::write(&src, "abc").unwrap();

        let settings = Compression {
            enabled: true,
            command: Some("cat".to_string()),
            ..Compression::default()
        };
        compress_file(&src, &dst, &settings).unwrap();
        assert_eq!(fs::read_to_string(&dst).unwrap(), "abc");
        assert!(!src.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_compressor_keeps_source() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("app.log.1");
        let dst = dir.path().join("app.log.1.z");
        fs::write(&src, "abc").unwrap();

        let settings = Compression {
            enabled: true,
            command: Some("false".to_string()),
            ..Compression::default()
        };
        let err = compress_file(&src, &dst, &settings).unwrap_err();
        assert!(matches!(err, RotateError::Compressor { .. }));
        assert!(src.exists());
        assert!(!dst.exists());
    }
}
