use crate::error::Result;
use std::io::{Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Atomically write `data` to `path` using a tempfile in the same directory.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Read a reader to end as UTF-8. Hook payloads arrive on stdin in one piece.
pub fn read_all(mut reader: impl Read) -> Result<String> {
    let mut buf = String::new();
    reader.read_to_string(&mut buf)?;
    Ok(buf)
}

/// First `max` characters of `s`, never splitting a code point.
pub fn clip(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a/b/pmo.yaml");
        atomic_write(&path, b"version: 1").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "version: 1");
    }

    #[test]
    fn clip_respects_char_boundaries() {
        assert_eq!(clip("小红书发布", 3), "小红书");
        assert_eq!(clip("abc", 10), "abc");
        assert_eq!(clip("", 5), "");
    }

    #[test]
    fn read_all_reads_reader() {
        let text = read_all(&b"{\"a\":1}"[..]).unwrap();
        assert_eq!(text, "{\"a\":1}");
    }
}
