use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};

/// Replacement of a byte range in a document source. An empty range inserts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Splice {
    pub range: Range<usize>,
    pub text: String,
}

impl Splice {
    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self {
            range: at..at,
            text: text.into(),
        }
    }

    pub fn replace(range: Range<usize>, text: impl Into<String>) -> Self {
        Self {
            range,
            text: text.into(),
        }
    }
}

/// Applies splices given in ascending, non-overlapping order.
pub fn apply(source: &str, splices: &[Splice]) -> String {
    let extra: usize = splices.iter().map(|s| s.text.len()).sum();
    let mut out = String::with_capacity(source.len() + extra);
    let mut cursor = 0;

    for splice in splices {
        debug_assert!(splice.range.start >= cursor, "splices out of order");
        out.push_str(&source[cursor..splice.range.start]);
        out.push_str(&splice.text);
        cursor = splice.range.end;
    }

    out.push_str(&source[cursor..]);
    out
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

/// Writes `contents` to a sibling temp file and renames it over `path`,
/// so readers see either the old file or the new one, never a partial write.
///
/// A symbolic link is resolved first so the file it points at is replaced
/// and the link itself survives.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let resolved;
    let path = match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => {
            resolved = fs::canonicalize(path)?;
            resolved.as_path()
        }
        _ => path,
    };
    let tmp_path = temp_path(path);

    let result = File::create(&tmp_path)
        .and_then(|mut file| {
            file.write_all(contents)?;
            file.sync_all()
        })
        .and_then(|()| fs::rename(&tmp_path, path));

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn apply_inserts_and_replaces() {
        let source = "<s n=''>x</s>";
        let splices = vec![
            Splice::insert(2, " a=\"1\""),
            Splice::replace(5..7, "'2'"),
        ];
        assert_eq!(apply(source, &splices), "<s a=\"1\" n='2'>x</s>");
    }

    #[test]
    fn apply_without_splices_is_identity() {
        assert_eq!(apply("<a/>\n", &[]), "<a/>\n");
    }

    #[test]
    fn temp_path_keeps_extension() {
        assert_eq!(
            temp_path(Path::new("/c/2020/52-1-1.xml")),
            PathBuf::from("/c/2020/52-1-1.xml.tmp")
        );
    }

    #[test]
    fn write_atomic_replaces_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.xml");
        fs::write(&path, "old").unwrap();

        write_atomic(&path, b"new").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn write_atomic_failure_leaves_nothing_behind() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing-dir").join("doc.xml");

        assert!(write_atomic(&path, b"new").is_err());
        assert!(!path.exists());
        assert!(!temp_path(&path).exists());
    }

    #[cfg(unix)]
    #[test]
    fn write_atomic_through_symlink_keeps_the_link() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("target.xml");
        let link = dir.path().join("link.xml");
        fs::write(&target, "old").unwrap();
        std::os::unix::fs::symlink(&target, &link).unwrap();

        write_atomic(&link, b"new").unwrap();

        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_to_string(&target).unwrap(), "new");
    }
}
