//! WAL directory naming conventions.

use std::path::{Path, PathBuf};

/// Name of a log segment file.
pub fn wal_file_name(file_no: u32) -> String {
    format!("{}.wal", file_no)
}

/// Full path of a log segment file.
pub fn wal_file_path(dir: &Path, file_no: u32) -> PathBuf {
    dir.join(wal_file_name(file_no))
}

/// Parse a segment file name and return its number.
///
/// Returns `None` if the name is not of the form `<N>.wal`.
pub fn parse_wal_file_name(name: &str) -> Option<u32> {
    name.strip_suffix(".wal")?.parse().ok()
}

/// List segment numbers present in a directory, sorted ascending.
pub fn list_wal_files(dir: &Path) -> std::io::Result<Vec<u32>> {
    let mut numbers = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();

        if let Some(number) = parse_wal_file_name(&name) {
            numbers.push(number);
        }
    }

    numbers.sort_unstable();
    Ok(numbers)
}

/// Get the file size.
pub fn file_size(path: &Path) -> std::io::Result<u64> {
    Ok(std::fs::metadata(path)?.len())
}

/// Delete a file, ignoring "not found" errors.
pub fn delete_file(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Create directory if it doesn't exist.
pub fn create_dir_if_missing(path: &Path) -> std::io::Result<()> {
    match std::fs::create_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_paths() {
        assert_eq!(wal_file_name(0), "0.wal");
        assert_eq!(wal_file_name(42), "42.wal");
        assert_eq!(
            wal_file_path(Path::new("/data/wal"), 7),
            Path::new("/data/wal/7.wal")
        );
    }

    #[test]
    fn test_parse_wal_file_name() {
        assert_eq!(parse_wal_file_name("0.wal"), Some(0));
        assert_eq!(parse_wal_file_name("123.wal"), Some(123));

        assert_eq!(parse_wal_file_name("123.log"), None);
        assert_eq!(parse_wal_file_name("abc.wal"), None);
        assert_eq!(parse_wal_file_name("123.wal.bak"), None);
        assert_eq!(parse_wal_file_name(".wal"), None);
    }

    #[test]
    fn test_list_wal_files() {
        let dir = tempdir().unwrap();

        std::fs::write(wal_file_path(dir.path(), 3), "x").unwrap();
        std::fs::write(wal_file_path(dir.path(), 0), "x").unwrap();
        std::fs::write(wal_file_path(dir.path(), 11), "x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let files = list_wal_files(dir.path()).unwrap();
        assert_eq!(files, vec![0, 3, 11]);
    }

    #[test]
    fn test_file_size() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("0.wal");
        std::fs::write(&path, vec![0u8; 450]).unwrap();
        assert_eq!(file_size(&path).unwrap(), 450);
    }

    #[test]
    fn test_delete_file() {
        let dir = tempdir().unwrap();
        let path = wal_file_path(dir.path(), 0);

        // Deleting a missing file succeeds.
        assert!(delete_file(&path).is_ok());

        std::fs::write(&path, "x").unwrap();
        delete_file(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_create_dir_if_missing() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a/b");

        create_dir_if_missing(&nested).unwrap();
        assert!(nested.is_dir());

        // Idempotent.
        create_dir_if_missing(&nested).unwrap();
    }
}
