//! Configuration options for the write-ahead log.

use std::path::PathBuf;

/// Smallest allowed slab size (64 KiB).
pub const WAL_BUFFER_MIN_SIZE: u32 = 64 * 1024;

/// Largest allowed slab size (2 GiB). One slab must fit any segment, and
/// segment offsets live in the low 32 bits of an LSN.
pub const WAL_BUFFER_MAX_SIZE: u32 = 2 * 1024 * 1024 * 1024;

/// Default slab size (64 MiB).
pub const DEFAULT_WAL_BUFFER_SIZE: u32 = 64 * 1024 * 1024;

/// Write-ahead log configuration.
///
/// `buffer_size` is the capacity of each of the two in-memory slabs and
/// therefore also the upper bound on a segment file's size. Values outside
/// `[WAL_BUFFER_MIN_SIZE, WAL_BUFFER_MAX_SIZE]` are clamped at
/// construction; recovery may grow the effective size further to fit the
/// largest segment already on disk.
#[derive(Debug, Clone)]
pub struct WalOptions {
    /// Directory holding the `<N>.wal` segment files.
    pub path: PathBuf,

    /// Initial slab size in bytes.
    pub buffer_size: u32,
}

impl WalOptions {
    /// Create options for the given log directory with default sizing.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            buffer_size: DEFAULT_WAL_BUFFER_SIZE,
        }
    }

    /// Validate the options.
    pub fn validate(&self) -> crate::Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(crate::Error::InvalidConfiguration(
                "wal path must not be empty".into(),
            ));
        }
        if self.buffer_size == 0 {
            return Err(crate::Error::InvalidConfiguration(
                "wal buffer size must not be zero".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for WalOptions.
#[derive(Debug, Clone)]
pub struct WalOptionsBuilder {
    options: WalOptions,
}

impl WalOptionsBuilder {
    /// Create a new builder for the given log directory.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            options: WalOptions::new(path),
        }
    }

    /// Set the slab size in bytes.
    pub fn buffer_size(mut self, size: u32) -> Self {
        self.options.buffer_size = size;
        self
    }

    /// Build the options.
    pub fn build(self) -> crate::Result<WalOptions> {
        self.options.validate()?;
        Ok(self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sizing() {
        let opts = WalOptions::new("/data/wal");
        assert_eq!(opts.buffer_size, DEFAULT_WAL_BUFFER_SIZE);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let opts = WalOptions::new("");
        assert!(opts.validate().is_err());

        let mut opts = WalOptions::new("/data/wal");
        opts.buffer_size = 0;
        assert!(opts.validate().is_err());
    }

    #[test]
    fn test_builder() {
        let opts = WalOptionsBuilder::new("/data/wal")
            .buffer_size(128 * 1024)
            .build()
            .unwrap();
        assert_eq!(opts.path, PathBuf::from("/data/wal"));
        assert_eq!(opts.buffer_size, 128 * 1024);
    }

    #[test]
    fn test_limits_ordering() {
        assert!(WAL_BUFFER_MIN_SIZE < DEFAULT_WAL_BUFFER_SIZE);
        assert!(DEFAULT_WAL_BUFFER_SIZE < WAL_BUFFER_MAX_SIZE);
    }
}
