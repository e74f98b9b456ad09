//! Engine configuration.

/// Tunables for an [`Engine`](crate::Engine), set before the first write.
#[derive(Debug, Clone)]
pub struct Config {
    /// Size cap at which the active segment rolls over (default: 1 MiB).
    ///
    /// The cap is strict: rollover happens when the next frame would push
    /// the file past it, never after.
    pub max_file_size: u64,

    /// Follow every append with `fsync` before returning (default: false).
    ///
    /// Off by default: durability is then bounded by the page cache, and a
    /// machine crash can lose the tail of the log. [`Engine::sync`] and
    /// [`Engine::close`] flush explicitly either way.
    ///
    /// [`Engine::sync`]: crate::Engine::sync
    /// [`Engine::close`]: crate::Engine::close
    pub sync_on_put: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_file_size: segment::DEFAULT_MAX_FILE_SIZE,
            sync_on_put: false,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the segment size cap.
    pub fn max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = size;
        self
    }

    /// Enable or disable fsync-per-put.
    pub fn sync_on_put(mut self, sync: bool) -> Self {
        self.sync_on_put = sync;
        self
    }
}
