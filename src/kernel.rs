use crate::{
    config::Config,
    prelude::*,
    vfs::{node::Filesystem, table::OpenFileTable},
};

/// The state shared by every task of the system. There is a single instance of this
/// structure, created when the kernel starts and never destroyed: each task holds a
/// reference to it instead of reaching for a global variable.
pub struct Kernel {
    config: Config,
    files: OpenFileTable,
    fs: Arc<dyn Filesystem>,
}

impl Kernel {
    /// Creates the kernel state with an empty open file table sized according to the
    /// configuration. Every path opened by a task is resolved by `fs`.
    #[must_use]
    pub fn new(config: Config, fs: Arc<dyn Filesystem>) -> Arc<Self> {
        log::info!(
            "Open file table ready ({} entries, console on {:?})",
            config.system_open_max,
            config.console
        );
        Arc::new(Self {
            files: OpenFileTable::new(config.system_open_max),
            config,
            fs,
        })
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the global open file table.
    #[must_use]
    pub fn files(&self) -> &OpenFileTable {
        &self.files
    }

    /// Returns the filesystem used to resolve the paths passed to `open`.
    #[must_use]
    pub fn fs(&self) -> &dyn Filesystem {
        &*self.fs
    }
}

impl core::fmt::Debug for Kernel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Kernel")
            .field("config", &self.config)
            .field("files", &self.files)
            .finish_non_exhaustive()
    }
}
