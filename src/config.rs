use crate::prelude::*;
use typed_builder::TypedBuilder;

/// The maximal number of descriptors a single task can have open at the same time. The
/// descriptor table tracks its free slots with a 64 bits bitmap, so this cannot exceed 64.
pub const OPEN_MAX: usize = 64;

/// The default number of open files the whole system can have at the same time.
pub const SYSTEM_OPEN_MAX: usize = 256;

/// The maximal length of a path that an task can pass to the kernel, including the
/// terminating null byte.
pub const MAX_PATH: usize = 1024;

/// The name of the console device. The standard descriptors of every task are opened
/// on this device when the task is created.
pub const CONSOLE: &str = "con:";

const _: () = assert!(OPEN_MAX <= 64);

/// Runtime configuration of the file descriptor subsystem. Every field defaults to the
/// compile-time constant of the same name.
#[derive(TypedBuilder, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Capacity of the global open file table.
    #[builder(default = SYSTEM_OPEN_MAX)]
    pub system_open_max: usize,

    /// Longest path accepted from userland, including the null terminator.
    #[builder(default = MAX_PATH)]
    pub max_path: usize,

    /// Path opened on descriptors 0, 1 and 2 of every new task.
    #[builder(default = String::from(CONSOLE), setter(into))]
    pub console: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::builder().build()
    }
}
