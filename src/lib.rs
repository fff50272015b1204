#![cfg_attr(not(test), no_std)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::match_bool)]
#![allow(clippy::unreadable_literal)]
#![allow(clippy::module_name_repetitions)]

extern crate alloc;

pub mod config;
pub mod device;
pub mod fs;
pub mod kernel;
pub mod logger;
pub mod syscall;
pub mod user;
pub mod vfs;

#[cfg(test)]
mod testing;

/// The prelude of the crate. It re-exports some imports that are used in almost every
/// file, allowing to use them without having to list them each time and improving the
/// readability of the code.
#[rustfmt::skip]
pub mod prelude {
    pub use alloc::string::{String, ToString};
    pub use alloc::boxed::Box;
    pub use alloc::sync::Arc;
    pub use alloc::vec::Vec;
    pub use sync::*;
}

pub use kernel::Kernel;
pub use user::task::Task;
