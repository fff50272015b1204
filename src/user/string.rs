use super::{buffer, pointer::Pointer, StrCopyError, UserMemory};
use crate::prelude::*;
use alloc::string::FromUtf8Error;

/// Fetch a null-terminated string from the memory of the task. The string is copied
/// into the kernel and returned as an owned `String`: modifying it does not affect the
/// memory of the task.
///
/// `max` is the size of the largest string accepted, including the terminator.
///
/// # Errors
/// This function will return an error if any of the following conditions are met (see
/// the [`FetchError`] enum for more details):
/// - The string is not readable by the task
/// - No terminator was found in the first `max` bytes
/// - The string is not valid UTF-8
/// - The kernel could not allocate a buffer to hold the string
pub fn fetch(memory: &dyn UserMemory, src: Pointer, max: usize) -> Result<String, FetchError> {
    let mut bytes = buffer::zeroed(max).map_err(|_| FetchError::OutOfMemory)?;
    let len = memory.copy_in_str(src, &mut bytes)?;
    bytes.truncate(len);
    Ok(String::from_utf8(bytes)?)
}

/// An enum that represents an error that can occur when fetching a string from the
/// memory of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchError {
    /// The string is not entirely readable by the task.
    InvalidMemory,

    /// The string, with its terminator, is longer than the maximal length allowed.
    StringTooLong,

    /// The string is not a valid UTF-8 string.
    StringNotUtf8,

    /// The kernel could not allocate a buffer to hold the string.
    OutOfMemory,
}

impl From<StrCopyError> for FetchError {
    fn from(error: StrCopyError) -> Self {
        match error {
            StrCopyError::Fault => Self::InvalidMemory,
            StrCopyError::TooLong => Self::StringTooLong,
        }
    }
}

impl From<FromUtf8Error> for FetchError {
    fn from(_: FromUtf8Error) -> Self {
        Self::StringNotUtf8
    }
}
