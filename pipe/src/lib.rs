// Common modules

mod error;
mod options;
mod sync;

#[cfg(target_family = "unix")]
mod nonblocking;

pub use error::TransferError;
pub use options::{create_pipe, pipe, PipeOptions};
pub use sync::{read, write, write_some, PipeReader, PipeWriter};

#[cfg(target_family = "unix")]
pub use nonblocking::{AsyncPipeReader, AsyncPipeWriter};

// OS-specific modules

#[cfg_attr(target_family = "unix", path = "unix/mod.rs")]
#[cfg_attr(target_family = "windows", path = "windows/mod.rs")]
mod os;

// Re-exported types from the handle crate
pub use pipework_handle::{
    CrossPlatformHandle, Handle, HandleError, RawHandle, SharedHandle, INVALID_HANDLE,
};

// Transfers on a released handle are programming errors, not I/O failures
pub(crate) fn expect_live(handle: &Handle, operation: &str) -> RawHandle {
    if !handle.is_valid() {
        panic!("{} called on a released handle", operation);
    }
    handle.as_raw()
}
