// Common modules

mod error;
mod handle;

pub use error::HandleError;
pub use handle::{CrossPlatformHandle, SharedHandle};

// OS-specific modules

#[cfg_attr(target_family = "unix", path = "unix/mod.rs")]
#[cfg_attr(target_family = "windows", path = "windows/mod.rs")]
mod os;

pub use os::handle::{
    downcast_to_handle, set_unmanaged_handle_inheritable, Handle, RawHandle, INVALID_HANDLE,
};
