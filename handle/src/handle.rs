use crate::error::HandleError;
use crate::os::handle::{Handle, RawHandle};
use std::sync::Arc;

pub type SharedHandle = Arc<Handle>;

// Operations acting on the resource panic when called on a released handle
pub trait CrossPlatformHandle: core::fmt::Debug {
    // `raw_handle` must not be owned by anything else, it is closed on drop
    unsafe fn from_raw(raw_handle: RawHandle) -> Result<Self, HandleError>
    where
        Self: Sized;

    fn as_raw(&self) -> RawHandle;

    /// Gives up ownership of the underlying resource and leaves this handle
    /// released. A second call returns `INVALID_HANDLE`.
    fn take(&mut self) -> RawHandle;

    fn is_valid(&self) -> bool;

    /// Closes the underlying resource now. The handle is released afterwards,
    /// even if the OS reported an error.
    fn close(&mut self) -> Result<(), HandleError>;

    fn duplicate(&self, inheritable: bool) -> Result<Self, HandleError>
    where
        Self: Sized;

    // Whatever owned the previous resource in `target` loses it
    unsafe fn duplicate_to(&self, target: RawHandle, inheritable: bool)
        -> Result<(), HandleError>;

    fn set_inheritable(&mut self, allow_inherit: bool) -> Result<(), HandleError>;

    fn is_inheritable(&self) -> Result<bool, HandleError>;

    fn set_blocking(&mut self, blocking: bool) -> Result<(), HandleError>;

    fn is_blocking(&self) -> Result<bool, HandleError>;
}
