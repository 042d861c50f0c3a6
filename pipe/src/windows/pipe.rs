use crate::os::last_error;
use core::ptr::null_mut;
use log::debug;
use pipework_handle::{CrossPlatformHandle, Handle, HandleError, INVALID_HANDLE};
use std::os::windows::io::FromRawHandle;
use winapi::shared::minwindef::{DWORD, FALSE, TRUE};
use winapi::um::minwinbase::SECURITY_ATTRIBUTES;
use winapi::um::namedpipeapi::CreatePipe;
use winapi::um::winnt::HANDLE;

// CreatePipe() applies inheritance atomically through its security
// attributes. Blocking mode has no creation flag and is set afterwards, which
// is harmless since it is not observable by other processes before use.
pub(crate) fn create_pipe(
    inheritable: bool,
    blocking: bool,
) -> Result<(Handle, Handle), HandleError> {
    let mut attributes = SECURITY_ATTRIBUTES {
        nLength: core::mem::size_of::<SECURITY_ATTRIBUTES>() as DWORD,
        lpSecurityDescriptor: null_mut(),
        bInheritHandle: if inheritable { TRUE } else { FALSE },
    };
    // Safety: both handles are wrapped right away, if CreatePipe() fails none
    // were created.
    let (mut read_end, mut write_end) = unsafe {
        let mut read_handle: HANDLE = null_mut();
        let mut write_handle: HANDLE = null_mut();
        if CreatePipe(
            &mut read_handle as *mut _,
            &mut write_handle as *mut _,
            &mut attributes as *mut _,
            0,
        ) == 0
        {
            return Err(HandleError::InternalOsOperationFailed {
                description: "CreatePipe() failed",
                raw_handle: INVALID_HANDLE,
                os_code: last_error().into(),
            });
        }
        (
            Handle::from_raw_handle(read_handle as _),
            Handle::from_raw_handle(write_handle as _),
        )
    };
    if !blocking {
        read_end.set_blocking(false)?;
        write_end.set_blocking(false)?;
    }
    debug!(
        "Created pipe: read handle {:#x}, write handle {:#x} (inheritable={}, blocking={})",
        read_end.as_raw(),
        write_end.as_raw(),
        inheritable,
        blocking
    );
    Ok((read_end, write_end))
}
