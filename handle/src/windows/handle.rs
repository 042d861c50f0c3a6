use crate::error::HandleError;
use crate::handle::CrossPlatformHandle;
use crate::os::last_error;
use core::ptr::null_mut;
use log::{debug, error};
use std::os::windows::io::{
    AsRawHandle, FromRawHandle, IntoRawHandle, OwnedHandle, RawHandle as StdRawHandle,
};
use winapi::shared::minwindef::{DWORD, FALSE, TRUE};
use winapi::um::handleapi::{
    CloseHandle, DuplicateHandle, GetHandleInformation, SetHandleInformation,
};
use winapi::um::namedpipeapi::SetNamedPipeHandleState;
use winapi::um::processenv::{GetStdHandle, SetStdHandle};
use winapi::um::processthreadsapi::GetCurrentProcess;
use winapi::um::winbase::{
    GetNamedPipeHandleStateW, HANDLE_FLAG_INHERIT, PIPE_NOWAIT, PIPE_READMODE_BYTE, PIPE_WAIT,
    STD_ERROR_HANDLE, STD_INPUT_HANDLE, STD_OUTPUT_HANDLE,
};
use winapi::um::winnt::{DUPLICATE_SAME_ACCESS, HANDLE};

pub type RawHandle = u64;

// INVALID_HANDLE_VALUE, i.e. (HANDLE)-1
pub const INVALID_HANDLE: RawHandle = usize::MAX as u64;

#[derive(Debug, Default, Eq, PartialEq, Hash)]
pub struct Handle {
    val: Option<u64>,
}

impl Handle {
    pub const fn invalid() -> Self {
        Self { val: None }
    }

    fn live(&self, operation: &str) -> HANDLE {
        match self.val {
            Some(handle) => handle as HANDLE,
            None => panic!("{} called on a released handle", operation),
        }
    }
}

fn os_failure(description: &'static str, handle: HANDLE) -> HandleError {
    HandleError::InternalOsOperationFailed {
        description,
        raw_handle: handle as u64,
        os_code: last_error(),
    }
}

fn std_slot(target: RawHandle) -> Option<DWORD> {
    [STD_INPUT_HANDLE, STD_OUTPUT_HANDLE, STD_ERROR_HANDLE]
        .into_iter()
        .find(|slot| u64::from(*slot) == target)
}

impl CrossPlatformHandle for Handle {
    unsafe fn from_raw(raw_handle: RawHandle) -> Result<Self, HandleError> {
        match raw_handle {
            INVALID_HANDLE => Ok(Self::invalid()),
            0 => Err(HandleError::InvalidHandleValue { raw_value: 0 }),
            handle => Ok(Handle { val: Some(handle) }),
        }
    }

    fn as_raw(&self) -> RawHandle {
        self.val.unwrap_or(INVALID_HANDLE)
    }

    fn take(&mut self) -> RawHandle {
        self.val.take().unwrap_or(INVALID_HANDLE)
    }

    fn is_valid(&self) -> bool {
        self.val.is_some()
    }

    fn close(&mut self) -> Result<(), HandleError> {
        let handle = self.live("close()");
        self.val = None;
        if unsafe { CloseHandle(handle) } == 0 {
            return Err(os_failure("CloseHandle() failed", handle));
        }
        Ok(())
    }

    fn duplicate(&self, inheritable: bool) -> Result<Self, HandleError> {
        let handle = self.live("duplicate()");
        let mut new_handle: HANDLE = null_mut();
        let res = unsafe {
            DuplicateHandle(
                GetCurrentProcess(),
                handle,
                GetCurrentProcess(),
                &mut new_handle as *mut _,
                0,
                if inheritable { TRUE } else { FALSE },
                DUPLICATE_SAME_ACCESS,
            )
        };
        if res == 0 {
            return Err(os_failure("DuplicateHandle() failed", handle));
        }
        debug!(
            "Duplicated handle {:?} as {:?} (inheritable={})",
            handle, new_handle, inheritable
        );
        Ok(Handle {
            val: Some(new_handle as u64),
        })
    }

    // There is no handle slot to overwrite on Windows: `target` must be one of
    // the STD_*_HANDLE identifiers, and the standard stream it names is replaced.
    unsafe fn duplicate_to(
        &self,
        target: RawHandle,
        inheritable: bool,
    ) -> Result<(), HandleError> {
        let slot = match std_slot(target) {
            Some(slot) => slot,
            None => return Err(HandleError::InvalidHandleValue { raw_value: target }),
        };
        let mut new_handle = self.duplicate(inheritable)?;
        let previous = GetStdHandle(slot);
        if SetStdHandle(slot, new_handle.as_raw() as HANDLE) == 0 {
            return Err(os_failure(
                "SetStdHandle() failed",
                new_handle.as_raw() as HANDLE,
            ));
        }
        let _ = new_handle.take(); // now owned by the standard stream slot
        if !previous.is_null() && previous as u64 != INVALID_HANDLE {
            CloseHandle(previous);
        }
        debug!(
            "Duplicated handle {:#x} onto standard stream {:#x}",
            self.as_raw(),
            slot
        );
        Ok(())
    }

    fn set_inheritable(&mut self, allow_inherit: bool) -> Result<(), HandleError> {
        let handle = self.live("set_inheritable()");
        let res = unsafe {
            SetHandleInformation(
                handle,
                HANDLE_FLAG_INHERIT,
                if allow_inherit {
                    HANDLE_FLAG_INHERIT
                } else {
                    0
                },
            )
        };
        if res == 0 {
            return Err(os_failure("SetHandleInformation() failed", handle));
        }
        Ok(())
    }

    fn is_inheritable(&self) -> Result<bool, HandleError> {
        let handle = self.live("is_inheritable()");
        let mut flags: DWORD = 0;
        let res = unsafe { GetHandleInformation(handle, &mut flags as *mut _) };
        if res == 0 {
            return Err(os_failure("GetHandleInformation() failed", handle));
        }
        Ok((flags & HANDLE_FLAG_INHERIT) != 0)
    }

    // Only meaningful for pipes, other handle types fail here
    fn set_blocking(&mut self, blocking: bool) -> Result<(), HandleError> {
        let handle = self.live("set_blocking()");
        let mut mode: DWORD =
            PIPE_READMODE_BYTE | if blocking { PIPE_WAIT } else { PIPE_NOWAIT };
        let res = unsafe {
            SetNamedPipeHandleState(handle, &mut mode as *mut _, null_mut(), null_mut())
        };
        if res == 0 {
            return Err(os_failure("SetNamedPipeHandleState() failed", handle));
        }
        Ok(())
    }

    fn is_blocking(&self) -> Result<bool, HandleError> {
        let handle = self.live("is_blocking()");
        let mut state: DWORD = 0;
        let res = unsafe {
            GetNamedPipeHandleStateW(
                handle,
                &mut state as *mut _,
                null_mut(),
                null_mut(),
                null_mut(),
                null_mut(),
                0,
            )
        };
        if res == 0 {
            return Err(os_failure("GetNamedPipeHandleStateW() failed", handle));
        }
        Ok((state & PIPE_NOWAIT) == 0)
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        if let Some(handle) = self.val.take() {
            if unsafe { CloseHandle(handle as HANDLE) } == 0 {
                let code = last_error();
                error!(
                    "CloseHandle(handle={:#x}) failed with error {}",
                    handle, code
                );
                if cfg!(debug_assertions) && !std::thread::panicking() {
                    panic!(
                        "CloseHandle(handle={:#x}) failed with error {}",
                        handle, code
                    );
                }
            }
        }
    }
}

impl FromRawHandle for Handle {
    unsafe fn from_raw_handle(handle: StdRawHandle) -> Self {
        Handle::from_raw(handle as u64).unwrap_or_default()
    }
}

impl IntoRawHandle for Handle {
    fn into_raw_handle(mut self) -> StdRawHandle {
        self.take() as StdRawHandle
    }
}

impl AsRawHandle for Handle {
    fn as_raw_handle(&self) -> StdRawHandle {
        self.as_raw() as StdRawHandle
    }
}

impl From<OwnedHandle> for Handle {
    fn from(handle: OwnedHandle) -> Self {
        downcast_to_handle(handle)
    }
}

pub fn downcast_to_handle<T: IntoRawHandle>(resource: T) -> Handle {
    // Safety: `resource` gave up its ownership of the handle
    unsafe { Handle::from_raw_handle(resource.into_raw_handle()) }
}

pub fn set_unmanaged_handle_inheritable<T: AsRawHandle>(
    resource: &T,
    allow_inherit: bool,
) -> Result<(), HandleError> {
    // This block is safe because the handle held by `resource` lives at least
    // for the duration of the block, and we give ownership back before returning
    unsafe {
        let mut handle = Handle::from_raw(resource.as_raw_handle() as u64)?;
        let res = handle.set_inheritable(allow_inherit);
        let _ = handle.take(); // leak voluntarily
        res
    }
}
