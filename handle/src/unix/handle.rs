use crate::error::HandleError;
use crate::handle::CrossPlatformHandle;
use crate::os::errno;
use libc::{c_int, fcntl, FD_CLOEXEC, F_GETFD, F_GETFL, F_SETFD, F_SETFL, O_NONBLOCK};
use log::{debug, error};
use std::os::unix::io::{AsRawFd, FromRawFd, IntoRawFd, OwnedFd, RawFd};

pub type RawHandle = c_int;

pub const INVALID_HANDLE: RawHandle = -1;

#[derive(Debug, Default, Eq, PartialEq, Hash)]
pub struct Handle {
    val: Option<c_int>,
}

impl Handle {
    pub const fn invalid() -> Self {
        Self { val: None }
    }

    fn live(&self, operation: &str) -> c_int {
        match self.val {
            Some(fd) => fd,
            None => panic!("{} called on a released handle", operation),
        }
    }
}

fn os_failure(description: &'static str, fd: c_int) -> HandleError {
    HandleError::InternalOsOperationFailed {
        description,
        raw_handle: fd as u64,
        os_code: errno() as u64,
    }
}

fn set_fd_flag(
    fd: c_int,
    get: c_int,
    set: c_int,
    flag: c_int,
    enabled: bool,
) -> Result<(), HandleError> {
    let current_flags = unsafe { fcntl(fd, get) };
    if current_flags < 0 {
        return Err(os_failure("fcntl(F_GETxx) failed", fd));
    }
    let new_flags = if enabled {
        current_flags | flag
    } else {
        current_flags & !flag
    };
    if new_flags == current_flags {
        return Ok(());
    }
    if unsafe { fcntl(fd, set, new_flags) } < 0 {
        return Err(os_failure("fcntl(F_SETxx) failed", fd));
    }
    Ok(())
}

fn get_fd_flag(fd: c_int, get: c_int, flag: c_int) -> Result<bool, HandleError> {
    let current_flags = unsafe { fcntl(fd, get) };
    if current_flags < 0 {
        return Err(os_failure("fcntl(F_GETxx) failed", fd));
    }
    Ok((current_flags & flag) != 0)
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn dup_onto(fd: c_int, target: c_int, inheritable: bool) -> Result<(), HandleError> {
    let flags = if inheritable { 0 } else { libc::O_CLOEXEC };
    loop {
        if unsafe { libc::dup3(fd, target, flags) } >= 0 {
            return Ok(());
        }
        if errno() != libc::EINTR {
            return Err(os_failure("dup3() failed", fd));
        }
    }
}

// No dup3() here: the close-on-exec flag is applied in a second step, so a
// process spawned in between inherits `target`.
#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn dup_onto(fd: c_int, target: c_int, inheritable: bool) -> Result<(), HandleError> {
    loop {
        if unsafe { libc::dup2(fd, target) } >= 0 {
            break;
        }
        if errno() != libc::EINTR {
            return Err(os_failure("dup2() failed", fd));
        }
    }
    set_fd_flag(target, F_GETFD, F_SETFD, FD_CLOEXEC, !inheritable)
}

impl CrossPlatformHandle for Handle {
    unsafe fn from_raw(raw_handle: RawHandle) -> Result<Self, HandleError> {
        match raw_handle {
            INVALID_HANDLE => Ok(Self::invalid()),
            fd if fd >= 0 => Ok(Handle { val: Some(fd) }),
            _ => Err(HandleError::InvalidHandleValue {
                raw_value: raw_handle as u64,
            }),
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
        let fd = self.live("close()");
        // Released before the call: on failure the descriptor state is
        // unspecified and retrying could close a reassigned descriptor.
        self.val = None;
        if unsafe { libc::close(fd) } < 0 {
            return Err(os_failure("close() failed", fd));
        }
        Ok(())
    }

    fn duplicate(&self, inheritable: bool) -> Result<Self, HandleError> {
        let fd = self.live("duplicate()");
        let cmd = if inheritable {
            libc::F_DUPFD
        } else {
            libc::F_DUPFD_CLOEXEC
        };
        let res = unsafe { fcntl(fd, cmd, 0) };
        if res < 0 {
            return Err(os_failure("fcntl(F_DUPFD) failed", fd));
        }
        debug!(
            "Duplicated fd {} as fd {} (inheritable={})",
            fd, res, inheritable
        );
        Ok(Handle { val: Some(res) })
    }

    unsafe fn duplicate_to(
        &self,
        target: RawHandle,
        inheritable: bool,
    ) -> Result<(), HandleError> {
        let fd = self.live("duplicate_to()");
        if target < 0 {
            return Err(HandleError::InvalidHandleValue {
                raw_value: target as u64,
            });
        }
        if fd == target {
            // Nothing to replace, only the flag can change
            return set_fd_flag(target, F_GETFD, F_SETFD, FD_CLOEXEC, !inheritable);
        }
        dup_onto(fd, target, inheritable)?;
        debug!(
            "Duplicated fd {} onto fd {} (inheritable={})",
            fd, target, inheritable
        );
        Ok(())
    }

    fn set_inheritable(&mut self, allow_inherit: bool) -> Result<(), HandleError> {
        let fd = self.live("set_inheritable()");
        set_fd_flag(fd, F_GETFD, F_SETFD, FD_CLOEXEC, !allow_inherit)
    }

    fn is_inheritable(&self) -> Result<bool, HandleError> {
        let fd = self.live("is_inheritable()");
        Ok(!get_fd_flag(fd, F_GETFD, FD_CLOEXEC)?)
    }

    fn set_blocking(&mut self, blocking: bool) -> Result<(), HandleError> {
        let fd = self.live("set_blocking()");
        set_fd_flag(fd, F_GETFL, F_SETFL, O_NONBLOCK, !blocking)
    }

    fn is_blocking(&self) -> Result<bool, HandleError> {
        let fd = self.live("is_blocking()");
        Ok(!get_fd_flag(fd, F_GETFL, O_NONBLOCK)?)
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        if let Some(fd) = self.val.take() {
            if unsafe { libc::close(fd) } < 0 {
                let code = errno();
                error!("close(fd={}) failed with error {}", fd, code);
                if cfg!(debug_assertions) && !std::thread::panicking() {
                    panic!("close(fd={}) failed with error {}", fd, code);
                }
            }
        }
    }
}

impl FromRawFd for Handle {
    unsafe fn from_raw_fd(fd: RawFd) -> Self {
        Handle {
            val: if fd >= 0 { Some(fd) } else { None },
        }
    }
}

impl IntoRawFd for Handle {
    fn into_raw_fd(mut self) -> RawFd {
        self.take()
    }
}

impl AsRawFd for Handle {
    fn as_raw_fd(&self) -> RawFd {
        self.as_raw()
    }
}

impl From<OwnedFd> for Handle {
    fn from(fd: OwnedFd) -> Self {
        downcast_to_handle(fd)
    }
}

pub fn downcast_to_handle<T: IntoRawFd>(resource: T) -> Handle {
    // Safety: `resource` gave up its ownership of the descriptor
    unsafe { Handle::from_raw_fd(resource.into_raw_fd()) }
}

pub fn set_unmanaged_handle_inheritable<T: AsRawFd>(
    resource: &T,
    allow_inherit: bool,
) -> Result<(), HandleError> {
    // This block is safe because the file descriptor held by `resource` lives at least
    // for the duration of the block, and we give ownership back before returning
    unsafe {
        let mut handle = Handle::from_raw(resource.as_raw_fd())?;
        let res = handle.set_inheritable(allow_inherit);
        let _ = handle.take(); // leak voluntarily
        res
    }
}
