use crate::os::errno;
use libc::c_int;
use log::{debug, warn};
use pipework_handle::{CrossPlatformHandle, Handle, HandleError, INVALID_HANDLE};
use std::os::unix::io::FromRawFd;

// Called before every write, the default disposition can be restored by
// anyone at any time. Handlers installed by someone else are left alone.
pub(crate) fn ignore_sigpipe() {
    unsafe {
        let mut current: libc::sigaction = core::mem::zeroed();
        if libc::sigaction(libc::SIGPIPE, core::ptr::null(), &mut current) < 0 {
            warn!("sigaction(SIGPIPE) query failed with error {}", errno());
            return;
        }
        if current.sa_sigaction != libc::SIG_DFL {
            return;
        }
        if libc::signal(libc::SIGPIPE, libc::SIG_IGN) == libc::SIG_ERR {
            warn!("Unable to ignore SIGPIPE: error {}", errno());
        } else {
            debug!("SIGPIPE had its default disposition, now ignored");
        }
    }
}

fn creation_failure(description: &'static str) -> HandleError {
    HandleError::InternalOsOperationFailed {
        description,
        raw_handle: INVALID_HANDLE as u64,
        os_code: errno() as u64,
    }
}

#[cfg(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "illumos",
    target_os = "solaris"
))]
fn create_raw_pair(inheritable: bool, blocking: bool) -> Result<(Handle, Handle), HandleError> {
    let mut flags = 0;
    if !inheritable {
        flags |= libc::O_CLOEXEC;
    }
    if !blocking {
        flags |= libc::O_NONBLOCK;
    }
    // Safety: both descriptors are wrapped right away, if pipe2() fails none
    // were created.
    unsafe {
        let mut fds: [c_int; 2] = [-1, -1];
        if libc::pipe2(fds.as_mut_ptr(), flags) < 0 {
            return Err(creation_failure("pipe2() failed"));
        }
        Ok((Handle::from_raw_fd(fds[0]), Handle::from_raw_fd(fds[1])))
    }
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "illumos",
    target_os = "solaris"
)))]
fn create_raw_pair(inheritable: bool, blocking: bool) -> Result<(Handle, Handle), HandleError> {
    // Safety: both descriptors are wrapped right away, if pipe() fails none
    // were created.
    let (mut read_end, mut write_end) = unsafe {
        let mut fds: [c_int; 2] = [-1, -1];
        if libc::pipe(fds.as_mut_ptr()) < 0 {
            return Err(creation_failure("pipe() failed"));
        }
        (Handle::from_raw_fd(fds[0]), Handle::from_raw_fd(fds[1]))
    };
    if !inheritable {
        warn!(
            "No pipe2() on this platform, close-on-exec is set after pipe(): fds {} and {} can leak into processes spawned concurrently",
            read_end.as_raw(),
            write_end.as_raw()
        );
    }
    // pipe() ends start inheritable and blocking
    for end in [&mut read_end, &mut write_end] {
        if !inheritable {
            end.set_inheritable(false)?;
        }
        if !blocking {
            end.set_blocking(false)?;
        }
    }
    Ok((read_end, write_end))
}

pub(crate) fn create_pipe(
    inheritable: bool,
    blocking: bool,
) -> Result<(Handle, Handle), HandleError> {
    ignore_sigpipe();
    let (read_end, write_end) = create_raw_pair(inheritable, blocking)?;
    debug!(
        "Created pipe: read fd {}, write fd {} (inheritable={}, blocking={})",
        read_end.as_raw(),
        write_end.as_raw(),
        inheritable,
        blocking
    );
    Ok((read_end, write_end))
}
