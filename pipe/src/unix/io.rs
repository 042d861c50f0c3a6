use crate::os::pipe::ignore_sigpipe;
use libc::{c_int, c_void};
use pipework_handle::RawHandle;
use std::io;

// Some platforms reject transfers above INT_MAX, shorter transfers are always legal
const MAX_TRANSFER_LEN: usize = c_int::MAX as usize - 1;

pub(crate) fn read_once(fd: RawHandle, buffer: &mut [u8]) -> io::Result<usize> {
    let len = buffer.len().min(MAX_TRANSFER_LEN);
    loop {
        let res = unsafe { libc::read(fd, buffer.as_mut_ptr() as *mut c_void, len) };
        if res >= 0 {
            return Ok(res as usize);
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

pub(crate) fn write_once(fd: RawHandle, data: &[u8]) -> io::Result<usize> {
    ignore_sigpipe();
    let len = data.len().min(MAX_TRANSFER_LEN);
    loop {
        let res = unsafe { libc::write(fd, data.as_ptr() as *const c_void, len) };
        if res >= 0 {
            return Ok(res as usize);
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}
