use crate::os::last_error;
use core::ptr::null_mut;
use pipework_handle::RawHandle;
use std::io;
use winapi::shared::minwindef::{DWORD, LPCVOID, LPVOID};
use winapi::shared::winerror::{ERROR_BROKEN_PIPE, ERROR_NO_DATA};
use winapi::um::fileapi::{ReadFile, WriteFile};
use winapi::um::winnt::HANDLE;

pub(crate) fn read_once(handle: RawHandle, buffer: &mut [u8]) -> io::Result<usize> {
    let len = buffer.len().min(DWORD::MAX as usize) as DWORD;
    let mut read: DWORD = 0;
    let res = unsafe {
        ReadFile(
            handle as HANDLE,
            buffer.as_mut_ptr() as LPVOID,
            len,
            &mut read as *mut _,
            null_mut(),
        )
    };
    if res == 0 {
        return match last_error() {
            // All write ends are closed: end-of-stream
            ERROR_BROKEN_PIPE => Ok(0),
            // PIPE_NOWAIT and nothing to read yet
            ERROR_NO_DATA => Err(io::ErrorKind::WouldBlock.into()),
            code => Err(io::Error::from_raw_os_error(code as i32)),
        };
    }
    Ok(read as usize)
}

pub(crate) fn write_once(handle: RawHandle, data: &[u8]) -> io::Result<usize> {
    let len = data.len().min(DWORD::MAX as usize) as DWORD;
    let mut written: DWORD = 0;
    let res = unsafe {
        WriteFile(
            handle as HANDLE,
            data.as_ptr() as LPCVOID,
            len,
            &mut written as *mut _,
            null_mut(),
        )
    };
    if res == 0 {
        // ERROR_NO_DATA and ERROR_BROKEN_PIPE both map to ErrorKind::BrokenPipe
        return Err(io::Error::from_raw_os_error(last_error() as i32));
    }
    if written == 0 && len > 0 {
        // PIPE_NOWAIT and the pipe buffer is full
        return Err(io::ErrorKind::WouldBlock.into());
    }
    Ok(written as usize)
}
