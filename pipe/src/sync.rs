use crate::error::TransferError;
use crate::expect_live;
use crate::os::io::{read_once, write_once};
use pipework_handle::{CrossPlatformHandle, Handle, HandleError};
use std::io;

/// Blocks until at least one byte is available. `Ok(0)` is end-of-stream,
/// except for an empty `buffer` which returns `Ok(0)` right away.
pub fn read(handle: &Handle, buffer: &mut [u8]) -> Result<usize, TransferError> {
    let raw = expect_live(handle, "read()");
    if buffer.is_empty() {
        return Ok(0);
    }
    read_once(raw, buffer).map_err(|e| TransferError::from_io(&e, "read() failed", 0))
}

pub fn write_some(handle: &Handle, data: &[u8]) -> Result<usize, TransferError> {
    let raw = expect_live(handle, "write_some()");
    write_once(raw, data).map_err(|e| TransferError::from_io(&e, "write() failed", 0))
}

/// Writes all of `data`. A closed read end fails with
/// `TransferError::BrokenPipe` and zero bytes transferred, whatever was
/// accepted before. Other failures report the bytes accepted before them.
pub fn write(handle: &Handle, data: &[u8]) -> Result<usize, TransferError> {
    let raw = expect_live(handle, "write()");
    let mut written = 0;
    while written < data.len() {
        match write_once(raw, &data[written..]) {
            Ok(0) => {
                return Err(TransferError::InternalOsOperationFailed {
                    description: "write() accepted no bytes",
                    transferred: written,
                    os_code: 0,
                })
            }
            Ok(n) => written += n,
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                return Err(TransferError::from_io(&e, "write() failed", 0))
            }
            Err(e) => return Err(TransferError::from_io(&e, "write() failed", written)),
        }
    }
    Ok(written)
}

#[derive(Debug)]
pub struct PipeReader {
    handle: Handle,
}

impl PipeReader {
    pub fn from_handle(mut handle: Handle) -> Result<Self, HandleError> {
        if !handle.is_blocking()? {
            handle.set_blocking(true)?;
        }
        Ok(Self { handle })
    }

    pub fn read(&mut self, buffer: &mut [u8]) -> Result<usize, TransferError> {
        read(&self.handle, buffer)
    }

    pub fn try_clone(&self) -> Result<Self, HandleError> {
        Ok(Self {
            handle: self.handle.duplicate(false)?,
        })
    }

    pub fn as_handle(&self) -> &Handle {
        &self.handle
    }

    pub fn as_handle_mut(&mut self) -> &mut Handle {
        &mut self.handle
    }

    pub fn into_handle(self) -> Handle {
        self.handle
    }
}

impl io::Read for PipeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        PipeReader::read(self, buf).map_err(io::Error::from)
    }
}

#[derive(Debug)]
pub struct PipeWriter {
    handle: Handle,
}

impl PipeWriter {
    pub fn from_handle(mut handle: Handle) -> Result<Self, HandleError> {
        if !handle.is_blocking()? {
            handle.set_blocking(true)?;
        }
        Ok(Self { handle })
    }

    pub fn write(&mut self, data: &[u8]) -> Result<usize, TransferError> {
        write(&self.handle, data)
    }

    pub fn write_some(&mut self, data: &[u8]) -> Result<usize, TransferError> {
        write_some(&self.handle, data)
    }

    pub fn try_clone(&self) -> Result<Self, HandleError> {
        Ok(Self {
            handle: self.handle.duplicate(false)?,
        })
    }

    pub fn as_handle(&self) -> &Handle {
        &self.handle
    }

    pub fn as_handle_mut(&mut self) -> &mut Handle {
        &mut self.handle
    }

    pub fn into_handle(self) -> Handle {
        self.handle
    }
}

impl io::Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        PipeWriter::write_some(self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
