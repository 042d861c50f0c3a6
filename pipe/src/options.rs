use crate::sync::{PipeReader, PipeWriter};
use pipework_handle::{Handle, HandleError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipeOptions {
    pub(crate) inheritable: bool,
    pub(crate) blocking: bool,
}

impl Default for PipeOptions {
    fn default() -> Self {
        Self {
            inheritable: false,
            blocking: true,
        }
    }
}

impl PipeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inheritable(mut self, inheritable: bool) -> Self {
        self.inheritable = inheritable;
        self
    }

    pub fn blocking(mut self, blocking: bool) -> Self {
        self.blocking = blocking;
        self
    }

    // Without pipe2(), a process spawned concurrently may inherit both ends
    pub fn create(&self) -> Result<(Handle, Handle), HandleError> {
        crate::os::pipe::create_pipe(self.inheritable, self.blocking)
    }
}

pub fn create_pipe(inheritable: bool, blocking: bool) -> Result<(Handle, Handle), HandleError> {
    PipeOptions::new()
        .inheritable(inheritable)
        .blocking(blocking)
        .create()
}

pub fn pipe() -> Result<(PipeReader, PipeWriter), HandleError> {
    let (read_end, write_end) = PipeOptions::new().create()?;
    Ok((
        PipeReader::from_handle(read_end)?,
        PipeWriter::from_handle(write_end)?,
    ))
}
