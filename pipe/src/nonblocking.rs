use crate::error::TransferError;
use crate::expect_live;
use crate::os::io::{read_once, write_once};
use core::pin::Pin;
use core::task::{ready, Context, Poll};
use log::debug;
use pipework_handle::{CrossPlatformHandle, Handle, HandleError};
use std::io;
use tokio::io::unix::AsyncFd;
use tokio::io::{AsyncRead, AsyncWrite, Interest, ReadBuf};

fn register(
    mut handle: Handle,
    interest: Interest,
    operation: &str,
) -> Result<AsyncFd<Handle>, HandleError> {
    let raw = expect_live(&handle, operation);
    if tokio::runtime::Handle::try_current().is_err() {
        return Err(HandleError::InternalOsOperationFailed {
            description: "no tokio runtime to register the handle with",
            raw_handle: raw as u64,
            os_code: 0,
        });
    }
    handle.set_blocking(false)?;
    let registered = AsyncFd::with_interest(handle, interest).map_err(|e| {
        HandleError::InternalOsOperationFailed {
            description: "registering the handle with the reactor failed",
            raw_handle: raw as u64,
            os_code: e.raw_os_error().unwrap_or(0) as u64,
        }
    })?;
    debug!("Registered fd {} with the reactor ({:?})", raw, interest);
    Ok(registered)
}

#[derive(Debug)]
pub struct AsyncPipeReader {
    inner: AsyncFd<Handle>,
}

impl AsyncPipeReader {
    pub fn new(handle: Handle) -> Result<Self, HandleError> {
        Ok(Self {
            inner: register(handle, Interest::READABLE, "AsyncPipeReader::new()")?,
        })
    }

    /// `Ok(0)` is end-of-stream, except for an empty `buffer` which returns
    /// `Ok(0)` right away. Cancel-safe.
    pub async fn read(&mut self, buffer: &mut [u8]) -> Result<usize, TransferError> {
        if buffer.is_empty() {
            return Ok(0);
        }
        loop {
            let mut guard = self
                .inner
                .readable()
                .await
                .map_err(|e| TransferError::from_io(&e, "waiting for readability failed", 0))?;
            match guard.try_io(|inner| read_once(inner.get_ref().as_raw(), buffer)) {
                Ok(Ok(n)) => return Ok(n),
                Ok(Err(e)) => return Err(TransferError::from_io(&e, "read() failed", 0)),
                Err(_would_block) => continue,
            }
        }
    }

    pub fn as_handle(&self) -> &Handle {
        self.inner.get_ref()
    }

    // Unregisters from the reactor, the handle stays non-blocking
    pub fn into_handle(self) -> Handle {
        self.inner.into_inner()
    }
}

impl AsyncRead for AsyncPipeReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }
        loop {
            let mut guard = ready!(this.inner.poll_read_ready(cx))?;
            let unfilled = buf.initialize_unfilled();
            match guard.try_io(|inner| read_once(inner.get_ref().as_raw(), unfilled)) {
                Ok(Ok(n)) => {
                    buf.advance(n);
                    return Poll::Ready(Ok(()));
                }
                Ok(Err(e)) => return Poll::Ready(Err(e)),
                Err(_would_block) => continue,
            }
        }
    }
}

#[derive(Debug)]
pub struct AsyncPipeWriter {
    inner: AsyncFd<Handle>,
    // Bytes moved by a `write()` future that has not completed yet
    unreported: usize,
}

impl AsyncPipeWriter {
    pub fn new(handle: Handle) -> Result<Self, HandleError> {
        Ok(Self {
            inner: register(handle, Interest::WRITABLE, "AsyncPipeWriter::new()")?,
            unreported: 0,
        })
    }

    // Cancel-safe
    pub async fn write_some(&mut self, data: &[u8]) -> Result<usize, TransferError> {
        self.unreported = 0;
        if data.is_empty() {
            return Ok(0);
        }
        loop {
            let mut guard = self
                .inner
                .writable()
                .await
                .map_err(|e| TransferError::from_io(&e, "waiting for writability failed", 0))?;
            match guard.try_io(|inner| write_once(inner.get_ref().as_raw(), data)) {
                Ok(Ok(n)) => return Ok(n),
                Ok(Err(e)) => return Err(TransferError::from_io(&e, "write() failed", 0)),
                Err(_would_block) => continue,
            }
        }
    }

    /// Writes all of `data`. Failures, broken pipe included, report the bytes
    /// accepted before them. If the future is dropped before completion, the
    /// bytes it already wrote are returned by `cancelled_write_progress()`.
    pub async fn write(&mut self, data: &[u8]) -> Result<usize, TransferError> {
        self.unreported = 0;
        while self.unreported < data.len() {
            let mut guard = match self.inner.writable().await {
                Ok(guard) => guard,
                Err(e) => {
                    let transferred = core::mem::take(&mut self.unreported);
                    return Err(TransferError::from_io(
                        &e,
                        "waiting for writability failed",
                        transferred,
                    ));
                }
            };
            let remaining = &data[self.unreported..];
            match guard.try_io(|inner| write_once(inner.get_ref().as_raw(), remaining)) {
                Ok(Ok(0)) => {
                    let transferred = core::mem::take(&mut self.unreported);
                    return Err(TransferError::InternalOsOperationFailed {
                        description: "write() accepted no bytes",
                        transferred,
                        os_code: 0,
                    });
                }
                Ok(Ok(n)) => self.unreported += n,
                Ok(Err(e)) => {
                    let transferred = core::mem::take(&mut self.unreported);
                    return Err(TransferError::from_io(&e, "write() failed", transferred));
                }
                Err(_would_block) => continue,
            }
        }
        Ok(core::mem::take(&mut self.unreported))
    }

    /// Bytes written by the last `write()` call if its future was dropped
    /// before completing, zero otherwise. Reset by the next write.
    pub fn cancelled_write_progress(&self) -> usize {
        self.unreported
    }

    pub fn as_handle(&self) -> &Handle {
        self.inner.get_ref()
    }

    // Unregisters from the reactor, the handle stays non-blocking
    pub fn into_handle(self) -> Handle {
        self.inner.into_inner()
    }
}

impl AsyncWrite for AsyncPipeWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        loop {
            let mut guard = ready!(this.inner.poll_write_ready(cx))?;
            match guard.try_io(|inner| write_once(inner.get_ref().as_raw(), buf)) {
                Ok(result) => return Poll::Ready(result),
                Err(_would_block) => continue,
            }
        }
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    // The pipe end is closed when the writer is dropped
    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
