use core::fmt;
use std::io;

// `transferred` counts the bytes moved by the same call before the failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    BrokenPipe { transferred: usize, os_code: u64 },
    InternalOsOperationFailed {
        description: &'static str,
        transferred: usize,
        os_code: u64,
    },
}

impl TransferError {
    pub(crate) fn from_io(
        err: &io::Error,
        description: &'static str,
        transferred: usize,
    ) -> Self {
        let os_code = err.raw_os_error().unwrap_or(0) as u64;
        if err.kind() == io::ErrorKind::BrokenPipe {
            Self::BrokenPipe {
                transferred,
                os_code,
            }
        } else {
            Self::InternalOsOperationFailed {
                description,
                transferred,
                os_code,
            }
        }
    }

    pub fn transferred(&self) -> usize {
        match self {
            Self::BrokenPipe { transferred, .. }
            | Self::InternalOsOperationFailed { transferred, .. } => *transferred,
        }
    }

    pub fn os_code(&self) -> u64 {
        match self {
            Self::BrokenPipe { os_code, .. }
            | Self::InternalOsOperationFailed { os_code, .. } => *os_code,
        }
    }

    pub fn is_broken_pipe(&self) -> bool {
        matches!(self, Self::BrokenPipe { .. })
    }
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BrokenPipe { transferred, .. } => {
                write!(f, "broken pipe after {} bytes transferred", transferred)
            }
            Self::InternalOsOperationFailed {
                description,
                transferred,
                os_code,
            } => write!(
                f,
                "{} after {} bytes transferred (error {})",
                description, transferred, os_code
            ),
        }
    }
}

impl std::error::Error for TransferError {}

impl From<TransferError> for io::Error {
    fn from(err: TransferError) -> Self {
        match err {
            broken @ TransferError::BrokenPipe { .. } => {
                io::Error::new(io::ErrorKind::BrokenPipe, broken)
            }
            other if other.os_code() != 0 => {
                io::Error::from_raw_os_error(other.os_code() as i32)
            }
            other => io::Error::new(io::ErrorKind::Other, other),
        }
    }
}
