use core::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleError {
    InvalidHandleValue {
        raw_value: u64,
    },
    InternalOsOperationFailed {
        description: &'static str,
        raw_handle: u64,
        os_code: u64,
    },
}

impl HandleError {
    pub fn os_code(&self) -> Option<u64> {
        match self {
            Self::InvalidHandleValue { .. } => None,
            Self::InternalOsOperationFailed { os_code, .. } => Some(*os_code),
        }
    }
}

impl fmt::Display for HandleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHandleValue { raw_value } => {
                write!(f, "invalid handle value {:#x}", raw_value)
            }
            Self::InternalOsOperationFailed {
                description,
                raw_handle,
                os_code,
            } => write!(
                f,
                "{} (handle {:#x}, error {})",
                description, raw_handle, os_code
            ),
        }
    }
}

impl std::error::Error for HandleError {}

impl From<HandleError> for std::io::Error {
    fn from(err: HandleError) -> Self {
        match err {
            HandleError::InternalOsOperationFailed { os_code, .. } if os_code != 0 => {
                std::io::Error::from_raw_os_error(os_code as i32)
            }
            invalid @ HandleError::InvalidHandleValue { .. } => {
                std::io::Error::new(std::io::ErrorKind::InvalidInput, invalid)
            }
            other => std::io::Error::new(std::io::ErrorKind::Other, other),
        }
    }
}
