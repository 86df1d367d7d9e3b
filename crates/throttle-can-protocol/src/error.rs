//! Throttle protocol error types.

use oscc_can_common::CanCommonError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThrottleError {
    #[error("Invalid frame length: expected {expected}, got {actual}")]
    FrameLength { expected: usize, actual: usize },

    #[error("Frame ID mismatch: expected {expected:#04x}, got {actual:#04x}")]
    FrameIdMismatch { expected: u32, actual: u32 },

    #[error("Field {field} out of range: {value} exceeds {max}")]
    FieldRange {
        field: &'static str,
        value: u64,
        max: u64,
    },

    #[error("Invalid monitor configuration: {0}")]
    InvalidConfig(String),
}

pub type ThrottleResult<T> = Result<T, ThrottleError>;

impl ThrottleError {
    pub fn field_range(field: &'static str, value: impl Into<u64>, max: impl Into<u64>) -> Self {
        Self::FieldRange {
            field,
            value: value.into(),
            max: max.into(),
        }
    }
}

impl From<CanCommonError> for ThrottleError {
    fn from(e: CanCommonError) -> Self {
        match e {
            CanCommonError::FrameTooLong(actual) => ThrottleError::FrameLength {
                expected: oscc_can_common::CAN_MAX_DLC,
                actual,
            },
            CanCommonError::PayloadOverrun { capacity, .. } => ThrottleError::FrameLength {
                expected: crate::THROTTLE_PAYLOAD_LEN,
                actual: capacity,
            },
        }
    }
}
