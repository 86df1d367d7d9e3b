//! Common CAN utilities for OSCC protocol implementations
//!
//! This crate provides the pieces shared by every OSCC module protocol
//! (throttle, brake, steering): the transport envelope handed over by the bus
//! layer, a cursor-style reader/writer for fixed 8-byte payloads, and
//! explicit bit-field helpers so that no protocol relies on a compiler's
//! native bitfield layout.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod bits;
pub mod frame;
pub mod payload;

pub use bits::*;
pub use frame::*;
pub use payload::*;

use thiserror::Error;

/// Maximum payload length of a classic CAN frame in bytes.
pub const CAN_MAX_DLC: usize = 8;

/// [`CAN_MAX_DLC`] as a data length code.
pub const CAN_MAX_DLC_CODE: u8 = 8;

const _: () = assert!(CAN_MAX_DLC_CODE as usize == CAN_MAX_DLC);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CanCommonError {
    #[error("Payload of {0} bytes does not fit a classic CAN frame (max 8)")]
    FrameTooLong(usize),

    #[error("Payload access out of bounds: offset {offset} + {len} exceeds {capacity} bytes")]
    PayloadOverrun {
        offset: usize,
        len: usize,
        capacity: usize,
    },
}

pub type CanCommonResult<T> = Result<T, CanCommonError>;
