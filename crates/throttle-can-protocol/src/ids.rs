//! Throttle module CAN identifiers, lengths, timing and payload offsets.
//!
//! These are the single source of truth for both codecs and for the
//! transport and scheduling layers that consume them.

use std::time::Duration;

/// Throttle command message (CAN frame) ID.
pub const THROTTLE_COMMAND_CAN_ID: u32 = 0x62;

/// Throttle report message (CAN frame) ID.
pub const THROTTLE_REPORT_CAN_ID: u32 = 0x63;

/// Throttle command message (CAN frame) length.
pub const THROTTLE_COMMAND_CAN_DLC: u8 = 8;

/// Throttle report message (CAN frame) length.
pub const THROTTLE_REPORT_CAN_DLC: u8 = 8;

/// Payload length shared by both messages, as a buffer size.
pub const THROTTLE_PAYLOAD_LEN: usize = 8;

/// Throttle report publishing interval in milliseconds.
pub const THROTTLE_REPORT_PUBLISH_INTERVAL_MS: u32 = 20;

/// Throttle report publishing interval.
pub const THROTTLE_REPORT_PUBLISH_INTERVAL: Duration =
    Duration::from_millis(THROTTLE_REPORT_PUBLISH_INTERVAL_MS as u64);

/// Raw accelerator position representing 100% demand.
pub const ACCELERATOR_POSITION_MAX: u16 = u16::MAX;

/// Watchdog counter source value meaning "no source".
pub const WDC_SOURCE_NONE: u8 = 0;

/// Width of the watchdog counter source field in bits.
pub const WDC_SOURCE_BITS: u8 = 4;

/// Largest encodable watchdog counter source.
pub const WDC_SOURCE_MAX: u8 = oscc_can_common::field_max(WDC_SOURCE_BITS);

/// Byte offsets and bit positions of the command payload.
pub mod command_layout {
    pub const POSITION_START: usize = 0;
    pub const RESERVED_0: usize = 2;
    pub const RESERVED_0_LEN: usize = 1;
    pub const FLAGS: usize = 3;
    pub const RESERVED_2_START: usize = 4;
    pub const RESERVED_2_LEN: usize = 3;
    pub const COUNT: usize = 7;

    pub const ENABLED_BIT: u8 = 0;
    pub const CLEAR_BIT: u8 = 1;
    pub const IGNORE_BIT: u8 = 2;
}

/// Byte offsets and bit positions of the report payload.
pub mod report_layout {
    pub const CURRENT_POSITION_START: usize = 0;
    pub const COMMANDED_POSITION_START: usize = 2;
    pub const SPOOFED_OUTPUT_START: usize = 4;
    /// Low nibble reserved, high nibble watchdog counter source.
    pub const WDC_BYTE: usize = 6;
    pub const WDC_SOURCE_SHIFT: u8 = 4;
    pub const STATUS_BYTE: usize = 7;

    pub const ENABLED_BIT: u8 = 0;
    pub const OVERRIDE_BIT: u8 = 1;
    pub const DRIVER_ACTIVITY_BIT: u8 = 2;
    pub const FAULT_WDC_BIT: u8 = 3;
    pub const FAULT_1_BIT: u8 = 4;
    pub const FAULT_2_BIT: u8 = 5;
    pub const FAULT_CONNECTOR_BIT: u8 = 7;
}

pub fn is_throttle_frame_id(id: u32) -> bool {
    matches!(id, THROTTLE_COMMAND_CAN_ID | THROTTLE_REPORT_CAN_ID)
}
