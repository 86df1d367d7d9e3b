//! OSCC throttle module CAN protocol.
//!
//! Defines the two fixed-size messages exchanged between a host computer and
//! the throttle controller: the command (ID `0x62`) that carries the desired
//! accelerator position and control flags, and the report (ID `0x63`) that the
//! controller publishes at least every 20 ms with positions, override state and
//! fault indicators.
//!
//! The crate is I/O-free. Codecs work on 8-byte payloads or on the
//! [`CanFrame`] envelope handed over by the bus layer; a consumer-side
//! [`ReportMonitor`] and [`CounterChecker`] cover report freshness and
//! watchdog counter sequencing.
//!
//! # Key Features
//! - Bit-exact command/report encoding with explicit little-endian packing
//! - Reserved bits zeroed on encode and ignored on decode
//! - Envelope validation (identifier, then DLC)
//! - Accelerator position scaling helpers (65535 == 100%)

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(static_mut_refs)]

pub mod command;
pub mod counter;
pub mod error;
pub mod ids;
pub mod message;
pub mod monitor;
pub mod report;
pub mod scale;

pub use command::{CommandFlags, ThrottleCommand, ThrottleCommandMessage, encode_command};
pub use counter::{CounterCheck, CounterChecker, CounterPolicy};
pub use error::{ThrottleError, ThrottleResult};
pub use ids::{
    ACCELERATOR_POSITION_MAX, THROTTLE_COMMAND_CAN_DLC, THROTTLE_COMMAND_CAN_ID,
    THROTTLE_PAYLOAD_LEN, THROTTLE_REPORT_CAN_DLC, THROTTLE_REPORT_CAN_ID,
    THROTTLE_REPORT_PUBLISH_INTERVAL, THROTTLE_REPORT_PUBLISH_INTERVAL_MS, WDC_SOURCE_MAX,
    WDC_SOURCE_NONE, is_throttle_frame_id,
};
pub use message::{ThrottleFrame, ThrottleMessage, check_envelope, decode_throttle_frame};
pub use monitor::{MonitorConfig, ReportFreshness, ReportMonitor, SharedReportMonitor};
pub use oscc_can_common::CanFrame;
pub use report::{
    ReportConsistency, ReportStatusFlags, ThrottleReport, ThrottleReportMessage, encode_report,
};
pub use scale::{
    checked_position, position_from_fraction, position_from_percent, position_to_fraction,
    position_to_percent,
};
