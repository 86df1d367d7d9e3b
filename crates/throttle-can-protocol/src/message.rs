//! Frame-level glue between the transport envelope and the payload codecs.

use oscc_can_common::CanFrame;
use tracing::debug;

use crate::command::{ThrottleCommand, ThrottleCommandMessage};
use crate::error::{ThrottleError, ThrottleResult};
use crate::ids::{THROTTLE_COMMAND_CAN_ID, THROTTLE_PAYLOAD_LEN, THROTTLE_REPORT_CAN_ID};
use crate::report::{ThrottleReport, ThrottleReportMessage};

/// A throttle payload bound to its frame identifier and length.
pub trait ThrottleMessage: Sized {
    const CAN_ID: u32;
    const DLC: u8;
    const NAME: &'static str;

    /// # Errors
    ///
    /// Returns [`ThrottleError::FieldRange`] if a field does not fit its
    /// wire width.
    fn encode_payload(&self) -> ThrottleResult<[u8; THROTTLE_PAYLOAD_LEN]>;

    /// # Errors
    ///
    /// Returns [`ThrottleError::FrameLength`] for a payload of the wrong size.
    fn decode_payload(data: &[u8]) -> ThrottleResult<Self>;

    /// # Errors
    ///
    /// Propagates [`ThrottleMessage::encode_payload`] failures.
    fn to_frame(&self, timestamp: u32) -> ThrottleResult<CanFrame> {
        Ok(CanFrame::from_payload(
            Self::CAN_ID,
            self.encode_payload()?,
            timestamp,
        ))
    }

    /// Validate the envelope, then decode the payload.
    ///
    /// # Errors
    ///
    /// Returns [`ThrottleError::FrameIdMismatch`] or
    /// [`ThrottleError::FrameLength`] when the envelope does not belong to
    /// this message.
    fn from_frame(frame: &CanFrame) -> ThrottleResult<Self> {
        check_envelope(frame, Self::CAN_ID, Self::DLC).inspect_err(|e| {
            debug!(message = Self::NAME, id = frame.id, dlc = frame.dlc, %e, "rejecting frame");
        })?;
        Self::decode_payload(frame.payload())
    }
}

/// Check identifier first, then data length code.
///
/// # Errors
///
/// Returns [`ThrottleError::FrameIdMismatch`] if `frame.id` differs from
/// `expected_id`, otherwise [`ThrottleError::FrameLength`] if `frame.dlc`
/// differs from `expected_dlc`.
pub fn check_envelope(frame: &CanFrame, expected_id: u32, expected_dlc: u8) -> ThrottleResult<()> {
    if frame.id != expected_id {
        return Err(ThrottleError::FrameIdMismatch {
            expected: expected_id,
            actual: frame.id,
        });
    }
    if frame.dlc != expected_dlc {
        return Err(ThrottleError::FrameLength {
            expected: usize::from(expected_dlc),
            actual: usize::from(frame.dlc),
        });
    }
    Ok(())
}

/// Either throttle message, as seen on a shared bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleFrame {
    Command(ThrottleCommandMessage),
    Report(ThrottleReportMessage),
}

impl ThrottleFrame {
    pub fn timestamp(&self) -> u32 {
        match self {
            Self::Command(msg) => msg.timestamp,
            Self::Report(msg) => msg.timestamp,
        }
    }

    pub fn can_id(&self) -> u32 {
        match self {
            Self::Command(_) => ThrottleCommand::CAN_ID,
            Self::Report(_) => ThrottleReport::CAN_ID,
        }
    }
}

/// Route a frame to the matching throttle decoder.
///
/// Frames of other modules yield `Ok(None)`: they are ordinary bus traffic,
/// not an error.
///
/// # Errors
///
/// Returns [`ThrottleError::FrameLength`] if a throttle frame carries the
/// wrong DLC.
pub fn decode_throttle_frame(frame: &CanFrame) -> ThrottleResult<Option<ThrottleFrame>> {
    match frame.id {
        THROTTLE_COMMAND_CAN_ID => {
            ThrottleCommandMessage::from_frame(frame).map(|msg| Some(ThrottleFrame::Command(msg)))
        }
        THROTTLE_REPORT_CAN_ID => {
            ThrottleReportMessage::from_frame(frame).map(|msg| Some(ThrottleFrame::Report(msg)))
        }
        _ => Ok(None),
    }
}
