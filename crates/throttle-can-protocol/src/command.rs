//! Throttle command message (host to controller).
//!
//! Payload layout (ID `0x62`, DLC 8):
//!
//! | Byte | Field |
//! |------|-------|
//! | 0-1 | `commanded_accelerator_position` (u16 LE, 65535 == 100%) |
//! | 2 | reserved |
//! | 3 | bit 0 `enabled`, bit 1 `clear`, bit 2 `ignore`, bits 3-7 reserved |
//! | 4-6 | reserved |
//! | 7 | `count` (optional watchdog counter) |

use bitflags::bitflags;
use oscc_can_common::{CanFrame, PayloadReader, PayloadWriter};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{ThrottleError, ThrottleResult};
use crate::ids::{
    THROTTLE_COMMAND_CAN_DLC, THROTTLE_COMMAND_CAN_ID, THROTTLE_PAYLOAD_LEN, command_layout,
};
use crate::message::ThrottleMessage;
use crate::scale::{checked_position, position_from_fraction, position_to_fraction};

bitflags! {
    /// Flag byte of the throttle command (payload byte 3).
    ///
    /// Bits 3-7 are reserved: never set on transmission and dropped on
    /// reception.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CommandFlags: u8 {
        /// Command authority active.
        const ENABLED = 1 << command_layout::ENABLED_BIT;
        /// Request to clear a latched driver override.
        const CLEAR = 1 << command_layout::CLEAR_BIT;
        /// Suppress driver override detection.
        const IGNORE = 1 << command_layout::IGNORE_BIT;
    }
}

/// Decoded throttle command payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ThrottleCommand {
    /// Accelerator position command. [65535 == 100%]
    pub commanded_accelerator_position: u16,
    pub enabled: bool,
    pub clear: bool,
    pub ignore: bool,
    /// Optional watchdog counter.
    pub count: u8,
}

impl ThrottleCommand {
    /// A disabled command requesting `position`.
    pub fn new(position: u16) -> Self {
        Self {
            commanded_accelerator_position: position,
            ..Self::default()
        }
    }

    /// Build a command from unchecked integer input.
    ///
    /// # Errors
    ///
    /// Returns [`ThrottleError::FieldRange`] if `position` exceeds 65535.
    pub fn try_new(
        position: u32,
        enabled: bool,
        clear: bool,
        ignore: bool,
        count: u8,
    ) -> ThrottleResult<Self> {
        Ok(Self {
            commanded_accelerator_position: checked_position(
                "commanded_accelerator_position",
                position,
            )?,
            enabled,
            clear,
            ignore,
            count,
        })
    }

    pub fn enable(mut self) -> Self {
        self.enabled = true;
        self
    }

    pub fn disable(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn with_position(mut self, position: u16) -> Self {
        self.commanded_accelerator_position = position;
        self
    }

    /// Set the demand from a fraction of full throttle, clamped to `0.0..=1.0`.
    pub fn with_demand(mut self, fraction: f32) -> Self {
        self.commanded_accelerator_position = position_from_fraction(fraction);
        self
    }

    pub fn with_clear(mut self, clear: bool) -> Self {
        self.clear = clear;
        self
    }

    pub fn with_ignore(mut self, ignore: bool) -> Self {
        self.ignore = ignore;
        self
    }

    pub fn with_count(mut self, count: u8) -> Self {
        self.count = count;
        self
    }

    pub fn demand(&self) -> f32 {
        position_to_fraction(self.commanded_accelerator_position)
    }

    pub fn flags(&self) -> CommandFlags {
        let mut flags = CommandFlags::empty();
        flags.set(CommandFlags::ENABLED, self.enabled);
        flags.set(CommandFlags::CLEAR, self.clear);
        flags.set(CommandFlags::IGNORE, self.ignore);
        flags
    }

    /// Serialize into the 8-byte payload. Reserved bytes and bits are zero.
    ///
    /// # Errors
    ///
    /// Infallible for a well-formed command; the result type is shared with
    /// [`ThrottleMessage::encode_payload`].
    pub fn encode(&self) -> ThrottleResult<[u8; THROTTLE_PAYLOAD_LEN]> {
        let mut writer = PayloadWriter::new();
        writer
            .write_u16_le(self.commanded_accelerator_position)?
            .reserve(command_layout::RESERVED_0_LEN)?
            .write_u8(self.flags().bits())?
            .reserve(command_layout::RESERVED_2_LEN)?
            .write_u8(self.count)?;
        Ok(writer.into_inner())
    }

    /// Parse an 8-byte payload. Reserved bytes and bits are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ThrottleError::FrameLength`] unless `data` is exactly
    /// eight bytes long.
    pub fn decode(data: &[u8]) -> ThrottleResult<Self> {
        if data.len() != THROTTLE_PAYLOAD_LEN {
            debug!(len = data.len(), "rejecting throttle command payload");
            return Err(ThrottleError::FrameLength {
                expected: THROTTLE_PAYLOAD_LEN,
                actual: data.len(),
            });
        }

        let mut reader = PayloadReader::new(data);
        let position = reader.read_u16_le()?;
        reader.skip(command_layout::RESERVED_0_LEN)?;
        let flags = CommandFlags::from_bits_truncate(reader.read_u8()?);
        reader.skip(command_layout::RESERVED_2_LEN)?;
        let count = reader.read_u8()?;

        let command = Self {
            commanded_accelerator_position: position,
            enabled: flags.contains(CommandFlags::ENABLED),
            clear: flags.contains(CommandFlags::CLEAR),
            ignore: flags.contains(CommandFlags::IGNORE),
            count,
        };
        trace!(?command, "decoded throttle command");
        Ok(command)
    }
}

impl ThrottleMessage for ThrottleCommand {
    const CAN_ID: u32 = THROTTLE_COMMAND_CAN_ID;
    const DLC: u8 = THROTTLE_COMMAND_CAN_DLC;
    const NAME: &'static str = "throttle command";

    fn encode_payload(&self) -> ThrottleResult<[u8; THROTTLE_PAYLOAD_LEN]> {
        self.encode()
    }

    fn decode_payload(data: &[u8]) -> ThrottleResult<Self> {
        Self::decode(data)
    }
}

/// Encode a command from raw integer fields.
///
/// # Errors
///
/// Returns [`ThrottleError::FieldRange`] if `position` exceeds 65535.
pub fn encode_command(
    position: u32,
    enabled: bool,
    clear: bool,
    ignore: bool,
    count: u8,
) -> ThrottleResult<[u8; THROTTLE_PAYLOAD_LEN]> {
    ThrottleCommand::try_new(position, enabled, clear, ignore, count)?.encode()
}

/// Throttle command together with the firmware receipt timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ThrottleCommandMessage {
    /// Timestamp when the command was received.
    pub timestamp: u32,
    pub data: ThrottleCommand,
}

impl ThrottleCommandMessage {
    pub fn new(timestamp: u32, data: ThrottleCommand) -> Self {
        Self { timestamp, data }
    }

    /// # Errors
    ///
    /// Returns [`ThrottleError::FrameIdMismatch`] for a foreign frame ID and
    /// [`ThrottleError::FrameLength`] for a DLC other than 8.
    pub fn from_frame(frame: &CanFrame) -> ThrottleResult<Self> {
        Ok(Self {
            timestamp: frame.timestamp,
            data: ThrottleCommand::from_frame(frame)?,
        })
    }

    /// # Errors
    ///
    /// Propagates encoding failures of the payload.
    pub fn to_frame(&self) -> ThrottleResult<CanFrame> {
        self.data.to_frame(self.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_layout() -> ThrottleResult<()> {
        let cmd = ThrottleCommand::new(0x1234)
            .enable()
            .with_ignore(true)
            .with_count(0xA5);
        assert_eq!(
            cmd.encode()?,
            [0x34, 0x12, 0x00, 0b0000_0101, 0x00, 0x00, 0x00, 0xA5]
        );
        Ok(())
    }

    #[test]
    fn test_decode_example_scenario() -> ThrottleResult<()> {
        let bytes = encode_command(32767, true, false, false, 5)?;
        let cmd = ThrottleCommand::decode(&bytes)?;
        assert_eq!(
            cmd,
            ThrottleCommand {
                commanded_accelerator_position: 32767,
                enabled: true,
                clear: false,
                ignore: false,
                count: 5,
            }
        );
        Ok(())
    }

    #[test]
    fn test_decode_ignores_reserved() -> ThrottleResult<()> {
        let clean = [0xFF, 0x7F, 0x00, 0b0000_0011, 0x00, 0x00, 0x00, 0x09];
        let dirty = [0xFF, 0x7F, 0xEE, 0b1111_1011, 0x12, 0x34, 0x56, 0x09];
        let a = ThrottleCommand::decode(&clean)?;
        let b = ThrottleCommand::decode(&dirty)?;
        assert_eq!(a, b);
        assert!(a.enabled && a.clear && !a.ignore);
        Ok(())
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        for len in [0usize, 7, 9] {
            let data = vec![0u8; len];
            assert_eq!(
                ThrottleCommand::decode(&data),
                Err(ThrottleError::FrameLength {
                    expected: 8,
                    actual: len
                })
            );
        }
    }

    #[test]
    fn test_try_new_rejects_out_of_range() {
        let result = ThrottleCommand::try_new(65536, true, false, false, 0);
        assert!(matches!(
            result,
            Err(ThrottleError::FieldRange {
                field: "commanded_accelerator_position",
                value: 65536,
                max: 65535,
            })
        ));
    }

    #[test]
    fn test_flags() {
        let cmd = ThrottleCommand::new(0).enable().with_clear(true);
        assert_eq!(cmd.flags(), CommandFlags::ENABLED | CommandFlags::CLEAR);
        assert_eq!(cmd.disable().flags(), CommandFlags::CLEAR);
    }

    #[test]
    fn test_demand() {
        let cmd = ThrottleCommand::new(0).with_demand(1.0);
        assert_eq!(cmd.commanded_accelerator_position, 65535);
        assert!((cmd.demand() - 1.0).abs() < f32::EPSILON);
        assert_eq!(ThrottleCommand::new(0).with_demand(-3.0).commanded_accelerator_position, 0);
    }

    #[test]
    fn test_message_frame_roundtrip() -> ThrottleResult<()> {
        let msg = ThrottleCommandMessage::new(1234, ThrottleCommand::new(500).enable());
        let frame = msg.to_frame()?;
        assert_eq!(frame.id, THROTTLE_COMMAND_CAN_ID);
        assert_eq!(frame.dlc, 8);
        assert_eq!(frame.timestamp, 1234);
        assert_eq!(ThrottleCommandMessage::from_frame(&frame)?, msg);
        Ok(())
    }

    #[test]
    fn test_message_rejects_report_id() -> ThrottleResult<()> {
        let mut frame = ThrottleCommand::new(1).to_frame(0)?;
        frame.id = crate::ids::THROTTLE_REPORT_CAN_ID;
        assert_eq!(
            ThrottleCommandMessage::from_frame(&frame),
            Err(ThrottleError::FrameIdMismatch {
                expected: 0x62,
                actual: 0x63
            })
        );
        Ok(())
    }
}
