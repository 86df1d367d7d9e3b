//! Throttle report message (controller to host).
//!
//! The controller publishes one report every
//! [`THROTTLE_REPORT_PUBLISH_INTERVAL_MS`](crate::THROTTLE_REPORT_PUBLISH_INTERVAL_MS)
//! regardless of how often commands arrive.
//!
//! Payload layout (ID `0x63`, DLC 8):
//!
//! | Byte | Field |
//! |------|-------|
//! | 0-1 | `current_accelerator_position` (u16 LE) |
//! | 2-3 | `commanded_accelerator_position` (u16 LE) |
//! | 4-5 | `spoofed_accelerator_output` (u16 LE) |
//! | 6 | bits 0-3 reserved, bits 4-7 `wdc_source` |
//! | 7 | bit 0 `enabled`, bit 1 `override`, bit 2 `driver_activity`, bit 3 `fault_wdc`, bit 4 `fault_1`, bit 5 `fault_2`, bit 6 reserved, bit 7 `fault_connector` |

use bitflags::bitflags;
use oscc_can_common::{CanFrame, PayloadReader, PayloadWriter, extract_field, insert_field};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{ThrottleError, ThrottleResult};
use crate::ids::{
    THROTTLE_PAYLOAD_LEN, THROTTLE_REPORT_CAN_DLC, THROTTLE_REPORT_CAN_ID, WDC_SOURCE_BITS,
    WDC_SOURCE_MAX, WDC_SOURCE_NONE, report_layout,
};
use crate::message::{ThrottleMessage, check_envelope};
use crate::scale::{checked_position, position_to_percent};

bitflags! {
    /// Status byte of the throttle report (payload byte 7).
    ///
    /// Bit 6 is reserved and dropped on reception.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ReportStatusFlags: u8 {
        /// Throttle controls enabled (no timeouts or overrides).
        const ENABLED = 1 << report_layout::ENABLED_BIT;
        /// Controls are provided by the driver.
        const OVERRIDE = 1 << report_layout::OVERRIDE_BIT;
        const DRIVER_ACTIVITY = 1 << report_layout::DRIVER_ACTIVITY_BIT;
        /// Watchdog counter fault latched.
        const FAULT_WDC = 1 << report_layout::FAULT_WDC_BIT;
        const FAULT_1 = 1 << report_layout::FAULT_1_BIT;
        const FAULT_2 = 1 << report_layout::FAULT_2_BIT;
        /// Connector sense pins are not shorted.
        const FAULT_CONNECTOR = 1 << report_layout::FAULT_CONNECTOR_BIT;

        const FAULTS = Self::FAULT_WDC.bits()
            | Self::FAULT_1.bits()
            | Self::FAULT_2.bits()
            | Self::FAULT_CONNECTOR.bits();
    }
}

/// Decoded throttle report payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ThrottleReport {
    /// Accelerator position as read by the position sensor. [65535 == 100%]
    pub current_accelerator_position: u16,
    /// Echo of the last accepted command. [65535 == 100%]
    pub commanded_accelerator_position: u16,
    /// Value injected onto the vehicle's throttle signal. [65535 == 100%]
    pub spoofed_accelerator_output: u16,
    /// Watchdog counter fault source, `0` meaning none. Four bits on the wire.
    pub wdc_source: u8,
    pub enabled: bool,
    #[serde(rename = "override")]
    pub driver_override: bool,
    pub driver_activity: bool,
    pub fault_wdc: bool,
    pub fault_1: bool,
    pub fault_2: bool,
    pub fault_connector: bool,
}

/// Cross-field check of the controller's enable contract.
///
/// The controller must drop `enabled` while any fault is latched or the driver
/// has taken over. Nothing in the codec enforces this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportConsistency {
    Consistent,
    /// `enabled` is set while the listed fault bits are set.
    EnabledWithFault(ReportStatusFlags),
    /// `enabled` is set while `override` is set.
    EnabledWhileOverridden,
}

impl ThrottleReport {
    pub fn new(current: u16, commanded: u16, spoofed: u16) -> Self {
        Self {
            current_accelerator_position: current,
            commanded_accelerator_position: commanded,
            spoofed_accelerator_output: spoofed,
            ..Self::default()
        }
    }

    /// Build a report from unchecked integer input.
    ///
    /// # Errors
    ///
    /// Returns [`ThrottleError::FieldRange`] if a position exceeds 65535 or
    /// `wdc_source` exceeds 15.
    pub fn try_new(
        current: u32,
        commanded: u32,
        spoofed: u32,
        wdc_source: u8,
        status: ReportStatusFlags,
    ) -> ThrottleResult<Self> {
        if wdc_source > WDC_SOURCE_MAX {
            return Err(ThrottleError::field_range(
                "wdc_source",
                wdc_source,
                WDC_SOURCE_MAX,
            ));
        }
        Ok(Self::new(
            checked_position("current_accelerator_position", current)?,
            checked_position("commanded_accelerator_position", commanded)?,
            checked_position("spoofed_accelerator_output", spoofed)?,
        )
        .with_wdc_source(wdc_source)
        .with_status(status))
    }

    pub fn with_wdc_source(mut self, wdc_source: u8) -> Self {
        self.wdc_source = wdc_source;
        self
    }

    /// Replace every status bit with the ones in `flags`.
    pub fn with_status(mut self, flags: ReportStatusFlags) -> Self {
        self.enabled = flags.contains(ReportStatusFlags::ENABLED);
        self.driver_override = flags.contains(ReportStatusFlags::OVERRIDE);
        self.driver_activity = flags.contains(ReportStatusFlags::DRIVER_ACTIVITY);
        self.fault_wdc = flags.contains(ReportStatusFlags::FAULT_WDC);
        self.fault_1 = flags.contains(ReportStatusFlags::FAULT_1);
        self.fault_2 = flags.contains(ReportStatusFlags::FAULT_2);
        self.fault_connector = flags.contains(ReportStatusFlags::FAULT_CONNECTOR);
        self
    }

    pub fn status(&self) -> ReportStatusFlags {
        let mut flags = ReportStatusFlags::empty();
        flags.set(ReportStatusFlags::ENABLED, self.enabled);
        flags.set(ReportStatusFlags::OVERRIDE, self.driver_override);
        flags.set(ReportStatusFlags::DRIVER_ACTIVITY, self.driver_activity);
        flags.set(ReportStatusFlags::FAULT_WDC, self.fault_wdc);
        flags.set(ReportStatusFlags::FAULT_1, self.fault_1);
        flags.set(ReportStatusFlags::FAULT_2, self.fault_2);
        flags.set(ReportStatusFlags::FAULT_CONNECTOR, self.fault_connector);
        flags
    }

    pub fn active_faults(&self) -> ReportStatusFlags {
        self.status() & ReportStatusFlags::FAULTS
    }

    pub fn has_fault(&self) -> bool {
        !self.active_faults().is_empty()
    }

    pub fn is_overridden(&self) -> bool {
        self.driver_override
    }

    pub fn has_wdc_source(&self) -> bool {
        self.wdc_source != WDC_SOURCE_NONE
    }

    pub fn current_position_percent(&self) -> f32 {
        position_to_percent(self.current_accelerator_position)
    }

    pub fn commanded_position_percent(&self) -> f32 {
        position_to_percent(self.commanded_accelerator_position)
    }

    pub fn spoofed_output_percent(&self) -> f32 {
        position_to_percent(self.spoofed_accelerator_output)
    }

    pub fn consistency(&self) -> ReportConsistency {
        if !self.enabled {
            return ReportConsistency::Consistent;
        }
        let faults = self.active_faults();
        if !faults.is_empty() {
            return ReportConsistency::EnabledWithFault(faults);
        }
        if self.driver_override {
            return ReportConsistency::EnabledWhileOverridden;
        }
        ReportConsistency::Consistent
    }

    /// Serialize into the 8-byte payload. Reserved bits are zero.
    ///
    /// # Errors
    ///
    /// Returns [`ThrottleError::FieldRange`] if `wdc_source` does not fit its
    /// four-bit field.
    pub fn encode(&self) -> ThrottleResult<[u8; THROTTLE_PAYLOAD_LEN]> {
        if self.wdc_source > WDC_SOURCE_MAX {
            return Err(ThrottleError::field_range(
                "wdc_source",
                self.wdc_source,
                WDC_SOURCE_MAX,
            ));
        }

        let wdc_byte = insert_field(
            0,
            report_layout::WDC_SOURCE_SHIFT,
            WDC_SOURCE_BITS,
            self.wdc_source,
        );

        let mut writer = PayloadWriter::new();
        writer
            .write_u16_le(self.current_accelerator_position)?
            .write_u16_le(self.commanded_accelerator_position)?
            .write_u16_le(self.spoofed_accelerator_output)?
            .write_u8(wdc_byte)?
            .write_u8(self.status().bits())?;
        Ok(writer.into_inner())
    }

    /// Parse an 8-byte payload. Reserved bits are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ThrottleError::FrameLength`] unless `data` is exactly
    /// eight bytes long.
    pub fn decode(data: &[u8]) -> ThrottleResult<Self> {
        if data.len() != THROTTLE_PAYLOAD_LEN {
            debug!(len = data.len(), "rejecting throttle report payload");
            return Err(ThrottleError::FrameLength {
                expected: THROTTLE_PAYLOAD_LEN,
                actual: data.len(),
            });
        }

        let mut reader = PayloadReader::new(data);
        let current = reader.read_u16_le()?;
        let commanded = reader.read_u16_le()?;
        let spoofed = reader.read_u16_le()?;
        let wdc_source = extract_field(
            reader.read_u8()?,
            report_layout::WDC_SOURCE_SHIFT,
            WDC_SOURCE_BITS,
        );
        let status = ReportStatusFlags::from_bits_truncate(reader.read_u8()?);

        let report = Self::new(current, commanded, spoofed)
            .with_wdc_source(wdc_source)
            .with_status(status);
        trace!(?report, "decoded throttle report");
        Ok(report)
    }
}

impl ThrottleMessage for ThrottleReport {
    const CAN_ID: u32 = THROTTLE_REPORT_CAN_ID;
    const DLC: u8 = THROTTLE_REPORT_CAN_DLC;
    const NAME: &'static str = "throttle report";

    fn encode_payload(&self) -> ThrottleResult<[u8; THROTTLE_PAYLOAD_LEN]> {
        self.encode()
    }

    fn decode_payload(data: &[u8]) -> ThrottleResult<Self> {
        Self::decode(data)
    }
}

/// Encode a report from raw integer fields.
///
/// # Errors
///
/// Returns [`ThrottleError::FieldRange`] if a position exceeds 65535 or
/// `wdc_source` exceeds 15.
pub fn encode_report(
    current: u32,
    commanded: u32,
    spoofed: u32,
    wdc_source: u8,
    status: ReportStatusFlags,
) -> ThrottleResult<[u8; THROTTLE_PAYLOAD_LEN]> {
    ThrottleReport::try_new(current, commanded, spoofed, wdc_source, status)?.encode()
}

/// Throttle report with its transport envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThrottleReportMessage {
    /// CAN frame ID.
    pub id: u32,
    /// CAN frame data length.
    pub dlc: u8,
    /// Timestamp when the report was put on the bus.
    pub timestamp: u32,
    pub data: ThrottleReport,
}

impl ThrottleReportMessage {
    pub fn new(timestamp: u32, data: ThrottleReport) -> Self {
        Self {
            id: THROTTLE_REPORT_CAN_ID,
            dlc: THROTTLE_REPORT_CAN_DLC,
            timestamp,
            data,
        }
    }

    /// # Errors
    ///
    /// Returns [`ThrottleError::FrameIdMismatch`] if the frame ID is not
    /// `0x63` and [`ThrottleError::FrameLength`] if its DLC is not 8.
    pub fn from_frame(frame: &CanFrame) -> ThrottleResult<Self> {
        Ok(Self {
            id: frame.id,
            dlc: frame.dlc,
            timestamp: frame.timestamp,
            data: ThrottleReport::from_frame(frame)?,
        })
    }

    /// Build the transport frame from this envelope.
    ///
    /// # Errors
    ///
    /// Fails if `id` or `dlc` were changed away from the report constants, or
    /// if the payload does not encode.
    pub fn to_frame(&self) -> ThrottleResult<CanFrame> {
        let frame = CanFrame {
            id: self.id,
            dlc: self.dlc,
            timestamp: self.timestamp,
            data: self.data.encode()?,
        };
        check_envelope(&frame, THROTTLE_REPORT_CAN_ID, THROTTLE_REPORT_CAN_DLC)?;
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ThrottleReport {
        ThrottleReport::new(0x0102, 0x0304, 0x0506)
            .with_wdc_source(0x0A)
            .with_status(ReportStatusFlags::ENABLED | ReportStatusFlags::DRIVER_ACTIVITY)
    }

    #[test]
    fn test_encode_layout() -> ThrottleResult<()> {
        assert_eq!(
            sample().encode()?,
            [0x02, 0x01, 0x04, 0x03, 0x06, 0x05, 0xA0, 0b0000_0101]
        );
        Ok(())
    }

    #[test]
    fn test_decode_layout() -> ThrottleResult<()> {
        let report = ThrottleReport::decode(&[0x02, 0x01, 0x04, 0x03, 0x06, 0x05, 0xA0, 0x05])?;
        assert_eq!(report, sample());
        Ok(())
    }

    #[test]
    fn test_encode_rejects_wide_wdc_source() {
        let report = ThrottleReport::default().with_wdc_source(16);
        assert_eq!(
            report.encode(),
            Err(ThrottleError::FieldRange {
                field: "wdc_source",
                value: 16,
                max: 15,
            })
        );
    }

    #[test]
    fn test_try_new_range_checks() -> ThrottleResult<()> {
        let report = ThrottleReport::try_new(65535, 0, 1, 15, ReportStatusFlags::ENABLED)?;
        assert_eq!(report.current_accelerator_position, u16::MAX);
        assert_eq!(report.wdc_source, 15);
        assert!(report.enabled);

        assert_eq!(
            ThrottleReport::try_new(0, 65536, 0, 0, ReportStatusFlags::empty()),
            Err(ThrottleError::FieldRange {
                field: "commanded_accelerator_position",
                value: 65536,
                max: 65535
            })
        );
        assert_eq!(
            encode_report(0, 0, 0, 16, ReportStatusFlags::empty()),
            Err(ThrottleError::FieldRange {
                field: "wdc_source",
                value: 16,
                max: 15
            })
        );
        Ok(())
    }

    #[test]
    fn test_encode_report_matches_typed_encode() -> ThrottleResult<()> {
        let status = ReportStatusFlags::OVERRIDE | ReportStatusFlags::FAULT_2;
        assert_eq!(
            encode_report(0x1234, 2, 3, 7, status)?,
            ThrottleReport::new(0x1234, 2, 3)
                .with_wdc_source(7)
                .with_status(status)
                .encode()?
        );
        Ok(())
    }

    #[test]
    fn test_decode_ignores_reserved_bits() -> ThrottleResult<()> {
        let clean = ThrottleReport::decode(&[0, 0, 0, 0, 0, 0, 0x30, 0b1000_0001])?;
        let dirty = ThrottleReport::decode(&[0, 0, 0, 0, 0, 0, 0x3F, 0b1100_0001])?;
        assert_eq!(clean, dirty);
        assert_eq!(clean.wdc_source, 3);
        assert!(clean.enabled);
        assert!(clean.fault_connector);
        Ok(())
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        for len in [7usize, 9] {
            let data = vec![0u8; len];
            assert!(matches!(
                ThrottleReport::decode(&data),
                Err(ThrottleError::FrameLength { expected: 8, actual }) if actual == len
            ));
        }
    }

    #[test]
    fn test_connector_fault_isolated() -> ThrottleResult<()> {
        let report = ThrottleReport::default().with_status(ReportStatusFlags::FAULT_CONNECTOR);
        let decoded = ThrottleReport::decode(&report.encode()?)?;
        assert!(decoded.fault_connector);
        assert!(!decoded.enabled);
        assert!(!decoded.driver_override);
        assert!(!decoded.fault_wdc && !decoded.fault_1 && !decoded.fault_2);
        Ok(())
    }

    #[test]
    fn test_active_faults() {
        let report = ThrottleReport::default().with_status(
            ReportStatusFlags::FAULT_1 | ReportStatusFlags::OVERRIDE | ReportStatusFlags::FAULT_WDC,
        );
        assert!(report.has_fault());
        assert!(report.is_overridden());
        assert_eq!(
            report.active_faults(),
            ReportStatusFlags::FAULT_1 | ReportStatusFlags::FAULT_WDC
        );
        assert!(!ThrottleReport::default().has_fault());
    }

    #[test]
    fn test_consistency() {
        let ok = ThrottleReport::default().with_status(ReportStatusFlags::ENABLED);
        assert_eq!(ok.consistency(), ReportConsistency::Consistent);

        let faulted_disabled = ThrottleReport::default().with_status(ReportStatusFlags::FAULT_2);
        assert_eq!(faulted_disabled.consistency(), ReportConsistency::Consistent);

        let faulted_enabled = ThrottleReport::default()
            .with_status(ReportStatusFlags::ENABLED | ReportStatusFlags::FAULT_CONNECTOR);
        assert_eq!(
            faulted_enabled.consistency(),
            ReportConsistency::EnabledWithFault(ReportStatusFlags::FAULT_CONNECTOR)
        );

        let overridden = ThrottleReport::default()
            .with_status(ReportStatusFlags::ENABLED | ReportStatusFlags::OVERRIDE);
        assert_eq!(
            overridden.consistency(),
            ReportConsistency::EnabledWhileOverridden
        );
    }

    #[test]
    fn test_percent_accessors() {
        let report = ThrottleReport::new(65535, 0, 32767);
        assert!((report.current_position_percent() - 100.0).abs() < 1e-3);
        assert!(report.commanded_position_percent().abs() < 1e-6);
        assert!((report.spoofed_output_percent() - 50.0).abs() < 1e-2);
    }

    #[test]
    fn test_wdc_source_none() {
        assert!(!ThrottleReport::default().has_wdc_source());
        assert!(sample().has_wdc_source());
    }

    #[test]
    fn test_message_envelope() -> ThrottleResult<()> {
        let msg = ThrottleReportMessage::new(5000, sample());
        assert_eq!(msg.id, 0x63);
        assert_eq!(msg.dlc, 8);
        let frame = msg.to_frame()?;
        assert_eq!(ThrottleReportMessage::from_frame(&frame)?, msg);
        Ok(())
    }

    #[test]
    fn test_message_rejects_bad_envelope() {
        let mut msg = ThrottleReportMessage::new(0, sample());
        msg.dlc = 7;
        assert!(matches!(
            msg.to_frame(),
            Err(ThrottleError::FrameLength {
                expected: 8,
                actual: 7
            })
        ));

        let mut msg = ThrottleReportMessage::new(0, sample());
        msg.id = 0x62;
        assert!(matches!(
            msg.to_frame(),
            Err(ThrottleError::FrameIdMismatch {
                expected: 0x63,
                actual: 0x62
            })
        ));
    }

    #[test]
    fn test_serde_uses_override_name() -> Result<(), serde_json::Error> {
        let report = ThrottleReport::default().with_status(ReportStatusFlags::OVERRIDE);
        let json = serde_json::to_value(report)?;
        assert_eq!(json.get("override"), Some(&serde_json::Value::Bool(true)));
        let back: ThrottleReport = serde_json::from_value(json)?;
        assert_eq!(back, report);
        Ok(())
    }
}
