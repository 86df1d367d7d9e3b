//! Transport envelope for classic CAN frames.
//!
//! The bus layer owns arbitration, retransmission and timestamping. Protocol
//! crates only see the [`CanFrame`] it hands over: identifier, data length
//! code, a 32-bit timestamp and up to eight payload bytes.

use serde::{Deserialize, Serialize};

use crate::{CAN_MAX_DLC, CAN_MAX_DLC_CODE, CanCommonError, CanCommonResult};

/// A received or to-be-transmitted classic CAN frame.
///
/// `dlc` is kept exactly as the transport reported it, even when it exceeds
/// [`CAN_MAX_DLC`], so protocol decoders can reject malformed frames instead
/// of silently truncating them. Bytes of `data` past `dlc` are zero for
/// frames built by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CanFrame {
    /// Frame identifier.
    pub id: u32,
    /// Data length code as delivered by the transport.
    pub dlc: u8,
    /// Timestamp recorded by the transport at receipt or transmission.
    pub timestamp: u32,
    /// Payload storage.
    pub data: [u8; CAN_MAX_DLC],
}

impl CanFrame {
    /// Build a frame from a payload slice of at most eight bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CanCommonError::FrameTooLong`] if `payload` is longer than
    /// [`CAN_MAX_DLC`].
    pub fn new(id: u32, payload: &[u8], timestamp: u32) -> CanCommonResult<Self> {
        let dlc = u8::try_from(payload.len())
            .ok()
            .filter(|dlc| usize::from(*dlc) <= CAN_MAX_DLC)
            .ok_or(CanCommonError::FrameTooLong(payload.len()))?;

        let mut data = [0u8; CAN_MAX_DLC];
        if let Some(dst) = data.get_mut(..payload.len()) {
            dst.copy_from_slice(payload);
        }

        Ok(Self {
            id,
            dlc,
            timestamp,
            data,
        })
    }

    /// Build a full eight-byte frame.
    pub fn from_payload(id: u32, data: [u8; CAN_MAX_DLC], timestamp: u32) -> Self {
        Self {
            id,
            dlc: CAN_MAX_DLC_CODE,
            timestamp,
            data,
        }
    }

    pub fn with_timestamp(mut self, timestamp: u32) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Payload bytes covered by the data length code.
    ///
    /// A DLC above [`CAN_MAX_DLC`] yields the whole storage; callers that care
    /// must check [`CanFrame::dlc`] first.
    pub fn payload(&self) -> &[u8] {
        self.data
            .get(..usize::from(self.dlc))
            .unwrap_or(&self.data)
    }

    pub fn is_full_length(&self) -> bool {
        usize::from(self.dlc) == CAN_MAX_DLC
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(500))]

        #[test]
        fn prop_new_preserves_payload(
            id in any::<u32>(),
            payload in proptest::collection::vec(any::<u8>(), 0..=CAN_MAX_DLC),
            timestamp in any::<u32>(),
        ) {
            let frame = CanFrame::new(id, &payload, timestamp);
            prop_assert!(frame.is_ok());
            if let Ok(frame) = frame {
                prop_assert_eq!(frame.payload(), payload.as_slice());
                prop_assert_eq!(usize::from(frame.dlc), payload.len());
            }
        }

        #[test]
        fn prop_new_rejects_oversized(len in (CAN_MAX_DLC + 1)..64usize) {
            let payload = vec![0u8; len];
            prop_assert_eq!(
                CanFrame::new(0x62, &payload, 0),
                Err(CanCommonError::FrameTooLong(len))
            );
        }
    }
}
