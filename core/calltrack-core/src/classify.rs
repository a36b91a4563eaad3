//! Call Classifier.
//!
//! Zero duration means the call never connected. Direction, voicemail and
//! rejection are not distinguished: every zero-duration terminal call is missed.

use crate::types::{Disposition, UNKNOWN_CARRIER};

pub fn classify(duration_seconds: u64) -> Disposition {
    if duration_seconds == 0 {
        Disposition::Missed
    } else {
        Disposition::Answered
    }
}

/// Label for the carrier/SIM slot. Slot ids are device specific, so the raw
/// id is passed through rather than mapped to a physical slot number.
pub fn carrier_label(slot: Option<&str>) -> String {
    match slot.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => format!("SIM {}", id),
        None => UNKNOWN_CARRIER.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_duration_is_missed() {
        assert_eq!(classify(0), Disposition::Missed);
    }

    #[test]
    fn any_positive_duration_is_answered() {
        for d in [1, 42, 3600, u64::MAX] {
            assert_eq!(classify(d), Disposition::Answered, "duration {}", d);
        }
    }

    #[test]
    fn carrier_label_formats_slot() {
        assert_eq!(carrier_label(Some("1")), "SIM 1");
        assert_eq!(carrier_label(Some(" 89014103 ")), "SIM 89014103");
        assert_eq!(carrier_label(Some("")), "UNKNOWN");
        assert_eq!(carrier_label(None), "UNKNOWN");
    }
}
