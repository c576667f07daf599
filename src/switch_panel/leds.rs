//! Landing-gear indicator masks for the switch panel feature report.
//!
//! The feature report is `[report_id, mask]` with report id `0x00`. Each of
//! the three gear indicators has a green and a red LED.

pub const GREEN_TOP: u8 = 0x01;
pub const GREEN_LEFT: u8 = 0x02;
pub const GREEN_RIGHT: u8 = 0x04;
pub const RED_TOP: u8 = 0x08;
pub const RED_LEFT: u8 = 0x10;
pub const RED_RIGHT: u8 = 0x20;

const FEEDBACK_REPORT_ID: u8 = 0x00;

/// All three indicators green.
pub const GEAR_DOWN_REPORT: [u8; 2] = [FEEDBACK_REPORT_ID, GREEN_TOP | GREEN_LEFT | GREEN_RIGHT];

/// All three indicators red.
pub const GEAR_UP_REPORT: [u8; 2] = [FEEDBACK_REPORT_ID, RED_TOP | RED_LEFT | RED_RIGHT];
