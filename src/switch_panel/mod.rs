mod device;
pub mod leds;
pub mod report;

use thiserror::Error;

pub use device::SwitchPanel;
pub use report::{decode, diff, ActiveSet, ChangeSet, Key};

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("{0} was not found as a connected HID device")]
    NotFound(String),
    #[error("device has no HID interrupt IN endpoint")]
    NoInputEndpoint,
    #[error("feature report is empty, expected a report id")]
    EmptyFeatureReport,
    #[error("short feature report write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },
    #[error("USB error: {0}")]
    Usb(#[from] rusb::Error),
}

/// Write side of the device: feature reports that drive the panel LEDs.
pub trait FeedbackSink {
    /// Send `report`, whose first byte is the report id.
    fn send_feature_report(&mut self, report: &[u8]) -> Result<(), DeviceError>;
}

/// Read side of the device.
pub trait PanelDevice: FeedbackSink {
    /// Wait for the next input report. `Ok(None)` means the read timed out
    /// without the panel sending anything.
    fn read_report(&mut self) -> Result<Option<Vec<u8>>, DeviceError>;
}
