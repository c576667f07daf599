//! Fakes for the device and dispatcher seams.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::dispatcher::PropertySink;
use crate::panel::{ControlDescriptor, PropertyValue};
use crate::switch_panel::{DeviceError, FeedbackSink, Key, PanelDevice};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatched {
    pub key: Key,
    pub paths: Vec<&'static str>,
    pub value: PropertyValue,
}

#[derive(Default)]
pub struct RecordingSink {
    pub dispatched: RefCell<Vec<Dispatched>>,
}

impl RecordingSink {
    pub fn take(&self) -> Vec<Dispatched> {
        self.dispatched.take()
    }
}

impl PropertySink for RecordingSink {
    fn dispatch(&self, control: &ControlDescriptor, value: PropertyValue) {
        self.dispatched.borrow_mut().push(Dispatched {
            key: control.key,
            paths: control.paths.to_vec(),
            value,
        });
    }
}

#[derive(Default)]
pub struct RecordingFeedback {
    pub reports: Vec<Vec<u8>>,
    pub fail: bool,
}

impl FeedbackSink for RecordingFeedback {
    fn send_feature_report(&mut self, report: &[u8]) -> Result<(), DeviceError> {
        if self.fail {
            return Err(DeviceError::Usb(rusb::Error::Pipe));
        }
        self.reports.push(report.to_vec());
        Ok(())
    }
}

pub type ScriptedRead = Result<Option<Vec<u8>>, DeviceError>;

/// Device that replays a fixed sequence of reads, then reports that it went
/// away. Feature reports land in a shared log so they survive the device
/// being dropped by the bridge loop.
pub struct ScriptedDevice {
    reads: VecDeque<ScriptedRead>,
    feedback: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl ScriptedDevice {
    pub fn new(reads: Vec<ScriptedRead>, feedback: Arc<Mutex<Vec<Vec<u8>>>>) -> Self {
        Self {
            reads: reads.into(),
            feedback,
        }
    }
}

impl FeedbackSink for ScriptedDevice {
    fn send_feature_report(&mut self, report: &[u8]) -> Result<(), DeviceError> {
        self.feedback.lock().unwrap().push(report.to_vec());
        Ok(())
    }
}

impl PanelDevice for ScriptedDevice {
    fn read_report(&mut self) -> Result<Option<Vec<u8>>, DeviceError> {
        self.reads
            .pop_front()
            .unwrap_or(Err(DeviceError::Usb(rusb::Error::NoDevice)))
    }
}
