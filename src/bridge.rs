use std::thread;
use std::time::Duration;

use tracing::{error, info, trace, warn};

use crate::config::ReconnectSettings;
use crate::dispatcher::PropertySink;
use crate::session::PanelSession;
use crate::switch_panel::{DeviceError, PanelDevice};

/// What to do when the panel stops answering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl ReconnectPolicy {
    /// Delay before the attempt that follows one which waited `current`.
    pub fn next_delay(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max_delay)
    }

    fn exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }
}

impl From<&ReconnectSettings> for ReconnectPolicy {
    fn from(settings: &ReconnectSettings) -> Self {
        Self {
            initial_delay: Duration::from_millis(settings.initial_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
            max_attempts: settings.max_attempts,
        }
    }
}

/// Feed every report from the panel through `session`.
///
/// Only returns when the device failed and could not be reopened within
/// `policy`; the error is the last one seen.
pub fn run<D, C>(
    device: D,
    mut connect: C,
    session: &mut PanelSession,
    sink: &dyn PropertySink,
    policy: &ReconnectPolicy,
) -> Result<(), DeviceError>
where
    D: PanelDevice,
    C: FnMut() -> Result<D, DeviceError>,
{
    let mut device = device;
    loop {
        let err = serve(&mut device, session, sink);
        error!(error = %err, "switch panel I/O error");

        // Switches may move while the panel is away.
        session.reset();

        device = reconnect(&mut connect, policy, err)?;
    }
}

fn serve<D: PanelDevice>(
    device: &mut D,
    session: &mut PanelSession,
    sink: &dyn PropertySink,
) -> DeviceError {
    loop {
        match device.read_report() {
            Ok(Some(report)) => {
                session.handle_report(&report, sink, device);
            }
            Ok(None) => trace!("no report before read timeout"),
            Err(err) => return err,
        }
    }
}

fn reconnect<D, C>(
    connect: &mut C,
    policy: &ReconnectPolicy,
    cause: DeviceError,
) -> Result<D, DeviceError>
where
    C: FnMut() -> Result<D, DeviceError>,
{
    if policy.exhausted(0) {
        return Err(cause);
    }

    let mut delay = policy.initial_delay;
    let mut attempts = 0;
    loop {
        thread::sleep(delay);
        attempts += 1;

        match connect() {
            Ok(device) => {
                info!(attempts, "switch panel reconnected");
                return Ok(device);
            }
            Err(err) => {
                warn!(attempts, error = %err, "switch panel reconnect failed");
                if policy.exhausted(attempts) {
                    return Err(err);
                }
                delay = policy.next_delay(delay);
            }
        }
    }
}
