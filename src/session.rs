use tracing::{debug, error, info, trace, warn};

use crate::dispatcher::PropertySink;
use crate::panel::PanelDefinition;
use crate::resolver::{resolve, Resolution};
use crate::switch_panel::{decode, diff, ActiveSet, ChangeSet, FeedbackSink};

/// Switch state carried from one report to the next.
pub struct PanelSession {
    panel: PanelDefinition,
    previous: ActiveSet,
}

impl PanelSession {
    pub fn new(panel: PanelDefinition) -> Self {
        Self {
            panel,
            previous: ActiveSet::new(),
        }
    }

    /// Keys that were active in the last handled report.
    #[cfg(test)]
    pub fn previous(&self) -> &ActiveSet {
        &self.previous
    }

    /// Forget the last report, so the next one re-sends every active switch.
    pub fn reset(&mut self) {
        self.previous.clear();
    }

    /// Process one input report and return the keys that flipped.
    ///
    /// The stored state is replaced before anything is dispatched, so a slow
    /// or failing dispatch never affects how the next report is diffed.
    pub fn handle_report(
        &mut self,
        report: &[u8],
        sink: &dyn PropertySink,
        feedback: &mut dyn FeedbackSink,
    ) -> ChangeSet {
        let current = decode(report);
        info!(switches = ?current, "report received");
        debug!(previous = ?self.previous, "previous switch status");

        let changes = diff(&current, &self.previous);
        self.previous = current;
        let active = &self.previous;

        for &key in &changes {
            if self.panel.lookup(key).is_none() {
                trace!(key, "no control mapped to key");
            }
        }

        for control in self.panel.iter().filter(|c| changes.contains(&c.key)) {
            debug!(key = control.key, "{} switched", control.name);

            match resolve(control, active) {
                Resolution::Dispatch { value, feedback: leds } => {
                    sink.dispatch(control, value);
                    if let Some(report) = leds {
                        if let Err(err) = feedback.send_feature_report(report) {
                            error!(key = control.key, error = %err, "failed to update panel LEDs");
                        }
                    }
                }
                Resolution::Released => {
                    debug!(key = control.key, "{} position released", control.name);
                }
                Resolution::UnknownPosition(key) => {
                    warn!(
                        key,
                        "state of physical {} changed, but could not change virtual state",
                        control.name
                    );
                }
                Resolution::Indeterminate => {
                    debug!(key = control.key, "{} is between positions", control.name);
                }
            }
        }

        changes
    }
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;
    use crate::panel::{ControlDescriptor, ControlKind, PropertyValue, Selector};
    use crate::switch_panel::leds::GEAR_DOWN_REPORT;
    use crate::switch_panel::Key;
    use crate::testing::{Dispatched, RecordingFeedback, RecordingSink};

    fn session() -> PanelSession {
        PanelSession::new(PanelDefinition::switch_panel().unwrap())
    }

    fn keys(keys: &[Key]) -> ActiveSet {
        keys.iter().copied().collect()
    }

    fn dispatched(key: Key, paths: &[&'static str], value: PropertyValue) -> Dispatched {
        Dispatched {
            key,
            paths: paths.to_vec(),
            value,
        }
    }

    #[test]
    fn first_report_syncs_magneto_off() {
        let mut session = session();
        let sink = RecordingSink::default();
        let mut leds = RecordingFeedback::default();

        let changes = session.handle_report(&[0x00, 0x20, 0x00], &sink, &mut leds);

        assert_eq!(changes, keys(&[13]));
        assert_eq!(
            sink.take(),
            vec![dispatched(
                13,
                &["/json/controls/switches/magnetos"],
                PropertyValue::Int(0)
            )]
        );
        assert!(leds.reports.is_empty());
    }

    #[test]
    fn magneto_turn_dispatches_only_the_new_position() {
        let mut session = session();
        let sink = RecordingSink::default();
        let mut leds = RecordingFeedback::default();

        session.handle_report(&[0x00, 0x80, 0x00], &sink, &mut leds);
        assert_eq!(sink.take()[0].value, PropertyValue::Int(1));

        let changes = session.handle_report(&[0x00, 0x40, 0x00], &sink, &mut leds);
        assert_eq!(changes, keys(&[14, 15]));
        assert_eq!(
            sink.take(),
            vec![dispatched(
                14,
                &["/json/controls/switches/magnetos"],
                PropertyValue::Int(2)
            )]
        );
    }

    #[test]
    fn gear_down_updates_property_and_leds() {
        let mut session = session();
        let sink = RecordingSink::default();
        let mut leds = RecordingFeedback::default();

        session.handle_report(&[0x00, 0x00, 0x04], &sink, &mut leds);
        sink.take();
        leds.reports.clear();

        let changes = session.handle_report(&[0x00, 0x00, 0x08], &sink, &mut leds);
        assert_eq!(changes, keys(&[2, 3]));

        // Both gear keys flipped; each resolves to the lever's current side.
        let gear = dispatched(
            3,
            &["/json/controls/gear/gear-down"],
            PropertyValue::Bool(true),
        );
        let sent = sink.take();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|d| d.value == gear.value && d.paths == gear.paths));
        assert_eq!(leds.reports, vec![GEAR_DOWN_REPORT.to_vec(); 2]);
        assert_eq!(leds.reports[0], vec![0x00, 0x01 | 0x02 | 0x04]);
    }

    #[test]
    fn gear_up_lights_red() {
        let mut session = session();
        let sink = RecordingSink::default();
        let mut leds = RecordingFeedback::default();

        session.handle_report(&[0x00, 0x00, 0x04], &sink, &mut leds);

        assert_eq!(
            sink.take(),
            vec![dispatched(
                2,
                &["/json/controls/gear/gear-down"],
                PropertyValue::Bool(false)
            )]
        );
        assert_eq!(leds.reports, vec![vec![0x00, 0x08 | 0x10 | 0x20]]);
    }

    #[test]
    fn de_ice_is_one_dispatch_covering_all_paths() {
        let mut session = session();
        let sink = RecordingSink::default();
        let mut leds = RecordingFeedback::default();

        session.handle_report(&[0x10, 0x00, 0x00], &sink, &mut leds);

        let sent = sink.take();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].paths.len(), 4);
        assert_eq!(sent[0].value, PropertyValue::Bool(true));
    }

    #[test]
    fn switching_off_sends_off_values() {
        let mut session = session();
        let sink = RecordingSink::default();
        let mut leds = RecordingFeedback::default();

        // Cowl (22) and strobe (10) on, then both off.
        session.handle_report(&[0x40, 0x04, 0x00], &sink, &mut leds);
        sink.take();
        session.handle_report(&[0x00, 0x00, 0x00], &sink, &mut leds);

        let sent = sink.take();
        let values: Vec<_> = sent.iter().map(|d| (d.key, d.value)).collect();
        assert_eq!(
            values,
            vec![(22, PropertyValue::Int(0)), (10, PropertyValue::Bool(false))]
        );
    }

    #[test]
    fn controls_are_processed_in_table_order() {
        let mut session = session();
        let sink = RecordingSink::default();
        let mut leds = RecordingFeedback::default();

        // Landing light (12), master battery (16), starter (1).
        session.handle_report(&[0x01, 0x10, 0x02], &sink, &mut leds);

        let order: Vec<_> = sink.take().iter().map(|d| d.key).collect();
        assert_eq!(order, vec![1, 16, 12]);
    }

    #[test]
    fn previous_state_tracks_the_latest_report() {
        let mut session = session();
        let sink = RecordingSink::default();
        let mut leds = RecordingFeedback {
            fail: true,
            ..Default::default()
        };

        session.handle_report(&[0x00, 0x20, 0x08], &sink, &mut leds);
        session.handle_report(&[0x01, 0x40, 0x04], &sink, &mut leds);

        assert_eq!(session.previous(), &decode(&[0x01, 0x40, 0x04]));
    }

    #[test]
    fn failed_led_write_does_not_stop_other_controls() {
        let mut session = session();
        let sink = RecordingSink::default();
        let mut leds = RecordingFeedback {
            fail: true,
            ..Default::default()
        };

        // Gear down (3) and beacon (8).
        session.handle_report(&[0x00, 0x01, 0x08], &sink, &mut leds);

        let order: Vec<_> = sink.take().iter().map(|d| d.key).collect();
        assert_eq!(order, vec![3, 8]);
    }

    #[test]
    fn reset_resends_active_switches() {
        let mut session = session();
        let sink = RecordingSink::default();
        let mut leds = RecordingFeedback::default();

        session.handle_report(&[0x01, 0x00, 0x00], &sink, &mut leds);
        assert_eq!(sink.take().len(), 1);
        assert!(session.handle_report(&[0x01, 0x00, 0x00], &sink, &mut leds).is_empty());
        assert!(sink.take().is_empty());

        session.reset();
        session.handle_report(&[0x01, 0x00, 0x00], &sink, &mut leds);
        assert_eq!(sink.take().len(), 1);
    }

    #[test]
    fn unmapped_keys_are_ignored() {
        let mut session = session();
        let sink = RecordingSink::default();
        let mut leds = RecordingFeedback::default();

        let changes = session.handle_report(&[0x00, 0x00, 0xF0], &sink, &mut leds);
        assert_eq!(changes, keys(&[4, 5, 6, 7]));
        assert!(sink.take().is_empty());
    }

    #[traced_test]
    #[test]
    fn unknown_selector_position_warns_and_continues() {
        static MODE: Selector = Selector { positions: &[0] };
        let panel = PanelDefinition::new(vec![
            ControlDescriptor {
                name: "Mode",
                paths: &["/json/mode"],
                key: 1,
                kind: ControlKind::Selector(&MODE),
            },
            ControlDescriptor {
                name: "Starter",
                paths: &["/json/controls/switches/starter"],
                key: 2,
                kind: ControlKind::Toggle,
            },
        ])
        .unwrap();
        let mut session = PanelSession::new(panel);
        let sink = RecordingSink::default();
        let mut leds = RecordingFeedback::default();

        session.handle_report(&[0x06], &sink, &mut leds);

        let order: Vec<_> = sink.take().iter().map(|d| d.key).collect();
        assert_eq!(order, vec![2]);
        assert!(logs_contain("could not change virtual state"));
    }
}
