use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::switch_panel::leds::{GEAR_DOWN_REPORT, GEAR_UP_REPORT};
use crate::switch_panel::Key;

/// Value written to a simulator property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
}

impl PropertyValue {
    /// Whether the value reads as "switched on".
    pub fn is_on(self) -> bool {
        match self {
            PropertyValue::Bool(on) => on,
            PropertyValue::Int(value) => value != 0,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Bool(value) => write!(f, "{value}"),
            PropertyValue::Int(value) => write!(f, "{value}"),
        }
    }
}

/// Positions of a rotary switch. Exactly one position key is active at a
/// time; the property value is the position's index in `positions`.
#[derive(Debug, PartialEq, Eq)]
pub struct Selector {
    pub positions: &'static [Key],
}

impl Selector {
    pub fn position_of(&self, key: Key) -> Option<usize> {
        self.positions.iter().position(|&position| position == key)
    }
}

/// Two-position lever whose state is mirrored on the panel LEDs.
#[derive(Debug, PartialEq, Eq)]
pub struct Bistable {
    pub on_key: Key,
    pub off_key: Key,
    pub on_value: PropertyValue,
    pub off_value: PropertyValue,
    pub on_feedback: &'static [u8],
    pub off_feedback: &'static [u8],
}

/// How a control's physical state becomes a property value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    /// `true` while the switch is on.
    Toggle,
    /// `1` while the switch is on, `0` otherwise.
    IntegerToggle,
    Selector(&'static Selector),
    Bistable(&'static Bistable),
}

/// One physical switch position and the properties it drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlDescriptor {
    pub name: &'static str,
    pub paths: &'static [&'static str],
    pub key: Key,
    pub kind: ControlKind,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PanelError {
    #[error("key {key} is assigned to both {first} and {second}")]
    DuplicateKey {
        key: Key,
        first: &'static str,
        second: &'static str,
    },
    #[error("{name} (key {key}) has no property paths")]
    NoPaths { name: &'static str, key: Key },
}

/// Fixed key → control table for one panel.
#[derive(Debug, Clone)]
pub struct PanelDefinition {
    controls: Vec<ControlDescriptor>,
    by_key: BTreeMap<Key, usize>,
}

impl PanelDefinition {
    pub fn new(controls: Vec<ControlDescriptor>) -> Result<Self, PanelError> {
        let mut by_key = BTreeMap::new();
        for (index, control) in controls.iter().enumerate() {
            if control.paths.is_empty() {
                return Err(PanelError::NoPaths {
                    name: control.name,
                    key: control.key,
                });
            }
            if let Some(&existing) = by_key.get(&control.key) {
                let first: &ControlDescriptor = &controls[existing];
                return Err(PanelError::DuplicateKey {
                    key: control.key,
                    first: first.name,
                    second: control.name,
                });
            }
            by_key.insert(control.key, index);
        }
        Ok(Self { controls, by_key })
    }

    /// Layout of the Saitek Pro Flight Switch Panel.
    pub fn switch_panel() -> Result<Self, PanelError> {
        Self::new(SWITCH_PANEL.to_vec())
    }

    pub fn lookup(&self, key: Key) -> Option<&ControlDescriptor> {
        self.by_key.get(&key).map(|&index| &self.controls[index])
    }

    /// Controls in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &ControlDescriptor> {
        self.controls.iter()
    }
}

const MAGNETOS: &[&str] = &["/json/controls/switches/magnetos"];
const GEAR_DOWN: &[&str] = &["/json/controls/gear/gear-down"];

const MAGNETO_OFF: Key = 13;
const MAGNETO_LEFT: Key = 15;
const MAGNETO_RIGHT: Key = 14;
const MAGNETO_BOTH: Key = 0;
const GEAR_UP_KEY: Key = 2;
const GEAR_DOWN_KEY: Key = 3;

static MAGNETO: Selector = Selector {
    positions: &[MAGNETO_OFF, MAGNETO_LEFT, MAGNETO_RIGHT, MAGNETO_BOTH],
};

static GEAR: Bistable = Bistable {
    on_key: GEAR_DOWN_KEY,
    off_key: GEAR_UP_KEY,
    on_value: PropertyValue::Bool(true),
    off_value: PropertyValue::Bool(false),
    on_feedback: &GEAR_DOWN_REPORT,
    off_feedback: &GEAR_UP_REPORT,
};

const fn control(
    name: &'static str,
    paths: &'static [&'static str],
    key: Key,
    kind: ControlKind,
) -> ControlDescriptor {
    ControlDescriptor {
        name,
        paths,
        key,
        kind,
    }
}

static SWITCH_PANEL: [ControlDescriptor; 20] = [
    control("Magneto", MAGNETOS, MAGNETO_OFF, ControlKind::Selector(&MAGNETO)),
    control("Magneto", MAGNETOS, MAGNETO_LEFT, ControlKind::Selector(&MAGNETO)),
    control("Magneto", MAGNETOS, MAGNETO_RIGHT, ControlKind::Selector(&MAGNETO)),
    control("Magneto", MAGNETOS, MAGNETO_BOTH, ControlKind::Selector(&MAGNETO)),
    control("Starter", &["/json/controls/switches/starter"], 1, ControlKind::Toggle),
    control("Gear", GEAR_DOWN, GEAR_UP_KEY, ControlKind::Bistable(&GEAR)),
    control("Gear", GEAR_DOWN, GEAR_DOWN_KEY, ControlKind::Bistable(&GEAR)),
    control("Master Battery", &["/json/controls/switches/master-bat"], 16, ControlKind::Toggle),
    control("Master Alt", &["/json/controls/switches/master-alt"], 17, ControlKind::Toggle),
    control(
        "Master Avionics",
        &["/json/controls/switches/master-avionics"],
        18,
        ControlKind::Toggle,
    ),
    control("Fuel Pump", &["/json/controls/engines/engine/fuel-pump"], 19, ControlKind::Toggle),
    control(
        "De-Ice",
        &[
            "/json/controls/anti-ice/window-heat",
            "/json/controls/anti-ice/wing-heat",
            "/json/controls/anti-ice/engine/carb-heat",
            "/json/controls/anti-ice/engine/inlet-heat",
        ],
        20,
        ControlKind::Toggle,
    ),
    control("Pitot Heat", &["/json/controls/anti-ice/pitot-heat"], 21, ControlKind::Toggle),
    control(
        "Cowl",
        &["/json/controls/engines/engine/cowl-flaps-norm"],
        22,
        ControlKind::IntegerToggle,
    ),
    control(
        "Dashboard Light",
        &[
            "/json/controls/lighting/panel-norm",
            "/json/controls/lighting/radio-norm",
        ],
        23,
        ControlKind::IntegerToggle,
    ),
    control("Beacon Light", &["/json/controls/lighting/beacon"], 8, ControlKind::Toggle),
    control("Nav Light", &["/json/controls/lighting/nav-lights"], 9, ControlKind::Toggle),
    control("Strobe Light", &["/json/controls/lighting/strobe"], 10, ControlKind::Toggle),
    control("Taxi Light", &["/json/controls/lighting/taxi-light"], 11, ControlKind::Toggle),
    control(
        "Landing Light",
        &["/json/controls/lighting/landing-lights"],
        12,
        ControlKind::Toggle,
    ),
];
