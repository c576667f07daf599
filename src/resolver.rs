use crate::panel::{ControlDescriptor, ControlKind, PropertyValue};
use crate::switch_panel::{ActiveSet, Key};

/// What to do about one control whose key just flipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Send `value` to every path of the control, then write `feedback` to the
    /// device if present.
    Dispatch {
        value: PropertyValue,
        feedback: Option<&'static [u8]>,
    },
    /// A selector position was left because another one was entered. The
    /// newly entered position carries the update.
    Released,
    /// A selector key that is not one of the selector's positions.
    UnknownPosition(Key),
    /// Neither side of a two-position lever is active.
    Indeterminate,
}

/// Work out the property value for `control` given the keys that are
/// currently active.
pub fn resolve(control: &ControlDescriptor, active: &ActiveSet) -> Resolution {
    let on = active.contains(&control.key);

    match control.kind {
        ControlKind::Selector(selector) => {
            if !on {
                return Resolution::Released;
            }
            match selector.position_of(control.key) {
                Some(position) => Resolution::Dispatch {
                    value: PropertyValue::Int(position as i64),
                    feedback: None,
                },
                None => Resolution::UnknownPosition(control.key),
            }
        }
        ControlKind::Bistable(lever) => {
            if active.contains(&lever.on_key) {
                Resolution::Dispatch {
                    value: lever.on_value,
                    feedback: Some(lever.on_feedback),
                }
            } else if active.contains(&lever.off_key) {
                Resolution::Dispatch {
                    value: lever.off_value,
                    feedback: Some(lever.off_feedback),
                }
            } else {
                Resolution::Indeterminate
            }
        }
        ControlKind::IntegerToggle => Resolution::Dispatch {
            value: PropertyValue::Int(i64::from(on)),
            feedback: None,
        },
        ControlKind::Toggle => Resolution::Dispatch {
            value: PropertyValue::Bool(on),
            feedback: None,
        },
    }
}
