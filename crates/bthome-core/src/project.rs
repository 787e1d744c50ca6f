//! Projection of decoded measurements onto output state and events.
//!
//! Everything here is driven by the catalog's semantic kind; there is no
//! per-object-id branching. Numeric kinds become unit-attached quantities
//! when their unit resolves, binary kinds become on/off or open/closed
//! states depending on declared physical semantics, event kinds fire
//! triggers instead of holding state.

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use time::{OffsetDateTime, UtcOffset};
use tracing::warn;

use bthome_types::catalog::Kind;
use bthome_types::{Measurement, Value};

/// Resolves unit symbols against whatever unit system the host uses.
///
/// Returning `None` for a symbol is not an error: the projector falls back
/// to a dimensionless numeric value rather than failing the update.
pub trait UnitResolver {
    /// Resolve a unit symbol to the host's canonical unit label.
    fn resolve(&self, symbol: &str) -> Option<String>;
}

/// Resolver accepting every unit symbol the catalog declares.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardUnits;

impl UnitResolver for StandardUnits {
    fn resolve(&self, symbol: &str) -> Option<String> {
        const KNOWN: &[&str] = &[
            "%", "°C", "hPa", "lx", "kg", "lb", "kWh", "W", "V", "µg/m³", "ppm", "°", "mm", "m",
            "s", "A", "m/s", "L", "mL", "m³/h", "m³", "m/s²", "°/s",
        ];
        KNOWN.contains(&symbol).then(|| symbol.to_owned())
    }
}

/// A projected output state value.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputValue {
    /// Numeric value with a resolved unit.
    Quantity {
        /// Scaled numeric value.
        value: f64,
        /// Resolved unit label.
        unit: String,
    },
    /// Dimensionless numeric value (no unit declared, or unresolvable).
    Decimal(f64),
    /// Switch state.
    OnOff(bool),
    /// Contact state, `true` meaning open.
    OpenClosed(bool),
    /// Calendar/time value in the local zone.
    DateTime(OffsetDateTime),
    /// Text, either decoded verbatim or the base64 form of raw bytes.
    Text(String),
}

impl fmt::Display for OutputValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputValue::Quantity { value, unit } => write!(f, "{value} {unit}"),
            OutputValue::Decimal(value) => write!(f, "{value}"),
            OutputValue::OnOff(true) => write!(f, "ON"),
            OutputValue::OnOff(false) => write!(f, "OFF"),
            OutputValue::OpenClosed(true) => write!(f, "OPEN"),
            OutputValue::OpenClosed(false) => write!(f, "CLOSED"),
            OutputValue::DateTime(ts) => write!(f, "{ts}"),
            OutputValue::Text(text) => write!(f, "{text}"),
        }
    }
}

/// What a single measurement projects to.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// A persisted state update.
    State(OutputValue),
    /// A fired event with its label.
    Trigger(String),
}

/// Project one measurement, or `None` when it has no output mapping
/// (device properties, unknown ids).
#[must_use]
pub fn project(measurement: &Measurement, units: &dyn UnitResolver) -> Option<Projection> {
    let entry = measurement.entry()?;

    let projection = match (&measurement.value, entry.kind) {
        (Value::Numeric(value), Kind::Numeric) => {
            Projection::State(numeric_state(*value, entry.unit, units))
        }
        (Value::Boolean(state), Kind::Binary { contact: true }) => {
            Projection::State(OutputValue::OpenClosed(*state))
        }
        (Value::Boolean(state), Kind::Binary { contact: false }) => {
            Projection::State(OutputValue::OnOff(*state))
        }
        (value @ Value::Event { .. }, Kind::Event { .. }) => Projection::Trigger(value.to_string()),
        (Value::Timestamp(epoch), Kind::Timestamp) => {
            let utc = OffsetDateTime::from_unix_timestamp(*epoch).ok()?;
            let local = utc.to_offset(UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC));
            Projection::State(OutputValue::DateTime(local))
        }
        (Value::Text(text), Kind::Text) => Projection::State(OutputValue::Text(text.clone())),
        (Value::Raw(bytes), Kind::Raw) => {
            Projection::State(OutputValue::Text(STANDARD.encode(bytes)))
        }
        _ => return None,
    };

    Some(projection)
}

fn numeric_state(value: f64, unit: Option<&str>, units: &dyn UnitResolver) -> OutputValue {
    match unit {
        Some(symbol) => match units.resolve(symbol) {
            Some(unit) => OutputValue::Quantity { value, unit },
            None => {
                warn!(unit = symbol, value, "unit not resolvable, falling back to plain decimal");
                OutputValue::Decimal(value)
            }
        },
        None => OutputValue::Decimal(value),
    }
}
