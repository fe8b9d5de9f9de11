use std::fmt;

use serde::{Deserialize, Serialize};

/// Temperature stored as Fahrenheit internally, the controller's native unit.
/// The controller only accepts whole degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Temperature(f64);

impl Temperature {
    pub fn from_fahrenheit(f: f64) -> Self {
        Self(f)
    }

    pub fn from_celsius(c: f64) -> Self {
        Self(c * (9.0 / 5.0) + 32.0)
    }

    pub fn fahrenheit(&self) -> f64 {
        self.0
    }

    pub fn celsius(&self) -> f64 {
        (self.0 - 32.0) * (5.0 / 9.0)
    }

    /// Round to controller precision (whole degrees F).
    pub fn to_wire(&self) -> i32 {
        self.0.round() as i32
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.0}\u{00b0}F", self.0)
    }
}

/// A temperature difference. Unlike [`Temperature`] there is no 32 degree
/// offset between the scales.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureDelta(f64);

impl TemperatureDelta {
    pub fn from_fahrenheit(f: f64) -> Self {
        Self(f)
    }

    pub fn from_celsius(c: f64) -> Self {
        Self(c * (9.0 / 5.0))
    }

    pub fn fahrenheit(&self) -> f64 {
        self.0
    }

    pub fn celsius(&self) -> f64 {
        self.0 * (5.0 / 9.0)
    }

    pub fn to_wire(&self) -> i32 {
        self.0.round() as i32
    }
}

impl fmt::Display for TemperatureDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\u{0394}{:.0}\u{00b0}F", self.0)
    }
}

/// An optional controller feature: either disabled or enabled with a value.
/// On the wire a disabled feature is the string `"off"`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Setting<T> {
    Off,
    On(T),
}

impl<T> Setting<T> {
    pub fn is_on(&self) -> bool {
        matches!(self, Setting::On(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Setting::On(v) => Some(v),
            Setting::Off => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Setting<U> {
        match self {
            Setting::On(v) => Setting::On(f(v)),
            Setting::Off => Setting::Off,
        }
    }
}

impl<T> From<T> for Setting<T> {
    fn from(v: T) -> Self {
        Setting::On(v)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HvacModePriority {
    Heat,
    Cool,
    Auto,
}

impl HvacModePriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            HvacModePriority::Heat => "heat",
            HvacModePriority::Cool => "cool",
            HvacModePriority::Auto => "auto",
        }
    }

    pub fn from_str_lossy(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "heat" => Some(HvacModePriority::Heat),
            "cool" => Some(HvacModePriority::Cool),
            "auto" => Some(HvacModePriority::Auto),
            _ => None,
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            HvacModePriority::Heat => 0,
            HvacModePriority::Cool => 1,
            HvacModePriority::Auto => 2,
        }
    }

    /// Unknown codes fall back to auto, as the controller app does.
    pub fn from_code(code: u64) -> Self {
        match code {
            0 => HvacModePriority::Heat,
            1 => HvacModePriority::Cool,
            _ => HvacModePriority::Auto,
        }
    }
}

/// Runtime state of one heat-pump stage or of the backup heater.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageState {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub activated: Option<bool>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default, rename = "runTime")]
    pub run_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// One value in a device snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Bool(bool),
    Number(f64),
    Text(String),
    /// The feature exists on the device but is disabled.
    Off,
    Temperature(Temperature),
    Delta(TemperatureDelta),
    Stages(Vec<StageState>),
    Backup(StageState),
}

impl ParamValue {
    pub fn is_off(&self) -> bool {
        matches!(self, ParamValue::Off)
    }

    /// Numeric reading in the controller's native unit, if there is one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Number(n) => Some(*n),
            ParamValue::Temperature(t) => Some(t.fahrenheit()),
            ParamValue::Delta(d) => Some(d.fahrenheit()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<Setting<Temperature>> for ParamValue {
    fn from(s: Setting<Temperature>) -> Self {
        match s {
            Setting::On(t) => ParamValue::Temperature(t),
            Setting::Off => ParamValue::Off,
        }
    }
}

impl From<Setting<TemperatureDelta>> for ParamValue {
    fn from(s: Setting<TemperatureDelta>) -> Self {
        match s {
            Setting::On(d) => ParamValue::Delta(d),
            Setting::Off => ParamValue::Off,
        }
    }
}

impl From<Setting<u32>> for ParamValue {
    fn from(s: Setting<u32>) -> Self {
        match s {
            Setting::On(n) => ParamValue::Number(f64::from(n)),
            Setting::Off => ParamValue::Off,
        }
    }
}
