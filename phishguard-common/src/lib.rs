// PhishGuard Common - Shared URL feature schema
// This crate is no_std so the schema can be compiled into anything that
// produces or consumes the detector's feature vector.

#![no_std]

#[cfg(any(test, feature = "std"))]
extern crate std;

use core::fmt;
use core::num::IntErrorKind;

/// Version of the feature schema
/// Classifier artifacts declare the version they were trained against
pub const SCHEMA_VERSION: u32 = 1;

/// Number of features in a record
pub const FEATURE_COUNT: usize = 9;

/// How a feature is entered and validated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKind {
    /// Non-negative count, clamped into its bounds
    Count,
    /// Yes/no indicator, restricted to {0, 1}
    Flag,
}

/// Column of the input form a feature is rendered in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormGroup {
    UrlStructure,
    Additional,
}

impl FormGroup {
    /// Heading shown above the group
    pub const fn title(self) -> &'static str {
        match self {
            FormGroup::UrlStructure => "URL Structure Features",
            FormGroup::Additional => "Additional Features",
        }
    }
}

/// Declaration of a single feature column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureSpec {
    /// Column name as the classifier expects it
    pub name: &'static str,
    /// Human readable label
    pub label: &'static str,
    /// Tooltip text
    pub help: &'static str,
    pub kind: FeatureKind,
    /// Inclusive lower bound
    pub min: u32,
    /// Inclusive upper bound
    pub max: u32,
    pub default: u32,
    pub group: FormGroup,
}

impl FeatureSpec {
    /// Clamp a raw value into `[min, max]`
    pub const fn clamp(&self, raw: i64) -> u32 {
        if raw < self.min as i64 {
            self.min
        } else if raw > self.max as i64 {
            self.max
        } else {
            raw as u32
        }
    }

    /// Accept a raw value the way the input control would.
    ///
    /// Counts are clamped into bounds. Flags only admit 0 and 1.
    pub fn accept(&self, raw: i64) -> Result<u32, RecordError> {
        match self.kind {
            FeatureKind::Count => Ok(self.clamp(raw)),
            FeatureKind::Flag if raw == 0 || raw == 1 => Ok(raw as u32),
            FeatureKind::Flag => Err(RecordError::InvalidFlag {
                field: self.name,
                value: raw,
            }),
        }
    }

    pub const fn is_flag(&self) -> bool {
        matches!(self.kind, FeatureKind::Flag)
    }
}

/// The ordered feature schema.
///
/// Order is significant: it is the column order of the classifier input.
pub const FEATURE_SCHEMA: [FeatureSpec; FEATURE_COUNT] = [
    FeatureSpec {
        name: "NumDots",
        label: "Number of Dots",
        help: "Number of dots/periods in the URL",
        kind: FeatureKind::Count,
        min: 0,
        max: 20,
        default: 3,
        group: FormGroup::UrlStructure,
    },
    FeatureSpec {
        name: "UrlLength",
        label: "URL Length",
        help: "Total length of the URL in characters",
        kind: FeatureKind::Count,
        min: 0,
        max: 500,
        default: 50,
        group: FormGroup::UrlStructure,
    },
    FeatureSpec {
        name: "NumDash",
        label: "Number of Dashes",
        help: "Number of dashes/hyphens in the URL",
        kind: FeatureKind::Count,
        min: 0,
        max: 20,
        default: 0,
        group: FormGroup::UrlStructure,
    },
    FeatureSpec {
        name: "AtSymbol",
        label: "@ Symbol Present",
        help: "Whether @ symbol is present in URL (0=No, 1=Yes)",
        kind: FeatureKind::Flag,
        min: 0,
        max: 1,
        default: 0,
        group: FormGroup::UrlStructure,
    },
    FeatureSpec {
        name: "IpAddress",
        label: "Uses IP Address",
        help: "Whether URL uses IP address instead of domain (0=No, 1=Yes)",
        kind: FeatureKind::Flag,
        min: 0,
        max: 1,
        default: 0,
        group: FormGroup::UrlStructure,
    },
    FeatureSpec {
        name: "HttpsInHostname",
        label: "HTTPS in Hostname",
        help: "Whether 'https' appears in hostname (0=No, 1=Yes)",
        kind: FeatureKind::Flag,
        min: 0,
        max: 1,
        default: 0,
        group: FormGroup::Additional,
    },
    FeatureSpec {
        name: "PathLevel",
        label: "Path Level",
        help: "Depth of URL path (number of slashes)",
        kind: FeatureKind::Count,
        min: 0,
        max: 20,
        default: 3,
        group: FormGroup::Additional,
    },
    FeatureSpec {
        name: "PathLength",
        label: "Path Length",
        help: "Length of the path component in characters",
        kind: FeatureKind::Count,
        min: 0,
        max: 200,
        default: 20,
        group: FormGroup::Additional,
    },
    FeatureSpec {
        name: "NumNumericChars",
        label: "Number of Numeric Characters",
        help: "Number of numeric characters in the URL",
        kind: FeatureKind::Count,
        min: 0,
        max: 100,
        default: 5,
        group: FormGroup::Additional,
    },
];

/// The schema as a `'static` slice
pub fn schema() -> &'static [FeatureSpec; FEATURE_COUNT] {
    &FEATURE_SCHEMA
}

/// Position of a feature in the schema
pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_SCHEMA.iter().position(|spec| spec.name == name)
}

/// Column names in schema order
pub fn feature_names() -> [&'static str; FEATURE_COUNT] {
    let mut names = [""; FEATURE_COUNT];
    for (slot, spec) in names.iter_mut().zip(FEATURE_SCHEMA.iter()) {
        *slot = spec.name;
    }
    names
}

/// Errors produced while reading submitted feature values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordError {
    /// The value is not an integer
    InvalidNumber { field: &'static str },
    /// A flag field received something other than 0 or 1
    InvalidFlag { field: &'static str, value: i64 },
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::InvalidNumber { field } => {
                write!(f, "{field} must be a whole number")
            }
            RecordError::InvalidFlag { field, value } => {
                write!(f, "{field} must be 0 or 1, got {value}")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for RecordError {}

/// A complete set of feature values, always within the schema bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureRecord {
    values: [u32; FEATURE_COUNT],
}

impl FeatureRecord {
    /// Record holding every field's declared default
    pub const fn defaults() -> Self {
        let mut values = [0u32; FEATURE_COUNT];
        let mut i = 0;
        while i < FEATURE_COUNT {
            values[i] = FEATURE_SCHEMA[i].default;
            i += 1;
        }
        Self { values }
    }

    /// Record with every field at its lower bound
    pub const fn minimums() -> Self {
        let mut values = [0u32; FEATURE_COUNT];
        let mut i = 0;
        while i < FEATURE_COUNT {
            values[i] = FEATURE_SCHEMA[i].min;
            i += 1;
        }
        Self { values }
    }

    /// Record with every field at its upper bound
    pub const fn maximums() -> Self {
        let mut values = [0u32; FEATURE_COUNT];
        let mut i = 0;
        while i < FEATURE_COUNT {
            values[i] = FEATURE_SCHEMA[i].max;
            i += 1;
        }
        Self { values }
    }

    /// Values in schema order
    pub fn values(&self) -> &[u32; FEATURE_COUNT] {
        &self.values
    }

    /// Value of a named field
    pub fn get(&self, name: &str) -> Option<u32> {
        feature_index(name).map(|i| self.values[i])
    }

    /// Fields paired with their specs, in schema order
    pub fn iter(&self) -> impl Iterator<Item = (&'static FeatureSpec, u32)> + '_ {
        schema().iter().zip(self.values.iter().copied())
    }

    /// Copy of this record with one field replaced.
    ///
    /// Unknown field names leave the record unchanged.
    pub fn with_value(mut self, name: &str, raw: i64) -> Result<Self, RecordError> {
        if let Some(i) = feature_index(name) {
            self.values[i] = FEATURE_SCHEMA[i].accept(raw)?;
        }
        Ok(self)
    }

    /// Build a record from submitted `(name, value)` text pairs.
    ///
    /// Missing fields keep their defaults and unknown names are ignored.
    pub fn from_fields<'a, I>(fields: I) -> Result<Self, RecordError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut record = Self::defaults();
        for (name, raw) in fields {
            let Some(i) = feature_index(name) else {
                continue;
            };
            let spec = &FEATURE_SCHEMA[i];
            // out-of-range whole numbers saturate and are clamped below
            let value = match raw.trim().parse::<i64>() {
                Ok(value) => value,
                Err(e) => match e.kind() {
                    IntErrorKind::PosOverflow => i64::MAX,
                    IntErrorKind::NegOverflow => i64::MIN,
                    _ => return Err(RecordError::InvalidNumber { field: spec.name }),
                },
            };
            record.values[i] = spec.accept(value)?;
        }
        Ok(record)
    }
}

impl Default for FeatureRecord {
    fn default() -> Self {
        Self::defaults()
    }
}
