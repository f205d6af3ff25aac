use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

// ==============================================================================
// facets
// ==============================================================================

/// gps position of the bin
///
/// both fields start out unset and are always replaced together, so the
/// pair is either fully null or fully populated. numbers keep the form the
/// sender used (40 stays 40, 12.5 stays 12.5).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: Option<Number>,
    pub longitude: Option<Number>,
}

impl Coordinates {
    pub fn new(latitude: Number, longitude: Number) -> Self {
        Self {
            latitude: Some(latitude),
            longitude: Some(longitude),
        }
    }
}

/// fill percentage per compartment
///
/// nominally numbers in 0-100, but whatever the sensor reports is stored
/// and served back untouched: no clamping, no type check.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinFill {
    pub wet_bin: Value,
    pub dry_bin: Value,
    pub metal_bin: Value,
}

impl Default for BinFill {
    fn default() -> Self {
        Self {
            wet_bin: Value::from(0),
            dry_bin: Value::from(0),
            metal_bin: Value::from(0),
        }
    }
}

/// everything the relay currently knows, as returned by GET /latest-data
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// last classifier output (e.g. "metal detected")
    pub message: String,
    pub coordinates: Coordinates,
    pub bin_fill: BinFill,
}

// ==============================================================================
// request payloads
// ==============================================================================
// every field is optional at the decode layer; the handlers decide what
// "missing" means for their facet.

#[derive(Debug, Default, Deserialize)]
pub struct WastePayload {
    #[serde(default)]
    pub message: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CoordinatesPayload {
    #[serde(default)]
    pub latitude: Option<Number>,
    #[serde(default)]
    pub longitude: Option<Number>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinFillPayload {
    #[serde(default)]
    pub wet_bin: Option<Value>,
    #[serde(default)]
    pub dry_bin: Option<Value>,
    #[serde(default)]
    pub metal_bin: Option<Value>,
}

impl From<BinFillPayload> for BinFill {
    /// omitted (or null) compartments become zero, nothing is merged with
    /// the old value
    fn from(p: BinFillPayload) -> Self {
        let level = |v: Option<Value>| match v {
            None | Some(Value::Null) => Value::from(0),
            Some(v) => v,
        };
        Self {
            wet_bin: level(p.wet_bin),
            dry_bin: level(p.dry_bin),
            metal_bin: level(p.metal_bin),
        }
    }
}

// ==============================================================================
// responses
// ==============================================================================

/// acknowledgement body shared by all ingestion endpoints
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Ack {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Ack {
    pub fn ok() -> Self {
        Self { success: true, error: None }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}
