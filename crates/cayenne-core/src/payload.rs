//! Payload encoding and decoding
//!
//! ```text
//! sensor reading   temp,c=23      (or bare 23 when type/unit is _none_)
//! actuator command 9,1            (sequence,value)
//! acknowledgement  ok,9           (ok,sequence)
//! ```

use std::fmt;

use serde_json::Value;

use crate::{Error, Result, NONE_SENTINEL};

/// Largest integer an `f64` represents exactly
const MAX_EXACT_FLOAT_INT: f64 = 9_007_199_254_740_992.0;

/// A value accepted for publishing as a reading
#[derive(Debug, Clone, PartialEq)]
pub enum SensorValue {
    Text(String),
    Number(serde_json::Number),
}

impl SensorValue {
    /// Normalize a host value for the sensor path.
    ///
    /// Strings and numbers pass through, booleans become `0`/`1`,
    /// everything else is rejected.
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(SensorValue::Text(s.clone())),
            Value::Number(n) => Ok(SensorValue::Number(n.clone())),
            Value::Bool(b) => Ok(SensorValue::from(*b)),
            other => Err(Error::InvalidValueType(json_kind(other).to_string())),
        }
    }

    /// Normalize a host value for the actuator feedback path.
    ///
    /// Like [`SensorValue::from_json`], except strings must hold a base-10
    /// integer and are published as that integer.
    pub fn from_json_feedback(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(|i| SensorValue::Number(i.into()))
                .map_err(|_| Error::InvalidValueType(format!("non-integer string {:?}", s))),
            other => Self::from_json(other),
        }
    }
}

impl From<bool> for SensorValue {
    fn from(b: bool) -> Self {
        SensorValue::Number(u8::from(b).into())
    }
}

impl From<i64> for SensorValue {
    fn from(i: i64) -> Self {
        SensorValue::Number(i.into())
    }
}

impl fmt::Display for SensorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorValue::Text(s) => write!(f, "{}", s),
            SensorValue::Number(n) => match n.as_f64() {
                // whole floats print without a trailing ".0"
                Some(x)
                    if !n.is_i64()
                        && !n.is_u64()
                        && x.fract() == 0.0
                        && x.abs() < MAX_EXACT_FLOAT_INT =>
                {
                    write!(f, "{}", x as i64)
                }
                _ => write!(f, "{}", n),
            },
        }
    }
}

/// A decoded actuator command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandMessage {
    /// Opaque token echoed back in the acknowledgement
    pub sequence: String,
    pub value: i64,
    pub channel: String,
}

/// Encode a sensor reading as `datatype,dataunit=value`, or the bare value
/// when either side is `_none_`
pub fn encode_sensor_payload(datatype: &str, dataunit: &str, value: &SensorValue) -> String {
    if datatype == NONE_SENTINEL || dataunit == NONE_SENTINEL {
        value.to_string()
    } else {
        format!("{},{}={}", datatype, dataunit, value)
    }
}

/// Decode a `sequence,value` command received on `channel`
pub fn decode_command_payload(raw: &[u8], channel: &str) -> Result<CommandMessage> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| Error::DecodeFailure(format!("payload is not UTF-8: {}", e)))?;

    let mut fields = text.split(',');
    let sequence = fields.next().unwrap_or_default().trim();
    let value = fields
        .next()
        .ok_or_else(|| Error::DecodeFailure(format!("missing command value in {:?}", text)))?;

    let value = value.trim().parse::<i64>().map_err(|_| {
        Error::DecodeFailure(format!("command value {:?} is not an integer", value))
    })?;

    Ok(CommandMessage {
        sequence: sequence.to_string(),
        value,
        channel: channel.to_string(),
    })
}

/// Encode the acknowledgement for a command sequence token
pub fn encode_ack_payload(sequence: &str) -> String {
    format!("ok,{}", sequence)
}

/// Name of a JSON value's type, for diagnostics
pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Render a JSON value the way string concatenation would
pub(crate) fn plain_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => SensorValue::Number(n.clone()).to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_whole_float_display() {
        let value = SensorValue::from_json(&json!(23.0)).unwrap();
        assert_eq!(value.to_string(), "23");

        let value = SensorValue::from_json(&json!(23.5)).unwrap();
        assert_eq!(value.to_string(), "23.5");
    }

    #[test]
    fn test_plain_string() {
        assert_eq!(plain_string(&json!("dev1")), "dev1");
        assert_eq!(plain_string(&json!(7)), "7");
        assert_eq!(plain_string(&json!(true)), "true");
    }
}
