//! Sensor, command and acknowledgement payload tests

use cayenne_core::payload::{decode_command_payload, encode_ack_payload, encode_sensor_payload};
use cayenne_core::{Error, SensorValue, NONE_SENTINEL};
use serde_json::json;

#[test]
fn test_encode_typed_reading() {
    let value = SensorValue::from_json(&json!(23)).unwrap();
    assert_eq!(encode_sensor_payload("temp", "c", &value), "temp,c=23");
}

#[test]
fn test_encode_bare_when_either_side_is_none() {
    let value = SensorValue::from_json(&json!(23)).unwrap();

    assert_eq!(encode_sensor_payload(NONE_SENTINEL, "c", &value), "23");
    assert_eq!(encode_sensor_payload("temp", NONE_SENTINEL, &value), "23");
    assert_eq!(encode_sensor_payload(NONE_SENTINEL, NONE_SENTINEL, &value), "23");
}

#[test]
fn test_encode_typed_shape() {
    let values = [json!(1), json!(-4.25), json!("on"), json!(true)];

    for v in values {
        let value = SensorValue::from_json(&v).unwrap();
        let payload = encode_sensor_payload("rel_hum", "p", &value);

        assert_eq!(payload.matches('=').count(), 1);
        assert!(payload.starts_with("rel_hum,p="));
    }
}

#[test]
fn test_sensor_value_normalization() {
    assert_eq!(
        SensorValue::from_json(&json!("12.5")).unwrap(),
        SensorValue::Text("12.5".to_string())
    );
    assert_eq!(SensorValue::from_json(&json!(false)).unwrap().to_string(), "0");
    assert_eq!(SensorValue::from_json(&json!(true)).unwrap().to_string(), "1");
    assert_eq!(SensorValue::from_json(&json!(-3)).unwrap().to_string(), "-3");
}

#[test]
fn test_sensor_value_rejects_structures() {
    for v in [json!({"a": 1}), json!([1, 2]), json!(null)] {
        assert!(matches!(
            SensorValue::from_json(&v),
            Err(Error::InvalidValueType(_))
        ));
    }
}

#[test]
fn test_feedback_value_parses_integer_strings() {
    assert_eq!(
        SensorValue::from_json_feedback(&json!("42")).unwrap(),
        SensorValue::from(42_i64)
    );
    assert_eq!(
        SensorValue::from_json_feedback(&json!(true)).unwrap(),
        SensorValue::from(1_i64)
    );
    assert!(matches!(
        SensorValue::from_json_feedback(&json!("on")),
        Err(Error::InvalidValueType(_))
    ));
    assert!(matches!(
        SensorValue::from_json_feedback(&json!({"v": 1})),
        Err(Error::InvalidValueType(_))
    ));
}

#[test]
fn test_decode_command() {
    let command = decode_command_payload(b"42,7", "3").unwrap();
    assert_eq!(command.sequence, "42");
    assert_eq!(command.value, 7);
    assert_eq!(command.channel, "3");
}

#[test]
fn test_decode_command_ignores_extra_fields() {
    let command = decode_command_payload(b"abc-1, 0 ,junk", "1").unwrap();
    assert_eq!(command.sequence, "abc-1");
    assert_eq!(command.value, 0);
}

#[test]
fn test_decode_command_rejects_malformed_value() {
    for raw in [&b"5,true"[..], b"9", b"9,abc", b"9,", b"9,1.5"] {
        assert!(
            matches!(
                decode_command_payload(raw, "1"),
                Err(Error::DecodeFailure(_))
            ),
            "payload {:?} should not decode",
            String::from_utf8_lossy(raw)
        );
    }
}

#[test]
fn test_decode_command_rejects_invalid_utf8() {
    let result = decode_command_payload(&[0x39, 0x2c, 0xff], "1");
    assert!(matches!(result, Err(Error::DecodeFailure(_))));
}

#[test]
fn test_ack_payload() {
    assert_eq!(encode_ack_payload("9"), "ok,9");
    assert_eq!(encode_ack_payload(""), "ok,");
}
