//! Sensor endpoint tests

use cayenne_bridge::{BridgeError, CayenneClient, EndpointEvent, SensorEndpoint};
use cayenne_core::{
    EndpointConfig, Error, FabricEvent, InboundEvent, PublishRequest, QoS, StatusColor,
    StatusShape,
};
use cayenne_test_utils::{
    bob_client_config, drain_events, endpoint_config, init_tracing, statuses, TestBed,
};
use serde_json::json;

fn fabric(value: serde_json::Value) -> InboundEvent {
    let event: FabricEvent = serde_json::from_value(value).unwrap();
    event.into()
}

#[test]
fn test_generic_reading_is_published_on_data_topic() {
    init_tracing();
    let bed = TestBed::connected();
    let (sensor, _events) =
        SensorEndpoint::start(&endpoint_config("1", "temp", "c"), Some(bed.client.as_ref()))
            .unwrap();

    sensor.handle_message(&json!({"payload": 23}));

    assert_eq!(
        bed.transport.published(),
        vec![PublishRequest {
            topic: "v1/bob/things/xyz/data/1".to_string(),
            payload: "temp,c=23".to_string(),
            qos: QoS::AtMostOnce,
            retain: false,
        }]
    );
}

#[test]
fn test_none_type_or_unit_publishes_bare_value() {
    let bed = TestBed::connected();
    let (sensor, _events) = SensorEndpoint::start(
        &endpoint_config("2", "_none_", "c"),
        Some(bed.client.as_ref()),
    )
    .unwrap();

    sensor.handle_input(&InboundEvent::generic("hello"));

    let published = bed.transport.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].payload, "hello");
}

#[test]
fn test_configured_qos_is_used() {
    let bed = TestBed::connected();
    let config = EndpointConfig {
        qos: QoS::AtLeastOnce,
        ..endpoint_config("1", "temp", "c")
    };
    let (sensor, _events) = SensorEndpoint::start(&config, Some(bed.client.as_ref())).unwrap();

    let request = sensor.encode(&InboundEvent::generic(21.5)).unwrap();
    assert_eq!(request.qos, QoS::AtLeastOnce);
    assert_eq!(request.payload, "temp,c=21.5");
    assert!(!request.retain);
}

#[test]
fn test_booleans_become_integers() {
    let bed = TestBed::connected();
    let config = endpoint_config("5", "digital_sensor", "d");
    let (sensor, _events) = SensorEndpoint::start(&config, Some(bed.client.as_ref())).unwrap();

    sensor.handle_input(&InboundEvent::generic(true));
    sensor.handle_input(&InboundEvent::generic(false));

    let payloads: Vec<String> = bed
        .transport
        .published()
        .into_iter()
        .map(|request| request.payload)
        .collect();
    assert_eq!(payloads, vec!["digital_sensor,d=1", "digital_sensor,d=0"]);
}

#[test]
fn test_structured_values_are_rejected() {
    let bed = TestBed::connected();
    let (sensor, _events) =
        SensorEndpoint::start(&endpoint_config("1", "temp", "c"), Some(bed.client.as_ref()))
            .unwrap();

    let result = sensor.encode(&InboundEvent::generic(json!({"a": 1})));
    assert!(matches!(
        result,
        Err(BridgeError::Core(Error::InvalidValueType(_)))
    ));

    sensor.handle_input(&InboundEvent::generic(json!([1, 2])));
    sensor.handle_input(&InboundEvent::generic(serde_json::Value::Null));
    assert!(bed.transport.published().is_empty());
}

#[test]
fn test_invalid_topic_is_rejected() {
    let bed = TestBed::connected();
    let (sensor, _events) =
        SensorEndpoint::start(&endpoint_config("a#b", "temp", "c"), Some(bed.client.as_ref()))
            .unwrap();

    let result = sensor.encode(&InboundEvent::generic(1));
    assert!(matches!(result, Err(BridgeError::Core(Error::InvalidTopic(_)))));

    sensor.handle_input(&InboundEvent::generic(1));
    assert!(bed.transport.published().is_empty());
}

#[test]
fn test_fabric_reading_on_derived_channel() {
    let bed = TestBed::connected();
    let (sensor, _events) =
        SensorEndpoint::start(&endpoint_config("", "temp", "c"), Some(bed.client.as_ref()))
            .unwrap();

    sensor.handle_message(&json!({
        "fabric": {
            "type": "value",
            "nodename": "dev1",
            "aid": 1,
            "iid": 2,
            "value": 55,
            "format": "int"
        }
    }));

    let published = bed.transport.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].topic, "v1/bob/things/xyz/data/dev1_1_2");
    assert_eq!(published[0].payload, "55");
}

#[test]
fn test_fabric_reading_on_configured_channel() {
    let bed = TestBed::connected();
    let (sensor, _events) =
        SensorEndpoint::start(&endpoint_config("7", "temp", "c"), Some(bed.client.as_ref()))
            .unwrap();

    let request = sensor
        .encode(&fabric(json!({
            "type": "value",
            "nodename": "dev1",
            "aid": 1,
            "iid": 2,
            "value": 55,
            "format": "int"
        })))
        .unwrap();

    assert_eq!(request.topic, "v1/bob/things/xyz/data/7");
    assert_eq!(request.payload, "temp,c=55");
}

#[test]
fn test_incomplete_fabric_event_is_rejected() {
    let bed = TestBed::connected();
    let (sensor, _events) =
        SensorEndpoint::start(&endpoint_config("", "temp", "c"), Some(bed.client.as_ref()))
            .unwrap();

    let missing_format = fabric(json!({
        "type": "value",
        "nodename": "dev1",
        "aid": 1,
        "iid": 2,
        "value": 55
    }));
    assert!(matches!(
        sensor.encode(&missing_format),
        Err(BridgeError::Core(Error::FabricFieldsMissing(_)))
    ));

    let wrong_type = fabric(json!({
        "type": "event",
        "nodename": "dev1",
        "aid": 1,
        "iid": 2,
        "value": 55,
        "format": "int"
    }));
    assert!(sensor.encode(&wrong_type).is_err());

    sensor.handle_input(&missing_format);
    sensor.handle_input(&wrong_type);
    assert!(bed.transport.published().is_empty());
}

#[test]
fn test_message_without_payload_is_dropped() {
    let bed = TestBed::connected();
    let (sensor, _events) =
        SensorEndpoint::start(&endpoint_config("1", "temp", "c"), Some(bed.client.as_ref()))
            .unwrap();

    assert_eq!(
        InboundEvent::from_json(&json!({"topic": "t"})),
        Err(Error::MissingPayload)
    );

    sensor.handle_message(&json!({"topic": "t"}));
    assert!(bed.transport.published().is_empty());
}

#[test]
fn test_start_without_client_fails() {
    let result = SensorEndpoint::start(&endpoint_config("1", "temp", "c"), None);

    match result {
        Err(BridgeError::ConfigurationMissing(what)) => assert_eq!(what, "client"),
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("sensor started without a client"),
    }
}

#[test]
fn test_start_without_broker_fails() {
    let client = CayenneClient::start(&bob_client_config(), None);
    let result = SensorEndpoint::start(&endpoint_config("1", "temp", "c"), Some(client.as_ref()));

    match result {
        Err(BridgeError::ConfigurationMissing(what)) => assert_eq!(what, "broker"),
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("sensor started without a broker"),
    }
}

#[test]
fn test_input_after_close_is_ignored() {
    let bed = TestBed::connected();
    let (sensor, _events) =
        SensorEndpoint::start(&endpoint_config("1", "temp", "c"), Some(bed.client.as_ref()))
            .unwrap();
    let id = sensor.id().clone();
    assert!(bed.registry.is_registered(&id));

    let mut closed = false;
    sensor.close(|| closed = true);
    assert!(closed);
    assert!(!bed.registry.is_registered(&id));

    sensor.handle_input(&InboundEvent::generic(1));
    assert!(bed.transport.published().is_empty());

    // second close still completes
    let mut closed_again = false;
    sensor.close(|| closed_again = true);
    assert!(closed_again);
}

#[test]
fn test_status_tracks_connection_and_values() {
    let bed = TestBed::new();
    let (sensor, mut events) =
        SensorEndpoint::start(&endpoint_config("1", "temp", "c"), Some(bed.client.as_ref()))
            .unwrap();

    let initial = statuses(&drain_events(&mut events));
    assert_eq!(initial.len(), 1);
    assert_eq!(initial[0].color, StatusColor::Red);
    assert_eq!(initial[0].shape, StatusShape::Ring);

    bed.registry.set_connected(true);
    let connected = statuses(&drain_events(&mut events));
    assert_eq!(connected.len(), 1);
    assert_eq!(connected[0].color, StatusColor::Green);
    assert_eq!(connected[0].shape, StatusShape::Dot);

    sensor.handle_input(&InboundEvent::generic(23));
    let after = statuses(&drain_events(&mut events));
    let last = after.last().unwrap();
    assert!(last.text.ends_with(" I: 23 O: temp,c=23"), "{}", last.text);
    assert_eq!(last.color, StatusColor::Green);
}

#[test]
fn test_failed_publish_records_no_output() {
    let bed = TestBed::connected();
    let (sensor, mut events) =
        SensorEndpoint::start(&endpoint_config("1", "temp", "c"), Some(bed.client.as_ref()))
            .unwrap();
    drain_events(&mut events);

    bed.transport.fail_publishes(true);
    sensor.handle_input(&InboundEvent::generic(23));

    let seen = drain_events(&mut events);
    assert!(seen
        .iter()
        .all(|event| matches!(event, EndpointEvent::Status(s) if !s.text.contains(" O: "))));
}
