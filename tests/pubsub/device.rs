//! Device description construction and announcement.

use serde_json::{Value, json};

use libpubsub::network::application::pubsub::device::{
    ANNOUNCEMENT_CHANNEL, BinarySensor, DeviceDescription, LedType, Light, Number, Sensor,
    Spectrum, Switch,
};

use crate::mock::{MockClock, connect_ok, written_lines};

fn full_description() -> DeviceDescription {
    DeviceDescription::new("hub", "Dev_42")
        .add_property("vendor", "acme")
        .add_location("lab", 51.4, 5.5)
        .add_sensor(
            "temp",
            Sensor {
                channel: "hub/temp",
                sensor_type: "temperature",
                unit: "C",
                default: 20.0,
                mode: "auto",
                step: None,
                icon: None,
            },
        )
        .add_number(
            "target",
            Number {
                channel: "hub/target",
                min_max: (10.0, 30.0),
                unit: "C",
                default: 21.0,
                icon: None,
            },
        )
        .add_binary_sensor(
            "motion",
            BinarySensor {
                channel: "hub/motion",
                sensor_type: "motion",
                default: false,
                icon: None,
            },
        )
        .add_switch(
            "relay",
            Switch {
                channel: "hub/relay",
                default: false,
                icon: Some("power"),
            },
        )
        .add_light(
            "lamp",
            Light {
                channel: "hub/lamp",
                led_type: LedType::Rgbww,
                spectrum: Spectrum::Cct,
                mired_min_max: Some((153, 500)),
                default_state: false,
                default_brightness: 128,
                icon: None,
            },
        )
}

#[test]
fn test_description_wire_shape() {
    let payload = full_description().to_payload();
    let root = payload.get("hub").and_then(Value::as_object).unwrap();

    assert_eq!(root["properties"]["device_id"], json!("Dev_42"));
    assert_eq!(root["properties"]["vendor"], json!("acme"));
    assert_eq!(root["location"]["lab"], json!([51.4, 5.5]));

    let components = root["components"].as_object().unwrap();
    assert_eq!(components.len(), 5);

    let temp = &components["temp"];
    assert_eq!(temp["type"], json!("sensor"));
    assert_eq!(temp["channel_name"], json!("hub/temp"));
    assert_eq!(temp["sensor_type"], json!("temperature"));
    assert_eq!(temp["value"], json!(20.0));
    assert_eq!(temp["mode"], json!("auto"));
    assert_eq!(temp["step"], json!(null));

    assert_eq!(components["target"]["type"], json!("number"));
    assert_eq!(components["target"]["min_max"], json!([10.0, 30.0]));

    assert_eq!(components["motion"]["type"], json!("binary_sensor"));
    assert_eq!(components["motion"]["state"], json!(false));

    assert_eq!(components["relay"]["type"], json!("switch"));
    assert_eq!(components["relay"]["icon"], json!("power"));

    let lamp = &components["lamp"];
    assert_eq!(lamp["type"], json!("light"));
    assert_eq!(lamp["ledType"], json!("RGBWW"));
    assert_eq!(lamp["spectrum"], json!("CCT"));
    assert_eq!(lamp["min_max"], json!([153, 500]));
    assert_eq!(lamp["brightness"], json!(128));
}

#[test]
fn test_submit_announces_once() {
    let mut harness = connect_ok("Hub_1", MockClock::stepping(1));
    let description = harness
        .client
        .device(None)
        .add_property("firmware", "1.2.3");
    assert_eq!(description.name(), "Hub_1");

    description.submit(&mut harness.client).unwrap();

    let prefix = format!("sendraw {ANNOUNCEMENT_CHANNEL} ");
    let lines = written_lines(&harness.writes);
    let announcements: Vec<_> = lines
        .iter()
        .filter(|line| line.starts_with(&prefix))
        .collect();
    assert_eq!(announcements.len(), 1);
    assert!(announcements[0].contains(r#""device_id":"Hub_1""#));
    assert!(announcements[0].contains(r#""firmware":"1.2.3""#));
}

#[test]
fn test_custom_device_name() {
    let harness = connect_ok("Owner_1", MockClock::stepping(1));
    let description = harness.client.device(Some("workbench"));
    let payload = description.to_payload();

    let root = payload.get("workbench").and_then(Value::as_object).unwrap();
    assert_eq!(root["properties"]["device_id"], json!("Owner_1"));
}
