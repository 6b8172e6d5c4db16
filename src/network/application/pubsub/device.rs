//! Device descriptions announced to the broker.
//!
//! A device description is a one-shot JSON document listing a device's
//! properties, location, and components (sensors, switches, lights, ...).
//! Brokers and dashboards use it to auto-discover what a client offers. The
//! builder is a pure consumer of [`Client::publish`]; it carries no protocol
//! state.
//!
//! # Examples
//!
//! ```rust,ignore
//! let description = client
//!     .device(Some("greenhouse-node"))
//!     .add_property("vendor", "acme")
//!     .add_location("greenhouse", 51.448, 5.491)
//!     .add_sensor(
//!         "air_temperature",
//!         Sensor {
//!             channel: "greenhouse/climate",
//!             sensor_type: "temperature",
//!             unit: "C",
//!             default: 21.0,
//!             mode: "auto",
//!             step: Some(0.5),
//!             icon: Some("thermometer"),
//!         },
//!     );
//! description.submit(&mut client)?;
//! ```

use alloc::string::{String, ToString};

use rand_core::RngCore;
use serde::Serialize;
use serde_json::Value;

use super::client::Client;
use super::{ClientError, Payload};
use crate::network::Connection;
use crate::time::Clock;

#[cfg(feature = "async")]
use super::client::AsyncClient;
#[cfg(feature = "async")]
use crate::network::AsyncConnection;

/// Well-known channel on which device descriptions are announced.
pub const ANNOUNCEMENT_CHANNEL: &str = "heyOOCSI!";

/// LED hardware driven by a [`Light`] component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LedType {
    /// Red/green/blue.
    Rgb,
    /// Red/green/blue plus white.
    Rgbw,
    /// Red/green/blue plus warm and cold white.
    Rgbww,
    /// Tunable white (color temperature).
    Cct,
    /// Single-channel dimmable.
    Dimmable,
    /// Plain on/off.
    OnOff,
}

/// Color capability a [`Light`] component exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Spectrum {
    /// Fixed white.
    White,
    /// Tunable color temperature.
    Cct,
    /// Full color.
    Rgb,
}

/// A numeric sensor component.
#[derive(Debug, Clone, Serialize)]
pub struct Sensor<'a> {
    /// Channel the sensor publishes on.
    #[serde(rename = "channel_name")]
    pub channel: &'a str,
    /// Sensor class, e.g. `temperature` or `humidity`.
    pub sensor_type: &'a str,
    /// Unit of the reported value.
    pub unit: &'a str,
    /// Initial value.
    #[serde(rename = "value")]
    pub default: f64,
    /// Reporting mode, typically `auto`.
    pub mode: &'a str,
    /// Step between reportable values, if quantized.
    pub step: Option<f64>,
    /// Display icon hint.
    pub icon: Option<&'a str>,
}

/// A settable numeric component.
#[derive(Debug, Clone, Serialize)]
pub struct Number<'a> {
    /// Channel the number is exchanged on.
    #[serde(rename = "channel_name")]
    pub channel: &'a str,
    /// Allowed `[minimum, maximum]` range.
    pub min_max: (f64, f64),
    /// Unit of the value.
    pub unit: &'a str,
    /// Initial value.
    #[serde(rename = "value")]
    pub default: f64,
    /// Display icon hint.
    pub icon: Option<&'a str>,
}

/// An on/off sensor component.
#[derive(Debug, Clone, Serialize)]
pub struct BinarySensor<'a> {
    /// Channel the sensor publishes on.
    #[serde(rename = "channel_name")]
    pub channel: &'a str,
    /// Sensor class, e.g. `motion` or `door`.
    pub sensor_type: &'a str,
    /// Initial state.
    #[serde(rename = "state")]
    pub default: bool,
    /// Display icon hint.
    pub icon: Option<&'a str>,
}

/// A switchable on/off component.
#[derive(Debug, Clone, Serialize)]
pub struct Switch<'a> {
    /// Channel the switch is controlled on.
    #[serde(rename = "channel_name")]
    pub channel: &'a str,
    /// Initial state.
    #[serde(rename = "state")]
    pub default: bool,
    /// Display icon hint.
    pub icon: Option<&'a str>,
}

/// A light component.
#[derive(Debug, Clone, Serialize)]
pub struct Light<'a> {
    /// Channel the light is controlled on.
    #[serde(rename = "channel_name")]
    pub channel: &'a str,
    /// LED hardware type.
    #[serde(rename = "ledType")]
    pub led_type: LedType,
    /// Color capability.
    pub spectrum: Spectrum,
    /// Color temperature range in mired, for tunable lights.
    #[serde(rename = "min_max")]
    pub mired_min_max: Option<(u16, u16)>,
    /// Initial state.
    #[serde(rename = "state")]
    pub default_state: bool,
    /// Initial brightness.
    #[serde(rename = "brightness")]
    pub default_brightness: u8,
    /// Display icon hint.
    pub icon: Option<&'a str>,
}

/// A device description under construction.
///
/// Built with the chaining `add_*` methods and announced once with
/// [`DeviceDescription::submit`]. The client handle is recorded as the
/// `device_id` property at construction.
#[derive(Debug, Clone)]
pub struct DeviceDescription {
    name: String,
    properties: Payload,
    components: Payload,
    location: Payload,
}

impl DeviceDescription {
    /// Start a description for `name`, owned by the client identified by
    /// `device_id`.
    pub fn new(name: &str, device_id: &str) -> Self {
        let mut properties = Payload::new();
        properties.insert("device_id".to_string(), Value::from(device_id));
        log::info!("[{}] created device {}", device_id, name);
        Self {
            name: name.to_string(),
            properties,
            components: Payload::new(),
            location: Payload::new(),
        }
    }

    /// The device name this description announces.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Record an arbitrary device property.
    pub fn add_property(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(name.to_string(), value.into());
        self
    }

    /// Record a named location as a latitude/longitude pair.
    pub fn add_location(mut self, name: &str, latitude: f64, longitude: f64) -> Self {
        self.location
            .insert(name.to_string(), Value::from([latitude, longitude].as_slice()));
        self
    }

    /// Add a numeric sensor component.
    pub fn add_sensor(self, name: &str, sensor: Sensor<'_>) -> Self {
        self.add_component(name, "sensor", &sensor)
    }

    /// Add a settable number component.
    pub fn add_number(self, name: &str, number: Number<'_>) -> Self {
        self.add_component(name, "number", &number)
    }

    /// Add an on/off sensor component.
    pub fn add_binary_sensor(self, name: &str, sensor: BinarySensor<'_>) -> Self {
        self.add_component(name, "binary_sensor", &sensor)
    }

    /// Add a switch component.
    pub fn add_switch(self, name: &str, switch: Switch<'_>) -> Self {
        self.add_component(name, "switch", &switch)
    }

    /// Add a light component.
    pub fn add_light(self, name: &str, light: Light<'_>) -> Self {
        self.add_component(name, "light", &light)
    }

    /// The JSON document as published: the device name keyed to its
    /// properties, components, and location.
    pub fn to_payload(&self) -> Payload {
        let mut body = Payload::new();
        body.insert(
            "properties".to_string(),
            Value::Object(self.properties.clone()),
        );
        body.insert(
            "components".to_string(),
            Value::Object(self.components.clone()),
        );
        body.insert("location".to_string(), Value::Object(self.location.clone()));
        let mut root = Payload::new();
        root.insert(self.name.clone(), Value::Object(body));
        root
    }

    /// Announce the description on [`ANNOUNCEMENT_CHANNEL`].
    pub fn submit<C, R, K>(&self, client: &mut Client<C, R, K>) -> Result<(), ClientError>
    where
        C: Connection,
        R: RngCore,
        K: Clock,
    {
        client.publish(ANNOUNCEMENT_CHANNEL, &self.to_payload())?;
        log::info!("[{}] announced device {}", client.handle(), self.name);
        Ok(())
    }

    /// Announce the description over an async client.
    #[cfg(feature = "async")]
    pub async fn submit_async<C, R, K>(
        &self,
        client: &mut AsyncClient<C, R, K>,
    ) -> Result<(), ClientError>
    where
        C: AsyncConnection,
        R: RngCore,
        K: Clock,
    {
        client.publish(ANNOUNCEMENT_CHANNEL, &self.to_payload()).await?;
        log::info!("[{}] announced device {}", client.handle(), self.name);
        Ok(())
    }

    fn add_component(mut self, name: &str, kind: &str, spec: &impl Serialize) -> Self {
        match serde_json::to_value(spec) {
            Ok(Value::Object(mut fields)) => {
                fields.insert("type".to_string(), Value::from(kind));
                self.components
                    .insert(name.to_string(), Value::Object(fields));
            }
            _ => log::warn!("could not encode component {}", name),
        }
        self
    }
}
