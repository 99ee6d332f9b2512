//! Update fan-out to the entity layer.
//!
//! Every fold produces at most one [`DeviceUpdate`]. Listeners are called
//! synchronously in registration order. Sensor telemetry is only forwarded
//! for zone 1; other zones still fold it into state.

use std::sync::{Arc, RwLock};

use anthemav_core::{DeviceState, Field, FoldOutcome};
use serde::Serialize;
use serde_json::{Map, Value, json};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::session::ConnectionStatus;

/// Zone whose sensor telemetry is surfaced.
pub const SENSOR_ZONE: u8 = 1;

/// One change notification for an entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceUpdate {
    pub entity_id: String,
    pub zone: Option<u8>,
    pub field: Option<Field>,
    pub attributes: Map<String, Value>,
}

/// Receives device updates.
pub trait UpdateListener: Send + Sync {
    fn on_update(&self, update: &DeviceUpdate);
}

/// Logs every update at debug level.
pub struct LoggingListener;

impl UpdateListener for LoggingListener {
    fn on_update(&self, update: &DeviceUpdate) {
        debug!(entity = %update.entity_id, attributes = ?update.attributes, "device_update");
    }
}

/// Forwards updates into an unbounded channel.
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<DeviceUpdate>,
}

impl ChannelListener {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DeviceUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl UpdateListener for ChannelListener {
    fn on_update(&self, update: &DeviceUpdate) {
        // receiver gone means nobody is interested anymore
        let _ = self.tx.send(update.clone());
    }
}

/// Registry of listeners owned by a device session.
#[derive(Default)]
pub struct EventEmitter {
    listeners: RwLock<Vec<Arc<dyn UpdateListener>>>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: Arc<dyn UpdateListener>) {
        self.listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Delivers an update to every listener in registration order.
    pub fn emit(&self, update: &DeviceUpdate) {
        let listeners = self.listeners.read().unwrap_or_else(|e| e.into_inner());
        for listener in listeners.iter() {
            listener.on_update(update);
        }
    }
}

/// Returns true when an outcome must not leave the session.
pub fn is_suppressed(outcome: &FoldOutcome) -> bool {
    outcome.field.is_sensor() && outcome.zone != Some(SENSOR_ZONE)
}

/// Builds the update for one fold, or `None` when it is suppressed.
pub fn update_for(
    device_id: &str,
    outcome: FoldOutcome,
    state: &DeviceState,
) -> Option<DeviceUpdate> {
    if is_suppressed(&outcome) {
        trace!(zone = ?outcome.zone, field = %outcome.field, "sensor update suppressed");
        return None;
    }

    let update = match outcome.zone {
        Some(zone) if outcome.field.is_sensor() => DeviceUpdate {
            entity_id: sensor_entity_id(device_id, outcome.field),
            zone: Some(zone),
            field: Some(outcome.field),
            attributes: sensor_attributes(state, zone, outcome.field),
        },
        Some(zone) => DeviceUpdate {
            entity_id: media_player_entity_id(device_id, zone),
            zone: Some(zone),
            field: Some(outcome.field),
            attributes: media_player_attributes(state, zone),
        },
        None => DeviceUpdate {
            entity_id: device_id.to_string(),
            zone: None,
            field: Some(outcome.field),
            attributes: device_attributes(state),
        },
    };
    Some(update)
}

/// Device-level availability update for a status transition.
pub fn availability_update(device_id: &str, status: ConnectionStatus) -> DeviceUpdate {
    let mut attributes = Map::new();
    attributes.insert(
        "available".into(),
        Value::Bool(status == ConnectionStatus::Connected),
    );
    attributes.insert("status".into(), Value::String(status.as_str().into()));
    DeviceUpdate {
        entity_id: device_id.to_string(),
        zone: None,
        field: None,
        attributes,
    }
}

/// Attributes of a zone's media player entity.
pub fn media_player_attributes(state: &DeviceState, zone: u8) -> Map<String, Value> {
    let mut attributes = Map::new();
    let Some(z) = state.zone(zone) else {
        return attributes;
    };

    attributes.insert("state".into(), json!(if z.power { "ON" } else { "OFF" }));
    attributes.insert("volume".into(), json!(z.volume_percent().round() as i64));
    attributes.insert("volume_db".into(), json!(z.volume_db));
    attributes.insert("muted".into(), json!(z.muted));
    attributes.insert("source".into(), json!(z.input_name));
    attributes.insert("source_list".into(), json!(state.source_list()));
    attributes
}

fn sensor_attributes(state: &DeviceState, zone: u8, field: Field) -> Map<String, Value> {
    let mut attributes = Map::new();
    let value = state
        .zone(zone)
        .and_then(|z| match field {
            Field::AudioFormat => Some(z.audio_format.clone()),
            Field::AudioChannels => Some(z.audio_channels.clone()),
            Field::VideoResolution => Some(z.video_resolution.clone()),
            Field::ListeningMode => Some(z.listening_mode.clone()),
            Field::SampleRate => Some(z.sample_rate.clone()),
            Field::BitDepth => Some(z.bit_depth.clone()),
            _ => None,
        })
        .unwrap_or_default();
    attributes.insert("value".into(), Value::String(value));
    attributes
}

fn device_attributes(state: &DeviceState) -> Map<String, Value> {
    let mut attributes = Map::new();
    if let Some(model) = &state.model {
        attributes.insert("model".into(), json!(model));
    }
    if let Some(count) = state.input_count {
        attributes.insert("input_count".into(), json!(count));
    }
    attributes.insert("source_list".into(), json!(state.source_list()));
    attributes
}

fn zone_suffix(zone: u8) -> String {
    if zone == 1 {
        String::new()
    } else {
        format!(".zone{zone}")
    }
}

/// `media_player.<id>` for zone 1, `media_player.<id>.zone<n>` otherwise.
pub fn media_player_entity_id(device_id: &str, zone: u8) -> String {
    format!("media_player.{device_id}{}", zone_suffix(zone))
}

/// `remote.<id>` for zone 1, `remote.<id>.zone<n>` otherwise.
pub fn remote_entity_id(device_id: &str, zone: u8) -> String {
    format!("remote.{device_id}{}", zone_suffix(zone))
}

/// `sensor.<id>_<field>`.
pub fn sensor_entity_id(device_id: &str, field: Field) -> String {
    format!("sensor.{device_id}_{field}")
}

/// Media player and remote ids for each listed zone.
pub fn entity_ids_for_zones(device_id: &str, zones: &[u8]) -> Vec<String> {
    zones
        .iter()
        .flat_map(|&zone| {
            [
                media_player_entity_id(device_id, zone),
                remote_entity_id(device_id, zone),
            ]
        })
        .collect()
}

const SENSOR_FIELDS: [Field; 6] = [
    Field::AudioFormat,
    Field::AudioChannels,
    Field::VideoResolution,
    Field::ListeningMode,
    Field::SampleRate,
    Field::BitDepth,
];

/// Recovers the device identifier from an entity id.
pub fn device_id_from_entity_id(entity_id: &str) -> Option<String> {
    let (domain, rest) = entity_id.split_once('.')?;
    if rest.is_empty() {
        return None;
    }

    if domain == "sensor" {
        return SENSOR_FIELDS
            .iter()
            .find_map(|field| rest.strip_suffix(&format!("_{field}")))
            .filter(|id| !id.is_empty())
            .map(str::to_string);
    }

    let parts: Vec<&str> = rest.split('.').collect();
    match parts.as_slice() {
        [id] => Some(id.to_string()),
        [id, zone] if zone.starts_with("zone") => Some(id.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anthemav_core::ParsedMessage;
    use std::sync::Mutex;

    const ID: &str = "anthem_192_168_1_100_14999";

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl UpdateListener for Recorder {
        fn on_update(&self, update: &DeviceUpdate) {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.name, update.entity_id));
        }
    }

    fn fold(state: &mut DeviceState, message: ParsedMessage) -> Option<DeviceUpdate> {
        let outcome = state.fold(&message);
        update_for(ID, outcome, state)
    }

    #[test]
    fn entity_ids() {
        assert_eq!(media_player_entity_id(ID, 1), format!("media_player.{ID}"));
        assert_eq!(
            media_player_entity_id(ID, 2),
            format!("media_player.{ID}.zone2")
        );
        assert_eq!(remote_entity_id(ID, 3), format!("remote.{ID}.zone3"));
        assert_eq!(
            sensor_entity_id(ID, Field::AudioFormat),
            format!("sensor.{ID}_audio_format")
        );
        assert_eq!(
            entity_ids_for_zones(ID, &[1, 2]),
            vec![
                format!("media_player.{ID}"),
                format!("remote.{ID}"),
                format!("media_player.{ID}.zone2"),
                format!("remote.{ID}.zone2"),
            ]
        );
    }

    #[test]
    fn device_id_round_trip() {
        for entity in [
            media_player_entity_id(ID, 1),
            media_player_entity_id(ID, 2),
            remote_entity_id(ID, 3),
            sensor_entity_id(ID, Field::ListeningMode),
            sensor_entity_id(ID, Field::BitDepth),
        ] {
            assert_eq!(device_id_from_entity_id(&entity).as_deref(), Some(ID));
        }
        assert_eq!(device_id_from_entity_id(""), None);
        assert_eq!(device_id_from_entity_id("nodot"), None);
        assert_eq!(device_id_from_entity_id("media_player."), None);
        assert_eq!(device_id_from_entity_id("a.b.c.d"), None);
        assert_eq!(device_id_from_entity_id("sensor.foo"), None);
    }

    #[test]
    fn zone1_sensor_is_emitted() {
        let mut state = DeviceState::new([1, 2]);
        let update = fold(
            &mut state,
            ParsedMessage::ZoneAudioFormat {
                zone: 1,
                format: "Dolby Atmos".into(),
            },
        )
        .expect("zone 1 sensor must emit");
        assert_eq!(update.entity_id, format!("sensor.{ID}_audio_format"));
        insta::assert_json_snapshot!(update.attributes, @r#"
        {
          "value": "Dolby Atmos"
        }
        "#);
    }

    #[test]
    fn other_zone_sensor_is_folded_but_suppressed() {
        let mut state = DeviceState::new([1, 2]);
        let update = fold(
            &mut state,
            ParsedMessage::ZoneAudioFormat {
                zone: 2,
                format: "PCM".into(),
            },
        );
        assert!(update.is_none());
        assert_eq!(state.zone(2).unwrap().audio_format, "PCM");
    }

    #[test]
    fn control_fields_emit_for_every_zone() {
        let mut state = DeviceState::new([1, 2]);
        let update = fold(&mut state, ParsedMessage::ZoneMute { zone: 2, is_muted: true }).unwrap();
        assert_eq!(update.entity_id, format!("media_player.{ID}.zone2"));
        assert_eq!(update.field, Some(Field::Muted));
        assert_eq!(update.attributes["muted"], json!(true));
    }

    #[test]
    fn repeated_fold_emits_each_time() {
        let mut state = DeviceState::new([1]);
        let msg = ParsedMessage::ZonePower { zone: 1, is_on: true };
        let first = fold(&mut state, msg.clone()).unwrap();
        let snapshot = state.clone();
        let second = fold(&mut state, msg).unwrap();
        assert_eq!(first.attributes, second.attributes);
        assert_eq!(snapshot.zone(1), state.zone(1));
    }

    #[test]
    fn media_player_attribute_map() {
        let mut state = DeviceState::new([1]);
        state.fold(&ParsedMessage::ZonePower { zone: 1, is_on: true });
        state.fold(&ParsedMessage::ZoneVolume {
            zone: 1,
            volume_db: -45,
        });
        state.fold(&ParsedMessage::InputName {
            input_number: 1,
            name: "Apple TV".into(),
        });
        state.fold(&ParsedMessage::InputName {
            input_number: 2,
            name: "Turntable".into(),
        });
        state.fold(&ParsedMessage::ZoneInput {
            zone: 1,
            input_number: 2,
        });

        insta::assert_json_snapshot!(media_player_attributes(&state, 1), @r#"
        {
          "muted": false,
          "source": "Turntable",
          "source_list": [
            "Apple TV",
            "Turntable"
          ],
          "state": "ON",
          "volume": 50,
          "volume_db": -45
        }
        "#);
    }

    #[test]
    fn device_level_update() {
        let mut state = DeviceState::new([1]);
        let update = fold(
            &mut state,
            ParsedMessage::SystemModel {
                model: "MRX 1140".into(),
            },
        )
        .unwrap();
        assert_eq!(update.entity_id, ID);
        assert_eq!(update.zone, None);
        assert_eq!(update.attributes["model"], json!("MRX 1140"));
    }

    #[test]
    fn availability() {
        let update = availability_update(ID, ConnectionStatus::Connected);
        assert_eq!(update.attributes["available"], json!(true));
        assert_eq!(update.attributes["status"], json!("connected"));
        let update = availability_update(ID, ConnectionStatus::Connecting);
        assert_eq!(update.attributes["available"], json!(false));
    }

    #[test]
    fn listeners_are_called_in_registration_order() {
        let emitter = EventEmitter::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for name in ["first", "second", "third"] {
            emitter.subscribe(Arc::new(Recorder {
                name,
                log: log.clone(),
            }));
        }
        assert_eq!(emitter.listener_count(), 3);

        emitter.emit(&availability_update(ID, ConnectionStatus::Connected));
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                format!("first:{ID}"),
                format!("second:{ID}"),
                format!("third:{ID}"),
            ]
        );
    }

    #[tokio::test]
    async fn channel_listener_forwards() {
        let emitter = EventEmitter::new();
        let (listener, mut rx) = ChannelListener::new();
        emitter.subscribe(Arc::new(LoggingListener));
        emitter.subscribe(Arc::new(listener));
        emitter.emit(&availability_update(ID, ConnectionStatus::Disconnected));

        let update = rx.recv().await.unwrap();
        assert_eq!(update.entity_id, ID);
        assert_eq!(update.attributes["available"], json!(false));
    }
}
