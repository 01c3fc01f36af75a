//! Shared fixtures for supervisor integration tests

#![allow(dead_code)]

use pitempmqtt::bridge::{ConnectionSupervisor, SupervisorSettings};
use pitempmqtt::config::BridgeConfig;
use pitempmqtt::testing::{MockTransport, TransportOp};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub const ONLINE_TOPIC: &str = "home/sensors/pitemp-test/online";
pub const ANNOUNCE_TOPIC: &str = "home/sensors/announce";
pub const COMMAND_TOPIC: &str = "home/sensors/command";
pub const TEMPERATURE_TOPIC: &str = "home/sensors/pitemp-test/status/temperature";

pub fn test_config() -> BridgeConfig {
    BridgeConfig::from_toml_str(
        r#"
[mqtt]
server = "broker.local"
client_id = "pitemp-test"
topic = "home/sensors"

[sensor]
kind = "simulated"
"#,
    )
    .unwrap()
}

pub fn supervisor_with(
    transport: MockTransport,
    events: tokio::sync::mpsc::UnboundedReceiver<pitempmqtt::transport::TransportEvent>,
    cancel: &CancellationToken,
) -> (Arc<MockTransport>, Arc<ConnectionSupervisor<MockTransport>>) {
    let transport = Arc::new(transport);
    let supervisor = ConnectionSupervisor::new(
        SupervisorSettings::from_config(&test_config().mqtt),
        transport.clone(),
        events,
        cancel,
    );
    (transport, Arc::new(supervisor))
}

/// The side effects of one successful (re)connection, in order
pub fn connection_side_effects(ops: &[TransportOp]) -> Vec<String> {
    ops.iter()
        .filter_map(|op| match op {
            TransportOp::Publish { topic, payload, .. } if topic == ONLINE_TOPIC => {
                Some(format!("online:{payload}"))
            }
            TransportOp::Publish { topic, .. } if topic == ANNOUNCE_TOPIC => {
                Some("announce".to_string())
            }
            TransportOp::Subscribe(topic) => Some(format!("subscribe:{topic}")),
            _ => None,
        })
        .collect()
}

pub fn count_publishes(transport: &MockTransport, topic: &str) -> usize {
    transport
        .published()
        .iter()
        .filter(|message| message.topic == topic)
        .count()
}
