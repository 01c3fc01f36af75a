//! Startup and shutdown against an unreachable broker
//!
//! The bridge must come up, keep retrying, and still shut down promptly when
//! nothing is listening on the broker port.

use pitempmqtt::bridge::{ConnectionSupervisor, SupervisorSettings, TelemetryPublisher};
use pitempmqtt::config::BridgeConfig;
use pitempmqtt::transport::mqtt::MqttClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

fn unreachable_config() -> BridgeConfig {
    BridgeConfig::from_toml_str(
        r#"
[mqtt]
server = "127.0.0.1"
port = 1
client_id = "pitemp-broker-down"
topic = "home/sensors"
connect_timeout_secs = 1
"#,
    )
    .unwrap()
}

#[tokio::test]
async fn test_supervisor_survives_unreachable_broker() {
    let config = unreachable_config();
    let (client, events) = MqttClient::new(config.mqtt.clone());
    let cancel = CancellationToken::new();
    let supervisor = ConnectionSupervisor::new(
        SupervisorSettings::from_config(&config.mqtt),
        Arc::new(client),
        events,
        &cancel,
    );

    timeout(Duration::from_secs(1), supervisor.start())
        .await
        .expect("start must not wait for the broker")
        .unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!supervisor.is_connected());
    assert!(!supervisor.publish_temperature(20.0).await);

    timeout(Duration::from_secs(5), supervisor.stop(true))
        .await
        .expect("stop must complete while the broker is down");
}
