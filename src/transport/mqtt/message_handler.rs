//! Pure message routing logic for MQTT events
//!
//! This module turns raw rumqttc events into routing decisions the client's
//! event loop task acts on.

use rumqttc::v5::mqttbytes::v5::Packet;
use rumqttc::v5::Event;

/// Pure message routing decisions based on MQTT events
pub struct MessageHandler;

impl MessageHandler {
    /// Route MQTT event to appropriate handler (pure routing decision)
    pub fn route_mqtt_event(event: &Event) -> EventRoute {
        match event {
            Event::Incoming(incoming) => match incoming {
                Packet::ConnAck(_) => EventRoute::ConnectionAcknowledged,
                Packet::Publish(publish) => EventRoute::MessageReceived {
                    topic: String::from_utf8_lossy(&publish.topic).to_string(),
                    payload: publish.payload.to_vec(),
                },
                Packet::Disconnect(_) => EventRoute::Disconnected,
                other => EventRoute::InfrastructureEvent(format!("{other:?}")),
            },
            Event::Outgoing(_) => EventRoute::OutgoingEvent,
        }
    }

    /// Decode a command payload; invalid UTF-8 is replaced rather than rejected
    pub fn decode_payload(payload: &[u8]) -> String {
        String::from_utf8_lossy(payload).trim().to_string()
    }
}

/// Routing decisions for MQTT events
#[derive(Debug, Clone, PartialEq)]
pub enum EventRoute {
    /// Connection acknowledged - ready to publish/subscribe
    ConnectionAcknowledged,
    /// Message received on subscribed topic
    MessageReceived { topic: String, payload: Vec<u8> },
    /// MQTT broker disconnected
    Disconnected,
    /// Infrastructure event (PingResp, SubAck, etc.)
    InfrastructureEvent(String),
    /// Outgoing event (handled automatically)
    OutgoingEvent,
}

impl EventRoute {
    /// Whether the route proves the broker is still talking to us
    pub fn is_inbound(&self) -> bool {
        !matches!(self, EventRoute::OutgoingEvent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rumqttc::v5::mqttbytes::v5::Publish;
    use rumqttc::v5::mqttbytes::QoS;

    #[test]
    fn test_route_publish() {
        let publish = Publish::new("home/command", QoS::AtMostOnce, "announce", None);
        let route = MessageHandler::route_mqtt_event(&Event::Incoming(Packet::Publish(publish)));
        assert_eq!(
            route,
            EventRoute::MessageReceived {
                topic: "home/command".to_string(),
                payload: b"announce".to_vec(),
            }
        );
        assert!(route.is_inbound());
    }

    #[test]
    fn test_outgoing_is_not_inbound() {
        assert!(!EventRoute::OutgoingEvent.is_inbound());
        assert!(EventRoute::Disconnected.is_inbound());
        assert!(EventRoute::InfrastructureEvent("PingResp".to_string()).is_inbound());
    }

    #[test]
    fn test_decode_payload() {
        assert_eq!(MessageHandler::decode_payload(b"announce"), "announce");
        assert_eq!(MessageHandler::decode_payload(b" announce\n"), "announce");
        assert_eq!(MessageHandler::decode_payload(&[0xff, b'a']), "\u{fffd}a");
    }
}
