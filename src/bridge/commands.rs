//! Inbound command protocol
//!
//! Controllers write a single text token to `{base}/command`. Only
//! `announce` is understood; every other token, and every other topic, is
//! dropped without an error.

use super::publisher::BridgePublisher;
use crate::protocol::{Command, TopicBuilder};
use crate::transport::mqtt::MessageHandler;
use crate::transport::Transport;
use std::sync::Arc;
use tracing::debug;

/// Pure routing: the command carried by a message, if it was sent to the
/// command topic at all
pub fn interpret(topics: &TopicBuilder, topic: &str, payload: &str) -> Option<Command> {
    topics
        .is_command_topic(topic)
        .then(|| Command::parse(payload))
}

pub struct CommandHandler<T: Transport> {
    publisher: Arc<BridgePublisher<T>>,
}

impl<T: Transport> CommandHandler<T> {
    pub fn new(publisher: Arc<BridgePublisher<T>>) -> Self {
        Self { publisher }
    }

    /// Handle one inbound message; returns the command it carried
    pub async fn handle(&self, topic: &str, payload: &[u8]) -> Option<Command> {
        let payload = MessageHandler::decode_payload(payload);
        debug!(topic = %topic, payload = %payload, "Received message");

        let command = interpret(self.publisher.topics(), topic, &payload);
        match &command {
            Some(Command::Announce) => {
                debug!("Received announce command");
                self.publisher.publish_announce().await;
            }
            Some(Command::Unknown(token)) => debug!(command = %token, "Ignoring unknown command"),
            None => {}
        }
        command
    }
}
