//! Topic construction for the bridge wire contract
//!
//! Every topic the bridge publishes to or subscribes on is derived from the
//! configured base topic and client id:
//!
//! | Topic                                  | Direction |
//! |----------------------------------------|-----------|
//! | `{base}/{client_id}/status/temperature`| publish   |
//! | `{base}/{client_id}/online`            | publish   |
//! | `{base}/announce`                      | publish   |
//! | `{base}/command`                       | subscribe |

/// Precomputed topic set for one bridge instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicBuilder {
    base_topic: String,
    client_id: String,
}

impl TopicBuilder {
    pub fn new(base_topic: &str, client_id: &str) -> Self {
        Self {
            base_topic: base_topic.trim_end_matches('/').to_string(),
            client_id: client_id.to_string(),
        }
    }

    pub fn base_topic(&self) -> &str {
        &self.base_topic
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Build temperature topic: `{base}/{client_id}/status/temperature`
    pub fn temperature(&self) -> String {
        format!("{}/{}/status/temperature", self.base_topic, self.client_id)
    }

    /// Build retained presence topic: `{base}/{client_id}/online`
    pub fn online(&self) -> String {
        format!("{}/{}/online", self.base_topic, self.client_id)
    }

    /// Build announce topic: `{base}/announce`
    pub fn announce(&self) -> String {
        format!("{}/announce", self.base_topic)
    }

    /// Build command topic: `{base}/command`
    pub fn command(&self) -> String {
        format!("{}/command", self.base_topic)
    }

    /// Exact match against the command topic; MQTT topics are case sensitive
    pub fn is_command_topic(&self, topic: &str) -> bool {
        topic == self.command()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_construction() {
        let topics = TopicBuilder::new("home/sensors", "pitemp-kitchen");
        assert_eq!(
            topics.temperature(),
            "home/sensors/pitemp-kitchen/status/temperature"
        );
        assert_eq!(topics.online(), "home/sensors/pitemp-kitchen/online");
        assert_eq!(topics.announce(), "home/sensors/announce");
        assert_eq!(topics.command(), "home/sensors/command");
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let topics = TopicBuilder::new("home/", "dev");
        assert_eq!(topics.base_topic(), "home");
        assert_eq!(topics.command(), "home/command");
    }

    #[test]
    fn test_command_topic_matching() {
        let topics = TopicBuilder::new("home", "dev");
        assert!(topics.is_command_topic("home/command"));
        assert!(!topics.is_command_topic("home/Command"));
        assert!(!topics.is_command_topic("home/dev/command"));
        assert!(!topics.is_command_topic("home/command/"));
    }
}
