//! Tests for logging configuration and format parsing

use pitempmqtt::observability::logging::{parse_level, LogFormat};
use tracing::Level;

#[test]
fn test_log_format_parse() {
    assert_eq!(LogFormat::parse("json"), LogFormat::Json);
    assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
    assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
    assert_eq!(LogFormat::parse("compact"), LogFormat::Compact);
}

#[test]
fn test_log_format_unknown_defaults_to_compact() {
    assert_eq!(LogFormat::parse("invalid"), LogFormat::Compact);
    assert_eq!(LogFormat::parse(""), LogFormat::Compact);
    assert_eq!(LogFormat::parse("yaml"), LogFormat::Compact);
}

#[test]
fn test_log_level_parse() {
    assert_eq!(parse_level("ERROR"), Level::ERROR);
    assert_eq!(parse_level("warn"), Level::WARN);
    assert_eq!(parse_level("Debug"), Level::DEBUG);
    assert_eq!(parse_level("trace"), Level::TRACE);
    assert_eq!(parse_level("verbose"), Level::INFO);
}
