//! Integration tests for logging system

use bridge_traits::time::LogLevel;
use core_runtime::logging::{redact_if_sensitive, redact_secrets, LogFormat, LoggingConfig, REDACTED};

#[test]
fn test_logging_configuration() {
    // Logging can only be initialized once per process, so only the builder is exercised here
    let config = LoggingConfig::default()
        .with_format(LogFormat::Json)
        .with_level(LogLevel::Debug)
        .with_pii_redaction(true)
        .with_spans(true);

    assert_eq!(config.format, LogFormat::Json);
    assert_eq!(config.level, LogLevel::Debug);
    assert!(config.redact_pii);
    assert!(config.enable_spans);
}

#[test]
fn test_redaction_of_oauth_fields() {
    for field in ["access_token", "refresh_token", "client_secret", "authorization"] {
        assert_eq!(redact_if_sensitive(field, "value"), REDACTED, "{field}");
    }
}

#[test]
fn test_redaction_of_emails() {
    let redacted = redact_if_sensitive("email", "founder@example.com");

    assert!(redacted.starts_with('f'));
    assert!(redacted.contains(REDACTED));
    assert!(!redacted.contains("example.com"));
}

#[test]
fn test_normal_values_pass_through() {
    assert_eq!(redact_if_sensitive("status", "500"), "500");
    assert_eq!(redact_if_sensitive("stage", "create_post"), "create_post");
    assert_eq!(redact_if_sensitive("session_id", "s-123"), "s-123");
}

#[test]
fn test_token_endpoint_error_body_is_scrubbed() {
    let body = r#"{"error":"invalid_request","error_description":"Unable to retrieve access token: appid/redirect uri/code verifier does not match authorization code","code":"AQT-abc"}"#;
    let scrubbed = redact_secrets(body);

    assert!(scrubbed.contains("invalid_request"));
    assert!(!scrubbed.contains("AQT-abc"));
}

#[test]
fn test_format_selection() {
    #[cfg(debug_assertions)]
    assert_eq!(LoggingConfig::default().format, LogFormat::Pretty);

    #[cfg(not(debug_assertions))]
    assert_eq!(LoggingConfig::default().format, LogFormat::Json);
}

#[test]
fn test_config_chaining() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Warn)
        .with_pii_redaction(false)
        .with_spans(false)
        .with_target(false)
        .with_thread_info(true)
        .with_filter("core_auth=debug,provider_linkedin=trace");

    assert_eq!(config.format, LogFormat::Compact);
    assert_eq!(config.level, LogLevel::Warn);
    assert!(!config.redact_pii);
    assert!(!config.enable_spans);
    assert!(!config.display_target);
    assert!(config.display_thread_info);
    assert_eq!(
        config.filter.as_deref(),
        Some("core_auth=debug,provider_linkedin=trace")
    );
}
