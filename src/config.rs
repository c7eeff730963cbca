//! Broker connection and publish run configuration.
//!
//! Connection options are read from `BROKER_*` environment variables, optionally
//! layered over a TOML file, and validated before any client is created.

use rdkafka::config::ClientConfig;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Prefix shared by every connection environment variable.
pub const ENV_PREFIX: &str = "BROKER";

pub const ENV_BOOTSTRAP_SERVERS: &str = "BROKER_BOOTSTRAP_SERVERS";
pub const ENV_SECURITY_PROTOCOL: &str = "BROKER_SECURITY_PROTOCOL";
pub const ENV_SSL_CA_LOCATION: &str = "BROKER_SSL_CA_LOCATION";
pub const ENV_CLIENT_ID: &str = "BROKER_CLIENT_ID";
pub const ENV_ENABLE_IDEMPOTENCE: &str = "BROKER_ENABLE_IDEMPOTENCE";
pub const ENV_SSL_ENDPOINT_IDENTIFICATION: &str = "BROKER_SSL_ENDPOINT_IDENTIFICATION";
pub const ENV_SASL_MECHANISM: &str = "BROKER_SASL_MECHANISM";
pub const ENV_SASL_USERNAME: &str = "BROKER_SASL_USERNAME";
pub const ENV_SASL_PASSWORD: &str = "BROKER_SASL_PASSWORD";

pub const DEFAULT_TOPIC: &str = "local-input-topic";
pub const DEFAULT_KEY: &str = "orders";
pub const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest flush or connect deadline accepted. librdkafka takes timeouts as
/// an `i32` number of milliseconds.
pub const MAX_TIMEOUT_SECS: u64 = 86_400;
pub const MAX_TIMEOUT: Duration = Duration::from_secs(MAX_TIMEOUT_SECS);

const MAX_TOPIC_LEN: usize = 249;

/// Errors that can occur while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),
}

fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.into(),
    }
}

/// Security protocol for broker connections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SecurityProtocol {
    Plaintext,
    #[default]
    Ssl,
    SaslPlaintext,
    SaslSsl,
}

impl SecurityProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityProtocol::Plaintext => "PLAINTEXT",
            SecurityProtocol::Ssl => "SSL",
            SecurityProtocol::SaslPlaintext => "SASL_PLAINTEXT",
            SecurityProtocol::SaslSsl => "SASL_SSL",
        }
    }

    /// Whether the transport is TLS and therefore needs a CA certificate.
    pub fn uses_tls(&self) -> bool {
        matches!(self, SecurityProtocol::Ssl | SecurityProtocol::SaslSsl)
    }

    pub fn uses_sasl(&self) -> bool {
        matches!(
            self,
            SecurityProtocol::SaslPlaintext | SecurityProtocol::SaslSsl
        )
    }
}

impl fmt::Display for SecurityProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SecurityProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plaintext" => Ok(SecurityProtocol::Plaintext),
            "ssl" => Ok(SecurityProtocol::Ssl),
            "sasl_plaintext" => Ok(SecurityProtocol::SaslPlaintext),
            "sasl_ssl" => Ok(SecurityProtocol::SaslSsl),
            other => Err(format!(
                "unknown security protocol '{}', expected one of PLAINTEXT, SSL, SASL_PLAINTEXT, SASL_SSL",
                other
            )),
        }
    }
}

/// SASL mechanisms the bundled librdkafka can serve without libsasl2
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaslMechanism {
    #[default]
    Plain,
    ScramSha256,
    ScramSha512,
}

impl SaslMechanism {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaslMechanism::Plain => "PLAIN",
            SaslMechanism::ScramSha256 => "SCRAM-SHA-256",
            SaslMechanism::ScramSha512 => "SCRAM-SHA-512",
        }
    }
}

impl FromStr for SaslMechanism {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('_', "-").as_str() {
            "PLAIN" => Ok(SaslMechanism::Plain),
            "SCRAM-SHA-256" => Ok(SaslMechanism::ScramSha256),
            "SCRAM-SHA-512" => Ok(SaslMechanism::ScramSha512),
            other => Err(format!(
                "unsupported SASL mechanism '{}', expected one of PLAIN, SCRAM-SHA-256, SCRAM-SHA-512",
                other
            )),
        }
    }
}

/// Credentials sent when the security protocol is `SASL_*`.
#[derive(Clone, PartialEq, Eq)]
pub struct SaslCredentials {
    pub mechanism: SaslMechanism,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for SaslCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaslCredentials")
            .field("mechanism", &self.mechanism)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Broker hostname verification against its certificate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EndpointIdentification {
    /// Skip hostname verification, for self-signed local certificates.
    None,
    #[default]
    Https,
}

impl EndpointIdentification {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointIdentification::None => "none",
            EndpointIdentification::Https => "https",
        }
    }
}

impl FromStr for EndpointIdentification {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(EndpointIdentification::None),
            "https" => Ok(EndpointIdentification::Https),
            other => Err(format!(
                "unknown endpoint identification '{}', expected none or https",
                other
            )),
        }
    }
}

/// Settings as they arrive from the file and environment layers, before validation.
#[derive(Debug, Clone, Deserialize)]
struct RawConnectionSettings {
    #[serde(default = "default_bootstrap_servers")]
    bootstrap_servers: String,
    #[serde(default = "default_security_protocol")]
    security_protocol: String,
    #[serde(default = "default_ssl_ca_location")]
    ssl_ca_location: String,
    #[serde(default = "default_client_id")]
    client_id: String,
    #[serde(default = "default_enable_idempotence")]
    enable_idempotence: String,
    #[serde(default = "default_ssl_endpoint_identification")]
    ssl_endpoint_identification: String,
    #[serde(default = "default_sasl_mechanism")]
    sasl_mechanism: String,
    #[serde(default)]
    sasl_username: Option<String>,
    #[serde(default)]
    sasl_password: Option<String>,
}

fn default_bootstrap_servers() -> String {
    "localhost:9093".to_string()
}

fn default_security_protocol() -> String {
    "SSL".to_string()
}

fn default_ssl_ca_location() -> String {
    "/etc/line-publisher/certs/ca.crt".to_string()
}

fn default_client_id() -> String {
    "py-producer".to_string()
}

fn default_enable_idempotence() -> String {
    "true".to_string()
}

fn default_ssl_endpoint_identification() -> String {
    "https".to_string()
}

fn default_sasl_mechanism() -> String {
    "PLAIN".to_string()
}

/// Validated connection options for one publish session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Broker addresses, each `host:port`
    pub bootstrap_servers: Vec<String>,
    pub security_protocol: SecurityProtocol,
    /// CA certificate used to verify the broker, required for TLS protocols
    pub ssl_ca_location: Option<PathBuf>,
    pub client_id: String,
    pub enable_idempotence: bool,
    /// Hostname verification, applied to TLS protocols only
    pub ssl_endpoint_identification: EndpointIdentification,
    /// Present exactly when the protocol is `SASL_*`
    pub sasl: Option<SaslCredentials>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            bootstrap_servers: vec![default_bootstrap_servers()],
            security_protocol: SecurityProtocol::default(),
            ssl_ca_location: Some(PathBuf::from(default_ssl_ca_location())),
            client_id: default_client_id(),
            enable_idempotence: true,
            ssl_endpoint_identification: EndpointIdentification::default(),
            sasl: None,
        }
    }
}

impl ConnectionConfig {
    /// Load from an optional TOML file overlaid with the process environment.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_from(file, None)
    }

    /// Same as [`load`](Self::load), reading environment variables from `env`
    /// instead of the process when it is `Some`.
    pub fn load_from(
        file: Option<&Path>,
        env: Option<::config::Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(::config::File::from(path));
        }

        let settings = builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .ignore_empty(true)
                    .source(env),
            )
            .build()?;

        let raw: RawConnectionSettings = settings.try_deserialize()?;
        Self::from_raw(raw)
    }

    pub fn bootstrap_servers(&self) -> String {
        self.bootstrap_servers.join(",")
    }

    /// Build the rdkafka client configuration handed to the producer.
    pub fn to_client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();

        config.set("bootstrap.servers", self.bootstrap_servers());
        config.set("security.protocol", self.security_protocol.as_str());
        config.set("client.id", &self.client_id);

        if self.security_protocol.uses_tls() {
            if let Some(ref ca) = self.ssl_ca_location {
                config.set("ssl.ca.location", ca.to_string_lossy());
            }
            config.set(
                "ssl.endpoint.identification.algorithm",
                self.ssl_endpoint_identification.as_str(),
            );
        }

        if let Some(ref sasl) = self.sasl {
            config.set("sasl.mechanism", sasl.mechanism.as_str());
            config.set("sasl.username", &sasl.username);
            config.set("sasl.password", &sasl.password);
        }

        config.set("enable.idempotence", self.enable_idempotence.to_string());

        config
    }
}

impl ConnectionConfig {
    fn from_raw(raw: RawConnectionSettings) -> Result<Self, ConfigError> {
        let bootstrap_servers = parse_bootstrap_servers(&raw.bootstrap_servers)?;

        let security_protocol = raw
            .security_protocol
            .parse::<SecurityProtocol>()
            .map_err(|message| invalid(ENV_SECURITY_PROTOCOL, message))?;

        let ssl_ca_location = Some(raw.ssl_ca_location.trim())
            .filter(|path| !path.is_empty())
            .map(PathBuf::from);
        if security_protocol.uses_tls() && ssl_ca_location.is_none() {
            return Err(ConfigError::MissingRequired(format!(
                "{} (required for {})",
                ENV_SSL_CA_LOCATION, security_protocol
            )));
        }

        let client_id = raw.client_id.trim().to_string();
        if client_id.is_empty() {
            return Err(ConfigError::MissingRequired(ENV_CLIENT_ID.to_string()));
        }

        let enable_idempotence = parse_flag(&raw.enable_idempotence).ok_or_else(|| {
            invalid(
                ENV_ENABLE_IDEMPOTENCE,
                format!("'{}' is not a boolean", raw.enable_idempotence),
            )
        })?;

        let ssl_endpoint_identification = raw
            .ssl_endpoint_identification
            .parse::<EndpointIdentification>()
            .map_err(|message| invalid(ENV_SSL_ENDPOINT_IDENTIFICATION, message))?;

        let sasl = if security_protocol.uses_sasl() {
            Some(parse_sasl(&raw, security_protocol)?)
        } else {
            None
        };

        Ok(Self {
            bootstrap_servers,
            security_protocol,
            ssl_ca_location,
            client_id,
            enable_idempotence,
            ssl_endpoint_identification,
            sasl,
        })
    }
}

fn parse_sasl(
    raw: &RawConnectionSettings,
    protocol: SecurityProtocol,
) -> Result<SaslCredentials, ConfigError> {
    let mechanism = raw
        .sasl_mechanism
        .parse::<SaslMechanism>()
        .map_err(|message| invalid(ENV_SASL_MECHANISM, message))?;

    let required = |value: &Option<String>, key: &str| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                ConfigError::MissingRequired(format!("{} (required for {})", key, protocol))
            })
    };

    Ok(SaslCredentials {
        mechanism,
        username: required(&raw.sasl_username, ENV_SASL_USERNAME)?,
        password: required(&raw.sasl_password, ENV_SASL_PASSWORD)?,
    })
}

/// Reject deadlines librdkafka cannot represent.
pub fn check_timeout(name: &str, timeout: Duration) -> Result<Duration, ConfigError> {
    if timeout > MAX_TIMEOUT {
        return Err(invalid(
            name,
            format!(
                "{}s exceeds the maximum of {}s",
                timeout.as_secs(),
                MAX_TIMEOUT_SECS
            ),
        ));
    }
    Ok(timeout)
}

fn parse_bootstrap_servers(value: &str) -> Result<Vec<String>, ConfigError> {
    let servers: Vec<String> = value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if servers.is_empty() {
        return Err(ConfigError::MissingRequired(
            ENV_BOOTSTRAP_SERVERS.to_string(),
        ));
    }

    for server in &servers {
        let (host, port) = server.rsplit_once(':').ok_or_else(|| {
            invalid(
                ENV_BOOTSTRAP_SERVERS,
                format!("'{}' is not in host:port form", server),
            )
        })?;
        if host.is_empty() {
            return Err(invalid(
                ENV_BOOTSTRAP_SERVERS,
                format!("'{}' has an empty host", server),
            ));
        }
        match port.parse::<u16>() {
            Ok(p) if p > 0 => {}
            _ => {
                return Err(invalid(
                    ENV_BOOTSTRAP_SERVERS,
                    format!("'{}' has an invalid port", server),
                ))
            }
        }
    }

    Ok(servers)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// How deliveries are confirmed during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryMode {
    /// Submit every line, then flush once at the end.
    #[default]
    Batched,
    /// Flush and await each message before submitting the next.
    PerMessage,
}

/// Topic, key and flush behaviour for a publish run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishSettings {
    pub topic: String,
    /// Partition key shared by every message of the run
    pub key: String,
    pub flush_timeout: Duration,
    pub mode: DeliveryMode,
}

impl Default for PublishSettings {
    fn default() -> Self {
        Self {
            topic: DEFAULT_TOPIC.to_string(),
            key: DEFAULT_KEY.to_string(),
            flush_timeout: DEFAULT_FLUSH_TIMEOUT,
            mode: DeliveryMode::default(),
        }
    }
}

impl PublishSettings {
    pub fn new(topic: impl Into<String>, key: impl Into<String>) -> Result<Self, ConfigError> {
        let topic = topic.into();
        validate_topic(&topic)?;

        Ok(Self {
            topic,
            key: key.into(),
            ..Default::default()
        })
    }

    pub fn with_flush_timeout(mut self, timeout: Duration) -> Result<Self, ConfigError> {
        self.flush_timeout = check_timeout("flush_timeout", timeout)?;
        Ok(self)
    }

    pub fn with_mode(mut self, mode: DeliveryMode) -> Self {
        self.mode = mode;
        self
    }
}

fn validate_topic(topic: &str) -> Result<(), ConfigError> {
    if topic.is_empty() {
        return Err(ConfigError::MissingRequired("topic".to_string()));
    }
    if topic == "." || topic == ".." {
        return Err(invalid("topic", format!("'{}' is reserved", topic)));
    }
    if topic.len() > MAX_TOPIC_LEN {
        return Err(invalid(
            "topic",
            format!("longer than {} characters", MAX_TOPIC_LEN),
        ));
    }
    if let Some(c) = topic
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
    {
        return Err(invalid(
            "topic",
            format!("'{}' contains illegal character '{}'", topic, c),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(vars: &[(&str, &str)]) -> Option<::config::Map<String, String>> {
        Some(
            vars.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_defaults_when_env_unset() {
        let config = ConnectionConfig::load_from(None, env(&[])).unwrap();

        assert_eq!(config.bootstrap_servers, vec!["localhost:9093".to_string()]);
        assert_eq!(config.security_protocol, SecurityProtocol::Ssl);
        assert_eq!(config.client_id, "py-producer");
        assert!(config.enable_idempotence);
        assert!(config.ssl_ca_location.is_some());
        assert_eq!(config, ConnectionConfig::default());
    }

    #[test]
    fn test_env_override_wins() {
        let config = ConnectionConfig::load_from(
            None,
            env(&[
                (ENV_BOOTSTRAP_SERVERS, "test:1234"),
                (ENV_SECURITY_PROTOCOL, "PLAINTEXT"),
                (ENV_SSL_CA_LOCATION, "/tmp/ca.crt"),
                (ENV_CLIENT_ID, "test-client"),
                (ENV_ENABLE_IDEMPOTENCE, "False"),
            ]),
        )
        .unwrap();

        assert_eq!(config.bootstrap_servers, vec!["test:1234".to_string()]);
        assert_eq!(config.security_protocol, SecurityProtocol::Plaintext);
        assert_eq!(config.ssl_ca_location, Some(PathBuf::from("/tmp/ca.crt")));
        assert_eq!(config.client_id, "test-client");
        assert!(!config.enable_idempotence);
    }

    #[test]
    fn test_empty_env_value_falls_back_to_default() {
        let config =
            ConnectionConfig::load_from(None, env(&[(ENV_BOOTSTRAP_SERVERS, "")])).unwrap();
        assert_eq!(config.bootstrap_servers(), "localhost:9093");
    }

    #[test]
    fn test_multiple_bootstrap_servers() {
        let config = ConnectionConfig::load_from(
            None,
            env(&[(ENV_BOOTSTRAP_SERVERS, "broker-1:9093, broker-2:9093")]),
        )
        .unwrap();

        assert_eq!(config.bootstrap_servers.len(), 2);
        assert_eq!(config.bootstrap_servers(), "broker-1:9093,broker-2:9093");
    }

    #[test]
    fn test_invalid_bootstrap_server_rejected() {
        for bad in ["localhost", ":9093", "localhost:0", "localhost:port"] {
            let err = ConnectionConfig::load_from(None, env(&[(ENV_BOOTSTRAP_SERVERS, bad)]))
                .unwrap_err();
            match err {
                ConfigError::InvalidValue { key, .. } => assert_eq!(key, ENV_BOOTSTRAP_SERVERS),
                other => panic!("unexpected error for '{}': {}", bad, other),
            }
        }
    }

    #[test]
    fn test_unknown_security_protocol_rejected() {
        let err = ConnectionConfig::load_from(None, env(&[(ENV_SECURITY_PROTOCOL, "TLS1.3")]))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_SECURITY_PROTOCOL));
    }

    #[test]
    fn test_security_protocol_is_case_insensitive() {
        assert_eq!("sasl_ssl".parse::<SecurityProtocol>(), Ok(SecurityProtocol::SaslSsl));
        assert_eq!("Plaintext".parse::<SecurityProtocol>(), Ok(SecurityProtocol::Plaintext));
        assert!(SecurityProtocol::SaslSsl.uses_tls());
        assert!(!SecurityProtocol::SaslPlaintext.uses_tls());
    }

    #[test]
    fn test_invalid_idempotence_flag_rejected() {
        let err =
            ConnectionConfig::load_from(None, env(&[(ENV_ENABLE_IDEMPOTENCE, "maybe")]))
                .unwrap_err();
        match err {
            ConfigError::InvalidValue { key, message } => {
                assert_eq!(key, ENV_ENABLE_IDEMPOTENCE);
                assert!(message.contains("maybe"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_flag_spellings() {
        for yes in ["true", "TRUE", "1", "yes", "On"] {
            assert_eq!(parse_flag(yes), Some(true), "{}", yes);
        }
        for no in ["false", "False", "0", "no", "off"] {
            assert_eq!(parse_flag(no), Some(false), "{}", no);
        }
        assert_eq!(parse_flag(""), None);
    }

    #[test]
    fn test_client_config_pass_through() {
        let config = ConnectionConfig::default();
        let client_config = config.to_client_config();

        assert_eq!(client_config.get("bootstrap.servers"), Some("localhost:9093"));
        assert_eq!(client_config.get("security.protocol"), Some("SSL"));
        assert_eq!(client_config.get("client.id"), Some("py-producer"));
        assert_eq!(client_config.get("enable.idempotence"), Some("true"));
        assert_eq!(
            client_config.get("ssl.ca.location"),
            Some("/etc/line-publisher/certs/ca.crt")
        );
    }

    #[test]
    fn test_client_config_idempotence_disabled() {
        let config = ConnectionConfig {
            enable_idempotence: false,
            ..Default::default()
        };
        assert_eq!(
            config.to_client_config().get("enable.idempotence"),
            Some("false")
        );
    }

    #[test]
    fn test_plaintext_omits_ca_location() {
        let config = ConnectionConfig {
            security_protocol: SecurityProtocol::Plaintext,
            ..Default::default()
        };
        let client_config = config.to_client_config();
        assert!(client_config.get("ssl.ca.location").is_none());
        assert!(client_config
            .get("ssl.endpoint.identification.algorithm")
            .is_none());

        // The same location is forwarded once TLS is on
        let config = ConnectionConfig::default();
        assert_eq!(
            config.to_client_config().get("ssl.ca.location"),
            Some("/etc/line-publisher/certs/ca.crt")
        );
    }

    #[test]
    fn test_sasl_requires_credentials() {
        let err = ConnectionConfig::load_from(
            None,
            env(&[(ENV_SECURITY_PROTOCOL, "SASL_PLAINTEXT")]),
        )
        .unwrap_err();
        match err {
            ConfigError::MissingRequired(what) => assert!(what.contains(ENV_SASL_USERNAME)),
            other => panic!("unexpected error: {}", other),
        }

        let err = ConnectionConfig::load_from(
            None,
            env(&[
                (ENV_SECURITY_PROTOCOL, "SASL_SSL"),
                (ENV_SASL_USERNAME, "producer"),
            ]),
        )
        .unwrap_err();
        assert!(err.to_string().contains(ENV_SASL_PASSWORD));
    }

    #[test]
    fn test_sasl_rejects_unsupported_mechanism() {
        let err = ConnectionConfig::load_from(
            None,
            env(&[
                (ENV_SECURITY_PROTOCOL, "SASL_PLAINTEXT"),
                (ENV_SASL_MECHANISM, "GSSAPI"),
                (ENV_SASL_USERNAME, "producer"),
                (ENV_SASL_PASSWORD, "secret"),
            ]),
        )
        .unwrap_err();
        match err {
            ConfigError::InvalidValue { key, .. } => assert_eq!(key, ENV_SASL_MECHANISM),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_sasl_credentials_reach_client_config() {
        let config = ConnectionConfig::load_from(
            None,
            env(&[
                (ENV_SECURITY_PROTOCOL, "SASL_SSL"),
                (ENV_SASL_MECHANISM, "scram_sha_512"),
                (ENV_SASL_USERNAME, "producer"),
                (ENV_SASL_PASSWORD, "secret"),
            ]),
        )
        .unwrap();

        let sasl = config.sasl.as_ref().expect("sasl credentials");
        assert_eq!(sasl.mechanism, SaslMechanism::ScramSha512);
        assert!(!format!("{:?}", sasl).contains("secret"));

        let client_config = config.to_client_config();
        assert_eq!(client_config.get("sasl.mechanism"), Some("SCRAM-SHA-512"));
        assert_eq!(client_config.get("sasl.username"), Some("producer"));
        assert_eq!(client_config.get("sasl.password"), Some("secret"));
    }

    #[test]
    fn test_sasl_settings_ignored_without_sasl_protocol() {
        let config = ConnectionConfig::load_from(
            None,
            env(&[(ENV_SASL_MECHANISM, "GSSAPI"), (ENV_SASL_USERNAME, "producer")]),
        )
        .unwrap();
        assert!(config.sasl.is_none());
        assert!(config.to_client_config().get("sasl.mechanism").is_none());
    }

    #[test]
    fn test_endpoint_identification() {
        let config = ConnectionConfig::load_from(None, env(&[])).unwrap();
        assert_eq!(
            config.to_client_config().get("ssl.endpoint.identification.algorithm"),
            Some("https")
        );

        let config = ConnectionConfig::load_from(
            None,
            env(&[(ENV_SSL_ENDPOINT_IDENTIFICATION, "NONE")]),
        )
        .unwrap();
        assert_eq!(config.ssl_endpoint_identification, EndpointIdentification::None);
        assert_eq!(
            config.to_client_config().get("ssl.endpoint.identification.algorithm"),
            Some("none")
        );

        let err = ConnectionConfig::load_from(
            None,
            env(&[(ENV_SSL_ENDPOINT_IDENTIFICATION, "dns")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains(ENV_SSL_ENDPOINT_IDENTIFICATION));
    }

    #[test]
    fn test_flush_timeout_bounds() {
        let settings = PublishSettings::default()
            .with_flush_timeout(MAX_TIMEOUT)
            .unwrap();
        assert_eq!(settings.flush_timeout, MAX_TIMEOUT);

        let err = PublishSettings::default()
            .with_flush_timeout(MAX_TIMEOUT + Duration::from_secs(1))
            .unwrap_err();
        assert!(err.to_string().contains("flush_timeout"));

        assert!(PublishSettings::default()
            .with_flush_timeout(Duration::from_secs(u64::MAX))
            .is_err());
        assert!(check_timeout("connect_timeout", Duration::ZERO).is_ok());
        // The largest accepted deadline still fits librdkafka's i32 milliseconds
        assert!(MAX_TIMEOUT.as_millis() < i32::MAX as u128);
    }

    #[test]
    fn test_publish_settings_defaults() {
        let settings = PublishSettings::default();
        assert_eq!(settings.topic, "local-input-topic");
        assert_eq!(settings.key, "orders");
        assert_eq!(settings.flush_timeout, Duration::from_secs(10));
        assert_eq!(settings.mode, DeliveryMode::Batched);
    }

    #[test]
    fn test_topic_validation() {
        assert!(PublishSettings::new("orders.v1_local-input", "orders").is_ok());
        assert!(PublishSettings::new("", "orders").is_err());
        assert!(PublishSettings::new("..", "orders").is_err());
        assert!(PublishSettings::new("bad topic", "orders").is_err());
        assert!(PublishSettings::new("a".repeat(MAX_TOPIC_LEN + 1), "orders").is_err());
    }
}
