//! Layered application configuration
//!
//! Sources, lowest precedence first: `conf/application.yml` (or `--config`),
//! `PULSEGATE__*` environment variables, then command line flags. Everything
//! is read once at startup and converted into the immutable settings structs
//! the other crates take in their constructors.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use config::{Config, ConfigBuilder, Environment, File, FileFormat, builder::DefaultState};
use pulsegate_common::{Channel, DEFAULT_MAX_STRENGTH, DEVICE_STRENGTH_LIMIT, Waveform};
use pulsegate_control::{ControlConfig, KeepaliveConfig};

use crate::error::ConfigError;
use crate::startup::{LogRotation, LoggingConfig};

pub const DEFAULT_CONFIG_FILE: &str = "conf/application.yml";
pub const ENV_PREFIX: &str = "PULSEGATE";

pub const DEFAULT_OSC_LISTEN: &str = "127.0.0.1:9001";
pub const DEFAULT_OSC_SEND_TO: &str = "127.0.0.1:9000";
pub const DEFAULT_PARAMETER_PREFIX: &str = "/avatar/parameters/";
pub const DEFAULT_SWITCH_ADDRESS: &str = "/dglab/switch";

type Result<T> = std::result::Result<T, ConfigError>;

/// Command line arguments
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "pulsegate", version, about = "Drive a stimulation device from avatar parameters")]
pub struct Cli {
    /// Configuration file (YAML, TOML or JSON)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// Address the OSC listener binds to
    #[arg(long = "listen")]
    pub listen: Option<String>,
    /// Address status text is sent to
    #[arg(long = "send-to")]
    pub send_to: Option<String>,
    /// Strength sent for a parameter value of 1.0
    #[arg(long = "max-strength")]
    pub max_strength: Option<u32>,
    #[arg(long = "log-level", env = "PULSEGATE_LOG_LEVEL")]
    pub log_level: Option<String>,
}

/// Parameter suffixes routed to each channel
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelMap {
    a: Vec<String>,
    b: Vec<String>,
}

impl ChannelMap {
    pub fn new(a: Vec<String>, b: Vec<String>) -> Self {
        Self { a, b }
    }

    pub fn suffixes(&self, channel: Channel) -> &[String] {
        match channel {
            Channel::A => &self.a,
            Channel::B => &self.b,
        }
    }

    /// Every `(channel, suffix)` pair, channel A first
    pub fn iter(&self) -> impl Iterator<Item = (Channel, &str)> {
        Channel::ALL.into_iter().flat_map(move |channel| {
            self.suffixes(channel)
                .iter()
                .map(move |suffix| (channel, suffix.as_str()))
        })
    }

    pub fn len(&self) -> usize {
        self.a.len() + self.b.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// OSC transport settings
#[derive(Debug, Clone)]
pub struct OscConfig {
    pub listen: SocketAddr,
    pub send_to: SocketAddr,
    /// Prepended to each configured suffix to form the listened address
    pub parameter_prefix: String,
    pub switch_address: String,
    /// Announce bridge state changes as chatbox text
    pub status_messages: bool,
}

impl OscConfig {
    pub fn parameter_address(&self, suffix: &str) -> String {
        format!("{}{}", self.parameter_prefix, suffix)
    }
}

/// Application configuration loaded from config files and environment
#[derive(Clone, Debug, Default)]
pub struct Configuration {
    pub config: Config,
}

impl Configuration {
    /// Load from the process arguments
    pub fn new() -> Result<Self> {
        Self::from_cli(Cli::parse())
    }

    pub fn from_cli(cli: Cli) -> Result<Self> {
        // The default file is optional; an explicit one must exist
        let file = match &cli.config {
            Some(path) => File::from(path.as_path()).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let builder = Config::builder().add_source(file).add_source(environment());
        let config = apply_overrides(builder, &cli)?.build()?;
        Ok(Self { config })
    }

    /// Build from an inline YAML document plus CLI overrides, without
    /// consulting the environment
    pub fn from_yaml_str(yaml: &str, cli: &Cli) -> Result<Self> {
        let builder = Config::builder().add_source(File::from_str(yaml, FileFormat::Yaml));
        let config = apply_overrides(builder, cli)?.build()?;
        Ok(Self { config })
    }

    // ========================================================================
    // Channel Mapping
    // ========================================================================

    /// Parameter suffixes for one channel; empty when unset
    pub fn channel_suffixes(&self, channel: Channel) -> Vec<String> {
        // Keys may come back lowercased depending on the source
        let upper = channel.as_str();
        let lower = upper.to_ascii_lowercase();
        [upper, lower.as_str()]
            .into_iter()
            .find_map(|key| self.config.get::<Vec<String>>(key).ok())
            .unwrap_or_default()
            .into_iter()
            .map(|suffix| suffix.trim().to_string())
            .filter(|suffix| !suffix.is_empty())
            .collect()
    }

    pub fn channel_map(&self) -> Result<ChannelMap> {
        let map = ChannelMap::new(
            self.channel_suffixes(Channel::A),
            self.channel_suffixes(Channel::B),
        );
        if map.is_empty() {
            return Err(ConfigError::NoChannels);
        }
        Ok(map)
    }

    // ========================================================================
    // Control Configuration
    // ========================================================================

    pub fn max_strength(&self) -> i64 {
        self.config
            .get_int("control.max_strength")
            .unwrap_or(DEFAULT_MAX_STRENGTH.into())
    }

    pub fn rate_limit_ms(&self) -> i64 {
        self.config.get_int("control.rate_limit_ms").unwrap_or(500)
    }

    pub fn reset_interval_ms(&self) -> i64 {
        self.config.get_int("control.reset_interval_ms").unwrap_or(1000)
    }

    pub fn reset_enabled(&self) -> bool {
        self.config.get_bool("control.reset_enabled").unwrap_or(true)
    }

    pub fn enabled_on_start(&self) -> bool {
        self.config
            .get_bool("control.enabled_on_start")
            .unwrap_or(true)
    }

    pub fn control_config(&self) -> Result<ControlConfig> {
        let max_strength = self.max_strength();
        if !(1..=i64::from(DEVICE_STRENGTH_LIMIT)).contains(&max_strength) {
            return Err(ConfigError::invalid(
                "control.max_strength",
                format!("must be between 1 and {}", DEVICE_STRENGTH_LIMIT),
            ));
        }

        Ok(ControlConfig {
            max_strength: max_strength as u32,
            rate_limit_interval: millis("control.rate_limit_ms", self.rate_limit_ms(), true)?,
            reset_interval: millis("control.reset_interval_ms", self.reset_interval_ms(), false)?,
            reset_enabled: self.reset_enabled(),
            enabled_on_start: self.enabled_on_start(),
        })
    }

    // ========================================================================
    // OSC Configuration
    // ========================================================================

    pub fn osc_listen(&self) -> String {
        self.config
            .get_string("osc.listen")
            .unwrap_or(DEFAULT_OSC_LISTEN.to_string())
    }

    pub fn osc_send_to(&self) -> String {
        self.config
            .get_string("osc.send_to")
            .unwrap_or(DEFAULT_OSC_SEND_TO.to_string())
    }

    pub fn parameter_prefix(&self) -> String {
        self.config
            .get_string("osc.parameter_prefix")
            .unwrap_or(DEFAULT_PARAMETER_PREFIX.to_string())
    }

    pub fn switch_address(&self) -> String {
        self.config
            .get_string("osc.switch_address")
            .unwrap_or(DEFAULT_SWITCH_ADDRESS.to_string())
    }

    pub fn status_messages(&self) -> bool {
        self.config.get_bool("osc.status_messages").unwrap_or(true)
    }

    pub fn osc_config(&self) -> Result<OscConfig> {
        let parameter_prefix = self.parameter_prefix();
        if !parameter_prefix.starts_with('/') {
            return Err(ConfigError::invalid(
                "osc.parameter_prefix",
                "must start with '/'",
            ));
        }
        let switch_address = self.switch_address();
        if !switch_address.starts_with('/') {
            return Err(ConfigError::invalid(
                "osc.switch_address",
                "must start with '/'",
            ));
        }

        Ok(OscConfig {
            listen: socket_addr("osc.listen", &self.osc_listen())?,
            send_to: socket_addr("osc.send_to", &self.osc_send_to())?,
            parameter_prefix,
            switch_address,
            status_messages: self.status_messages(),
        })
    }

    // ========================================================================
    // Keep-alive Configuration
    // ========================================================================

    pub fn keepalive_enabled(&self) -> bool {
        self.config.get_bool("keepalive.enabled").unwrap_or(true)
    }

    pub fn keepalive_interval_secs(&self) -> i64 {
        self.config.get_int("keepalive.interval_secs").unwrap_or(15)
    }

    pub fn keepalive_duration_secs(&self) -> i64 {
        self.config.get_int("keepalive.duration_secs").unwrap_or(10)
    }

    pub fn keepalive_waveform(&self) -> String {
        self.config
            .get_string("keepalive.waveform")
            .unwrap_or("breath".to_string())
    }

    pub fn keepalive_config(&self) -> Result<KeepaliveConfig> {
        let interval_secs = self.keepalive_interval_secs();
        if interval_secs < 1 {
            return Err(ConfigError::invalid(
                "keepalive.interval_secs",
                "must be at least 1",
            ));
        }
        let duration_secs = u32::try_from(self.keepalive_duration_secs())
            .map_err(|_| ConfigError::invalid("keepalive.duration_secs", "must not be negative"))?;
        let name = self.keepalive_waveform();
        let waveform = Waveform::preset(&name).ok_or_else(|| {
            ConfigError::invalid("keepalive.waveform", format!("unknown waveform '{}'", name))
        })?;

        Ok(KeepaliveConfig {
            enabled: self.keepalive_enabled(),
            interval: Duration::from_secs(interval_secs as u64),
            duration_secs,
            waveform,
        })
    }

    // ========================================================================
    // Logging Configuration
    // ========================================================================

    pub fn log_level(&self) -> String {
        self.config
            .get_string("logging.level")
            .unwrap_or("info".to_string())
    }

    pub fn log_to_file(&self) -> bool {
        self.config.get_bool("logging.file").unwrap_or(false)
    }

    pub fn log_console(&self) -> bool {
        self.config.get_bool("logging.console").unwrap_or(true)
    }

    pub fn log_dir(&self) -> Option<String> {
        self.config.get_string("logging.dir").ok()
    }

    pub fn log_rotation(&self) -> Result<LogRotation> {
        match self.config.get::<LogRotation>("logging.rotation") {
            Ok(rotation) => Ok(rotation),
            Err(config::ConfigError::NotFound(_)) => Ok(LogRotation::Daily),
            Err(e) => Err(ConfigError::invalid("logging.rotation", e.to_string())),
        }
    }

    pub fn logging_config(&self) -> Result<LoggingConfig> {
        let level = self.log_level();
        let level = level
            .parse()
            .map_err(|_| ConfigError::invalid("logging.level", format!("unknown level '{}'", level)))?;

        let mut logging = LoggingConfig::from_config(
            self.log_dir(),
            self.log_console(),
            self.log_to_file(),
            level,
        );
        logging.rotation = self.log_rotation()?;
        Ok(logging)
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("a")
        .with_list_parse_key("b")
}

fn apply_overrides(
    mut builder: ConfigBuilder<DefaultState>,
    cli: &Cli,
) -> Result<ConfigBuilder<DefaultState>> {
    if let Some(v) = &cli.listen {
        builder = builder.set_override("osc.listen", v.as_str())?;
    }
    if let Some(v) = &cli.send_to {
        builder = builder.set_override("osc.send_to", v.as_str())?;
    }
    if let Some(v) = cli.max_strength {
        builder = builder.set_override("control.max_strength", i64::from(v))?;
    }
    if let Some(v) = &cli.log_level {
        builder = builder.set_override("logging.level", v.as_str())?;
    }
    Ok(builder)
}

fn millis(key: &'static str, value: i64, allow_zero: bool) -> Result<Duration> {
    let min = if allow_zero { 0 } else { 1 };
    if value < min {
        return Err(ConfigError::invalid(
            key,
            format!("must be at least {} ms", min),
        ));
    }
    Ok(Duration::from_millis(value as u64))
}

fn socket_addr(key: &'static str, value: &str) -> Result<SocketAddr> {
    value
        .parse()
        .map_err(|_| ConfigError::invalid(key, format!("'{}' is not a socket address", value)))
}
