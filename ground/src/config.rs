//! Relay configuration: frame size, queue capacities, and the four listener
//! ports, layered from built-in defaults, an optional TOML file, `RELAY_*`
//! environment variables, and CLI flags.

use clap::Parser;
use config::{Config as ConfigSource, Environment, File};
use serde::Deserialize;

use space_relay_shared::queue::DEFAULT_CAPACITY;

/// Default total size, in bytes, of a TM transfer frame.
pub const DEFAULT_FRAME_SIZE: usize = 1115;

/// Default TCP port for the spacecraft-downlink (TM) endpoint.
pub const DEFAULT_SPACECRAFT_DOWNLINK_PORT: u16 = 5555;
/// Default TCP port for the MOC-RAF endpoint.
pub const DEFAULT_MOC_RAF_PORT: u16 = 5556;
/// Default TCP port for the spacecraft-uplink (TC) endpoint.
pub const DEFAULT_SPACECRAFT_UPLINK_PORT: u16 = 5557;
/// Default TCP port for the MOC-FSP endpoint.
pub const DEFAULT_MOC_FSP_PORT: u16 = 5558;

/// Relay configuration, loaded from an optional TOML file, environment
/// variables prefixed `RELAY_`, and finally CLI flags (highest priority).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Total byte length of every TM transfer frame read from the spacecraft.
    pub frame_size: usize,
    /// Capacity of the telemetry and command hand-off queues.
    pub queue_capacity: usize,
    /// TCP port the spacecraft connects to in order to push TM frames.
    pub spacecraft_downlink_port: u16,
    /// TCP port the MOC RAF consumer connects to in order to read TM frames.
    pub moc_raf_port: u16,
    /// TCP port the spacecraft connects to in order to receive CLTUs.
    pub spacecraft_uplink_port: u16,
    /// TCP port the MOC FSP producer connects to in order to send CLTUs.
    pub moc_fsp_port: u16,
    /// Bind address shared by all four listeners.
    pub bind_address: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            frame_size: DEFAULT_FRAME_SIZE,
            queue_capacity: DEFAULT_CAPACITY,
            spacecraft_downlink_port: DEFAULT_SPACECRAFT_DOWNLINK_PORT,
            moc_raf_port: DEFAULT_MOC_RAF_PORT,
            spacecraft_uplink_port: DEFAULT_SPACECRAFT_UPLINK_PORT,
            moc_fsp_port: DEFAULT_MOC_FSP_PORT,
            bind_address: "0.0.0.0".to_string(),
        }
    }
}

/// Command-line overrides for [`RelayConfig`]. Any flag left unset falls
/// back to the config file / environment / built-in default.
#[derive(Debug, Parser)]
#[command(name = "ground-relay", about = "CCSDS ground-station relay")]
pub struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long)]
    pub config: Option<String>,

    /// Total byte length of every TM transfer frame.
    #[arg(long)]
    pub frame_size: Option<usize>,

    /// Capacity of the telemetry and command hand-off queues.
    #[arg(long)]
    pub queue_capacity: Option<usize>,

    /// TCP port for the spacecraft-downlink (TM) endpoint.
    #[arg(long)]
    pub spacecraft_downlink_port: Option<u16>,

    /// TCP port for the MOC-RAF endpoint.
    #[arg(long)]
    pub moc_raf_port: Option<u16>,

    /// TCP port for the spacecraft-uplink (TC) endpoint.
    #[arg(long)]
    pub spacecraft_uplink_port: Option<u16>,

    /// TCP port for the MOC-FSP endpoint.
    #[arg(long)]
    pub moc_fsp_port: Option<u16>,

    /// Bind address shared by all four listeners.
    #[arg(long)]
    pub bind_address: Option<String>,
}

/// Mirror of [`RelayConfig`] with every field optional, used as the shape
/// layered TOML/environment sources are deserialized into before merging
/// over the built-in defaults.
#[derive(Debug, Default, Deserialize)]
struct PartialRelayConfig {
    frame_size: Option<usize>,
    queue_capacity: Option<usize>,
    spacecraft_downlink_port: Option<u16>,
    moc_raf_port: Option<u16>,
    spacecraft_uplink_port: Option<u16>,
    moc_fsp_port: Option<u16>,
    bind_address: Option<String>,
}

impl RelayConfig {
    /// Load configuration by layering the built-in defaults, an optional
    /// TOML file, `RELAY_*` environment variables, and CLI overrides, in
    /// increasing order of priority.
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let mut builder = ConfigSource::builder();

        if let Some(path) = &cli.config {
            builder = builder.add_source(File::with_name(path));
        }

        builder = builder.add_source(Environment::with_prefix("RELAY"));

        let partial: PartialRelayConfig = builder.build()?.try_deserialize()?;

        let mut cfg = RelayConfig::default();
        if let Some(v) = partial.frame_size {
            cfg.frame_size = v;
        }
        if let Some(v) = partial.queue_capacity {
            cfg.queue_capacity = v;
        }
        if let Some(v) = partial.spacecraft_downlink_port {
            cfg.spacecraft_downlink_port = v;
        }
        if let Some(v) = partial.moc_raf_port {
            cfg.moc_raf_port = v;
        }
        if let Some(v) = partial.spacecraft_uplink_port {
            cfg.spacecraft_uplink_port = v;
        }
        if let Some(v) = partial.moc_fsp_port {
            cfg.moc_fsp_port = v;
        }
        if let Some(v) = partial.bind_address {
            cfg.bind_address = v;
        }

        if let Some(v) = cli.frame_size {
            cfg.frame_size = v;
        }
        if let Some(v) = cli.queue_capacity {
            cfg.queue_capacity = v;
        }
        if let Some(v) = cli.spacecraft_downlink_port {
            cfg.spacecraft_downlink_port = v;
        }
        if let Some(v) = cli.moc_raf_port {
            cfg.moc_raf_port = v;
        }
        if let Some(v) = cli.spacecraft_uplink_port {
            cfg.spacecraft_uplink_port = v;
        }
        if let Some(v) = cli.moc_fsp_port {
            cfg.moc_fsp_port = v;
        }
        if let Some(v) = &cli.bind_address {
            cfg.bind_address = v.clone();
        }

        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_ports() {
        let cfg = RelayConfig::default();
        assert_eq!(cfg.spacecraft_downlink_port, 5555);
        assert_eq!(cfg.moc_raf_port, 5556);
        assert_eq!(cfg.spacecraft_uplink_port, 5557);
        assert_eq!(cfg.moc_fsp_port, 5558);
        assert_eq!(cfg.frame_size, 1115);
        assert_eq!(cfg.queue_capacity, 1000);
    }

    #[test]
    fn cli_overrides_take_priority() {
        let cli = Cli {
            config: None,
            frame_size: Some(64),
            queue_capacity: Some(4),
            spacecraft_downlink_port: None,
            moc_raf_port: None,
            spacecraft_uplink_port: None,
            moc_fsp_port: None,
            bind_address: None,
        };
        let cfg = RelayConfig::load(&cli).unwrap();
        assert_eq!(cfg.frame_size, 64);
        assert_eq!(cfg.queue_capacity, 4);
        assert_eq!(cfg.spacecraft_downlink_port, 5555);
    }
}
