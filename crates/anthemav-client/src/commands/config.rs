//! Configuration commands.

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Dump the current configuration to stdout.
pub fn dump(config: &ClientConfig) -> ClientResult<()> {
    let toml_str = toml::to_string_pretty(config)
        .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))?;
    println!("# config.toml ({})", ClientConfig::default_path().display());
    println!("{}", toml_str);

    Ok(())
}

/// Validate the configuration, including CLI overrides.
pub fn validate(config: &ClientConfig, host: Option<&str>, port: Option<u16>) -> ClientResult<()> {
    config.logging.tracing_config().map_err(ClientError::Config)?;

    let device = config
        .device_config(host, port)
        .map_err(ClientError::Config)?;
    println!(
        "Device {} at {}:{} with zones {:?}.",
        device.identifier,
        device.host,
        device.port,
        device.enabled_zones()
    );

    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration file path.
pub fn path() -> ClientResult<()> {
    let config_path = ClientConfig::default_path();
    println!("config: {}", config_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_needs_a_host() {
        let config = ClientConfig::default();
        assert!(matches!(
            validate(&config, None, None),
            Err(ClientError::Config(_))
        ));
        assert!(validate(&config, Some("192.168.1.20"), None).is_ok());
    }

    #[test]
    fn default_config_serializes() {
        let toml_str = toml::to_string_pretty(&ClientConfig::default()).unwrap();
        assert!(toml_str.contains("[device]"));
        assert!(toml_str.contains("port = 14999"));
        assert!(toml_str.contains("[[device.zones]]"));
    }
}
