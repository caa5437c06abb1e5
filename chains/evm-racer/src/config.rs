use crate::cli::Cli;
use config::{Config, Environment, File, FileFormat};
use core_logic::{ConfigError, RaceSettings};
use std::path::Path;

/// Prefix of environment variables that override settings, e.g. `RACER_CHAIN_ID`.
pub const ENV_PREFIX: &str = "RACER";

/// Load settings from an optional TOML file, then the environment.
pub fn load_settings(path: Option<&str>) -> Result<RaceSettings, ConfigError> {
    let mut builder = Config::builder();

    if let Some(path) = path {
        if !Path::new(path).exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_string(),
            });
        }
        builder = builder.add_source(File::new(path, FileFormat::Toml));
    }

    let settings: RaceSettings = builder
        .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
        .build()
        .and_then(|c| c.try_deserialize())
        .map_err(|e| ConfigError::LoadFailed {
            source_name: path.unwrap_or("environment").to_string(),
            msg: e.to_string(),
        })?;

    settings.validate()?;
    Ok(settings)
}

/// Flags given on the command line win over file and environment.
pub fn apply_overrides(mut settings: RaceSettings, cli: &Cli) -> Result<RaceSettings, ConfigError> {
    if let Some(chain_id) = cli.chain_id {
        settings.chain_id = Some(chain_id);
    }
    if let Some(poll_ms) = cli.poll_ms {
        settings.receipt_poll_ms = poll_ms;
    }
    if let Some(deadline) = cli.deadline_secs {
        settings.deadline_secs = Some(deadline);
    }

    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    fn settings_file(body: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_from_file() {
        let file = settings_file("chain_id = 3\nreceipt_poll_ms = 250\n");
        let settings = load_settings(file.path().to_str()).unwrap();

        assert_eq!(settings.chain_id, Some(3));
        assert_eq!(settings.receipt_poll_interval(), Duration::from_millis(250));
        assert_eq!(settings.fallback_gas_price_gwei, 5);
    }

    #[test]
    fn test_missing_file_is_reported() {
        let err = load_settings(Some("/definitely/not/here.toml")).unwrap_err();
        assert_eq!(
            err,
            ConfigError::FileNotFound {
                path: "/definitely/not/here.toml".to_string()
            }
        );
    }

    #[test]
    fn test_invalid_file_values_fail_validation() {
        let file = settings_file("receipt_poll_ms = 0\n");
        assert!(matches!(
            load_settings(file.path().to_str()),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_malformed_file_is_a_load_failure() {
        let file = settings_file("receipt_poll_ms = \"soon\"\n");
        assert!(matches!(
            load_settings(file.path().to_str()),
            Err(ConfigError::LoadFailed { .. })
        ));
    }

    #[test]
    fn test_environment_overrides_defaults() {
        std::env::set_var("RACER_CONNECT_TIMEOUT_SECS", "4");
        let settings = load_settings(None).unwrap();
        std::env::remove_var("RACER_CONNECT_TIMEOUT_SECS");

        assert_eq!(settings.connect_timeout(), Duration::from_secs(4));
    }

    #[test]
    fn test_cli_flags_win() {
        let cli = Cli::try_parse_from([
            "evm-racer",
            "--chain-id",
            "5",
            "--deadline-secs",
            "90",
            "sendToMulNodes",
            "21000",
            "1",
            "00",
            "0x00",
            "1",
        ])
        .unwrap();

        let settings = apply_overrides(RaceSettings::default(), &cli).unwrap();
        assert_eq!(settings.chain_id, Some(5));
        assert_eq!(settings.deadline(), Some(Duration::from_secs(90)));
        assert_eq!(settings.receipt_poll_ms, 1000);
    }

    #[test]
    fn test_zero_chain_id_flag_is_rejected() {
        let cli = Cli::try_parse_from([
            "evm-racer",
            "--chain-id",
            "0",
            "send",
            "21000",
            "1",
            "00",
            "0x00",
            "1",
            "http://node-a:8545",
        ])
        .unwrap();
        assert!(apply_overrides(RaceSettings::default(), &cli).is_err());
    }
}
