use anyhow::Result;
use modelvault_core::Config;

pub async fn execute(key: Option<&str>, value: Option<&str>) -> Result<()> {
    match (key, value) {
        // Show effective config, environment overrides included
        (None, None) => {
            let config = Config::load()?;
            println!("Configuration file: {:?}\n", Config::config_path()?);
            println!("[storage]");
            println!("  target = \"{}\"", config.storage.target);
            println!("  local_root = {:?}", config.storage.local_root.display().to_string());
            println!(
                "  bucket = {}",
                config.storage.bucket.as_deref().unwrap_or("(not set)")
            );
            println!();
            println!("[gcs]");
            println!("  endpoint = \"{}\"", config.gcs.endpoint);
            println!(
                "  token = {}",
                config.gcs.token.as_ref().map(|_| "***").unwrap_or("(not set)")
            );
        }

        // Get a specific key
        (Some(key), None) => {
            let config = Config::load()?;
            let value = get_config_value(&config, key)?;
            println!("{}", value);
        }

        // Set a specific key in the file, ignoring environment overrides
        (Some(key), Some(value)) => {
            let mut config = Config::load_file()?;
            set_config_value(&mut config, key, value)?;
            config.save()?;
            println!("Set {} = {}", key, value);
        }

        _ => unreachable!(),
    }

    Ok(())
}

fn get_config_value(config: &Config, key: &str) -> Result<String> {
    match key {
        "storage.target" => Ok(config.storage.target.to_string()),
        "storage.local_root" => Ok(config.storage.local_root.display().to_string()),
        "storage.bucket" => Ok(config.storage.bucket.clone().unwrap_or_default()),
        "gcs.endpoint" => Ok(config.gcs.endpoint.clone()),
        "gcs.token" => Ok(config
            .gcs
            .token
            .as_ref()
            .map(|_| "***".to_string())
            .unwrap_or_default()),
        _ => anyhow::bail!("Unknown config key: {}", key),
    }
}

fn set_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "storage.target" => config.storage.target = value.parse()?,
        "storage.local_root" => config.storage.local_root = value.into(),
        "storage.bucket" => {
            config.storage.bucket = if value.is_empty() {
                None
            } else {
                Some(value.to_string())
            }
        }
        "gcs.endpoint" => config.gcs.endpoint = value.to_string(),
        "gcs.token" => {
            config.gcs.token = if value.is_empty() {
                None
            } else {
                Some(value.to_string())
            }
        }
        _ => anyhow::bail!("Unknown config key: {}", key),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelvault_core::ModelTarget;

    #[test]
    fn set_then_get() {
        let mut config = Config::default();
        set_config_value(&mut config, "storage.target", "gcs").unwrap();
        set_config_value(&mut config, "storage.bucket", "depth-models").unwrap();
        set_config_value(&mut config, "gcs.token", "secret").unwrap();

        assert_eq!(config.storage.target, ModelTarget::Gcs);
        assert_eq!(get_config_value(&config, "storage.bucket").unwrap(), "depth-models");
        assert_eq!(get_config_value(&config, "gcs.token").unwrap(), "***");

        set_config_value(&mut config, "storage.bucket", "").unwrap();
        assert!(config.storage.bucket.is_none());
    }

    #[test]
    fn rejects_unknown_keys_and_targets() {
        let mut config = Config::default();
        assert!(set_config_value(&mut config, "storage.target", "mlflow").is_err());
        assert!(set_config_value(&mut config, "daemon.port", "1").is_err());
        assert!(get_config_value(&config, "inference.top_p").is_err());
    }
}
