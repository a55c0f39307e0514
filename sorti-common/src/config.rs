//! Configuration loading and database path resolution

use crate::{Error, Result};
use std::path::PathBuf;

/// Database path resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file (`database` key)
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_database_path(cli_arg: Option<&std::path::Path>, env_var_name: &str) -> Result<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Ok(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        return Ok(PathBuf::from(path));
    }

    // Priority 3: TOML config file
    if let Ok(config_path) = load_config_file() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(database) = config.get("database").and_then(|v| v.as_str()) {
                    return Ok(PathBuf::from(database));
                }
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    Ok(default_data_dir().join("sorti.db"))
}

/// Get the configuration file path for the platform
fn load_config_file() -> Result<PathBuf> {
    let user_config = dirs::config_dir()
        .map(|d| d.join("sortimate").join("config.toml"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;

    if user_config.exists() {
        return Ok(user_config);
    }

    let system_config = PathBuf::from("/etc/sortimate/config.toml");
    if system_config.exists() {
        return Ok(system_config);
    }

    Err(Error::Config("No config file found".to_string()))
}

/// OS-dependent default data folder
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("sortimate"))
        .unwrap_or_else(|| PathBuf::from("./sortimate_data"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_cli_arg_wins() {
        let path = resolve_database_path(Some(Path::new("/tmp/cli.db")), "SORTI_TEST_UNSET_VAR")
            .unwrap();
        assert_eq!(path, PathBuf::from("/tmp/cli.db"));
    }

    #[test]
    fn test_env_var_used_when_no_cli_arg() {
        std::env::set_var("SORTI_TEST_DB_VAR", "/tmp/env.db");
        let path = resolve_database_path(None, "SORTI_TEST_DB_VAR").unwrap();
        assert_eq!(path, PathBuf::from("/tmp/env.db"));
        std::env::remove_var("SORTI_TEST_DB_VAR");
    }

    #[test]
    fn test_fallback_is_data_dir() {
        let path = resolve_database_path(None, "SORTI_TEST_UNSET_VAR").unwrap();
        assert!(path.ends_with("sorti.db"));
    }
}
