use std::{env, fmt, fs, path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("could not read configuration file")]
    ReadFailed,
    #[error("could not write configuration file")]
    WriteFailed,
    #[error("could not parse configuration file")]
    ParseFailed,
    #[error("no usable configuration directory")]
    ConfigPathUnavailable,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    pub engine: Engine,
    pub storage: Storage,
    pub twilio: Twilio,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Engine {
    /// Seconds between sweeps over all checks
    pub sweep_interval_seconds: u64,
    /// Seconds between audit log rotation passes
    pub rotation_interval_seconds: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Storage {
    /// Directory holding record files, one subdirectory per entity kind
    pub data_dir: path::PathBuf,
    /// Directory holding per-check audit logs and their archives
    pub logs_dir: path::PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Twilio {
    pub account_sid: String,
    pub auth_token: String,
    pub from_phone: String,
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/vigil/config.toml or
/// $HOME/.config/...)
fn default_config_path() -> Result<path::PathBuf, Error> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(Error::ConfigPathUnavailable);
    };

    Ok(path.join("vigil/config.toml"))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: Engine {
                sweep_interval_seconds: 60,
                rotation_interval_seconds: 60 * 60 * 24,
            },
            storage: Storage {
                data_dir: ".data".into(),
                logs_dir: ".logs".into(),
            },
            twilio: Twilio {
                account_sid: String::new(),
                auth_token: String::new(),
                from_phone: String::new(),
            },
        }
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);

        writeln!(f, "Current Internal Configuration State:")?;
        write_title_1(f, "Engine")?;
        write_1(f, "Sweep Interval (s)", &self.engine.sweep_interval_seconds)?;
        write_1(
            f,
            "Rotation Interval (s)",
            &self.engine.rotation_interval_seconds,
        )?;
        write_title_1(f, "Storage")?;
        write_1(f, "Data Directory", &self.storage.data_dir.display())?;
        write_1(f, "Logs Directory", &self.storage.logs_dir.display())?;
        write_title_1(f, "Twilio")?;
        write_1(f, "Account SID", &self.twilio.account_sid)?;
        write_1(f, "From Phone", &self.twilio.from_phone)?;

        Ok(())
    }
}

impl Config {
    /// Generate Config structure from file
    ///
    /// Creates a default config in ~/.config/vigil/config.toml
    ///  or the specified path, with the name config.toml if one does not exist
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, Error> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else {
            default_config_path()?
        };

        if config_path.exists() {
            let raw_string = fs::read_to_string(&config_path).map_err(|_err| Error::ReadFailed)?;
            toml::from_str(raw_string.as_str()).map_err(|_err| Error::ParseFailed)
        } else {
            let config = Self::default();
            config.write_config(&config_path)?;
            Ok(config)
        }
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &std::path::Path) -> Result<(), Error> {
        let config_str: String = toml::to_string_pretty(self).map_err(|_err| Error::ParseFailed)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|_err| Error::WriteFailed)?;
        }

        std::fs::write(path, config_str).map_err(|_err| Error::WriteFailed)
    }
}
