use crate::error::CliError;
use clap::{Args, Parser, Subcommand};
use libphoton::application::{GAME_PORT, MASTER_PORT};
use libphoton::DebugLevel;
use photon_client::LoopbackModel;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Photon server administration.
///
/// Reads the properties of a Photon server application, or drains its actors before it is stopped.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Config {
    /// Path to the configuration file. The default is `$HOME/.photon-admin/config.yml`.
    #[arg(long = "config-file", short = 'c', env = "PHOTON_ADMIN_CONFIG")]
    pub config_file: Option<PathBuf>,
    /// IP address of the Photon server. Overrides the configuration file.
    #[arg(long = "address", short = 'a', env = "PHOTON_ADMIN_ADDRESS")]
    pub address: Option<String>,
    /// Photon application name, `Game` or `Master`. Overrides the configuration file. The default is `Game`.
    #[arg(long = "name", short = 'n')]
    pub application: Option<String>,
    /// Print results as JSON.
    #[arg(long = "json", default_value_t = false)]
    pub json: bool,
    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Print the root component's properties as `key=value` lines. This is the default command.
    #[command(name = "props", alias = "properties")]
    Props,
    /// Stop admitting actors and wait for the existing ones to leave.
    #[command(name = "stop", alias = "drain")]
    Stop(StopCommand),
}

#[derive(Debug, Args)]
pub struct StopCommand {
    /// The drain is complete once the actor count is at or below this value.
    #[arg(long = "threshold", short = 't', default_value_t = 0)]
    pub threshold: i64,
    /// Give up waiting after this many milliseconds.
    #[arg(long = "timeout-ms")]
    pub timeout_ms: u64,
    /// Milliseconds between two actor count polls.
    #[arg(long = "interval-ms", default_value_t = 10_000)]
    pub interval_ms: u64,
}

pub struct GlobalOptions {
    pub config_file: Option<PathBuf>,
    pub address: Option<String>,
    pub application: Option<String>,
    pub json: bool,
}

impl Config {
    pub fn to_parts(self) -> (GlobalOptions, CliCommand) {
        let global = GlobalOptions {
            config_file: self.config_file,
            address: self.address,
            application: self.application,
            json: self.json,
        };
        (global, self.command.unwrap_or(CliCommand::Props))
    }
}

/// Defaults read from the configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub address: String,
    pub application: String,
    pub master_port: u16,
    pub game_port: u16,
    pub service_interval_ms: u64,
    pub connect_timeout_ms: Option<u64>,
    pub request_timeout_ms: Option<u64>,
    pub debug_level: DebugLevel,
    /// Behaviour of the in-memory server the commands run against.
    pub loopback: LoopbackModel,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            application: "Game".to_string(),
            master_port: MASTER_PORT,
            game_port: GAME_PORT,
            service_interval_ms: 100,
            connect_timeout_ms: Some(10_000),
            request_timeout_ms: None,
            debug_level: DebugLevel::default(),
            loopback: LoopbackModel::default(),
        }
    }
}

impl Settings {
    /// Load the settings at `path`, or at the default location when `path` is `None`.
    ///
    /// A missing file at the default location yields the default settings. A missing file that was asked for
    /// explicitly is an error.
    pub fn try_load<P: AsRef<Path>>(path: Option<P>) -> Result<Self, CliError> {
        match path {
            Some(path) => load_settings_file(path),
            None => match load_settings_file(default_config_path()) {
                Err(CliError::IoError(err)) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
                other => other,
            },
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), CliError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_yml::to_writer(writer, self)?;
        Ok(())
    }
}

pub fn default_config_path() -> PathBuf {
    let mut home = std::env::home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.push(".photon-admin");
    home.push("config.yml");
    home
}

fn load_settings_file<P: AsRef<Path>>(path: P) -> Result<Settings, CliError> {
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    let settings = serde_yml::from_reader(reader)?;
    Ok(settings)
}
