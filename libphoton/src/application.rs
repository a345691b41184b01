use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

pub const MASTER_PORT: u16 = 6000;
pub const GAME_PORT: u16 = 6001;

/// The server applications that can be administered. Each listens on its own well-known port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Application {
    Master,
    Game,
}

impl Application {
    pub fn name(&self) -> &'static str {
        match self {
            Application::Master => "Master",
            Application::Game => "Game",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Application::Master => MASTER_PORT,
            Application::Game => GAME_PORT,
        }
    }
}

impl Display for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Error)]
#[error("Application name should be Master or Game, got '{0}'")]
pub struct UnknownApplication(pub String);

impl FromStr for Application {
    type Err = UnknownApplication;

    /// Application names are case-sensitive, as the server matches them exactly.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Master" => Ok(Application::Master),
            "Game" => Ok(Application::Game),
            other => Err(UnknownApplication(other.to_string())),
        }
    }
}
