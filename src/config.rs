use chrono_tz::Tz;
use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Destination timezone used to evaluate venue-local opening hours
    #[serde(default = "default_timezone")]
    pub destination_timezone: Tz,

    /// Interest categories the daily tip rotates through, comma-separated
    #[serde(default = "default_tip_categories")]
    pub daily_tip_categories: String,

    /// Fixed RNG seed for reproducible selection (testing/debugging only)
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_timezone() -> Tz {
    chrono_tz::Europe::Madrid
}

fn default_tip_categories() -> String {
    "culture,food,nature,beach,active,shopping".to_string()
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// The daily-tip rotation list as owned category strings.
    pub fn tip_categories(&self) -> Vec<String> {
        self.daily_tip_categories
            .split(',')
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty())
            .collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            destination_timezone: default_timezone(),
            daily_tip_categories: default_tip_categories(),
            rng_seed: None,
        }
    }
}
