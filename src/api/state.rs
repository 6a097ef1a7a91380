use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::Config;
use crate::services::session_history::SessionHistoryStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// The only mutable state shared across requests.
    pub history: SessionHistoryStore,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            history: SessionHistoryStore::default(),
        }
    }

    /// Per-request RNG. Seeded from config when a fixed seed is set, which
    /// makes selection reproducible in tests and debugging sessions.
    pub fn rng(&self) -> StdRng {
        match self.config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
