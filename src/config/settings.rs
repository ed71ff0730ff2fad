#[derive(Debug, Clone)]
pub struct CompetitionSettings {
    /// Fallback challenge window when a tournament or ladder does not set one.
    pub default_challenge_window_mins: i64,
    pub min_participants: usize,
    pub sweep_interval_secs: u64,
}

impl Default for CompetitionSettings {
    fn default() -> Self {
        Self {
            default_challenge_window_mins: 2880, // 48h to play and report
            min_participants: 2,
            sweep_interval_secs: 300,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CollaboratorSettings {
    pub identity_base_url: String,
    pub directory_base_url: String,
    pub notify_base_url: String,
    pub user_agent: &'static str,
    pub timeout_secs: u64,
}

impl Default for CollaboratorSettings {
    fn default() -> Self {
        Self {
            identity_base_url: env_or("IDENTITY_SERVICE_URL", "http://localhost:7401"),
            directory_base_url: env_or("DIRECTORY_SERVICE_URL", "http://localhost:7402"),
            notify_base_url: env_or("NOTIFY_SERVICE_URL", "http://localhost:7403"),
            user_agent: "Courtside/1.0",
            timeout_secs: 10,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub competition: CompetitionSettings,
    pub collaborators: CollaboratorSettings,
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }
}
