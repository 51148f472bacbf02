use std::time::Duration;

/// Settings shared by the built-in behaviors
#[derive(Debug, Clone)]
pub struct NodesConfig {
    /// Base URL of the agent query service; `/query` is appended
    pub agent_api_url: Option<String>,
    /// How long a pool watcher observes before reporting
    pub watch_delay: Duration,
    /// Optional timeout for agent requests; none by default
    pub request_timeout: Option<Duration>,
}

impl NodesConfig {
    /// Read `AGENT_API_URL` from the environment
    pub fn from_env() -> Self {
        Self {
            agent_api_url: std::env::var("AGENT_API_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            ..Self::default()
        }
    }

    pub fn with_agent_api_url(mut self, url: impl Into<String>) -> Self {
        self.agent_api_url = Some(url.into());
        self
    }

    pub fn with_watch_delay(mut self, delay: Duration) -> Self {
        self.watch_delay = delay;
        self
    }
}

impl Default for NodesConfig {
    fn default() -> Self {
        Self {
            agent_api_url: None,
            watch_delay: Duration::from_millis(800),
            request_timeout: None,
        }
    }
}
