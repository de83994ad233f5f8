use serde::{Deserialize, Serialize};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Default page fetch timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 10;
/// Default favicon probe (HEAD) timeout in seconds
const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 3;

const USER_AGENT_DEFAULT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Configuration for outbound page fetches
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Timeout for the page GET in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Timeout for the /favicon.ico HEAD probe in seconds
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    /// User-Agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// URL schemes allowed for outbound requests
    #[serde(default = "default_allowed_schemes")]
    pub allowed_schemes: Vec<String>,

    /// Hosts that are never fetched
    #[serde(default)]
    pub blocked_hosts: Vec<String>,

    /// Refuse to fetch hosts that resolve to loopback/private addresses
    #[serde(default)]
    pub block_private_ips: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
            user_agent: USER_AGENT_DEFAULT.to_string(),
            allowed_schemes: default_allowed_schemes(),
            blocked_hosts: Vec::new(),
            block_private_ips: false,
        }
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_probe_timeout_secs() -> u64 {
    DEFAULT_PROBE_TIMEOUT_SECS
}

fn default_user_agent() -> String {
    USER_AGENT_DEFAULT.to_string()
}

fn default_allowed_schemes() -> Vec<String> {
    vec!["http".to_string(), "https".to_string()]
}

fn default_bind_addr() -> String {
    DEFAULT_BIND_ADDR.to_string()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(skip_serializing, skip_deserializing)]
    path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            fetch: FetchConfig::default(),
            path: String::new(),
        }
    }
}

impl Config {
    fn validate(&mut self) {
        if self.fetch.timeout_secs == 0 {
            panic!("fetch.timeout_secs must be greater than 0");
        }

        if self.fetch.probe_timeout_secs == 0 {
            panic!("fetch.probe_timeout_secs must be greater than 0");
        }

        if self.fetch.allowed_schemes.is_empty() {
            panic!("fetch.allowed_schemes must not be empty");
        }

        if self.fetch.user_agent.trim().is_empty() {
            self.fetch.user_agent = USER_AGENT_DEFAULT.to_string();
        }
    }

    pub fn load_with(path: &str) -> Self {
        // create new if does not exist
        if std::fs::metadata(path).is_err() {
            std::fs::write(path, serde_yml::to_string(&Self::default()).unwrap())
                .expect("failed to write default config");
        }

        let config_str = std::fs::read_to_string(path).expect("failed to read config file");
        let mut config: Self = serde_yml::from_str(&config_str).expect("config is malformed");

        config.path = path.to_string();

        config.validate();

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config).unwrap() {
            config.save();
        }

        config
    }

    pub fn save(&self) {
        let config_str = serde_yml::to_string(&self).unwrap();
        std::fs::write(&self.path, config_str).expect("failed to write config file");
    }
}
