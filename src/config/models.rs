use crate::humanize::HumanDuration;
use crate::issuer::HttpConfig;
use crate::links::{BoostSwitches, ConnectionGate, ConnectionInfo, EffectiveType};
use crate::scheduler::{MethodToggles, SchedulerPolicy};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub links: LinksConfig,
    #[serde(default)]
    pub board: BoardConfig,
    #[serde(default)]
    pub http: HttpSettings,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Dispatch limits and method switches
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_max_concurrent_prefetchers")]
    pub max_concurrent_prefetchers: usize,
    #[serde(default)]
    pub allow_query_prefetch: bool,
    #[serde(default)]
    pub methods: MethodToggles,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_prefetchers: default_max_concurrent_prefetchers(),
            allow_query_prefetch: false,
            methods: MethodToggles::default(),
        }
    }
}

impl SchedulerConfig {
    pub fn policy(&self) -> SchedulerPolicy {
        SchedulerPolicy::new(self.max_concurrent_prefetchers, self.methods)
    }
}

fn default_max_concurrent_prefetchers() -> usize {
    2
}

/// Connection-quality gate and the connection it is evaluated against
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
    #[serde(default = "default_true")]
    pub avoid_slow_connections: bool,
    #[serde(default = "default_true")]
    pub avoid_data_saver: bool,
    #[serde(default = "default_effective_type")]
    pub effective_type: EffectiveType,
    #[serde(default)]
    pub save_data: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            avoid_slow_connections: true,
            avoid_data_saver: true,
            effective_type: default_effective_type(),
            save_data: false,
        }
    }
}

impl NetworkConfig {
    pub fn gate(&self) -> ConnectionGate {
        ConnectionGate {
            avoid_slow_connections: self.avoid_slow_connections,
            avoid_data_saver: self.avoid_data_saver,
        }
    }

    pub fn connection(&self) -> ConnectionInfo {
        ConnectionInfo {
            effective_type: self.effective_type,
            save_data: self.save_data,
        }
    }
}

fn default_effective_type() -> EffectiveType {
    EffectiveType::FourG
}

/// Link discovery settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LinksConfig {
    /// Period between bulk rescans; zero disables them.
    #[serde(default = "default_scan_interval")]
    pub scan_interval: HumanDuration,
    #[serde(default = "default_true")]
    pub boost_in_viewport_links: bool,
    #[serde(default = "default_true")]
    pub boost_mouse_over_links: bool,
    /// Document whose host counts as same-origin for page prefetches.
    #[serde(default = "default_document_origin")]
    pub document_origin: String,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            scan_interval: default_scan_interval(),
            boost_in_viewport_links: true,
            boost_mouse_over_links: true,
            document_origin: default_document_origin(),
        }
    }
}

impl LinksConfig {
    pub fn boosts(&self) -> BoostSwitches {
        BoostSwitches {
            viewport: self.boost_in_viewport_links,
            hover: self.boost_mouse_over_links,
        }
    }
}

fn default_scan_interval() -> HumanDuration {
    HumanDuration::from_secs(3)
}

fn default_document_origin() -> String {
    "http://localhost/".to_string()
}

/// Status board settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BoardConfig {
    #[serde(default = "default_fadeout_delay")]
    pub fadeout_delay: HumanDuration,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            fadeout_delay: default_fadeout_delay(),
        }
    }
}

fn default_fadeout_delay() -> HumanDuration {
    HumanDuration::from_secs(5)
}

/// Network issuer settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpSettings {
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: HumanDuration,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: HumanDuration,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    pub proxy: Option<String>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout: default_connect_timeout(),
            request_timeout: default_request_timeout(),
            user_agent: default_user_agent(),
            max_body_bytes: default_max_body_bytes(),
            proxy: None,
        }
    }
}

impl HttpSettings {
    pub fn issuer_config(&self) -> HttpConfig {
        HttpConfig {
            connect_timeout: self.connect_timeout.as_duration(),
            request_timeout: self.request_timeout.as_duration(),
            user_agent: self.user_agent.clone(),
            max_body_bytes: self.max_body_bytes,
            proxy: self.proxy.clone(),
        }
    }
}

fn default_connect_timeout() -> HumanDuration {
    HumanDuration::from_secs(10)
}

fn default_request_timeout() -> HumanDuration {
    HumanDuration::from_secs(30)
}

fn default_user_agent() -> String {
    HttpConfig::default().user_agent
}

fn default_max_body_bytes() -> usize {
    2 * 1024 * 1024 // 2 MiB
}

/// HTTP API settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8088))
}

fn default_true() -> bool {
    true
}
