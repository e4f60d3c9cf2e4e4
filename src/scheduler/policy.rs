use serde::{Deserialize, Serialize};

use super::resource::Method;

/// Per-method enable switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct MethodToggles {
    #[serde(default = "enabled")]
    pub dns_prefetch: bool,
    #[serde(default = "enabled")]
    pub preconnect: bool,
    #[serde(default = "enabled")]
    pub modulepreload: bool,
    #[serde(default = "enabled")]
    pub preload: bool,
    #[serde(default = "enabled")]
    pub prefetch: bool,
}

fn enabled() -> bool {
    true
}

impl Default for MethodToggles {
    fn default() -> Self {
        Self::all(true)
    }
}

impl MethodToggles {
    pub fn all(on: bool) -> Self {
        Self {
            dns_prefetch: on,
            preconnect: on,
            modulepreload: on,
            preload: on,
            prefetch: on,
        }
    }

    pub fn is_enabled(&self, method: Method) -> bool {
        match method {
            Method::DnsPrefetch => self.dns_prefetch,
            Method::Preconnect => self.preconnect,
            Method::ModulePreload => self.modulepreload,
            Method::Preload => self.preload,
            Method::Prefetch => self.prefetch,
        }
    }

    pub fn set(&mut self, method: Method, on: bool) {
        let flag = match method {
            Method::DnsPrefetch => &mut self.dns_prefetch,
            Method::Preconnect => &mut self.preconnect,
            Method::ModulePreload => &mut self.modulepreload,
            Method::Preload => &mut self.preload,
            Method::Prefetch => &mut self.prefetch,
        };
        *flag = on;
    }

    pub fn any_enabled(&self) -> bool {
        Method::ALL.into_iter().any(|m| self.is_enabled(m))
    }
}

/// Dispatch policy for one scheduler instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerPolicy {
    /// Maximum simultaneously reserved dispatch slots; clamped to at least 1.
    pub max_concurrency: usize,
    pub methods: MethodToggles,
}

impl SchedulerPolicy {
    pub fn new(max_concurrency: usize, methods: MethodToggles) -> Self {
        Self {
            max_concurrency: max_concurrency.max(1),
            methods,
        }
    }
}

impl Default for SchedulerPolicy {
    fn default() -> Self {
        Self::new(2, MethodToggles::default())
    }
}
