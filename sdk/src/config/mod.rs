//! Configuration presets for the Kestrel client
//!
//! The recognised options are `host_port`, `tls_strategy`, `namespace`,
//! `token` and `slots`, plus worker and polling tuning. Every option can be
//! read from `KESTREL_*` environment variables.

use kestrel_core::ReconnectionStrategy;
use std::time::Duration;

/// Environment variables read by [`KestrelClientConfig::from_env`].
pub mod env {
    pub const HOST_PORT: &str = "KESTREL_HOST_PORT";
    pub const NAMESPACE: &str = "KESTREL_NAMESPACE";
    pub const TOKEN: &str = "KESTREL_TOKEN";
    pub const SLOTS: &str = "KESTREL_SLOTS";
    pub const TLS: &str = "KESTREL_TLS";
    pub const TLS_CA_CERT: &str = "KESTREL_TLS_CA_CERT";
    pub const TLS_DOMAIN: &str = "KESTREL_TLS_DOMAIN";
}

/// How the client secures its connection to the scheduler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsStrategy {
    /// Plain-text HTTP/2
    #[default]
    None,
    /// TLS, trusting the platform roots plus an optional CA certificate
    Tls {
        ca_cert_pem: Option<String>,
        /// Override for the server name checked against the certificate
        domain: Option<String>,
    },
}

impl TlsStrategy {
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Tls { .. })
    }
}

/// Configuration for the worker side of the client
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Maximum number of task invocations executing concurrently
    pub slots: usize,
    /// Timeout applied to tasks that do not declare their own
    pub default_task_timeout: Duration,
    /// How to re-open the command stream after losing it
    pub reconnection: ReconnectionStrategy,
    /// How long shutdown waits for in-flight invocations
    pub shutdown_grace: Duration,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl WorkerSettings {
    /// Default configuration suitable for most use cases
    pub const DEFAULT: Self = Self {
        slots: 10,
        default_task_timeout: Duration::from_secs(600), // 10 minutes
        reconnection: ReconnectionStrategy::ExponentialBackoff {
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            multiplier: 2.0,
            max_attempts: None,
        },
        shutdown_grace: Duration::from_secs(30),
    };

    /// High-throughput configuration for heavy task workloads
    pub const HIGH_THROUGHPUT: Self = Self {
        slots: 100,
        default_task_timeout: Duration::from_secs(300), // 5 minutes
        reconnection: ReconnectionStrategy::ExponentialBackoff {
            initial_delay_ms: 100,
            max_delay_ms: 10_000,
            multiplier: 2.0,
            max_attempts: None,
        },
        shutdown_grace: Duration::from_secs(60),
    };

    /// Low-resource configuration for constrained environments
    pub const LOW_RESOURCE: Self = Self {
        slots: 2,
        default_task_timeout: Duration::from_secs(600), // 10 minutes
        reconnection: ReconnectionStrategy::Fixed {
            delay_ms: 5_000,
            max_attempts: None,
        },
        shutdown_grace: Duration::from_secs(15),
    };

    /// Create a new configuration with validation
    pub fn new(
        slots: usize,
        default_task_timeout: Duration,
        reconnection: ReconnectionStrategy,
        shutdown_grace: Duration,
    ) -> Result<Self, ConfigError> {
        if slots == 0 {
            return Err(ConfigError::InvalidValue(
                "slots must be positive".to_string(),
            ));
        }
        if default_task_timeout.is_zero() {
            return Err(ConfigError::InvalidValue(
                "default_task_timeout must be positive".to_string(),
            ));
        }

        Ok(Self {
            slots,
            default_task_timeout,
            reconnection,
            shutdown_grace,
        })
    }
}

/// Complete configuration for KestrelClient
#[derive(Debug, Clone)]
pub struct KestrelClientConfig {
    /// Scheduler address as `host:port`
    pub host_port: String,
    pub tls_strategy: TlsStrategy,
    /// Namespace that scopes workflows, runs and events
    pub namespace: String,
    /// Bearer token sent with every request
    pub token: Option<String>,
    /// How often a run handle polls for the run's result
    pub result_poll_interval: Duration,
    pub worker: WorkerSettings,
}

impl Default for KestrelClientConfig {
    fn default() -> Self {
        Self {
            host_port: "localhost:7077".to_string(),
            tls_strategy: TlsStrategy::None,
            namespace: "default".to_string(),
            token: None,
            result_poll_interval: Duration::from_millis(500),
            worker: WorkerSettings::DEFAULT,
        }
    }
}

impl KestrelClientConfig {
    /// High-throughput configuration for production workloads
    pub fn high_throughput() -> Self {
        Self {
            result_poll_interval: Duration::from_millis(250),
            worker: WorkerSettings::HIGH_THROUGHPUT,
            ..Self::default()
        }
    }

    /// Low-resource configuration for development or constrained environments
    pub fn low_resource() -> Self {
        Self {
            result_poll_interval: Duration::from_secs(1),
            worker: WorkerSettings::LOW_RESOURCE,
            ..Self::default()
        }
    }

    /// Defaults overridden by the `KESTREL_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host_port) = lookup(env::HOST_PORT) {
            config.host_port = host_port;
        }
        if let Some(namespace) = lookup(env::NAMESPACE) {
            config.namespace = namespace;
        }
        if let Some(token) = lookup(env::TOKEN).filter(|t| !t.is_empty()) {
            config.token = Some(token);
        }
        if let Some(slots) = lookup(env::SLOTS) {
            config.worker.slots = slots.trim().parse().map_err(|_| ConfigError::Env {
                key: env::SLOTS,
                reason: format!("'{}' is not a positive integer", slots),
            })?;
        }

        let tls_enabled = match lookup(env::TLS).as_deref().map(str::trim) {
            None | Some("") | Some("false") | Some("0") => false,
            Some("true") | Some("1") => true,
            Some(other) => {
                return Err(ConfigError::Env {
                    key: env::TLS,
                    reason: format!("'{}' is not a boolean", other),
                })
            }
        };
        let ca_cert_path = lookup(env::TLS_CA_CERT);
        let domain = lookup(env::TLS_DOMAIN);
        if tls_enabled || ca_cert_path.is_some() {
            let ca_cert_pem = ca_cert_path
                .map(|path| {
                    std::fs::read_to_string(&path).map_err(|e| ConfigError::Env {
                        key: env::TLS_CA_CERT,
                        reason: format!("cannot read '{}': {}", path, e),
                    })
                })
                .transpose()?;
            config.tls_strategy = TlsStrategy::Tls {
                ca_cert_pem,
                domain,
            };
        }

        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration can be used to connect.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker.slots == 0 {
            return Err(ConfigError::InvalidValue(
                "slots must be positive".to_string(),
            ));
        }
        if self.result_poll_interval.is_zero() {
            return Err(ConfigError::InvalidValue(
                "result_poll_interval must be positive".to_string(),
            ));
        }
        if self.namespace.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "namespace must not be empty".to_string(),
            ));
        }
        let port = self
            .host_port
            .rsplit_once(':')
            .map(|(_, port)| port)
            .unwrap_or_default();
        if port.parse::<u16>().is_err() {
            return Err(ConfigError::InvalidValue(format!(
                "host_port '{}' must be host:port",
                self.host_port
            )));
        }
        Ok(())
    }

    /// Endpoint URI for the configured host and TLS strategy.
    pub fn endpoint_uri(&self) -> String {
        let scheme = if self.tls_strategy.is_enabled() {
            "https"
        } else {
            "http"
        };
        format!("{}://{}", scheme, self.host_port)
    }

    pub fn slots(&self) -> usize {
        self.worker.slots
    }

    pub fn with_host_port(mut self, host_port: impl Into<String>) -> Self {
        self.host_port = host_port.into();
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_tls(mut self, tls: TlsStrategy) -> Self {
        self.tls_strategy = tls;
        self
    }

    pub fn with_slots(mut self, slots: usize) -> Self {
        self.worker.slots = slots;
        self
    }

    pub fn with_result_poll_interval(mut self, interval: Duration) -> Self {
        self.result_poll_interval = interval;
        self
    }

    pub fn with_worker_settings(mut self, worker: WorkerSettings) -> Self {
        self.worker = worker;
        self
    }
}

/// Configuration error
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("Invalid environment variable {key}: {reason}")]
    Env { key: &'static str, reason: String },
}

impl From<ConfigError> for crate::error::KestrelError {
    fn from(err: ConfigError) -> Self {
        crate::error::ValidationError::Config(err.to_string()).into()
    }
}
