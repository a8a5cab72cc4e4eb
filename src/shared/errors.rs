use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Metric {0} is already registered")]
    DuplicateMetric(String),

    #[error("A global metrics recorder is already installed for this process")]
    RecorderInstalled,

    #[error("Invalid metrics registry settings: {0}")]
    Settings(String),
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Failed to bind metrics listener on {addr}: {source}")]
    MetricsBind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to bind service listener on {addr}: {source}")]
    ServiceBind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Metrics(#[from] MetricsError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
