use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("failed to bind listener: {0}")]
    Bind(#[from] std::io::Error),
    #[error("{client} http client could not be built: {message}")]
    HttpClient {
        client: &'static str,
        message: String,
    },
    #[error("invalid {setting}: {message}")]
    Configuration {
        setting: &'static str,
        message: String,
    },
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
}

impl InfraError {
    pub fn http_client(client: &'static str, err: impl std::fmt::Display) -> Self {
        Self::HttpClient {
            client,
            message: err.to_string(),
        }
    }

    pub fn configuration(setting: &'static str, message: impl Into<String>) -> Self {
        Self::Configuration {
            setting,
            message: message.into(),
        }
    }

    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry(message.into())
    }
}
