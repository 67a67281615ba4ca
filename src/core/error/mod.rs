use serde::{Deserialize, Serialize};
use serde_json::Value;

mod codes;

pub use codes::{all_codes, parse_code};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigMissingKey,
    ConfigInvalidValue,
    ConfigInvalidParams,

    ValidationInvalidArgument,

    PluginLoadFailed,
    PluginSymbolNotFound,

    CompileFailed,

    AuthFailed,

    RemoteApiFailed,
    RemoteInvalidResponse,
    RemoteNotFound,

    InternalIoError,
    InternalJsonError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigMissingKey => "config.missing_key",
            ErrorCode::ConfigInvalidValue => "config.invalid_value",
            ErrorCode::ConfigInvalidParams => "config.invalid_params",

            ErrorCode::ValidationInvalidArgument => "validation.invalid_argument",

            ErrorCode::PluginLoadFailed => "plugin.load_failed",
            ErrorCode::PluginSymbolNotFound => "plugin.symbol_not_found",

            ErrorCode::CompileFailed => "compile.failed",

            ErrorCode::AuthFailed => "auth.failed",

            ErrorCode::RemoteApiFailed => "remote.api_failed",
            ErrorCode::RemoteInvalidResponse => "remote.invalid_response",
            ErrorCode::RemoteNotFound => "remote.not_found",

            ErrorCode::InternalIoError => "internal.io_error",
            ErrorCode::InternalJsonError => "internal.json_error",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMissingKeyDetails {
    pub key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidValueDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidParamsDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub cause: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidArgumentDetails {
    pub field: String,
    pub problem: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginLoadFailedDetails {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginSymbolNotFoundDetails {
    pub path: String,
    pub symbol: String,
    pub available: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteApiFailedDetails {
    pub method: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub body: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalIoErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalJsonErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
    pub retryable: Option<bool>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

fn to_details<T: Serialize>(details: T) -> Value {
    serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
            retryable: None,
        }
    }

    pub fn config_missing_key(key: impl Into<String>) -> Self {
        let key = key.into();
        let message = format!("Missing required configuration key {}", key);
        Self::new(
            ErrorCode::ConfigMissingKey,
            message,
            to_details(ConfigMissingKeyDetails { key: key.clone() }),
        )
        .with_hint(format!("Set the {} environment variable", key))
    }

    pub fn config_invalid_value(
        key: impl Into<String>,
        value: Option<String>,
        problem: impl Into<String>,
    ) -> Self {
        Self::new(
            ErrorCode::ConfigInvalidValue,
            "Invalid configuration value",
            to_details(ConfigInvalidValueDetails {
                key: key.into(),
                value,
                problem: problem.into(),
            }),
        )
    }

    /// The single configuration error raised by parameter loading.
    pub fn config_invalid_params(
        message: impl Into<String>,
        path: Option<String>,
        cause: impl Into<String>,
    ) -> Self {
        Self::new(
            ErrorCode::ConfigInvalidParams,
            message,
            to_details(ConfigInvalidParamsDetails {
                path,
                cause: cause.into(),
            }),
        )
    }

    pub fn validation_invalid_argument(
        field: impl Into<String>,
        problem: impl Into<String>,
        id: Option<String>,
    ) -> Self {
        Self::new(
            ErrorCode::ValidationInvalidArgument,
            "Invalid argument",
            to_details(InvalidArgumentDetails {
                field: field.into(),
                problem: problem.into(),
                id,
            }),
        )
    }

    pub fn plugin_load_failed(path: impl Into<String>, error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::PluginLoadFailed,
            "Failed to load pipeline definition",
            to_details(PluginLoadFailedDetails {
                path: path.into(),
                error: error.into(),
            }),
        )
    }

    pub fn plugin_symbol_not_found(
        path: impl Into<String>,
        symbol: impl Into<String>,
        available: Vec<String>,
    ) -> Self {
        let symbol = symbol.into();
        let hint = if available.is_empty() {
            "The definition file declares no pipelines".to_string()
        } else {
            format!("Available pipelines: {}", available.join(", "))
        };

        Self::new(
            ErrorCode::PluginSymbolNotFound,
            format!("Pipeline '{}' not found in definition file", symbol),
            to_details(PluginSymbolNotFoundDetails {
                path: path.into(),
                symbol,
                available,
            }),
        )
        .with_hint(hint)
    }

    pub fn compile_failed(message: impl Into<String>, context: Option<String>) -> Self {
        Self::new(
            ErrorCode::CompileFailed,
            message,
            serde_json::json!({ "context": context }),
        )
    }

    pub fn auth_failed(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::AuthFailed,
            message,
            Value::Object(serde_json::Map::new()),
        )
        .with_hint("Check SA_EMAIL, GCP_PROJECT and GOOGLE_APPLICATION_CREDENTIALS")
    }

    pub fn remote_api_failed(details: RemoteApiFailedDetails) -> Self {
        let message = match details.status {
            Some(status) => format!("API error: HTTP {}", status),
            None => "HTTP request failed".to_string(),
        };
        let retryable = details.status.map(|s| s >= 500);

        let mut err = Self::new(ErrorCode::RemoteApiFailed, message, to_details(details));
        err.retryable = retryable;
        err
    }

    pub fn remote_invalid_response(message: impl Into<String>, body: Value) -> Self {
        Self::new(
            ErrorCode::RemoteInvalidResponse,
            message,
            serde_json::json!({ "body": body }),
        )
    }

    pub fn remote_not_found(kind: &str, id: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::RemoteNotFound,
            format!("{} not found", kind),
            serde_json::json!({ "id": id.into() }),
        )
    }

    pub fn internal_io(error: impl Into<String>, context: Option<String>) -> Self {
        Self::new(
            ErrorCode::InternalIoError,
            "IO error",
            to_details(InternalIoErrorDetails {
                error: error.into(),
                context,
            }),
        )
    }

    pub fn internal_json(error: impl Into<String>, context: Option<String>) -> Self {
        Self::new(
            ErrorCode::InternalJsonError,
            "JSON error",
            to_details(InternalJsonErrorDetails {
                error: error.into(),
                context,
            }),
        )
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint {
            message: message.into(),
        });
        self
    }
}
