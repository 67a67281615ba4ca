use super::ErrorCode;

pub fn all_codes() -> &'static [ErrorCode] {
    &[
        ErrorCode::ConfigMissingKey,
        ErrorCode::ConfigInvalidValue,
        ErrorCode::ConfigInvalidParams,
        ErrorCode::ValidationInvalidArgument,
        ErrorCode::PluginLoadFailed,
        ErrorCode::PluginSymbolNotFound,
        ErrorCode::CompileFailed,
        ErrorCode::AuthFailed,
        ErrorCode::RemoteApiFailed,
        ErrorCode::RemoteInvalidResponse,
        ErrorCode::RemoteNotFound,
        ErrorCode::InternalIoError,
        ErrorCode::InternalJsonError,
    ]
}

pub fn parse_code(code: &str) -> Option<ErrorCode> {
    all_codes()
        .iter()
        .copied()
        .find(|candidate| candidate.as_str() == code)
}
