/// Failure reported by an RPC method.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RpcError {
    /// The callee answered with a defined application error.
    #[error("rpc error {code}: {description}")]
    Application { code: i32, description: String },

    /// The call never produced an answer (connection reset, timeout, ...).
    #[error("rpc transport failure: {0}")]
    Transport(String),

    #[error("{0}")]
    Other(String),
}

/// Error code tag for a finished call: the application code when there is
/// one, `"0"` on success and `"-1"` for anything else.
pub fn error_code_tag(err: Option<&RpcError>) -> String {
    match err {
        None => "0".to_string(),
        Some(RpcError::Application { code, .. }) => code.to_string(),
        Some(_) => "-1".to_string(),
    }
}
