#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("error {action} function '{function}': could not reach gateway {gateway}")]
    Transport {
        action: &'static str,
        gateway: String,
        function: String,
        source: reqwest::Error,
    },

    #[error("gateway returned unexpected status code {status} for function '{function}': {body}")]
    UnexpectedStatus {
        function: String,
        status: u16,
        body: String,
    },

    #[error("failed to read gateway {gateway} response (status {status}) for function '{function}'")]
    ReadBody {
        gateway: String,
        function: String,
        status: u16,
        source: reqwest::Error,
    },
}
