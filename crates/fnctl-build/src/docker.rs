#[derive(Debug, thiserror::Error)]
pub enum DockerError {
    #[error("{program} not found: install Docker or set [build].engine in fnctl.toml")]
    NotFound {
        program: String,
        source: std::io::Error,
    },

    #[error("{program} command failed: {args:?}\n{stderr}")]
    CommandFailed {
        program: String,
        args: Vec<String>,
        stderr: String,
    },
}
