use crate::docker::DockerError;

/// Abstraction over container CLI execution for testability.
///
/// Production code uses [`RealExecutor`], tests use mockall-generated mocks.
#[allow(async_fn_in_trait)]
pub trait ContainerExecutor: Send + Sync {
    /// Execute a container CLI command, streaming output to the terminal.
    async fn exec_streaming(&self, args: &[String]) -> Result<(), DockerError>;
}

/// Runs the configured container CLI (`docker` by default).
pub struct RealExecutor {
    program: String,
}

impl RealExecutor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for RealExecutor {
    fn default() -> Self {
        Self::new("docker")
    }
}

impl ContainerExecutor for RealExecutor {
    async fn exec_streaming(&self, args: &[String]) -> Result<(), DockerError> {
        use std::process::Stdio;

        tracing::debug!(program = %self.program, ?args, "exec (streaming)");
        let status = tokio::process::Command::new(&self.program)
            .args(args)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| DockerError::NotFound {
                program: self.program.clone(),
                source: e,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(DockerError::CommandFailed {
                program: self.program.clone(),
                args: args.to_vec(),
                stderr: format!("exit code: {status}"),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_program_is_not_found() {
        let executor = RealExecutor::new("fnctl-no-such-container-cli");

        let err = executor
            .exec_streaming(&["version".to_owned()])
            .await
            .unwrap_err();

        assert!(matches!(err, DockerError::NotFound { .. }), "{err:?}");
        assert!(err.to_string().contains("fnctl-no-such-container-cli"));
    }
}
