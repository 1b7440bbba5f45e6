use serde::{Deserialize, Serialize};

/// Environment variable that overrides the gateway URL from `fnctl.toml`.
pub const GATEWAY_ENV: &str = "OPENFAAS_URL";

/// fnctl.toml configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FnctlConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub watch: WatchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Gateway base URL
    #[serde(default = "default_gateway_url")]
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Container CLI used for build, publish, and push
    #[serde(default = "default_engine")]
    pub engine: String,
    /// Platforms used by publish when --platforms is not given
    #[serde(default = "default_platforms")]
    pub default_platforms: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Quiet period before a burst of file events triggers a re-run
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Ignore file, relative to the watched directory
    #[serde(default = "default_ignore_file")]
    pub ignore_file: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: default_gateway_url(),
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            engine: default_engine(),
            default_platforms: default_platforms(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            ignore_file: default_ignore_file(),
        }
    }
}

impl FnctlConfig {
    /// Load from fnctl.toml in the given directory, or return defaults if not found.
    pub fn load(project_dir: &std::path::Path) -> crate::Result<Self> {
        let config_path = project_dir.join("fnctl.toml");
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(&config_path).map_err(|e| crate::Error::ConfigLoad {
                path: config_path.clone(),
                source: e,
            })?;
        let config: Self = toml::from_str(&content).map_err(|e| crate::Error::ConfigParse {
            path: config_path.clone(),
            source: e,
        })?;

        if config.watch.debounce_ms == 0 {
            return Err(crate::Error::ZeroDebounce { path: config_path });
        }

        tracing::debug!(path = %config_path.display(), "loaded config");
        Ok(config)
    }

    /// Resolve the gateway URL: explicit flag, then `OPENFAAS_URL`, then the
    /// stack file's provider, then this config.
    pub fn gateway_url(&self, flag: Option<&str>, stack_gateway: Option<&str>) -> String {
        let env = std::env::var(GATEWAY_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty());
        let configured = stack_gateway.unwrap_or(self.gateway.url.as_str());
        resolve_gateway(flag, env.as_deref(), configured)
    }
}

fn resolve_gateway(flag: Option<&str>, env: Option<&str>, configured: &str) -> String {
    flag.or(env)
        .unwrap_or(configured)
        .trim()
        .trim_end_matches('/')
        .to_owned()
}

fn default_gateway_url() -> String {
    "http://127.0.0.1:8080".to_owned()
}

fn default_engine() -> String {
    "docker".to_owned()
}

fn default_platforms() -> Vec<String> {
    vec!["linux/amd64".to_owned()]
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_ignore_file() -> String {
    ".gitignore".to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_beats_env_and_config() {
        let url = resolve_gateway(
            Some("http://flag:8080/"),
            Some("http://env:8080"),
            "http://cfg:8080",
        );
        assert_eq!(url, "http://flag:8080");
    }

    #[test]
    fn env_beats_config() {
        let url = resolve_gateway(None, Some("http://env:8080"), "http://cfg:8080");
        assert_eq!(url, "http://env:8080");
    }

    #[test]
    fn config_used_when_nothing_else_set() {
        let url = resolve_gateway(None, None, "http://cfg:8080//");
        assert_eq!(url, "http://cfg:8080");
    }
}
