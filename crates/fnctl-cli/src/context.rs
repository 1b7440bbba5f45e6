//! Per-invocation state: project directory, `fnctl.toml`, and the typed
//! options each stage reads out of the parsed flags.

use std::path::{Path, PathBuf};

use clap::ArgMatches;
use fnctl_build::ImageBuilder;
use fnctl_core::options::parse_key_values;
use fnctl_core::{
    BuildOptions, DeployOptions, DirectFunction, FnctlConfig, NamedFunction, PipelineOptions,
    PushOptions, Stack, TagFormat,
};

use crate::cli;

pub struct Context {
    pub project_dir: PathBuf,
    pub config: FnctlConfig,
}

impl Context {
    /// Context for the current directory.
    pub fn load() -> anyhow::Result<Self> {
        Self::from_dir(PathBuf::from("."))
    }

    pub fn from_dir(project_dir: PathBuf) -> anyhow::Result<Self> {
        let config = FnctlConfig::load(&project_dir)?;
        Ok(Self {
            project_dir,
            config,
        })
    }

    pub fn builder(&self) -> ImageBuilder {
        ImageBuilder::new(&self.config.build.engine)
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_dir.join(path)
        }
    }

    /// The stack file, if it exists. Read fresh on every call so each watch
    /// iteration sees the current definitions.
    pub fn stack(&self, yaml: &Path) -> anyhow::Result<Option<Stack>> {
        Ok(Stack::load_optional(&self.resolve_path(yaml))?)
    }

    /// Functions a stage operates on: the direct function, or the filtered stack.
    pub fn functions(
        &self,
        yaml: &Path,
        direct: &DirectFunction,
        filter: Option<&str>,
    ) -> anyhow::Result<Vec<NamedFunction>> {
        let stack = self.stack(yaml)?;
        Ok(direct.resolve(stack.as_ref(), filter)?)
    }

    // ── Options from flags ──

    pub fn build_options(&self, m: &ArgMatches) -> anyhow::Result<BuildOptions> {
        Ok(BuildOptions {
            yaml: yaml(m),
            filter: cli::string(m, "filter"),
            direct: direct(m),
            build_args: parse_key_values(
                "--build-arg",
                cli::strings(m, "build-arg").iter().map(String::as_str),
            )?,
            no_cache: cli::switch(m, "no-cache"),
            tag: tag(m)?,
            remote_builder: cli::string(m, "remote-builder"),
            payload_secret: cli::string(m, "payload-secret").map(|p| self.resolve_path(Path::new(&p))),
        })
    }

    pub fn push_options(&self, m: &ArgMatches) -> anyhow::Result<PushOptions> {
        Ok(PushOptions {
            yaml: yaml(m),
            filter: cli::string(m, "filter"),
            direct: direct(m),
            tag: tag(m)?,
        })
    }

    /// Deploy options; the gateway falls back to the stack provider when
    /// neither the flag nor `OPENFAAS_URL` is set.
    pub fn deploy_options(
        &self,
        m: &ArgMatches,
        stack: Option<&Stack>,
    ) -> anyhow::Result<DeployOptions> {
        let stack_gateway = stack.and_then(|s| s.provider.gateway.as_deref());
        let key_values = |flag: &'static str, name: &str| {
            parse_key_values(flag, cli::strings(m, name).iter().map(String::as_str))
        };

        Ok(DeployOptions {
            yaml: yaml(m),
            filter: cli::string(m, "filter"),
            direct: direct(m),
            gateway: self
                .config
                .gateway_url(cli::string(m, "gateway").as_deref(), stack_gateway),
            env: key_values("--env", "env")?,
            labels: key_values("--label", "label")?,
            annotations: key_values("--annotation", "annotation")?,
            secrets: cli::strings(m, "secret"),
            tag: tag(m)?,
            replace: cli::switch(m, "replace"),
            update: cli::boolean(m, "update"),
        })
    }

    pub fn pipeline_options(&self, m: &ArgMatches) -> PipelineOptions {
        PipelineOptions {
            publish: cli::switch(m, "publish"),
            platforms: cli::explicitly_set(m, "platforms").then(|| cli::strings(m, "platforms")),
            skip_push: cli::switch(m, "skip-push"),
            skip_deploy: cli::switch(m, "skip-deploy"),
            remote_builder: cli::string(m, "remote-builder"),
            watch: cli::switch(m, "watch"),
        }
    }

    /// Platforms for `publish`: the flag when given, otherwise `fnctl.toml`.
    pub fn platforms(&self, m: &ArgMatches) -> Vec<String> {
        if cli::explicitly_set(m, "platforms") {
            cli::strings(m, "platforms")
        } else {
            self.config.build.default_platforms.clone()
        }
    }
}

pub(crate) fn yaml(m: &ArgMatches) -> PathBuf {
    PathBuf::from(cli::string(m, "yaml").unwrap_or_else(|| "stack.yml".to_owned()))
}

fn direct(m: &ArgMatches) -> DirectFunction {
    DirectFunction {
        name: cli::string(m, "name"),
        image: cli::string(m, "image"),
        handler: cli::string(m, "handler").map(PathBuf::from),
    }
}

fn tag(m: &ArgMatches) -> anyhow::Result<TagFormat> {
    Ok(cli::string(m, "tag")
        .as_deref()
        .unwrap_or("latest")
        .parse::<TagFormat>()?)
}
