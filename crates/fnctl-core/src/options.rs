//! Parsed option types for each stage, and the checks that run before any
//! stage touches the container tool or the gateway.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::stack::{Function, NamedFunction, Stack};
use crate::{Error, Result};

/// How the image reference is tagged before build and push.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TagFormat {
    /// Use the image reference as written.
    #[default]
    Latest,
    /// Replace the tag with the short git commit.
    Sha,
}

impl std::str::FromStr for TagFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "latest" => Ok(Self::Latest),
            "sha" => Ok(Self::Sha),
            other => Err(Error::InvalidOptions(format!(
                "unknown --tag format '{other}': expected 'latest' or 'sha'"
            ))),
        }
    }
}

/// Functions named directly on the command line instead of in a stack file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectFunction {
    pub name: Option<String>,
    pub image: Option<String>,
    pub handler: Option<PathBuf>,
}

impl DirectFunction {
    fn is_complete(&self) -> bool {
        self.name.is_some() && self.image.is_some()
    }

    /// Resolve the functions to operate on: the function described by flags
    /// when both --name and --image are given, otherwise the stack.
    pub fn resolve(
        &self,
        stack: Option<&Stack>,
        filter: Option<&str>,
    ) -> Result<Vec<NamedFunction>> {
        if let (Some(name), Some(image)) = (&self.name, &self.image) {
            return Ok(vec![NamedFunction {
                name: name.clone(),
                function: Function::new(
                    image.clone(),
                    self.handler.clone().unwrap_or_else(|| PathBuf::from(".")),
                ),
            }]);
        }

        match stack {
            Some(stack) => stack.select(filter),
            None => Err(Error::InvalidOptions(
                "no stack file found: pass -f/--yaml, or both --image and --name".to_owned(),
            )),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildOptions {
    pub yaml: PathBuf,
    pub filter: Option<String>,
    pub direct: DirectFunction,
    pub build_args: BTreeMap<String, String>,
    pub no_cache: bool,
    pub tag: TagFormat,
    pub remote_builder: Option<String>,
    pub payload_secret: Option<PathBuf>,
}

impl BuildOptions {
    /// Build preconditions, checked before any stage runs.
    pub fn validate(&self, stack_present: bool) -> Result<()> {
        if !stack_present && !self.direct.is_complete() {
            return Err(Error::InvalidOptions(format!(
                "stack file {} not found: pass -f/--yaml, or both --image and --name",
                self.yaml.display()
            )));
        }

        if let Some(url) = &self.remote_builder {
            require_http_url("--remote-builder", url)?;
        }

        if let Some(path) = &self.payload_secret {
            if self.remote_builder.is_none() {
                return Err(Error::InvalidOptions(
                    "--payload-secret can only be used with --remote-builder".to_owned(),
                ));
            }
            if !path.is_file() {
                return Err(Error::InvalidOptions(format!(
                    "payload secret {} does not exist or is not a file",
                    path.display()
                )));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PushOptions {
    pub yaml: PathBuf,
    pub filter: Option<String>,
    pub direct: DirectFunction,
    pub tag: TagFormat,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PublishOptions {
    pub build: BuildOptions,
    pub platforms: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeployOptions {
    pub yaml: PathBuf,
    pub filter: Option<String>,
    pub direct: DirectFunction,
    pub gateway: String,
    pub env: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub secrets: Vec<String>,
    pub tag: TagFormat,
    pub replace: bool,
    pub update: bool,
}

impl DeployOptions {
    /// Deploy preconditions, checked before any stage runs.
    pub fn validate(&self, stack_present: bool) -> Result<()> {
        if self.replace && self.update {
            return Err(Error::InvalidOptions(
                "--replace and --update are mutually exclusive; pass --update=false with --replace"
                    .to_owned(),
            ));
        }

        if !stack_present && !self.direct.is_complete() {
            return Err(Error::InvalidOptions(format!(
                "stack file {} not found: pass -f/--yaml, or both --image and --name",
                self.yaml.display()
            )));
        }

        require_http_url("gateway", &self.gateway)
    }
}

/// Options owned by the composite `up` command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineOptions {
    pub publish: bool,
    /// `Some` only when --platforms was passed explicitly.
    pub platforms: Option<Vec<String>>,
    pub skip_push: bool,
    pub skip_deploy: bool,
    pub remote_builder: Option<String>,
    pub watch: bool,
}

impl PipelineOptions {
    /// Option combinations that are rejected before any stage runs.
    pub fn validate(&self) -> Result<()> {
        if !self.publish && self.platforms.as_ref().is_some_and(|p| !p.is_empty()) {
            return Err(Error::InvalidOptions(
                "--platforms can only be used with the --publish flag".to_owned(),
            ));
        }
        Ok(())
    }

    /// Push runs after build only when it is not skipped and no remote
    /// builder has already taken the image to the registry.
    pub fn should_push(&self) -> bool {
        !self.skip_push && self.remote_builder.is_none()
    }
}

/// Parse repeated `KEY=VALUE` flag values into a map; later keys win.
pub fn parse_key_values<'a>(
    flag: &'static str,
    values: impl IntoIterator<Item = &'a str>,
) -> Result<BTreeMap<String, String>> {
    let mut map = BTreeMap::new();
    for raw in values {
        let (key, value) = raw
            .split_once('=')
            .filter(|(k, _)| !k.trim().is_empty())
            .ok_or_else(|| Error::InvalidKeyValue {
                flag,
                value: raw.to_owned(),
            })?;
        map.insert(key.trim().to_owned(), value.to_owned());
    }
    Ok(map)
}

fn require_http_url(what: &str, url: &str) -> Result<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(Error::InvalidOptions(format!(
            "{what} URL '{url}' must start with http:// or https://"
        )))
    }
}
