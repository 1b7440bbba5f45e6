use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Stack file (`stack.yml`) listing the functions to build and deploy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stack {
    #[serde(default)]
    pub provider: Provider,
    #[serde(default)]
    pub functions: BTreeMap<String, Function>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    /// Gateway URL; used when neither --gateway nor OPENFAAS_URL is set
    pub gateway: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    /// Image reference, e.g. `registry.example.com/team/echo:0.1`
    pub image: String,
    /// Build context directory
    #[serde(default = "default_handler")]
    pub handler: PathBuf,
    #[serde(default)]
    pub build_args: BTreeMap<String, String>,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    #[serde(default)]
    pub secrets: Vec<String>,
}

impl Function {
    pub fn new(image: impl Into<String>, handler: impl Into<PathBuf>) -> Self {
        Self {
            image: image.into(),
            handler: handler.into(),
            build_args: BTreeMap::new(),
            environment: BTreeMap::new(),
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
            secrets: Vec::new(),
        }
    }
}

/// A function selected from a stack, with its name attached.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedFunction {
    pub name: String,
    pub function: Function,
}

impl Stack {
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| crate::Error::StackLoad {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(path, &content)
    }

    /// Like [`Stack::load`], but a missing file yields `None`.
    pub fn load_optional(path: &Path) -> crate::Result<Option<Self>> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no stack file");
            return Ok(None);
        }
        Self::load(path).map(Some)
    }

    pub fn parse(path: &Path, content: &str) -> crate::Result<Self> {
        let stack: Self =
            serde_yaml_ng::from_str(content).map_err(|e| crate::Error::StackParse {
                path: path.to_path_buf(),
                source: e,
            })?;
        tracing::debug!(path = %path.display(), functions = stack.functions.len(), "loaded stack");
        Ok(stack)
    }

    /// Functions in name order, narrowed by an optional `*` wildcard filter.
    ///
    /// A filter that matches nothing is an error; an empty stack without a
    /// filter yields an empty list.
    pub fn select(&self, filter: Option<&str>) -> crate::Result<Vec<NamedFunction>> {
        let selected: Vec<NamedFunction> = self
            .functions
            .iter()
            .filter(|(name, _)| filter.is_none_or(|f| wildcard_match(f, name)))
            .map(|(name, function)| NamedFunction {
                name: name.clone(),
                function: function.clone(),
            })
            .collect();

        match filter {
            Some(f) if selected.is_empty() => Err(crate::Error::NoMatchingFunctions {
                filter: f.to_owned(),
            }),
            _ => Ok(selected),
        }
    }
}

/// Match `name` against a pattern where `*` stands for any run of characters.
pub fn wildcard_match(pattern: &str, name: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == name;
    }

    let (first, rest) = (parts[0], &parts[1..]);
    let Some(mut remaining) = name.strip_prefix(first) else {
        return false;
    };

    let (last, middle) = match rest.split_last() {
        Some(split) => split,
        None => return true,
    };

    for part in middle {
        match remaining.find(part) {
            Some(idx) => remaining = &remaining[idx + part.len()..],
            None => return false,
        }
    }

    remaining.len() >= last.len() && remaining.ends_with(last)
}

fn default_handler() -> PathBuf {
    PathBuf::from(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_exact() {
        assert!(wildcard_match("echo", "echo"));
        assert!(!wildcard_match("echo", "echo2"));
    }

    #[test]
    fn wildcard_prefix_suffix() {
        assert!(wildcard_match("echo*", "echo-fn"));
        assert!(wildcard_match("*-fn", "echo-fn"));
        assert!(wildcard_match("*", "anything"));
        assert!(!wildcard_match("*-fn", "echo-func"));
    }

    #[test]
    fn wildcard_middle() {
        assert!(wildcard_match("e*o*n", "echo-fn"));
        assert!(!wildcard_match("e*z*n", "echo-fn"));
    }

    #[test]
    fn wildcard_overlapping_prefix_and_suffix() {
        assert!(!wildcard_match("ab*ba", "aba"));
        assert!(wildcard_match("ab*ba", "abba"));
    }
}
