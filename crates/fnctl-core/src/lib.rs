//! Core types and configuration for fnctl.
//!
//! This crate defines the `fnctl.toml` schema ([`FnctlConfig`]), the stack
//! file model ([`Stack`]), per-stage option types and their validation,
//! composite command flag merging ([`CompositeCommand`]), and the ignore
//! rules used by the watch loop ([`IgnoreFilter`]).

pub mod config;
pub mod error;
pub mod flags;
pub mod ignore_filter;
pub mod options;
pub mod stack;

pub use config::{BuildConfig, FnctlConfig, GatewayConfig, WatchConfig};
pub use error::{Error, Result};
pub use flags::{CompositeCommand, FlagKind, FlagSet, FlagSpec};
pub use ignore_filter::IgnoreFilter;
pub use options::{
    BuildOptions, DeployOptions, DirectFunction, PipelineOptions, PublishOptions, PushOptions,
    TagFormat,
};
pub use stack::{Function, NamedFunction, Stack};
