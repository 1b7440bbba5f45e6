//! Command tree.
//!
//! Every stage command declares its flags as a [`FlagSet`]; the clap
//! commands are generated from [`CompositeCommand`]s so `up` accepts the
//! union of build, push, and deploy flags without redeclaring them.

use clap::{Arg, ArgAction, ArgMatches, Command, parser::ValueSource};
use fnctl_core::{CompositeCommand, FlagKind, FlagSet, FlagSpec};

// ── Flag sets ──

fn yaml_flag() -> FlagSpec {
    FlagSpec::value("yaml", "Path to the stack file describing the functions")
        .with_short('f')
        .with_default("stack.yml")
}

fn filter_flag() -> FlagSpec {
    FlagSpec::value("filter", "Wildcard to match function names in the stack file")
}

fn image_flag() -> FlagSpec {
    FlagSpec::value("image", "Image reference, when not using a stack file")
}

fn name_flag() -> FlagSpec {
    FlagSpec::value("name", "Function name, when not using a stack file")
}

fn tag_flag() -> FlagSpec {
    FlagSpec::value("tag", "Image tag format: 'latest' or 'sha'").with_default("latest")
}

fn build_arg_flag() -> FlagSpec {
    FlagSpec::repeated("build-arg", "Build argument KEY=VALUE (repeatable)")
}

fn no_cache_flag() -> FlagSpec {
    FlagSpec::switch("no-cache", "Do not use the build cache")
}

fn remote_builder_flag() -> FlagSpec {
    FlagSpec::value("remote-builder", "URL of a remote builder daemon")
}

fn payload_secret_flag() -> FlagSpec {
    FlagSpec::value("payload-secret", "Path to payload secret file for the remote builder")
}

fn platforms_flag() -> FlagSpec {
    FlagSpec::list(
        "platforms",
        "Publish for these platforms, when used with --publish",
    )
    .with_default("linux/amd64")
}

pub fn build_flags() -> FlagSet {
    FlagSet::new("build")
        .flag(yaml_flag())
        .flag(filter_flag())
        .flag(image_flag())
        .flag(name_flag())
        .flag(FlagSpec::value(
            "handler",
            "Directory with the function's Dockerfile, when not using a stack file",
        ))
        .flag(build_arg_flag())
        .flag(no_cache_flag())
        .flag(tag_flag())
        .flag(remote_builder_flag())
        .flag(payload_secret_flag())
}

pub fn push_flags() -> FlagSet {
    FlagSet::new("push")
        .flag(yaml_flag())
        .flag(filter_flag())
        .flag(image_flag())
        .flag(name_flag())
        .flag(tag_flag())
}

pub fn deploy_flags() -> FlagSet {
    FlagSet::new("deploy")
        .flag(yaml_flag())
        .flag(filter_flag())
        .flag(image_flag())
        .flag(name_flag())
        .flag(tag_flag())
        .flag(FlagSpec::value(
            "gateway",
            "Gateway URL (default: $OPENFAAS_URL, stack provider, or fnctl.toml)",
        ))
        .flag(FlagSpec::repeated("env", "Environment variable KEY=VALUE (repeatable)").with_short('e'))
        .flag(FlagSpec::repeated("label", "Label KEY=VALUE (repeatable)").with_short('l'))
        .flag(FlagSpec::repeated("annotation", "Annotation KEY=VALUE (repeatable)"))
        .flag(FlagSpec::repeated("secret", "Secret name to mount (repeatable)"))
        .flag(FlagSpec::switch(
            "replace",
            "Remove and re-create existing functions (requires --update=false)",
        ))
        .flag(FlagSpec::boolean(
            "update",
            true,
            "Update existing functions in place",
        ))
}

pub fn publish_flags() -> FlagSet {
    FlagSet::new("publish").flag(platforms_flag())
}

pub fn up_flags() -> FlagSet {
    FlagSet::new("up")
        .flag(FlagSpec::switch(
            "publish",
            "Use publish instead of build followed by push",
        ))
        .flag(platforms_flag())
        .flag(FlagSpec::switch(
            "skip-push",
            "Skip pushing function to remote registry",
        ))
        .flag(FlagSpec::switch("skip-deploy", "Skip function deployment"))
        .flag(remote_builder_flag())
        .flag(payload_secret_flag())
        .flag(FlagSpec::switch(
            "watch",
            "Watch for changes in files and re-deploy",
        ))
}

// ── Composite commands ──

pub fn up_command() -> fnctl_core::Result<CompositeCommand> {
    CompositeCommand::new("up")
        .merge(&up_flags())?
        .merge(&build_flags())?
        .merge(&push_flags())?
        .merge(&deploy_flags())
}

pub fn publish_command() -> fnctl_core::Result<CompositeCommand> {
    CompositeCommand::new("publish")
        .merge(&publish_flags())?
        .merge(&build_flags())
}

const UP_LONG: &str = "\
Build, push, and deploy function containers either via the supplied stack file
using the \"--yaml\" flag (which may contain multiple function definitions), or
directly via flags.

The push step may be skipped by setting the --skip-push flag
and the deploy step with --skip-deploy.

Note: all flags from the build, push, and deploy commands are valid and can be
combined; see the --help text for those commands for details.";

const UP_EXAMPLES: &str = "\
Examples:
  # Deploy everything
  fnctl up

  # Deploy a named function
  fnctl up --filter echo

  # Deploy but skip the push step
  fnctl up --skip-push

  # Build but skip pushing and use a build-arg
  fnctl up --skip-push --build-arg GO111MODULE=on

  # Rebuild and redeploy on every change
  fnctl up --watch";

/// The full `fnctl` command tree. Fails if any composite command has conflicting flags.
pub fn command() -> fnctl_core::Result<Command> {
    let build = CompositeCommand::new("build").merge(&build_flags())?;
    let push = CompositeCommand::new("push").merge(&push_flags())?;
    let deploy = CompositeCommand::new("deploy").merge(&deploy_flags())?;

    Ok(Command::new("fnctl")
        .about("Build, push, and deploy function containers to a serverless gateway")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            to_clap(&build).about("Build function container images"),
        )
        .subcommand(to_clap(&push).about("Push function images to a registry"))
        .subcommand(to_clap(&deploy).about("Deploy functions to the gateway"))
        .subcommand(
            to_clap(&publish_command()?)
                .about("Build and push multi-platform images in one step"),
        )
        .subcommand(
            to_clap(&up_command()?)
                .about("Builds, pushes, and deploys function containers")
                .long_about(UP_LONG)
                .after_help(UP_EXAMPLES),
        )
        .subcommand(
            Command::new("remove")
                .visible_alias("rm")
                .about("Remove functions from the gateway")
                .arg(
                    Arg::new("names")
                        .value_name("NAME")
                        .num_args(1..)
                        .required(true)
                        .help("Functions to remove"),
                )
                .arg(to_arg(&FlagSpec::value(
                    "gateway",
                    "Gateway URL (default: $OPENFAAS_URL or fnctl.toml)",
                ))),
        ))
}

fn to_clap(composite: &CompositeCommand) -> Command {
    composite
        .flags()
        .fold(Command::new(composite.name().to_owned()), |cmd, spec| {
            cmd.arg(to_arg(spec))
        })
}

fn to_arg(spec: &FlagSpec) -> Arg {
    let mut arg = Arg::new(spec.name).long(spec.name).help(spec.help);
    if let Some(short) = spec.short {
        arg = arg.short(short);
    }

    arg = match spec.kind {
        FlagKind::Switch => arg.action(ArgAction::SetTrue),
        FlagKind::Bool => arg
            .action(ArgAction::Set)
            .value_parser(clap::value_parser!(bool))
            .num_args(0..=1)
            .require_equals(true)
            .default_missing_value("true"),
        FlagKind::Value => arg.action(ArgAction::Set),
        FlagKind::Repeated => arg.action(ArgAction::Append),
        FlagKind::List => arg.action(ArgAction::Append).value_delimiter(','),
    };

    if let Some(default) = spec.default {
        arg = arg.default_value(default);
    }
    arg
}

// ── Typed access to matches ──

pub fn string(m: &ArgMatches, name: &str) -> Option<String> {
    m.get_one::<String>(name)
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
}

pub fn strings(m: &ArgMatches, name: &str) -> Vec<String> {
    m.get_many::<String>(name)
        .map(|vals| vals.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty()).collect())
        .unwrap_or_default()
}

pub fn switch(m: &ArgMatches, name: &str) -> bool {
    m.get_flag(name)
}

pub fn boolean(m: &ArgMatches, name: &str) -> bool {
    m.get_one::<bool>(name).copied().unwrap_or(false)
}

/// Whether the user passed the flag, as opposed to clap filling in its default.
pub fn explicitly_set(m: &ArgMatches, name: &str) -> bool {
    m.value_source(name) == Some(ValueSource::CommandLine)
}
