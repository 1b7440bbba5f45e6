//! Container image operations for fnctl.
//!
//! # Stages
//!
//! ```text
//! fnctl build    ── docker build --tag IMAGE [--build-arg K=V]... HANDLER
//!                   (remote builder: docker --host URL build ... && docker --host URL push)
//! fnctl push     ── docker push IMAGE
//! fnctl publish  ── docker buildx build --platform P1,P2 --push --tag IMAGE HANDLER
//! ```
//!
//! The container CLI is reached through [`ContainerExecutor`] so the stages
//! can be exercised without Docker installed.

pub mod builder;
pub mod docker;
pub mod executor;
pub mod tag;

pub use builder::{BuildError, ImageBuilder};
pub use docker::DockerError;
pub use executor::{ContainerExecutor, RealExecutor};
pub use tag::{apply_tag, resolve_image};
