mod build;
mod deploy;
mod publish;
mod push;
mod remove;
mod up;

pub use build::build;
pub use deploy::deploy;
pub use publish::publish;
pub use push::push;
pub use remove::remove;
pub use up::up;

pub(crate) use build::run_build;
pub(crate) use deploy::run_deploy;
pub(crate) use publish::run_publish;
pub(crate) use push::run_push;
