//! Gateway HTTP client for fnctl.
//!
//! ```text
//! deploy  ── PUT  /system/functions   (404 → POST /system/functions)
//!            --replace: DELETE then POST
//! remove  ── DELETE /system/functions {"functionName": NAME}
//!            200/201/202 → removed, 404 → nothing to remove
//! ```

pub mod client;
pub mod error;

pub use client::{DeleteOutcome, DeployMode, DeployOutcome, DeployRequest, GatewayClient};
pub use error::GatewayError;
