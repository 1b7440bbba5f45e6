use std::collections::BTreeMap;

use fnctl_core::{DeployOptions, NamedFunction};
use reqwest::StatusCode;
use serde::Serialize;

use crate::error::GatewayError;

const FUNCTIONS_PATH: &str = "/system/functions";

/// HTTP client for a function gateway.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    gateway: String,
}

/// Body of `DELETE /system/functions`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteFunctionRequest<'a> {
    function_name: &'a str,
}

/// Body of `POST`/`PUT /system/functions`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployRequest {
    pub service: String,
    pub image: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env_vars: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub secrets: Vec<String>,
}

impl DeployRequest {
    /// Request for a stack function, with flag values layered over the stack's.
    pub fn from_function(function: &NamedFunction, image: &str, opts: &DeployOptions) -> Self {
        let spec = &function.function;
        let overlay = |base: &BTreeMap<String, String>, flags: &BTreeMap<String, String>| {
            let mut merged = base.clone();
            merged.extend(flags.clone());
            merged
        };

        let mut secrets = spec.secrets.clone();
        for secret in &opts.secrets {
            if !secrets.contains(secret) {
                secrets.push(secret.clone());
            }
        }

        Self {
            service: function.name.clone(),
            image: image.to_owned(),
            env_vars: overlay(&spec.environment, &opts.env),
            labels: overlay(&spec.labels, &opts.labels),
            annotations: overlay(&spec.annotations, &opts.annotations),
            secrets,
        }
    }
}

/// How an existing function is treated on deploy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployMode {
    /// Update in place; create when the gateway does not know the function.
    Update,
    /// Delete the existing function, then create it.
    Replace,
    /// Create only.
    Create,
}

impl DeployMode {
    pub fn from_flags(replace: bool, update: bool) -> Self {
        match (replace, update) {
            (true, _) => Self::Replace,
            (false, true) => Self::Update,
            (false, false) => Self::Create,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The gateway removed the function.
    Removed,
    /// Nothing to remove.
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployOutcome {
    Updated,
    Created,
}

impl GatewayClient {
    pub fn new(gateway: &str) -> Self {
        Self::with_http_client(reqwest::Client::new(), gateway)
    }

    pub fn with_http_client(http: reqwest::Client, gateway: &str) -> Self {
        Self {
            http,
            gateway: gateway.trim_end_matches('/').to_owned(),
        }
    }

    pub fn gateway(&self) -> &str {
        &self.gateway
    }

    fn functions_url(&self) -> String {
        format!("{}{FUNCTIONS_PATH}", self.gateway)
    }

    // ── Delete ──

    /// Delete a function from the gateway.
    ///
    /// 200/201/202 mean the function was removed; 404 means there was nothing
    /// to remove and is not an error.
    pub async fn delete_function(&self, function: &str) -> Result<DeleteOutcome, GatewayError> {
        let body = DeleteFunctionRequest {
            function_name: function,
        };

        tracing::debug!(gateway = %self.gateway, function, "DELETE {FUNCTIONS_PATH}");
        let response = self
            .http
            .delete(self.functions_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Transport {
                action: "removing",
                gateway: self.gateway.clone(),
                function: function.to_owned(),
                source: e,
            })?;

        let status = response.status();
        tracing::debug!(function, %status, "delete response");
        match status {
            StatusCode::OK | StatusCode::CREATED | StatusCode::ACCEPTED => Ok(DeleteOutcome::Removed),
            StatusCode::NOT_FOUND => Ok(DeleteOutcome::NotFound),
            _ => Err(self.unexpected_status(function, response).await),
        }
    }

    // ── Deploy ──

    pub async fn deploy_function(
        &self,
        request: &DeployRequest,
        mode: DeployMode,
    ) -> Result<DeployOutcome, GatewayError> {
        match mode {
            DeployMode::Update => {
                let response = self.send_deploy(reqwest::Method::PUT, request).await?;
                match response.status() {
                    status if status.is_success() => Ok(DeployOutcome::Updated),
                    StatusCode::NOT_FOUND => {
                        tracing::debug!(function = %request.service, "not deployed yet, creating");
                        self.create(request).await
                    }
                    _ => Err(self.unexpected_status(&request.service, response).await),
                }
            }
            DeployMode::Replace => {
                self.delete_function(&request.service).await?;
                self.create(request).await
            }
            DeployMode::Create => self.create(request).await,
        }
    }

    async fn create(&self, request: &DeployRequest) -> Result<DeployOutcome, GatewayError> {
        let response = self.send_deploy(reqwest::Method::POST, request).await?;
        if response.status().is_success() {
            Ok(DeployOutcome::Created)
        } else {
            Err(self.unexpected_status(&request.service, response).await)
        }
    }

    async fn send_deploy(
        &self,
        method: reqwest::Method,
        request: &DeployRequest,
    ) -> Result<reqwest::Response, GatewayError> {
        tracing::debug!(gateway = %self.gateway, function = %request.service, %method, "{FUNCTIONS_PATH}");
        let response = self
            .http
            .request(method, self.functions_url())
            .json(request)
            .send()
            .await
            .map_err(|e| GatewayError::Transport {
                action: "deploying",
                gateway: self.gateway.clone(),
                function: request.service.clone(),
                source: e,
            })?;
        tracing::debug!(function = %request.service, status = %response.status(), "deploy response");
        Ok(response)
    }

    async fn unexpected_status(&self, function: &str, response: reqwest::Response) -> GatewayError {
        let status = response.status().as_u16();
        match response.text().await {
            Ok(body) => GatewayError::UnexpectedStatus {
                function: function.to_owned(),
                status,
                body,
            },
            Err(e) => GatewayError::ReadBody {
                gateway: self.gateway.clone(),
                function: function.to_owned(),
                status,
                source: e,
            },
        }
    }
}
