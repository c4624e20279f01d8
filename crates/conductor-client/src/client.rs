// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP client for control-plane solutions and catalogs.

use std::future::Future;
use std::sync::Arc;

use conductor_core::{CatalogSpec, ObjectState, SolutionSpec};
use reqwest::header::IF_MATCH;
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::auth::{AuthRequest, AuthResponse, TokenCache};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

/// Authenticated client for the control-plane REST API.
///
/// Every request carries a bearer token obtained from `users/auth`. The
/// token is cached and shared by clones of the client; a 401 triggers one
/// re-login and one retry before the request fails as unauthorized.
///
/// All operations take a [`CancellationToken`] and return
/// [`ClientError::Cancelled`] as soon as it fires.
#[derive(Clone)]
pub struct ControlPlaneClient {
    config: Arc<ClientConfig>,
    http: reqwest::Client,
    tokens: Arc<TokenCache>,
}

impl ControlPlaneClient {
    /// Create a new client with the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config: Arc::new(config),
            http,
            tokens: Arc::new(TokenCache::new()),
        })
    }

    /// Create a client from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Fetch a solution. The returned spec's `generation` is the version
    /// to pass back to [`replace_solution`](Self::replace_solution).
    #[instrument(skip(self, cancel))]
    pub async fn fetch_solution(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<SolutionSpec> {
        let url = self.object_url(&["solutions"], name)?;
        let state: ObjectState<SolutionSpec> =
            self.get_json(&url, "solution", name, cancel).await?;
        state.spec.ok_or_else(|| ClientError::NotFound {
            kind: "solution".to_string(),
            name: name.to_string(),
        })
    }

    /// Replace a solution. When `spec.generation` is set the write is
    /// conditional on it and a mismatch fails with [`ClientError::Conflict`].
    #[instrument(skip(self, spec, cancel))]
    pub async fn replace_solution(
        &self,
        name: &str,
        spec: &SolutionSpec,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let url = self.object_url(&["solutions"], name)?;
        let generation = spec.generation.clone();

        let response = self
            .send_authorized(
                |http| {
                    let request = http.post(url.clone()).json(spec);
                    match &generation {
                        Some(generation) => request.header(IF_MATCH, generation.as_str()),
                        None => request,
                    }
                },
                cancel,
            )
            .await?;

        check_status(response, "solution", name).await?;
        debug!(name, generation = ?spec.generation, "Solution replaced");
        Ok(())
    }

    /// Fetch a catalog from the catalog registry.
    #[instrument(skip(self, cancel))]
    pub async fn fetch_catalog(&self, name: &str, cancel: &CancellationToken) -> Result<CatalogSpec> {
        let url = self.object_url(&["catalogs", "registry"], name)?;
        let state: ObjectState<CatalogSpec> = self.get_json(&url, "catalog", name, cancel).await?;
        let mut catalog = state.spec.ok_or_else(|| ClientError::NotFound {
            kind: "catalog".to_string(),
            name: name.to_string(),
        })?;
        if catalog.name.is_empty() {
            catalog.name = name.to_string();
        }
        Ok(catalog)
    }

    /// URL of a named object under `collection`, with the name as one
    /// percent-encoded path segment.
    fn object_url(&self, collection: &[&str], name: &str) -> Result<Url> {
        let name = path_segment(name)?;
        let mut url = Url::parse(&self.config.base_url).map_err(|e| {
            ClientError::Config(format!("invalid baseUrl '{}': {}", self.config.base_url, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                ClientError::Config(format!(
                    "baseUrl '{}' cannot carry a path",
                    self.config.base_url
                ))
            })?
            .pop_if_empty()
            .extend(collection)
            .push(name);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &Url,
        kind: &str,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<T> {
        let response = self.send_authorized(|http| http.get(url.clone()), cancel).await?;
        let response = check_status(response, kind, name).await?;
        let body = with_cancel(cancel, response.bytes()).await??;
        serde_json::from_slice(&body).map_err(|e| {
            ClientError::UnexpectedResponse(format!("invalid {} '{}' body: {}", kind, name, e))
        })
    }

    /// Send a request with the cached bearer token, refreshing it once on 401.
    async fn send_authorized<F>(&self, build: F, cancel: &CancellationToken) -> Result<Response>
    where
        F: Fn(&reqwest::Client) -> RequestBuilder,
    {
        with_cancel(cancel, async {
            let token = self.tokens.get_or_login(|| self.login()).await?;
            let response = build(&self.http).bearer_auth(&token.value).send().await?;
            if response.status() != StatusCode::UNAUTHORIZED {
                return Ok(response);
            }

            warn!(epoch = token.epoch, "Bearer token rejected, logging in again");
            let token = self
                .tokens
                .refresh(Some(token.epoch), || self.login())
                .await?;
            let response = build(&self.http).bearer_auth(&token.value).send().await?;
            if response.status() == StatusCode::UNAUTHORIZED {
                return Err(ClientError::Unauthorized(
                    "request rejected after token refresh".to_string(),
                ));
            }
            Ok::<_, ClientError>(response)
        })
        .await?
    }

    async fn login(&self) -> Result<String> {
        let response = self
            .http
            .post(self.config.endpoint("users/auth"))
            .json(&AuthRequest {
                username: &self.config.user,
                password: &self.config.password,
            })
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ClientError::Unauthorized(format!(
                "login for '{}' rejected",
                self.config.user
            )));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Server {
                status: status.as_u16(),
                message,
            });
        }

        let auth: AuthResponse = response.json().await?;
        if auth.access_token.is_empty() {
            return Err(ClientError::Unauthorized(
                "auth response carried no access token".to_string(),
            ));
        }
        debug!(user = %self.config.user, token_type = ?auth.token_type, "Logged in");
        Ok(auth.access_token)
    }
}

async fn with_cancel<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = T>,
) -> Result<T> {
    if cancel.is_cancelled() {
        return Err(ClientError::Cancelled);
    }
    cancel
        .run_until_cancelled(fut)
        .await
        .ok_or(ClientError::Cancelled)
}

async fn check_status(response: Response, kind: &str, name: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();

    Err(match status {
        StatusCode::NOT_FOUND => ClientError::NotFound {
            kind: kind.to_string(),
            name: name.to_string(),
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClientError::Unauthorized(message),
        StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => ClientError::Conflict {
            name: name.to_string(),
            message,
        },
        StatusCode::BAD_REQUEST => ClientError::BadRequest(message),
        _ => ClientError::Server {
            status: status.as_u16(),
            message,
        },
    })
}

/// Object names travel as a single path segment. `.` and `..` would be
/// dropped or resolved by the URL parser, so they are rejected with `/`.
fn path_segment(name: &str) -> Result<&str> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') {
        return Err(ClientError::BadRequest(format!(
            "invalid object name '{}'",
            name
        )));
    }
    Ok(name)
}
