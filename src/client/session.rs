// Copyright 2026 BadCompany
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Authenticated console session: credential login plus cookie jar

use crate::client::response::{ensure_success, read_json};
use crate::config::AssetConfig;
use crate::core::constants::{endpoints, messages, session};
use crate::core::errors::{format_error_detail, ConnectorError};
use crate::core::models::ProgressLog;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Response};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};
use url::Url;

/// Logged-in session, owned by a single action invocation
pub struct CybereasonSession {
    http: Client,
    base_url: String,
    cookie: String,
}

impl CybereasonSession {
    /// Log in to the console and capture the session cookie.
    ///
    /// Every outcome is reported to `progress`. The session is only returned
    /// when the login response set a non-empty `JSESSIONID` cookie and the
    /// final status was 200.
    ///
    /// # Arguments
    /// * `asset` - Base URL, credentials and certificate verification flag
    /// * `timeout` - Per-request timeout applied to every call on this session
    /// * `progress` - Live progress feed
    pub async fn login(
        asset: &AssetConfig,
        timeout: Duration,
        progress: &mut ProgressLog,
    ) -> Result<Self, ConnectorError> {
        progress.save_progress("Logging in to the Cybereason console...");
        let login_url = format!("{}{}", asset.base_url, endpoints::LOGIN);

        let parsed_url = match Url::parse(&login_url) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => url,
            Ok(_) => {
                let msg = format!(
                    "Error connecting to server. No connection adapters were found for {}",
                    login_url
                );
                progress.save_progress(msg.clone());
                return Err(ConnectorError::Authentication(msg));
            }
            Err(_) => {
                let msg = format!("Error connecting to server. Invalid URL {}", login_url);
                progress.save_progress(msg.clone());
                return Err(ConnectorError::Authentication(msg));
            }
        };

        let jar = Arc::new(Jar::default());
        let http = Self::build_client(asset, timeout, jar.clone())?;

        let form = [
            ("username", asset.username.as_deref().unwrap_or_default()),
            ("password", asset.password.as_deref().unwrap_or_default()),
        ];

        let response = match http.post(parsed_url.clone()).form(&form).send().await {
            Ok(response) => response,
            Err(e) => {
                let msg = if e.is_connect() {
                    messages::LOGIN_CONNECTION_REFUSED.to_string()
                } else if e.is_builder() {
                    format!("Error connecting to server. Invalid URL {}", login_url)
                } else {
                    format!(
                        "Error connecting to server. {}",
                        format_error_detail(None, Some(&e.to_string()))
                    )
                };
                error!(url = %login_url, error = %e, "Login request failed");
                progress.save_progress(msg.clone());
                return Err(ConnectorError::Authentication(msg));
            }
        };

        let status = response.status().as_u16();
        let cookie = Self::session_cookie_from(&jar, &parsed_url);
        let body = response.text().await.unwrap_or_default();

        match cookie {
            None => {
                progress.save_progress(messages::NO_SESSION_COOKIE);
                progress.save_progress(format!("Status code: {}", status));
                debug!(status, body = %body, "Login returned no session cookie");
                Err(ConnectorError::Authentication(messages::NO_SESSION_COOKIE.to_string()))
            }
            Some(_) if status != 200 => {
                progress.save_progress(messages::LOGIN_UNKNOWN_ERROR);
                progress.save_progress(format!("Status code: {}", status));
                debug!(status, body = %body, "Login returned unexpected status");
                Err(ConnectorError::Authentication(format!(
                    "{}. Status code: {}",
                    messages::LOGIN_UNKNOWN_ERROR,
                    status
                )))
            }
            Some(cookie) => {
                progress.save_progress(messages::LOGIN_SUCCESS);
                progress.save_progress(messages::SESSION_CREATED);
                info!(base_url = %asset.base_url, "Console session established");
                Ok(Self {
                    http,
                    base_url: asset.base_url.clone(),
                    cookie,
                })
            }
        }
    }

    fn build_client(
        asset: &AssetConfig,
        timeout: Duration,
        jar: Arc<Jar>,
    ) -> Result<Client, ConnectorError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(asset.user_agent()));

        Client::builder()
            .cookie_provider(jar)
            .default_headers(headers)
            .timeout(timeout)
            .danger_accept_invalid_certs(!asset.verify_server_cert)
            .build()
            .map_err(|e| {
                ConnectorError::Configuration(format!("Failed to create HTTP client: {}", e))
            })
    }

    /// Value of the session cookie the jar would send to `url`
    fn session_cookie_from(jar: &Jar, url: &Url) -> Option<String> {
        let header = jar.cookies(url)?;
        let raw = header.to_str().ok()?;
        raw.split(';')
            .map(str::trim)
            .find_map(|pair| pair.strip_prefix(session::SESSION_COOKIE)?.strip_prefix('='))
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }

    pub fn session_cookie(&self) -> &str {
        &self.cookie
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST a serializable body as JSON. The response is returned unclassified.
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<Response, ConnectorError> {
        let url = self.url(path);
        debug!(url = %url, "POST (json)");
        Ok(self.http.post(url).json(body).send().await?)
    }

    /// POST a pre-rendered body; the session's JSON content type still applies
    pub async fn post_raw(
        &self,
        path: &str,
        body: impl Into<String>,
    ) -> Result<Response, ConnectorError> {
        let url = self.url(path);
        debug!(url = %url, "POST (raw)");
        Ok(self.http.post(url).body(body.into()).send().await?)
    }

    pub async fn get(&self, path: &str) -> Result<Response, ConnectorError> {
        let url = self.url(path);
        debug!(url = %url, "GET");
        Ok(self.http.get(url).send().await?)
    }

    /// POST a JSON body, classify failures and decode the success body
    pub async fn query<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<Value, ConnectorError> {
        let response = ensure_success(self.post_json(path, body).await?).await?;
        read_json(response).await
    }
}
