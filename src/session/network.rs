//! HTTP client construction
//!
//! Every `reqwest::Client` the crate uses is built here so proxy, timeout
//! and user-agent settings apply uniformly.

use crate::{Result, config::Settings};
use reqwest::{Client, Proxy, header::HeaderMap};
use std::time::Duration;

/// Builds HTTP clients from network settings
#[derive(Debug, Clone)]
pub struct NetworkManager {
    /// Effective proxy URL
    proxy_url: Option<String>,
    /// User agent string
    user_agent: String,
    /// Connection timeout
    connect_timeout: Duration,
    /// Whole-request timeout, if configured
    request_timeout: Option<Duration>,
}

impl NetworkManager {
    /// Create new network manager from settings
    pub fn new(settings: &Settings) -> Self {
        Self {
            proxy_url: settings.get_proxy_url(),
            user_agent: settings.network.user_agent.clone(),
            connect_timeout: Duration::from_secs(settings.network.connect_timeout),
            request_timeout: settings.network.request_timeout.map(Duration::from_secs),
        }
    }

    /// User agent sent with every request
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Build a client without extra headers (used before a session exists)
    pub fn plain_client(&self) -> Result<Client> {
        self.build_client(HeaderMap::new())
    }

    /// Build a client that sends `headers` with every request
    pub fn build_client(&self, headers: HeaderMap) -> Result<Client> {
        let mut client_builder = Client::builder()
            .user_agent(self.user_agent.clone())
            .default_headers(headers)
            .connect_timeout(self.connect_timeout);

        if let Some(timeout) = self.request_timeout {
            client_builder = client_builder.timeout(timeout);
        }

        if let Some(proxy_url) = &self.proxy_url {
            let proxy = Proxy::all(proxy_url).map_err(|e| {
                crate::Error::config("network.proxy", &format!("Invalid proxy URL: {}", e))
            })?;
            client_builder = client_builder.proxy(proxy);
        }

        let client = client_builder.build().map_err(|e| {
            crate::Error::internal(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(client)
    }
}
