//! Minimal client for the vhost gateway's control-plane HTTP API.

mod dto;
mod error;

pub use dto::ListHost;
pub use error::ClientError;

use reqwest::{Client, StatusCode, Url};

use crate::dto::{AddRequest, AddResponse, ListResponse, RandomRequest};

/// Thin wrapper around a base URL and an HTTP client.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    base: Url,
    http: Client,
}

impl GatewayClient {
    /// Parses `base_url` and builds a client against it, using the crate's
    /// default `reqwest::Client`.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Ok(Self::with_http_client(base_url, Client::new())?)
    }

    /// Same as [`GatewayClient::new`] but with a caller-supplied `reqwest::Client`
    /// (for custom timeouts, TLS config, proxies, etc).
    pub fn with_http_client(base_url: &str, http: Client) -> Result<Self, ClientError> {
        Ok(Self {
            base: Url::parse(base_url)?,
            http,
        })
    }

    fn vhost_url(&self) -> Url {
        self.base.join("/vhost/").expect("static path is valid")
    }

    fn vhost_path_url(&self, name: &str) -> Url {
        self.base
            .join(&format!("/vhost/{name}"))
            .expect("path-escaped name is a valid url segment")
    }

    fn random_url(&self) -> Url {
        self.base.join("/random/").expect("static path is valid")
    }

    /// Registers `host_prefix` → `target`, returning the full hostname the
    /// registry bound it under.
    pub async fn add(&self, host_prefix: &str, target: &str) -> Result<String, ClientError> {
        let response = self
            .http
            .post(self.vhost_url())
            .json(&AddRequest { host_prefix, target })
            .send()
            .await?;
        let body: AddResponse = expect_ok(response).await?;
        Ok(body.hostname)
    }

    /// Requests a server-generated random hostname bound to `target`.
    pub async fn random(&self, target: &str) -> Result<String, ClientError> {
        let response = self
            .http
            .post(self.random_url())
            .json(&RandomRequest { target })
            .send()
            .await?;
        let body: AddResponse = expect_ok(response).await?;
        Ok(body.hostname)
    }

    /// Removes `hostname`.
    pub async fn remove(&self, hostname: &str) -> Result<(), ClientError> {
        let response = self.http.delete(self.vhost_path_url(hostname)).send().await?;
        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => Err(ClientError::NotFound),
            other => Err(ClientError::UnexpectedStatus(other)),
        }
    }

    /// Lists every currently registered vhost.
    pub async fn list(&self) -> Result<Vec<ListHost>, ClientError> {
        let response = self.http.get(self.vhost_url()).send().await?;
        let body: ListResponse = expect_ok(response).await?;
        Ok(body.hosts)
    }

    /// Looks up a single vhost by its exact registered name.
    pub async fn list_host(&self, name: &str) -> Result<ListHost, ClientError> {
        let response = self.http.get(self.vhost_path_url(name)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound);
        }
        let body: ListResponse = expect_ok(response).await?;
        body.hosts.into_iter().next().ok_or(ClientError::NotFound)
    }
}

async fn expect_ok<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    if response.status() != StatusCode::OK {
        return Err(ClientError::UnexpectedStatus(response.status()));
    }
    Ok(response.json::<T>().await?)
}
