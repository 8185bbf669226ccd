//! DNSimple v2 API client for issued certificates.

use crate::client::CertificateSource;
use async_trait::async_trait;
use certbridge_core::config::DnsimpleConfig;
use certbridge_core::error::{ClientError, ConfigError, Result};
use certbridge_core::types::{CertificateChain, CertificateId};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;
use tracing::{debug, info};

/// Every DNSimple response wraps its payload in `data`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct DownloadedCertificate {
    server: Option<String>,
    root: Option<String>,
    #[serde(default)]
    chain: Vec<String>,
}

#[derive(Deserialize)]
struct PrivateKey {
    private_key: String,
}

/// Certificate source backed by the DNSimple API.
#[derive(Clone)]
pub struct DnsimpleClient {
    client: Client,
    base_url: String,
    token: String,
}

impl DnsimpleClient {
    /// Creates a client for `config.url` authenticating with `config.token`.
    pub fn new(config: &DnsimpleConfig) -> Result<Self> {
        if config.token.is_empty() {
            return Err(ConfigError::missing_field("dnsimple.token").into());
        }

        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("certbridge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::request_failed(&config.url, e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    fn certificate_url(&self, id: &CertificateId, suffix: &str) -> String {
        format!(
            "{}/v2/{}/domains/{}/certificates/{}/{}",
            self.base_url, id.account_id, id.domain_id, id.certificate_id, suffix
        )
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!(url = %url, "Sending DNSimple request");

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| ClientError::request_failed(url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("Unknown error"));
            return Err(ClientError::UnexpectedStatus {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| ClientError::invalid_response(url, e.to_string()))?;

        Ok(envelope.data)
    }
}

impl fmt::Debug for DnsimpleClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DnsimpleClient")
            .field("base_url", &self.base_url)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl CertificateSource for DnsimpleClient {
    async fn fetch_chain(&self, id: &CertificateId) -> Result<CertificateChain> {
        let url = self.certificate_url(id, "download");
        let downloaded: DownloadedCertificate = self.get(&url).await?;

        info!(
            certificate = %id,
            intermediates = downloaded.chain.len(),
            "Downloaded certificate chain"
        );

        Ok(CertificateChain {
            server: downloaded.server,
            root: downloaded.root,
            chain: downloaded.chain,
        })
    }

    async fn fetch_private_key(&self, id: &CertificateId) -> Result<String> {
        let url = self.certificate_url(id, "private_key");
        let key: PrivateKey = self.get(&url).await?;

        info!(certificate = %id, "Downloaded certificate private key");

        Ok(key.private_key)
    }
}
