//! Azure App Service client over the Resource Manager REST API.
//!
//! The bearer token is acquired by the host and passed in through
//! [`AppServiceConfig::access_token`].

use crate::client::{AppServiceClient, BindingUpdate};
use async_trait::async_trait;
use base64::prelude::*;
use certbridge_core::config::AppServiceConfig;
use certbridge_core::error::{ClientError, ConfigError, Result};
use certbridge_core::types::{ApplicationTarget, HostNameBindingSnapshot};
use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// SSL state used for every binding this client writes.
pub const SNI_ENABLED: &str = "SniEnabled";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Page<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Site {
    id: String,
    name: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    properties: SiteProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SiteProperties {
    #[serde(default)]
    resource_group: String,
    #[serde(default)]
    host_name_ssl_states: Vec<HostNameSslState>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HostNameSslState {
    name: String,
    thumbprint: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CertificateResource<'a> {
    location: &'a str,
    properties: CertificateProperties<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CertificateProperties<'a> {
    pfx_blob: String,
    password: &'a str,
}

#[derive(Serialize)]
struct HostNameBinding<'a> {
    properties: HostNameBindingProperties<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HostNameBindingProperties<'a> {
    ssl_state: &'a str,
    thumbprint: &'a str,
}

/// Application management client for Azure App Service.
#[derive(Clone)]
pub struct AzureAppServiceClient {
    client: Client,
    management_url: Url,
    subscription_id: String,
    api_version: String,
    access_token: String,
}

impl AzureAppServiceClient {
    pub fn new(config: &AppServiceConfig) -> Result<Self> {
        if config.subscription_id.is_empty() {
            return Err(ConfigError::missing_field("app_service.subscription_id").into());
        }

        let management_url = Url::parse(&config.management_url).map_err(|e| {
            ConfigError::invalid_value("app_service.management_url", e.to_string())
        })?;

        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("certbridge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::request_failed(&config.management_url, e.to_string()))?;

        Ok(Self {
            client,
            management_url,
            subscription_id: config.subscription_id.clone(),
            api_version: config.api_version.clone(),
            access_token: config.access_token.clone(),
        })
    }

    /// Builds a management URL from raw path segments. Each segment is
    /// percent-encoded, so names containing `#` or `/` stay one segment.
    fn resource_url<'a, I>(&self, segments: I) -> Result<Url>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut url = self.management_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::invalid_argument("management URL cannot be a base"))?
            .pop_if_empty()
            .extend(segments);
        url.query_pairs_mut()
            .append_pair("api-version", &self.api_version);
        Ok(url)
    }

    /// URL of a resource identified by its full ARM id.
    fn resource_id_url(&self, resource_id: &str, children: &[&str]) -> Result<Url> {
        let segments = resource_id
            .split('/')
            .filter(|segment| !segment.is_empty())
            .chain(children.iter().copied());
        self.resource_url(segments)
    }

    fn certificate_url(&self, application: &ApplicationTarget, name: &str) -> Result<Url> {
        if application.resource_group.is_empty() {
            return Err(ClientError::invalid_argument(format!(
                "application '{}' has no resource group",
                application.name
            ))
            .into());
        }

        self.resource_url([
            "subscriptions",
            self.subscription_id.as_str(),
            "resourceGroups",
            application.resource_group.as_str(),
            "providers",
            "Microsoft.Web",
            "certificates",
            name,
        ])
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<serde_json::Value>,
    ) -> Result<T> {
        let url_text = url.to_string();
        debug!(method = %method, url = %url_text, "Sending management request");

        let mut request = self
            .client
            .request(method, url)
            .bearer_auth(&self.access_token);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ClientError::request_failed(&url_text, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("Unknown error"));
            return Err(ClientError::UnexpectedStatus {
                url: url_text,
                status: status.as_u16(),
                body,
            }
            .into());
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::invalid_response(&url_text, e.to_string()).into())
    }

    async fn get_site(&self, application: &ApplicationTarget) -> Result<Site> {
        let url = self.resource_id_url(&application.id, &[])?;
        self.send(Method::GET, url, None).await
    }
}

impl fmt::Debug for AzureAppServiceClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureAppServiceClient")
            .field("management_url", &self.management_url.as_str())
            .field("subscription_id", &self.subscription_id)
            .field("api_version", &self.api_version)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// Name of the certificate resource holding `thumbprint` in `region`.
pub fn certificate_resource_name(thumbprint: &str, region: &str) -> String {
    format!("{}##{}#", thumbprint, region)
}

/// Host part of a binding's ARM name (`site/host` or `host`).
fn binding_host_name(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

impl Site {
    fn into_target(self) -> ApplicationTarget {
        ApplicationTarget::new(self.id, self.name)
            .with_region(self.location)
            .with_resource_group(self.properties.resource_group)
    }
}

#[async_trait]
impl AppServiceClient for AzureAppServiceClient {
    async fn list_applications(&self) -> Result<Vec<ApplicationTarget>> {
        let mut url = self.resource_url([
            "subscriptions",
            self.subscription_id.as_str(),
            "providers",
            "Microsoft.Web",
            "sites",
        ])?;

        let mut applications = Vec::new();
        loop {
            let page: Page<Site> = self.send(Method::GET, url, None).await?;
            applications.extend(page.value.into_iter().map(Site::into_target));

            match page.next_link {
                Some(next) => {
                    url = Url::parse(&next)
                        .map_err(|e| ClientError::invalid_response(&next, e.to_string()))?;
                }
                None => break,
            }
        }

        info!(count = applications.len(), "Listed web applications");
        Ok(applications)
    }

    async fn list_bindings(
        &self,
        application: &ApplicationTarget,
    ) -> Result<Vec<HostNameBindingSnapshot>> {
        let site = self.get_site(application).await?;

        Ok(site
            .properties
            .host_name_ssl_states
            .into_iter()
            .map(|state| {
                HostNameBindingSnapshot::new(
                    binding_host_name(&state.name),
                    state.thumbprint.filter(|t| !t.is_empty()),
                )
            })
            .collect())
    }

    async fn update_binding(&self, update: BindingUpdate<'_>) -> Result<ApplicationTarget> {
        let application = update.application;
        let name = certificate_resource_name(update.thumbprint, &application.region);

        let certificate = serde_json::to_value(CertificateResource {
            location: &application.region,
            properties: CertificateProperties {
                pfx_blob: BASE64_STANDARD.encode(update.certificate),
                password: update.password,
            },
        })
        .map_err(|e| ClientError::invalid_argument(e.to_string()))?;

        let url = self.certificate_url(application, &name)?;
        let _: serde_json::Value = self.send(Method::PUT, url, Some(certificate)).await?;

        debug!(
            application = %application.name,
            certificate = %name,
            "Uploaded certificate resource"
        );

        let binding = serde_json::to_value(HostNameBinding {
            properties: HostNameBindingProperties {
                ssl_state: SNI_ENABLED,
                thumbprint: update.thumbprint,
            },
        })
        .map_err(|e| ClientError::invalid_argument(e.to_string()))?;

        let url = self.resource_id_url(&application.id, &["hostNameBindings", update.host_name])?;
        let _: serde_json::Value = self.send(Method::PUT, url, Some(binding)).await?;

        Ok(self.get_site(application).await?.into_target())
    }
}
