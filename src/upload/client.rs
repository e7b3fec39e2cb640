//! Pwndoc HTTP client

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::header::{COOKIE, HeaderMap, HeaderValue};
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use super::api::{ApiReply, Audit, AuditSummary, Envelope, ReportingApi, VulnerabilityTemplate};
use crate::config::WizardConfig;

const CONNECT_TIMEOUT: u64 = 5;
const READ_TIMEOUT: u64 = 60;

#[derive(Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenData {
    token: String,
}

/// Authenticated session against one Pwndoc instance
pub struct PwndocClient {
    base_url: String,
    client: Client,
}

impl PwndocClient {
    /// Log in with the configured credentials
    pub async fn connect(config: &WizardConfig) -> Result<Self> {
        let base_url = config.pwndoc_url.trim_end_matches('/').to_string();

        let login = Self::builder(config.accept_invalid_certs).build()?;
        let response = login
            .post(format!("{base_url}/api/users/token"))
            .json(&Credentials {
                username: &config.pwndoc_username,
                password: &config.pwndoc_password,
            })
            .send()
            .await
            .with_context(|| format!("Failed to reach Pwndoc at {base_url}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Pwndoc login failed: {status} - {body}"));
        }
        let envelope: Envelope<TokenData> = response
            .json()
            .await
            .context("Pwndoc login returned an unexpected body")?;

        let mut headers = HeaderMap::new();
        let cookie = HeaderValue::from_str(&format!("token=JWT {}", envelope.datas.token))
            .context("Pwndoc returned a token that is not a valid header value")?;
        headers.insert(COOKIE, cookie);

        let client = Self::builder(config.accept_invalid_certs)
            .default_headers(headers)
            .build()?;
        tracing::info!("Authenticated against {}", base_url);

        Ok(Self { base_url, client })
    }

    fn builder(accept_invalid_certs: bool) -> reqwest::ClientBuilder {
        Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT))
            .timeout(Duration::from_secs(READ_TIMEOUT))
            .danger_accept_invalid_certs(accept_invalid_certs)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_datas<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .with_context(|| format!("GET {path} failed"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("GET {path} failed: {status} - {body}"));
        }
        let envelope: Envelope<T> = response
            .json()
            .await
            .with_context(|| format!("GET {path} returned an unexpected body"))?;
        Ok(envelope.datas)
    }

    async fn send_json(&self, method: Method, path: &str, body: &Value) -> Result<ApiReply> {
        let response = self
            .client
            .request(method.clone(), self.url(path))
            .json(body)
            .send()
            .await
            .with_context(|| format!("{method} {path} failed"))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .with_context(|| format!("{method} {path}: failed to read response"))?;

        Ok(ApiReply {
            status,
            body: body.to_vec(),
        })
    }
}

#[async_trait]
impl ReportingApi for PwndocClient {
    async fn get_audits(&self) -> Result<Vec<AuditSummary>> {
        self.get_datas("/api/audits").await
    }

    async fn get_audit(&self, id: &str) -> Result<Audit> {
        self.get_datas(&format!("/api/audits/{id}")).await
    }

    async fn put_json(&self, path: &str, body: &Value) -> Result<ApiReply> {
        self.send_json(Method::PUT, path, body).await
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<ApiReply> {
        self.send_json(Method::POST, path, body).await
    }

    async fn export_vulnerability_templates(&self) -> Result<Vec<VulnerabilityTemplate>> {
        self.get_datas("/api/vulnerabilities/export").await
    }
}
