use crate::errors::LookupError;
use crate::models::{CompanyIdentifier, EnrichedCompany};
use reqwest;
use std::time::Duration;
use tracing;

/// Client for the public CNPJ registry lookup service.
///
/// Each lookup is a single `GET {base_url}/{cnpj}`; there is no retry.
#[derive(Clone)]
pub struct RegistryClient {
    client: reqwest::Client,
    base_url: String,
}

impl RegistryClient {
    /// Creates a new `RegistryClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Root URL of the lookup service.
    /// * `timeout` - Upper bound for one whole request, body included.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create registry client: {}", e))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Looks up one company by CNPJ.
    ///
    /// # Returns
    ///
    /// * `Result<EnrichedCompany, LookupError>` - The company, or a transport,
    ///   status or decode failure.
    pub async fn lookup(&self, id: &CompanyIdentifier) -> Result<EnrichedCompany, LookupError> {
        let url = format!("{}/{}", self.base_url, id);
        tracing::debug!("Looking up CNPJ {}: {}", id, url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LookupError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| LookupError::Transport(e.to_string()))?;

        let company: EnrichedCompany =
            serde_json::from_slice(&body).map_err(|e| LookupError::Decode(e.to_string()))?;

        tracing::debug!("✓ CNPJ {} resolved: {}", id, company.razao_social);
        Ok(company)
    }
}
