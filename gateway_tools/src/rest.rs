use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    Client,
    Url,
};
use serde::de::DeserializeOwned;
use sf_common::Secret;

use crate::GatewayApiError;

/// A bearer-authenticated JSON client. All three gateways authenticate server calls this way.
#[derive(Clone)]
pub(crate) struct RestClient {
    base_url: Url,
    client: Arc<Client>,
}

impl RestClient {
    pub fn new(base_url: &str, secret_key: &Secret<String>) -> Result<Self, GatewayApiError> {
        if secret_key.is_blank() {
            return Err(GatewayApiError::NotConfigured);
        }
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| GatewayApiError::Initialization(format!("Invalid base URL {base_url}. {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(GatewayApiError::Initialization(format!("{base_url} cannot be used as a base URL")));
        }
        let mut headers = HeaderMap::with_capacity(2);
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", secret_key.reveal()))
            .map_err(|e| GatewayApiError::Initialization(e.to_string()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| GatewayApiError::Initialization(e.to_string()))?;
        Ok(Self { base_url, client: Arc::new(client) })
    }

    /// Appends `segments` to the base URL. Each segment is percent-encoded, so a `/`, `?` or `#` in a payment
    /// reference stays inside its own segment.
    pub fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // Never fails: `new` rejects base URLs that cannot have a path
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        params: &[(&str, &str)],
    ) -> Result<T, GatewayApiError> {
        let url = self.url(segments);
        trace!("💳️ GET {url}");
        let mut req = self.client.get(url);
        if !params.is_empty() {
            req = req.query(params);
        }
        let response = req.send().await.map_err(|e| GatewayApiError::RestResponseError(e.to_string()))?;
        if response.status().is_success() {
            trace!("💳️ Query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| GatewayApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| GatewayApiError::RestResponseError(e.to_string()))?;
            Err(GatewayApiError::QueryError { status, message })
        }
    }
}
