//! Vehicle Data Client
//!
//! HTTP access to the vehicle data service: the year/make/model catalog and
//! the market valuation lookup. Both share a base URL and the `x-AuthKey`
//! credential, injected at construction.

use crate::config::{Config, SecretString};
use crate::error::{CatalogError, CatalogResult, PipelineError, PipelineResult};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

const AUTH_HEADER: &str = "x-AuthKey";

/// Ordered option lists for the cascading selects
#[async_trait]
pub trait CatalogService: Send + Sync {
    async fn list_years(&self) -> CatalogResult<Vec<String>>;

    async fn list_makes(&self, year: &str) -> CatalogResult<Vec<String>>;

    async fn list_models(&self, year: &str, make: &str) -> CatalogResult<Vec<String>>;
}

/// Parameters of one valuation lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValuationQuery {
    pub year: String,
    pub make: String,
    pub model: String,
    pub jurisdiction: String,
    pub mileage: String,
}

/// Market valuation lookup. Returns the raw service body.
#[async_trait]
pub trait ValuationService: Send + Sync {
    async fn market_value(&self, query: &ValuationQuery) -> PipelineResult<Value>;
}

#[derive(Debug, Deserialize)]
struct YearsResponse {
    years: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct MakesResponse {
    makes: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<Value>,
}

/// The service returns years as numbers and names as strings; both are stored as text.
fn option_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// reqwest-backed client for the vehicle data service
#[derive(Clone)]
pub struct VehicleDataClient {
    client: Client,
    base_url: String,
    auth_key: SecretString,
}

impl VehicleDataClient {
    pub fn new(client: Client, base_url: impl Into<String>, auth_key: SecretString) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            auth_key,
        }
    }

    /// Build from loaded configuration
    pub fn from_config(config: &Config) -> anyhow::Result<Arc<Self>> {
        let client = config
            .http
            .build_client()
            .context("Failed to build vehicle data client")?;
        Ok(Arc::new(Self::new(
            client,
            config.services.base_url.clone(),
            config.services.auth_key.clone(),
        )))
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .header(AUTH_HEADER, self.auth_key.expose_secret())
    }

    async fn fetch_options<T: serde::de::DeserializeOwned>(&self, path: &str) -> CatalogResult<T> {
        tracing::debug!("Catalog GET {}", path);
        let response = self.get(path).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| CatalogError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl CatalogService for VehicleDataClient {
    async fn list_years(&self) -> CatalogResult<Vec<String>> {
        let body: YearsResponse = self.fetch_options("/ymm-specs/options/v2/year").await?;
        Ok(body.years.into_iter().map(option_text).collect())
    }

    async fn list_makes(&self, year: &str) -> CatalogResult<Vec<String>> {
        let path = format!("/ymm-specs/options/v2/make/{}", segment(year));
        let body: MakesResponse = self.fetch_options(&path).await?;
        Ok(body.makes.into_iter().map(option_text).collect())
    }

    async fn list_models(&self, year: &str, make: &str) -> CatalogResult<Vec<String>> {
        let path = format!(
            "/ymm-specs/options/v2/model/{}/{}",
            segment(year),
            segment(make)
        );
        let body: ModelsResponse = self.fetch_options(&path).await?;
        Ok(body.models.into_iter().map(option_text).collect())
    }
}

#[async_trait]
impl ValuationService for VehicleDataClient {
    async fn market_value(&self, query: &ValuationQuery) -> PipelineResult<Value> {
        let path = format!(
            "/market-value/v2/ymm/{}/{}/{}",
            segment(&query.year),
            segment(&query.make),
            segment(&query.model)
        );
        tracing::debug!("Valuation GET {}", path);

        let response = self
            .get(&path)
            .query(&[("state", &query.jurisdiction), ("mileage", &query.mileage)])
            .send()
            .await
            .map_err(PipelineError::ValuationTransport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::ValuationStatus {
                status: status.as_u16(),
                body,
            });
        }

        let text = response
            .text()
            .await
            .map_err(PipelineError::ValuationTransport)?;
        serde_json::from_str(&text).map_err(|e| PipelineError::MalformedValuation(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_for(server: &mockito::Server) -> VehicleDataClient {
        VehicleDataClient::new(Client::new(), server.url(), SecretString::new("test-key"))
    }

    #[tokio::test]
    async fn test_list_years_numeric_values() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/ymm-specs/options/v2/year")
            .match_header("x-AuthKey", "test-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":"success","years":[2024,2023,"2022"]}"#)
            .create_async()
            .await;

        let years = client_for(&server).list_years().await.unwrap();

        mock.assert_async().await;
        assert_eq!(years, vec!["2024", "2023", "2022"]);
    }

    #[tokio::test]
    async fn test_list_makes() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/ymm-specs/options/v2/make/2020")
            .with_status(200)
            .with_body(r#"{"makes":["Acura","Honda"]}"#)
            .create_async()
            .await;

        let makes = client_for(&server).list_makes("2020").await.unwrap();

        mock.assert_async().await;
        assert_eq!(makes, vec!["Acura", "Honda"]);
    }

    #[tokio::test]
    async fn test_list_models_encodes_segments() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/ymm-specs/options/v2/model/2020/Land%20Rover")
            .with_status(200)
            .with_body(r#"{"models":["Defender","Discovery"]}"#)
            .create_async()
            .await;

        let models = client_for(&server)
            .list_models("2020", "Land Rover")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(models, vec!["Defender", "Discovery"]);
    }

    #[tokio::test]
    async fn test_catalog_error_status() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/ymm-specs/options/v2/year")
            .with_status(401)
            .with_body("unauthorized")
            .create_async()
            .await;

        let err = client_for(&server).list_years().await.unwrap_err();

        mock.assert_async().await;
        assert!(matches!(err, CatalogError::Status { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_catalog_missing_field_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/ymm-specs/options/v2/make/2020")
            .with_status(200)
            .with_body(r#"{"years":[]}"#)
            .create_async()
            .await;

        let err = client_for(&server).list_makes("2020").await.unwrap_err();
        assert!(matches!(err, CatalogError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_market_value_query_params() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/market-value/v2/ymm/2019/Honda/Accord")
            .match_header("x-AuthKey", "test-key")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("state".into(), "TX".into()),
                mockito::Matcher::UrlEncoded("mileage".into(), "42000".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"status":"success","data":{}}"#)
            .create_async()
            .await;

        let query = ValuationQuery {
            year: "2019".to_string(),
            make: "Honda".to_string(),
            model: "Accord".to_string(),
            jurisdiction: "TX".to_string(),
            mileage: "42000".to_string(),
        };
        let body = client_for(&server).market_value(&query).await.unwrap();

        mock.assert_async().await;
        assert_eq!(body["status"], "success");
    }

    #[tokio::test]
    async fn test_market_value_server_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", mockito::Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let query = ValuationQuery {
            year: "2019".to_string(),
            make: "Honda".to_string(),
            model: "Accord".to_string(),
            jurisdiction: "AL".to_string(),
            mileage: "1".to_string(),
        };
        let err = client_for(&server).market_value(&query).await.unwrap_err();
        assert!(matches!(err, PipelineError::ValuationStatus { status: 500, .. }));
    }
}
