//! Valuation Pipeline
//!
//! Single-attempt submission: query the valuation service, reshape the
//! result, compose the sink payload with the form snapshot and attribution,
//! POST it, and on acknowledgment hand back the redirect target. Any stage
//! failing aborts the rest; nothing is sent until the payload is complete.

pub mod reshape;

pub use reshape::{IndexedValuations, TrimValuation, ValueTriple, item_key, reshape};

use crate::catalog::{ValuationQuery, ValuationService};
use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use crate::wizard::attribution::AttributionMetadata;
use crate::wizard::form::FormFields;
use anyhow::Context;
use reqwest::{Client, Url};
use serde::Serialize;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Fragment marking a completed submission
pub const DONE_FRAGMENT: &str = "done";

/// Body POSTed to the sink
#[derive(Debug, Serialize)]
pub struct SubmissionPayload<'a> {
    #[serde(rename = "marketValue")]
    pub market_value: IndexedValuations,
    pub form_data: &'a FormFields,
    #[serde(flatten)]
    pub attribution: &'a AttributionMetadata,
}

/// Where the host should navigate after a successful submission.
///
/// Navigation must happen at the top-level browsing context: the wizard may
/// be embedded, and the destination page is not meant to load inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTarget {
    url: Url,
}

impl RedirectTarget {
    /// Base URL plus `utm_name`/`utm_email`/`utm_phone` and the `done` fragment
    pub fn build(base: &str, name: &str, email: &str, phone: &str) -> PipelineResult<Self> {
        let mut url = Url::parse(base).map_err(|e| PipelineError::InvalidRedirect {
            url: base.to_string(),
            reason: e.to_string(),
        })?;

        url.query_pairs_mut()
            .append_pair("utm_name", name)
            .append_pair("utm_email", email)
            .append_pair("utm_phone", phone);
        url.set_fragment(Some(DONE_FRAGMENT));

        Ok(Self { url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    pub fn fragment(&self) -> Option<&str> {
        self.url.fragment()
    }

    /// Decoded value of a query parameter
    pub fn query_param(&self, key: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }
}

impl std::fmt::Display for RedirectTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.url.as_str())
    }
}

pub struct ValuationPipeline {
    valuation: Arc<dyn ValuationService>,
    client: Client,
    sink_url: String,
    redirect_base_url: String,
}

impl ValuationPipeline {
    pub fn new(
        valuation: Arc<dyn ValuationService>,
        client: Client,
        sink_url: impl Into<String>,
        redirect_base_url: impl Into<String>,
    ) -> Self {
        Self {
            valuation,
            client,
            sink_url: sink_url.into(),
            redirect_base_url: redirect_base_url.into(),
        }
    }

    /// Build from loaded configuration. The sink URL is required.
    pub fn from_config(
        config: &Config,
        valuation: Arc<dyn ValuationService>,
    ) -> anyhow::Result<Self> {
        let sink_url = config
            .submission
            .sink_url
            .clone()
            .context("submission.sink_url is not configured")?;
        let client = config.http.build_client()?;
        Ok(Self::new(
            valuation,
            client,
            sink_url,
            config.submission.redirect_base_url.clone(),
        ))
    }

    /// Run the pipeline once. The returned error's cause is logged here;
    /// callers show only [`PipelineError::user_message`].
    pub async fn submit(
        &self,
        form: &FormFields,
        attribution: &AttributionMetadata,
    ) -> PipelineResult<RedirectTarget> {
        let submission_id = Uuid::new_v4();
        let span = tracing::info_span!("submission", id = %submission_id);

        let result = self.run(form, attribution).instrument(span.clone()).await;

        span.in_scope(|| match &result {
            Ok(target) => tracing::info!(
                "Submission acknowledged; redirect host {:?}",
                target.url().host_str()
            ),
            Err(e) => tracing::error!("Error submitting valuation: {}", e),
        });
        result
    }

    async fn run(
        &self,
        form: &FormFields,
        attribution: &AttributionMetadata,
    ) -> PipelineResult<RedirectTarget> {
        let query = ValuationQuery {
            year: form.year.clone(),
            make: form.make.clone(),
            model: form.model.clone(),
            jurisdiction: form.jurisdiction.clone(),
            mileage: form.mileage.clone(),
        };
        let raw = self.valuation.market_value(&query).await?;

        let market_value = reshape(&raw)?;
        tracing::debug!("Reshaped {} trim(s)", market_value.len());

        let payload = SubmissionPayload {
            market_value,
            form_data: form,
            attribution,
        };
        let body = serde_json::to_vec(&payload)?;

        let response = self
            .client
            .post(&self.sink_url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(PipelineError::SinkTransport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::SinkRejected(status.as_u16()));
        }

        RedirectTarget::build(&self.redirect_base_url, &form.name, &form.email, &form.phone)
    }
}
