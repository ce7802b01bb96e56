//! Wizard Runtime
//!
//! Single-task event loop around [`WizardController`]. Host input arrives
//! on the handle's channel and the results of spawned network calls on an
//! internal one; both are applied from this loop only, so the controller is
//! never shared. After each event the host receives a fresh [`WizardView`];
//! a successful submission ends the loop with a [`WizardUpdate::Redirect`].
//!
//! The loop ends when the host quits or drops every [`WizardHandle`]. A
//! submission already issued is never abandoned: the loop waits for it to
//! settle first.

use crate::catalog::CatalogService;
use crate::error::{CatalogResult, PipelineResult};
use crate::valuation::{RedirectTarget, ValuationPipeline};
use crate::wizard::{
    AttributionMetadata, AttributionPublisher, FetchTicket, Field, WizardAction,
    WizardController, WizardView, attribution_channel,
};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Events applied by the runtime loop
#[derive(Debug)]
pub enum WizardEvent {
    /// User edited a field
    FieldChanged { field: Field, value: String },

    /// User pressed the step's primary button
    Advance,

    /// User went back a step
    Back,

    /// Host asked for the current view
    Refresh,

    /// A catalog fetch finished
    OptionsFetched {
        ticket: FetchTicket,
        result: CatalogResult<Vec<String>>,
    },

    /// The valuation pipeline finished
    SubmissionFinished(PipelineResult<RedirectTarget>),

    /// Host is shutting the wizard down
    Quit,
}

/// Output delivered to the host
#[derive(Debug, Clone, PartialEq)]
pub enum WizardUpdate {
    View(WizardView),
    /// Terminal: navigate the top-level context here
    Redirect(RedirectTarget),
}

/// Host-side handle for feeding the runtime
#[derive(Debug, Clone)]
pub struct WizardHandle {
    tx: mpsc::UnboundedSender<WizardEvent>,
    attribution: AttributionPublisher,
}

impl WizardHandle {
    fn send(&self, event: WizardEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn set_field(&self, field: Field, value: impl Into<String>) -> bool {
        self.send(WizardEvent::FieldChanged {
            field,
            value: value.into(),
        })
    }

    pub fn advance(&self) -> bool {
        self.send(WizardEvent::Advance)
    }

    pub fn back(&self) -> bool {
        self.send(WizardEvent::Back)
    }

    pub fn refresh(&self) -> bool {
        self.send(WizardEvent::Refresh)
    }

    pub fn quit(&self) -> bool {
        self.send(WizardEvent::Quit)
    }

    /// Deliver an attribution bag. Takes effect immediately; no view update.
    pub fn attribution(&self, metadata: AttributionMetadata) -> bool {
        self.attribution.publish(metadata)
    }
}

pub struct WizardRuntime {
    controller: WizardController,
    catalog: Arc<dyn CatalogService>,
    pipeline: Arc<ValuationPipeline>,
    /// Host input; closes when every handle is dropped
    rx: mpsc::UnboundedReceiver<WizardEvent>,
    /// Results of spawned fetches and submissions
    results_tx: mpsc::UnboundedSender<WizardEvent>,
    results_rx: mpsc::UnboundedReceiver<WizardEvent>,
    updates: mpsc::UnboundedSender<WizardUpdate>,
}

impl WizardRuntime {
    /// Create the runtime, the host handle, and the update stream
    pub fn new(
        catalog: Arc<dyn CatalogService>,
        pipeline: Arc<ValuationPipeline>,
    ) -> (Self, WizardHandle, mpsc::UnboundedReceiver<WizardUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        let (updates, updates_rx) = mpsc::unbounded_channel();
        let (publisher, subscription) = attribution_channel();

        let runtime = Self {
            controller: WizardController::new(subscription),
            catalog,
            pipeline,
            rx,
            results_tx,
            results_rx,
            updates,
        };
        let handle = WizardHandle {
            tx,
            attribution: publisher,
        };
        (runtime, handle, updates_rx)
    }

    /// Run until a redirect, a quit, or every handle is dropped.
    ///
    /// Returns the redirect target when the submission succeeded, including
    /// one that settled after the host asked to stop.
    pub async fn run(mut self) -> Option<RedirectTarget> {
        let initial = self.controller.start();
        self.spawn_fetches(initial);
        self.emit_view();

        let mut stopping = false;
        loop {
            let event = tokio::select! {
                event = self.rx.recv(), if !stopping => event.unwrap_or(WizardEvent::Quit),
                Some(event) = self.results_rx.recv() => event,
            };

            match self.handle(event) {
                Step::Continue => self.emit_view(),
                Step::Redirect(target) => {
                    let _ = self.updates.send(WizardUpdate::Redirect(target.clone()));
                    return Some(target);
                }
                Step::Stop if self.controller.is_submitting() => {
                    tracing::info!("Stop requested during submission; waiting for it to settle");
                    stopping = true;
                }
                Step::Stop => break,
            }

            if stopping && !self.controller.is_submitting() {
                break;
            }
        }

        tracing::debug!("Wizard runtime stopped without redirect");
        None
    }

    fn handle(&mut self, event: WizardEvent) -> Step {
        match event {
            WizardEvent::FieldChanged { field, value } => {
                let tickets = self.controller.set_field(field, &value);
                self.spawn_fetches(tickets);
            }
            WizardEvent::Advance => {
                if let WizardAction::Submit(request) = self.controller.advance() {
                    let pipeline = Arc::clone(&self.pipeline);
                    let tx = self.results_tx.clone();
                    tokio::spawn(async move {
                        let result = request.run(&pipeline).await;
                        let _ = tx.send(WizardEvent::SubmissionFinished(result));
                    });
                }
            }
            WizardEvent::Back => self.controller.back(),
            WizardEvent::Refresh => {}
            WizardEvent::OptionsFetched { ticket, result } => {
                self.controller.apply_options(&ticket, result);
            }
            WizardEvent::SubmissionFinished(result) => {
                if let Some(target) = self.controller.finish_submission(result) {
                    return Step::Redirect(target);
                }
            }
            WizardEvent::Quit => return Step::Stop,
        }
        Step::Continue
    }

    fn spawn_fetches(&self, tickets: Vec<FetchTicket>) {
        for ticket in tickets {
            let catalog = Arc::clone(&self.catalog);
            let tx = self.results_tx.clone();
            tokio::spawn(async move {
                let result = ticket.run(catalog.as_ref()).await;
                let _ = tx.send(WizardEvent::OptionsFetched { ticket, result });
            });
        }
    }

    fn emit_view(&self) {
        let _ = self.updates.send(WizardUpdate::View(self.controller.view()));
    }
}

enum Step {
    Continue,
    Redirect(RedirectTarget),
    Stop,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ValuationQuery, ValuationService, VehicleDataClient};
    use crate::config::SecretString;
    use crate::error::SUBMISSION_FAILED_MESSAGE;
    use crate::wizard::WizardStep;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Catalog whose 2019 makes lookup blocks until released
    struct GatedCatalog {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl CatalogService for GatedCatalog {
        async fn list_years(&self) -> CatalogResult<Vec<String>> {
            Ok(vec!["2020".to_string(), "2019".to_string()])
        }

        async fn list_makes(&self, year: &str) -> CatalogResult<Vec<String>> {
            if year == "2019" {
                self.gate.notified().await;
            }
            Ok(vec![format!("Make-{}", year)])
        }

        async fn list_models(&self, year: &str, make: &str) -> CatalogResult<Vec<String>> {
            Ok(vec![format!("{}-{}", make, year)])
        }
    }

    /// Valuation service that answers only once released
    struct GatedValuation {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl ValuationService for GatedValuation {
        async fn market_value(&self, _query: &ValuationQuery) -> PipelineResult<Value> {
            self.gate.notified().await;
            Ok(json!({"data": {"market_value": {"market_value_data": []}}}))
        }
    }

    fn pipeline_for(server_url: &str) -> Arc<ValuationPipeline> {
        let valuation = Arc::new(VehicleDataClient::new(
            reqwest::Client::new(),
            server_url,
            SecretString::new("k"),
        ));
        Arc::new(ValuationPipeline::new(
            valuation,
            reqwest::Client::new(),
            format!("{}/hook", server_url),
            "https://dealer.example.com/",
        ))
    }

    async fn wait_for<F>(updates: &mut mpsc::UnboundedReceiver<WizardUpdate>, pred: F) -> WizardUpdate
    where
        F: Fn(&WizardUpdate) -> bool,
    {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let update = updates.recv().await.expect("runtime stopped");
                if pred(&update) {
                    return update;
                }
            }
        })
        .await
        .expect("timed out waiting for update")
    }

    fn view_matches(update: &WizardUpdate, pred: impl Fn(&WizardView) -> bool) -> bool {
        matches!(update, WizardUpdate::View(view) if pred(view))
    }

    #[tokio::test]
    async fn test_years_loaded_on_start() {
        let catalog = Arc::new(GatedCatalog {
            gate: Arc::new(Notify::new()),
        });
        let (runtime, handle, mut updates) = WizardRuntime::new(catalog, pipeline_for("http://127.0.0.1:9"));
        let task = tokio::spawn(runtime.run());

        wait_for(&mut updates, |u| {
            view_matches(u, |v| v.options.years == vec!["Select Years", "2020", "2019"] && !v.busy)
        })
        .await;

        handle.quit();
        assert_eq!(task.await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_late_stale_makes_response_is_ignored() {
        let gate = Arc::new(Notify::new());
        let catalog = Arc::new(GatedCatalog { gate: gate.clone() });
        let (runtime, handle, mut updates) = WizardRuntime::new(catalog, pipeline_for("http://127.0.0.1:9"));
        let task = tokio::spawn(runtime.run());

        handle.set_field(Field::Year, "2019");
        handle.set_field(Field::Year, "2020");

        wait_for(&mut updates, |u| {
            view_matches(u, |v| v.options.makes == vec!["Select Makes", "Make-2020"])
        })
        .await;

        // Release the outdated 2019 lookup; it must not replace the 2020 list
        gate.notify_one();
        let update = wait_for(&mut updates, |u| view_matches(u, |v| !v.busy)).await;
        let WizardUpdate::View(view) = update else {
            unreachable!()
        };
        assert_eq!(view.options.makes, vec!["Select Makes", "Make-2020"]);

        handle.quit();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_full_flow_redirects() {
        let mut server = mockito::Server::new_async().await;
        let _valuation = server
            .mock("GET", mockito::Matcher::Regex("^/market-value/".to_string()))
            .with_status(200)
            .with_body(r#"{"data":{"market_value":{"market_value_data":[]}}}"#)
            .create_async()
            .await;
        let sink = server
            .mock("POST", "/hook")
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let catalog = Arc::new(GatedCatalog {
            gate: Arc::new(Notify::new()),
        });
        let (runtime, handle, mut updates) = WizardRuntime::new(catalog, pipeline_for(&server.url()));
        let task = tokio::spawn(runtime.run());

        handle.set_field(Field::Year, "2020");
        handle.set_field(Field::Make, "Honda");
        handle.set_field(Field::Model, "Civic");
        handle.set_field(Field::Mileage, "12a3b");
        handle.advance();
        wait_for(&mut updates, |u| view_matches(u, |v| v.step == WizardStep::Contact)).await;

        handle.set_field(Field::Name, "Ada");
        handle.set_field(Field::Email, "ada@example.com");
        handle.set_field(Field::Phone, "5550100");
        handle.attribution(AttributionMetadata::from_pairs([("utm_source", "test")]));
        handle.advance();

        let update = wait_for(&mut updates, |u| matches!(u, WizardUpdate::Redirect(_))).await;
        let WizardUpdate::Redirect(target) = update else {
            unreachable!()
        };
        assert_eq!(target.fragment(), Some("done"));
        assert_eq!(target.query_param("utm_name").as_deref(), Some("Ada"));

        let returned = task.await.unwrap();
        assert_eq!(returned, Some(target));
        sink.assert_async().await;
    }

    #[tokio::test]
    async fn test_sink_failure_keeps_wizard_on_contact() {
        let mut server = mockito::Server::new_async().await;
        let _valuation = server
            .mock("GET", mockito::Matcher::Regex("^/market-value/".to_string()))
            .with_status(200)
            .with_body(r#"{"data":{"market_value":{"market_value_data":[]}}}"#)
            .create_async()
            .await;
        let _sink = server
            .mock("POST", "/hook")
            .with_status(503)
            .create_async()
            .await;

        let catalog = Arc::new(GatedCatalog {
            gate: Arc::new(Notify::new()),
        });
        let (runtime, handle, mut updates) = WizardRuntime::new(catalog, pipeline_for(&server.url()));
        let task = tokio::spawn(runtime.run());

        for (field, value) in [
            (Field::Year, "2020"),
            (Field::Make, "Honda"),
            (Field::Model, "Civic"),
            (Field::Mileage, "1000"),
        ] {
            handle.set_field(field, value);
        }
        handle.advance();
        for (field, value) in [
            (Field::Name, "Ada"),
            (Field::Email, "ada@example.com"),
            (Field::Phone, "5550100"),
        ] {
            handle.set_field(field, value);
        }
        handle.advance();

        let update = wait_for(&mut updates, |u| {
            view_matches(u, |v| v.error.as_deref() == Some(SUBMISSION_FAILED_MESSAGE))
        })
        .await;
        let WizardUpdate::View(view) = update else {
            unreachable!()
        };
        assert_eq!(view.step, WizardStep::Contact);
        assert!(!view.submitting);
        assert_eq!(view.fields.name, "Ada");
        assert_eq!(view.fields.mileage, "1000");

        handle.quit();
        assert_eq!(task.await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_dropping_every_handle_stops_runtime() {
        let catalog = Arc::new(GatedCatalog {
            gate: Arc::new(Notify::new()),
        });
        let (runtime, handle, updates) = WizardRuntime::new(catalog, pipeline_for("http://127.0.0.1:9"));
        drop(handle);
        drop(updates);

        let returned = tokio::time::timeout(Duration::from_secs(2), runtime.run())
            .await
            .expect("runtime kept running without a handle");
        assert_eq!(returned, None);
    }

    #[tokio::test]
    async fn test_quit_waits_for_issued_submission() {
        let mut server = mockito::Server::new_async().await;
        let sink = server
            .mock("POST", "/hook")
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let gate = Arc::new(Notify::new());
        let pipeline = Arc::new(ValuationPipeline::new(
            Arc::new(GatedValuation { gate: gate.clone() }),
            reqwest::Client::new(),
            format!("{}/hook", server.url()),
            "https://dealer.example.com/",
        ));
        let catalog = Arc::new(GatedCatalog {
            gate: Arc::new(Notify::new()),
        });
        let (runtime, handle, mut updates) = WizardRuntime::new(catalog, pipeline);
        let task = tokio::spawn(runtime.run());

        for (field, value) in [
            (Field::Year, "2020"),
            (Field::Make, "Honda"),
            (Field::Model, "Civic"),
            (Field::Mileage, "1000"),
        ] {
            handle.set_field(field, value);
        }
        handle.advance();
        for (field, value) in [
            (Field::Name, "Ada"),
            (Field::Email, "ada@example.com"),
            (Field::Phone, "5550100"),
        ] {
            handle.set_field(field, value);
        }
        handle.advance();
        wait_for(&mut updates, |u| view_matches(u, |v| v.submitting)).await;

        handle.quit();
        drop(handle);
        gate.notify_one();

        let returned = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("runtime did not settle")
            .unwrap();
        let target = returned.expect("submission result was dropped");
        assert_eq!(target.query_param("utm_email").as_deref(), Some("ada@example.com"));
        sink.assert_async().await;
    }
}
