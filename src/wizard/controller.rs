//! Wizard Controller
//!
//! Owns the form, the option lists and the attribution subscription, and
//! decides what happens on each user action. It never performs I/O itself:
//! field changes return the fetches to issue, and a valid final step
//! returns a [`WizardAction::Submit`] for the host to run. Results come back
//! through [`WizardController::apply_options`] and
//! [`WizardController::finish_submission`].

use super::attribution::{AttributionMetadata, AttributionSubscription};
use super::form::{Field, FormFields, FormState, WizardStep};
use super::options::{FetchTicket, OptionList, OptionResolver, OptionSet};
use crate::error::{CatalogResult, PipelineResult};
use crate::valuation::{RedirectTarget, ValuationPipeline};

/// What the host should do after an advance
#[derive(Debug, Clone, PartialEq)]
pub enum WizardAction {
    /// Nothing to run; re-read the view
    None,
    /// Run the valuation pipeline with this snapshot
    Submit(SubmissionRequest),
}

/// Everything the pipeline needs, captured at submit time
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionRequest {
    pub form: FormFields,
    pub attribution: AttributionMetadata,
}

impl SubmissionRequest {
    pub async fn run(&self, pipeline: &ValuationPipeline) -> PipelineResult<RedirectTarget> {
        pipeline.submit(&self.form, &self.attribution).await
    }
}

/// Read-only snapshot for rendering
#[derive(Debug, Clone, PartialEq)]
pub struct WizardView {
    pub step: WizardStep,
    pub fields: FormFields,
    pub options: OptionSet,
    /// A catalog fetch is outstanding (blocking overlay)
    pub busy: bool,
    /// The final submission is outstanding (button label only)
    pub submitting: bool,
    pub error: Option<String>,
    pub button_label: &'static str,
}

/// Build the itemized validation message
pub fn missing_fields_message(missing: &[Field]) -> String {
    let names: Vec<&str> = missing.iter().map(Field::wire_name).collect();
    format!("Please fill in all required fields: {}", names.join(", "))
}

pub struct WizardController {
    form: FormState,
    resolver: OptionResolver,
    attribution: AttributionSubscription,
    submitting: bool,
}

impl WizardController {
    pub fn new(attribution: AttributionSubscription) -> Self {
        Self {
            form: FormState::new(),
            resolver: OptionResolver::new(),
            attribution,
            submitting: false,
        }
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn options(&self) -> &OptionSet {
        self.resolver.options()
    }

    pub fn step(&self) -> WizardStep {
        self.form.step()
    }

    pub fn error(&self) -> Option<&str> {
        self.form.error()
    }

    pub fn is_busy(&self) -> bool {
        self.resolver.is_busy()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Initial fetches: the years list
    pub fn start(&mut self) -> Vec<FetchTicket> {
        self.resolver
            .begin(OptionList::Years, "", "")
            .into_iter()
            .collect()
    }

    /// Store a user edit and return the refetches it triggers.
    ///
    /// Every year selection refreshes makes and models, and every make
    /// selection refreshes models, even when the value is unchanged: picking
    /// the same parent again is how a failed fetch is retried. Selecting a
    /// list's own placeholder label stores an empty value.
    pub fn set_field(&mut self, field: Field, value: &str) -> Vec<FetchTicket> {
        let value = match OptionList::for_field(field) {
            Some(list) if list.placeholder() == value => "",
            _ => value,
        };
        self.form.set_field(field, value);

        let year = self.form.field(Field::Year).to_string();
        let make = self.form.field(Field::Make).to_string();

        let lists: &[OptionList] = match field {
            Field::Year => &[OptionList::Makes, OptionList::Models],
            Field::Make => &[OptionList::Models],
            _ => &[],
        };

        lists
            .iter()
            .filter_map(|list| self.resolver.begin(*list, &year, &make))
            .collect()
    }

    /// Feed back a finished catalog fetch; stale results are ignored
    pub fn apply_options(
        &mut self,
        ticket: &FetchTicket,
        result: CatalogResult<Vec<String>>,
    ) -> bool {
        let year = self.form.field(Field::Year).to_string();
        let make = self.form.field(Field::Make).to_string();
        self.resolver.complete(ticket, result, &year, &make)
    }

    /// Try to leave the current step
    pub fn advance(&mut self) -> WizardAction {
        if self.submitting {
            tracing::debug!("Advance ignored: submission already in progress");
            return WizardAction::None;
        }

        let step = self.form.step();
        let missing = self.form.missing(step.required_fields());
        if !missing.is_empty() {
            self.form.set_error(missing_fields_message(&missing));
            return WizardAction::None;
        }

        self.form.clear_error();
        match step {
            WizardStep::Vehicle => {
                self.form.set_step(WizardStep::Contact);
                WizardAction::None
            }
            WizardStep::Contact => {
                self.submitting = true;
                WizardAction::Submit(SubmissionRequest {
                    form: self.form.fields().clone(),
                    attribution: self.attribution.current(),
                })
            }
        }
    }

    /// Return from `Contact` to `Vehicle`
    pub fn back(&mut self) {
        if self.submitting || self.form.step() == WizardStep::Vehicle {
            return;
        }
        self.form.clear_error();
        self.form.set_step(WizardStep::Vehicle);
    }

    /// Settle the submission started by [`advance`](Self::advance).
    ///
    /// On success the form is reset and the redirect target returned; the
    /// host navigates and discards the wizard. On failure the generic
    /// message is shown and the entered data is kept for a resubmit.
    pub fn finish_submission(
        &mut self,
        result: PipelineResult<RedirectTarget>,
    ) -> Option<RedirectTarget> {
        self.submitting = false;
        match result {
            Ok(target) => {
                self.form.reset();
                // Dependent lists belong to the cleared selections
                self.resolver.begin(OptionList::Makes, "", "");
                self.resolver.begin(OptionList::Models, "", "");
                Some(target)
            }
            Err(e) => {
                self.form.set_error(e.user_message());
                None
            }
        }
    }

    pub fn view(&self) -> WizardView {
        let step = self.form.step();
        let button_label = match step {
            WizardStep::Vehicle if self.is_busy() => "Loading...",
            WizardStep::Vehicle => "Next",
            WizardStep::Contact if self.submitting => "Submitting...",
            WizardStep::Contact => "Get My Trade-In Value",
        };

        WizardView {
            step,
            fields: self.form.fields().clone(),
            options: self.options().clone(),
            busy: self.is_busy(),
            submitting: self.submitting,
            error: self.form.error().map(str::to_string),
            button_label,
        }
    }
}
