//! Trade-in wizard core: form state, cascading option lists, attribution,
//! and the two-step controller.

pub mod attribution;
pub mod controller;
pub mod form;
pub mod options;

pub use attribution::{
    ATTRIBUTION_KEYS, AttributionMetadata, AttributionPublisher, AttributionSubscription,
    attribution_channel,
};
pub use controller::{SubmissionRequest, WizardAction, WizardController, WizardView};
pub use form::{Field, FormFields, FormState, JURISDICTIONS, WizardStep};
pub use options::{FetchTicket, OptionList, OptionResolver, OptionSet};
