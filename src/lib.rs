//! Tradein - vehicle trade-in valuation wizard
//!
//! A two-step wizard that resolves a vehicle through cascading
//! year / make / model lists, collects contact details, fetches a market
//! valuation, forwards it to a downstream sink and hands back a redirect.
//!
//! ## Quick Start
//!
//! ```bash
//! # Interactive wizard
//! tradein
//!
//! # One-shot catalog lookups
//! tradein years
//! tradein models 2020 Honda
//! ```

pub mod app;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod valuation;
pub mod wizard;

// Re-export commonly used types
pub use app::{WizardHandle, WizardRuntime, WizardUpdate};
pub use error::{CatalogError, PipelineError};
pub use valuation::{RedirectTarget, ValuationPipeline};
pub use wizard::{Field, WizardController, WizardStep};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
