//! CUE Generation
//!
//! Turns the config types of each service into a CUE document.
//!
//! ## Pipeline
//!
//! ```text
//! config loads ──▶ usage ──▶ fields/translate ──▶ service (assembly) ──▶ text
//! ```
//!
//! Each service is generated independently and only reads the shared
//! declaration registry, so one failing service never affects another.

pub mod fields;
pub mod service;
pub mod translate;
pub mod usage;

pub use fields::{build_field, FieldTable, FieldTags};
pub use service::{generate_service, GeneratedDocument, HEADER, HEADER_MARKER};
pub use translate::{builtin_to_cue, Translator};
pub use usage::{Usage, UsageCounter, UsageKey, UsageTable};

use tracing::warn;

use crate::config::GeneratorConfig;
use crate::error::{CuegenError, Result};
use crate::schema::{DeclRegistry, Service};

/// Outcome of generating one service
#[derive(Debug)]
pub struct ServiceOutcome {
    pub service: String,
    /// `Ok(None)` when the service has no config fields
    pub result: Result<Option<GeneratedDocument>>,
}

/// Generator over a fixed declaration registry
#[derive(Debug, Clone, Copy)]
pub struct Generator<'a> {
    registry: &'a DeclRegistry,
    config: &'a GeneratorConfig,
}

impl<'a> Generator<'a> {
    pub fn new(registry: &'a DeclRegistry, config: &'a GeneratorConfig) -> Self {
        Self { registry, config }
    }

    /// Generate one service's document
    pub fn generate(&self, service: &Service) -> Result<Option<GeneratedDocument>> {
        generate_service(self.registry, service, self.config)
    }

    /// Generate the service called `name` from `services`
    pub fn generate_named(&self, services: &[Service], name: &str) -> Result<Option<GeneratedDocument>> {
        let service = services
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| CuegenError::UnknownService(name.to_string()))?;
        self.generate(service)
    }

    /// Generate every service; failures are reported per service
    pub fn generate_all(&self, services: &[Service]) -> Vec<ServiceOutcome> {
        services
            .iter()
            .map(|service| {
                let result = self.generate(service);
                if let Err(e) = &result {
                    warn!(service = %service.name, error = %e, "config generation failed");
                }
                ServiceOutcome {
                    service: service.name.clone(),
                    result,
                }
            })
            .collect()
    }
}
