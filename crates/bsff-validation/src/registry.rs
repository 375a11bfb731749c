//! # Company Registry
//!
//! The company-registry collaborator. Given a SIRET or VAT number it
//! returns the canonical record of the company: official name and address,
//! whether the company holds an account, which profiles it declared, and
//! its transporter receipt if any.
//!
//! Records feed two steps of the pipeline: enrichment (canonical name and
//! address overwrite user input on unsealed company blocks) and profile
//! checks (each role requires a registered company with a given profile).

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use bsff_core::Timestamp;

use crate::issue::LookupError;

/// Activity a company declared when registering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompanyProfile {
    /// Produces waste.
    Producer,
    /// Carries waste.
    Transporter,
    /// Treats waste.
    WasteProcessor,
    /// Groups or stores waste before treatment.
    Collector,
    /// Services refrigeration equipment and collects fluids.
    Operator,
}

/// Transporter receipt recorded in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransporterReceipt {
    /// Receipt number.
    pub number: String,
    /// Issuing department.
    pub department: String,
    /// End of validity.
    pub validity_limit: Timestamp,
}

/// Canonical company record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompanyRecord {
    /// Official name.
    pub name: Option<String>,
    /// Official address.
    pub address: Option<String>,
    /// Whether the company holds an account on the platform.
    pub registered: bool,
    /// Declared profiles.
    pub profiles: Vec<CompanyProfile>,
    /// Transporter receipt, for carriers.
    pub transporter_receipt: Option<TransporterReceipt>,
}

impl CompanyRecord {
    /// Whether the company declared `profile`.
    pub fn has_profile(&self, profile: CompanyProfile) -> bool {
        self.profiles.contains(&profile)
    }
}

/// Company lookups by SIRET or VAT number.
///
/// Implementations must be `Send + Sync` and object-safe so the validator
/// can share them behind an `Arc`. `Ok(None)` means the identifier is
/// unknown; `Err` means the registry could not answer.
#[async_trait]
pub trait CompanyRegistry: Send + Sync {
    /// The record of the company identified by `key`.
    async fn lookup(&self, key: &str) -> Result<Option<CompanyRecord>, LookupError>;
}

/// Registry backed by an in-process map.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    records: RwLock<HashMap<String, CompanyRecord>>,
}

impl InMemoryRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with `(key, record)` pairs.
    pub fn with_records(records: impl IntoIterator<Item = (String, CompanyRecord)>) -> Self {
        Self {
            records: RwLock::new(records.into_iter().collect()),
        }
    }

    /// Insert or replace the record of `key`.
    pub fn insert(&self, key: impl Into<String>, record: CompanyRecord) {
        self.records.write().insert(key.into(), record);
    }
}

#[async_trait]
impl CompanyRegistry for InMemoryRegistry {
    async fn lookup(&self, key: &str) -> Result<Option<CompanyRecord>, LookupError> {
        Ok(self.records.read().get(key.trim()).cloned())
    }
}

// ─── Per-run cache ───────────────────────────────────────────────────

/// Records already fetched during one validation run, so enrichment and
/// profile checks query each identifier once.
pub(crate) struct Lookups<'r> {
    registry: &'r dyn CompanyRegistry,
    cache: HashMap<String, Option<CompanyRecord>>,
}

impl<'r> Lookups<'r> {
    pub(crate) fn new(registry: &'r dyn CompanyRegistry) -> Self {
        Self {
            registry,
            cache: HashMap::new(),
        }
    }

    pub(crate) async fn get(&mut self, key: &str) -> Result<Option<CompanyRecord>, LookupError> {
        if let Some(record) = self.cache.get(key) {
            return Ok(record.clone());
        }
        let record = self.registry.lookup(key).await?;
        self.cache.insert(key.to_string(), record.clone());
        Ok(record)
    }
}
