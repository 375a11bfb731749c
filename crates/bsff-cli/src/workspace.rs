//! # Workspace File
//!
//! The CLI operates on a single JSON file standing in for the platform's
//! database: stored documents, the company registry, intervention sheets
//! and the user → company memberships used to resolve roles.
//!
//! ```json
//! {
//!   "documents": [ { "id": "FF-1", "createdAt": "2024-10-01T08:00:00Z", ... } ],
//!   "companies": { "11111111111111": { "registered": true, "profiles": ["PRODUCER"] } },
//!   "interventionSheets": [],
//!   "members": { "jane": ["11111111111111"] }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

use bsff_core::DocumentId;
use bsff_state::{Document, UserRoles};
use bsff_validation::{
    CompanyRecord, InMemoryRegistry, InMemoryStore, InterventionSheet, RoleResolver, StaticRoles,
};

/// Contents of a workspace file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Workspace {
    /// Stored documents.
    pub documents: Vec<Document>,
    /// Company registry, keyed by SIRET or VAT number.
    pub companies: BTreeMap<String, CompanyRecord>,
    /// Known intervention sheets.
    pub intervention_sheets: Vec<InterventionSheet>,
    /// Company keys each user belongs to.
    pub members: BTreeMap<String, Vec<String>>,
}

impl Workspace {
    /// Read a workspace file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading workspace {}", path.display()))?;
        let workspace: Workspace = serde_json::from_str(&content)
            .with_context(|| format!("parsing workspace {}", path.display()))?;
        tracing::debug!(
            path = %path.display(),
            documents = workspace.documents.len(),
            companies = workspace.companies.len(),
            "workspace loaded"
        );
        Ok(workspace)
    }

    /// Write the workspace back, pretty-printed.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("writing workspace {}", path.display()))?;
        Ok(())
    }

    /// The stored document with the given id.
    pub fn document(&self, id: &str) -> anyhow::Result<&Document> {
        self.documents
            .iter()
            .find(|d| d.id.as_str() == id)
            .ok_or_else(|| anyhow!("document {id} not found in workspace"))
    }

    /// A store holding the workspace documents and sheets.
    pub fn store(&self) -> Arc<InMemoryStore> {
        let store = InMemoryStore::with_documents(self.documents.iter().cloned());
        for sheet in &self.intervention_sheets {
            store.insert_intervention_sheet(sheet.clone());
        }
        Arc::new(store)
    }

    /// The company registry.
    pub fn registry(&self) -> Arc<InMemoryRegistry> {
        Arc::new(InMemoryRegistry::with_records(
            self.companies.iter().map(|(k, v)| (k.clone(), v.clone())),
        ))
    }

    /// Roles of `user` on `document`; no role without a user.
    pub fn roles(&self, user: Option<&str>, document: &Document) -> UserRoles {
        let Some(user) = user else {
            return UserRoles::default();
        };
        let resolver = self
            .members
            .iter()
            .flat_map(|(u, keys)| keys.iter().map(move |k| (u, k)))
            .fold(StaticRoles::new(), |roles, (u, k)| roles.with_membership(u.clone(), k.clone()));
        resolver.roles(user, document)
    }

    /// Replace the documents with the contents of `store`.
    pub fn sync_from(&mut self, store: &InMemoryStore) {
        self.documents = store.documents();
    }

    /// Insert or replace one document.
    pub fn upsert(&mut self, document: Document) {
        match self.documents.iter_mut().find(|d| d.id == document.id) {
            Some(slot) => *slot = document,
            None => self.documents.push(document),
        }
    }

    /// Ids of every stored document, in file order.
    pub fn ids(&self) -> Vec<DocumentId> {
        self.documents.iter().map(|d| d.id.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bsff_core::{Siret, Timestamp};

    fn document() -> Document {
        let mut d = Document::new_draft(
            DocumentId("FF-1".into()),
            Timestamp::parse("2024-10-01T00:00:00Z").unwrap(),
        );
        d.emitter.company.siret = Some(Siret("11111111111111".into()));
        d
    }

    #[test]
    fn test_roles_from_members() {
        let mut ws = Workspace::default();
        ws.members.insert("jane".into(), vec!["11111111111111".into()]);
        let d = document();
        assert!(ws.roles(Some("jane"), &d).is_emitter);
        assert!(!ws.roles(Some("john"), &d).is_emitter);
        assert_eq!(ws.roles(None, &d), UserRoles::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ws.json");
        let mut ws = Workspace::default();
        ws.upsert(document());
        ws.save(&path).unwrap();

        let back = Workspace::load(&path).unwrap();
        assert_eq!(back.ids(), [DocumentId("FF-1".into())]);
        assert!(back.document("FF-1").is_ok());
        assert!(back.document("FF-2").is_err());
    }

    #[test]
    fn test_upsert_replaces() {
        let mut ws = Workspace::default();
        ws.upsert(document());
        let mut changed = document();
        changed.is_draft = false;
        ws.upsert(changed);
        assert_eq!(ws.documents.len(), 1);
        assert!(!ws.documents[0].is_draft);
    }
}
