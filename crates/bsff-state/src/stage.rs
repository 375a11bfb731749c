//! # Signature Stage Hierarchy
//!
//! Documents and containers advance through named signature stages. A
//! hierarchy is an ordered list of nodes, each with a reachability
//! predicate over the owning entity and an optional `next` stage.
//!
//! ## Document stages
//!
//! ```text
//! EMISSION ──▶ TRANSPORT ──▶ TRANSPORT_2 ──▶ … ──▶ TRANSPORT_5 ──▶ RECEPTION ──▶ ACCEPTATION ──▶ OPERATION
//! ```
//!
//! Transporter slots 2–5 are optional: a document with one carrier goes
//! straight from `TRANSPORT` to `RECEPTION` as far as reached stages are
//! concerned, but the ancestor set of `RECEPTION` still contains every slot.
//!
//! ## Container stages
//!
//! ```text
//! ACCEPTATION ──▶ OPERATION
//! ```
//!
//! ## Design
//!
//! Ancestor sets are computed once per hierarchy at construction, by
//! fixpoint over the `next` links, and stored as bitsets indexed by stage.
//! Lookups are O(1) and never recurse.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use bsff_core::config::TRANSPORTER_SLOTS;
use bsff_core::BsffError;

use crate::container::Container;
use crate::document::Document;

// ─── Stage ───────────────────────────────────────────────────────────

/// Number of distinct stages (emission, five transport slots, reception,
/// acceptation, operation).
pub const STAGE_COUNT: usize = 4 + TRANSPORTER_SLOTS;

/// A signature stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Stage {
    /// Emitter signature.
    Emission,
    /// Transport signature of slot 1..5.
    Transport(u8),
    /// Destination reception signature.
    Reception,
    /// Acceptance signature (every container, at document level).
    Acceptation,
    /// Operation signature (every non-refused container, at document level).
    Operation,
}

impl Stage {
    /// Transport stage of `slot`, if the slot exists.
    pub fn transport(slot: usize) -> Option<Stage> {
        if (1..=TRANSPORTER_SLOTS).contains(&slot) {
            u8::try_from(slot).ok().map(Stage::Transport)
        } else {
            None
        }
    }

    /// Every stage in hierarchy order.
    pub fn all() -> [Stage; STAGE_COUNT] {
        [
            Stage::Emission,
            Stage::Transport(1),
            Stage::Transport(2),
            Stage::Transport(3),
            Stage::Transport(4),
            Stage::Transport(5),
            Stage::Reception,
            Stage::Acceptation,
            Stage::Operation,
        ]
    }

    /// Position in [`Stage::all`]. Out-of-range transport slots clamp to
    /// the nearest valid slot.
    pub fn index(&self) -> usize {
        match self {
            Stage::Emission => 0,
            Stage::Transport(slot) => usize::from(*slot).clamp(1, TRANSPORTER_SLOTS),
            Stage::Reception => TRANSPORTER_SLOTS + 1,
            Stage::Acceptation => TRANSPORTER_SLOTS + 2,
            Stage::Operation => TRANSPORTER_SLOTS + 3,
        }
    }

    /// Canonical name: `TRANSPORT` for slot 1, `TRANSPORT_<n>` otherwise.
    pub fn name(&self) -> String {
        match self {
            Stage::Emission => "EMISSION".to_string(),
            Stage::Transport(1) => "TRANSPORT".to_string(),
            Stage::Transport(slot) => format!("TRANSPORT_{slot}"),
            Stage::Reception => "RECEPTION".to_string(),
            Stage::Acceptation => "ACCEPTATION".to_string(),
            Stage::Operation => "OPERATION".to_string(),
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name())
    }
}

impl FromStr for Stage {
    type Err = BsffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || BsffError::UnknownVariant {
            kind: "stage",
            value: s.to_string(),
        };
        match s {
            "EMISSION" => Ok(Stage::Emission),
            "TRANSPORT" => Ok(Stage::Transport(1)),
            "RECEPTION" => Ok(Stage::Reception),
            "ACCEPTATION" => Ok(Stage::Acceptation),
            "OPERATION" => Ok(Stage::Operation),
            other => other
                .strip_prefix("TRANSPORT_")
                .and_then(|slot| slot.parse::<usize>().ok())
                .and_then(Stage::transport)
                .ok_or_else(unknown),
        }
    }
}

impl From<Stage> for String {
    fn from(stage: Stage) -> Self {
        stage.name()
    }
}

impl TryFrom<String> for Stage {
    type Error = BsffError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ─── Stage Set ───────────────────────────────────────────────────────

/// A set of stages, stored as a bitset over [`Stage::index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StageSet(u16);

impl StageSet {
    /// The empty set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// The set holding only `stage`.
    pub fn of(stage: Stage) -> Self {
        Self(1 << stage.index())
    }

    /// Whether `stage` is in the set.
    pub fn contains(&self, stage: Stage) -> bool {
        self.0 & (1 << stage.index()) != 0
    }

    /// Add `stage` to the set.
    pub fn insert(&mut self, stage: Stage) {
        self.0 |= 1 << stage.index();
    }

    /// Union of both sets.
    pub fn union(self, other: StageSet) -> StageSet {
        Self(self.0 | other.0)
    }

    /// Whether every stage of `other` is in `self`.
    pub fn is_superset(&self, other: &StageSet) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Number of stages in the set.
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Stages in hierarchy order.
    pub fn iter(&self) -> impl Iterator<Item = Stage> + '_ {
        Stage::all().into_iter().filter(move |s| self.contains(*s))
    }
}

impl FromIterator<Stage> for StageSet {
    fn from_iter<I: IntoIterator<Item = Stage>>(iter: I) -> Self {
        let mut set = StageSet::empty();
        for stage in iter {
            set.insert(stage);
        }
        set
    }
}

// ─── Hierarchy ───────────────────────────────────────────────────────

/// One node of a stage hierarchy.
pub struct StageNode<T> {
    /// The stage this node stands for.
    pub stage: Stage,
    /// Whether the entity reached the stage.
    pub is_reached: fn(&T) -> bool,
    /// Following stage, if any.
    pub next: Option<Stage>,
}

/// An ordered stage graph with precomputed ancestor sets.
pub struct StageHierarchy<T> {
    nodes: Vec<StageNode<T>>,
    ancestors: [StageSet; STAGE_COUNT],
}

impl<T> StageHierarchy<T> {
    /// Build a hierarchy from nodes listed in topological order.
    pub fn new(nodes: Vec<StageNode<T>>) -> Self {
        let mut ancestors = [StageSet::empty(); STAGE_COUNT];
        for node in &nodes {
            ancestors[node.stage.index()].insert(node.stage);
        }
        let mut changed = true;
        while changed {
            changed = false;
            for node in &nodes {
                let Some(next) = node.next else { continue };
                let merged = ancestors[next.index()].union(ancestors[node.stage.index()]);
                if merged != ancestors[next.index()] {
                    ancestors[next.index()] = merged;
                    changed = true;
                }
            }
        }
        Self { nodes, ancestors }
    }

    /// Stages of this hierarchy in order.
    pub fn stages(&self) -> impl Iterator<Item = Stage> + '_ {
        self.nodes.iter().map(|n| n.stage)
    }

    /// Every stage whose predicate holds for `entity`.
    pub fn reached_stages(&self, entity: &T) -> StageSet {
        self.nodes
            .iter()
            .filter(|n| (n.is_reached)(entity))
            .map(|n| n.stage)
            .collect()
    }

    /// The last stage reached, walking in topological order. `None` for
    /// an entity that reached no stage.
    pub fn current_stage(&self, entity: &T) -> Option<Stage> {
        self.nodes
            .iter()
            .filter(|n| (n.is_reached)(entity))
            .map(|n| n.stage)
            .last()
    }

    /// `target` and every transitive predecessor. Empty for `None`.
    pub fn ancestor_stages(&self, target: Option<Stage>) -> StageSet {
        match target {
            Some(stage) => self.ancestors[stage.index()].union(StageSet::of(stage)),
            None => StageSet::empty(),
        }
    }
}

// ─── Document and container hierarchies ──────────────────────────────

fn emission_signed(d: &Document) -> bool {
    d.emitter.emission_signature.is_some()
}

fn transport_signed<const SLOT: u8>(d: &Document) -> bool {
    d.is_transport_signed(SLOT)
}

fn reception_signed(d: &Document) -> bool {
    d.destination.reception_signature.is_some()
}

fn all_containers_accepted(d: &Document) -> bool {
    !d.containers.is_empty() && d.containers.iter().all(Container::is_acceptation_signed)
}

fn all_containers_operated(d: &Document) -> bool {
    !d.containers.is_empty()
        && d.containers
            .iter()
            .all(|c| c.is_operation_signed() || c.is_signed_refused())
}

fn container_accepted(c: &Container) -> bool {
    c.is_acceptation_signed()
}

fn container_operated(c: &Container) -> bool {
    c.is_operation_signed()
}

/// Document stage hierarchy.
pub static DOCUMENT_STAGES: Lazy<StageHierarchy<Document>> = Lazy::new(|| {
    StageHierarchy::new(vec![
        StageNode { stage: Stage::Emission, is_reached: emission_signed, next: Some(Stage::Transport(1)) },
        StageNode { stage: Stage::Transport(1), is_reached: transport_signed::<1>, next: Some(Stage::Transport(2)) },
        StageNode { stage: Stage::Transport(2), is_reached: transport_signed::<2>, next: Some(Stage::Transport(3)) },
        StageNode { stage: Stage::Transport(3), is_reached: transport_signed::<3>, next: Some(Stage::Transport(4)) },
        StageNode { stage: Stage::Transport(4), is_reached: transport_signed::<4>, next: Some(Stage::Transport(5)) },
        StageNode { stage: Stage::Transport(5), is_reached: transport_signed::<5>, next: Some(Stage::Reception) },
        StageNode { stage: Stage::Reception, is_reached: reception_signed, next: Some(Stage::Acceptation) },
        StageNode { stage: Stage::Acceptation, is_reached: all_containers_accepted, next: Some(Stage::Operation) },
        StageNode { stage: Stage::Operation, is_reached: all_containers_operated, next: None },
    ])
});

/// Container stage hierarchy.
pub static CONTAINER_STAGES: Lazy<StageHierarchy<Container>> = Lazy::new(|| {
    StageHierarchy::new(vec![
        StageNode { stage: Stage::Acceptation, is_reached: container_accepted, next: Some(Stage::Operation) },
        StageNode { stage: Stage::Operation, is_reached: container_operated, next: None },
    ])
});

/// Last stage reached by a document.
pub fn document_stage(document: &Document) -> Option<Stage> {
    DOCUMENT_STAGES.current_stage(document)
}

/// Ancestor stages a container is evaluated against: those of the
/// document target plus those of the container's own current stage.
pub fn container_ancestors(document_ancestors: StageSet, container: &Container) -> StageSet {
    let own = CONTAINER_STAGES.ancestor_stages(CONTAINER_STAGES.current_stage(container));
    document_ancestors.union(own)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Signature;
    use crate::transporter::Transporter;
    use bsff_core::{AcceptationStatus, ContainerId, DocumentId, Timestamp, TransporterId};

    fn sig() -> Option<Signature> {
        Some(Signature {
            author: "Jane".into(),
            date: Timestamp::parse("2024-10-01T00:00:00Z").unwrap(),
        })
    }

    fn doc() -> Document {
        Document::new_draft(
            DocumentId("FF-1".into()),
            Timestamp::parse("2024-10-01T00:00:00Z").unwrap(),
        )
    }

    // ── Stage names ──────────────────────────────────────────────────

    #[test]
    fn test_stage_names_roundtrip() {
        for stage in Stage::all() {
            assert_eq!(stage.name().parse::<Stage>().unwrap(), stage);
        }
        assert_eq!(Stage::Transport(1).to_string(), "TRANSPORT");
        assert_eq!(Stage::Transport(3).to_string(), "TRANSPORT_3");
        assert!("TRANSPORT_6".parse::<Stage>().is_err());
        assert!("TRANSPORT_1".parse::<Stage>().is_ok());
    }

    #[test]
    fn test_stage_serializes_as_name() {
        let json = serde_json::to_string(&Stage::Transport(2)).unwrap();
        assert_eq!(json, "\"TRANSPORT_2\"");
        let back: Stage = serde_json::from_str("\"RECEPTION\"").unwrap();
        assert_eq!(back, Stage::Reception);
    }

    // ── Ancestor sets ────────────────────────────────────────────────

    #[test]
    fn test_ancestors_of_none_is_empty() {
        assert!(DOCUMENT_STAGES.ancestor_stages(None).is_empty());
    }

    #[test]
    fn test_ancestors_of_emission() {
        let set = DOCUMENT_STAGES.ancestor_stages(Some(Stage::Emission));
        assert_eq!(set.len(), 1);
        assert!(set.contains(Stage::Emission));
    }

    #[test]
    fn test_ancestors_of_reception_include_all_slots() {
        let set = DOCUMENT_STAGES.ancestor_stages(Some(Stage::Reception));
        assert!(set.contains(Stage::Emission));
        for slot in 1..=5 {
            assert!(set.contains(Stage::Transport(slot)));
        }
        assert!(!set.contains(Stage::Acceptation));
        assert_eq!(set.len(), 7);
    }

    #[test]
    fn test_ancestors_of_operation_is_everything() {
        let set = DOCUMENT_STAGES.ancestor_stages(Some(Stage::Operation));
        assert_eq!(set.len(), STAGE_COUNT);
    }

    #[test]
    fn test_container_hierarchy_ancestors() {
        let set = CONTAINER_STAGES.ancestor_stages(Some(Stage::Operation));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![Stage::Acceptation, Stage::Operation]);
    }

    // ── Current stage ────────────────────────────────────────────────

    #[test]
    fn test_fresh_draft_has_no_stage() {
        assert_eq!(document_stage(&doc()), None);
    }

    #[test]
    fn test_current_stage_skips_missing_slots() {
        let mut d = doc();
        d.emitter.emission_signature = sig();
        let mut t = Transporter::new(TransporterId("t1".into()), 1);
        t.transport.signature = sig();
        d.transporters.push(t);
        assert_eq!(document_stage(&d), Some(Stage::Transport(1)));

        d.destination.reception_signature = sig();
        assert_eq!(document_stage(&d), Some(Stage::Reception));
    }

    #[test]
    fn test_operation_reached_when_refused_containers_remain() {
        let mut d = doc();
        d.destination.reception_signature = sig();
        let mut operated = Container::new(ContainerId("c1".into()));
        operated.acceptation.signature = sig();
        operated.acceptation.status = Some(AcceptationStatus::Accepted);
        let mut refused = Container::new(ContainerId("c2".into()));
        refused.acceptation.signature = sig();
        refused.acceptation.status = Some(AcceptationStatus::Refused);
        d.containers = vec![operated, refused];
        assert_eq!(document_stage(&d), Some(Stage::Acceptation));

        d.containers[0].operation.signature = sig();
        assert_eq!(document_stage(&d), Some(Stage::Operation));
    }

    #[test]
    fn test_container_ancestors_merge_document_stages() {
        let mut c = Container::new(ContainerId("c1".into()));
        c.acceptation.signature = sig();
        let doc_set = DOCUMENT_STAGES.ancestor_stages(Some(Stage::Emission));
        let merged = container_ancestors(doc_set, &c);
        assert!(merged.contains(Stage::Emission));
        assert!(merged.contains(Stage::Acceptation));
        assert!(!merged.contains(Stage::Operation));
    }

    // ── Properties ───────────────────────────────────────────────────

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Recording signatures in order never shrinks the ancestor set.
            #[test]
            fn ancestors_grow_monotonically(slots in 1usize..=5, containers in 1usize..4) {
                let mut d = doc();
                let mut previous = DOCUMENT_STAGES.ancestor_stages(document_stage(&d));
                let mut steps: Vec<Box<dyn Fn(&mut Document)>> = Vec::new();
                steps.push(Box::new(|d: &mut Document| d.emitter.emission_signature = sig()));
                for slot in 1..=slots {
                    steps.push(Box::new(move |d: &mut Document| {
                        let mut t = Transporter::new(TransporterId(format!("t{slot}")), slot as u8);
                        t.transport.signature = sig();
                        d.transporters.push(t);
                    }));
                }
                steps.push(Box::new(move |d: &mut Document| {
                    d.destination.reception_signature = sig();
                    d.containers = (0..containers)
                        .map(|i| Container::new(ContainerId(format!("c{i}"))))
                        .collect();
                }));
                steps.push(Box::new(|d: &mut Document| {
                    for c in &mut d.containers {
                        c.acceptation.signature = sig();
                        c.acceptation.status = Some(AcceptationStatus::Accepted);
                    }
                }));
                steps.push(Box::new(|d: &mut Document| {
                    for c in &mut d.containers {
                        c.operation.signature = sig();
                    }
                }));
                for step in steps {
                    step(&mut d);
                    let current = DOCUMENT_STAGES.ancestor_stages(document_stage(&d));
                    prop_assert!(current.is_superset(&previous));
                    previous = current;
                }
                prop_assert_eq!(document_stage(&d), Some(Stage::Operation));
            }

            /// Every ancestor set contains its own stage.
            #[test]
            fn ancestors_contain_target(idx in 0usize..STAGE_COUNT) {
                let stage = Stage::all()[idx];
                prop_assert!(DOCUMENT_STAGES.ancestor_stages(Some(stage)).contains(stage));
            }
        }
    }
}
