//! # Document Field Rules
//!
//! Most emitter-declared data is sealed by the emission signature. The
//! emitter itself keeps editing rights until the first transporter signs.
//! Destination contact details stay editable until the operation, and the
//! reception block is sealed by the reception signature.

use bsff_core::DocumentKind;

use super::{FieldRule, RuleContext, RuleField, RuledEntity, Rule};
use crate::document::Document;
use crate::stage::Stage;
use crate::value::FieldValue;

/// Ruled fields of a document, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentField {
    Kind,
    EmitterCompanyName,
    EmitterCompanySiret,
    EmitterCompanyAddress,
    EmitterCompanyContact,
    EmitterCompanyPhone,
    EmitterCompanyMail,
    EmitterCustomInfo,
    EmissionSignatureAuthor,
    EmissionSignatureDate,
    TransportSignatureDate,
    WasteCode,
    WasteDescription,
    WasteAdr,
    WeightValue,
    WeightIsEstimate,
    DestinationCompanyName,
    DestinationCompanySiret,
    DestinationCompanyAddress,
    DestinationCompanyContact,
    DestinationCompanyPhone,
    DestinationCompanyMail,
    DestinationPlannedOperationCode,
    DestinationCap,
    DestinationCustomInfo,
    DestinationReceptionDate,
    ReceptionSignatureAuthor,
    ReceptionSignatureDate,
    InterventionSheets,
    Transporters,
    Containers,
    Forwarding,
    Grouping,
    Repackaging,
}

const TRANSPORT_BEFORE_EMISSION: &str =
    "The transporter cannot sign the pickup before the emitter signed the document.";
const RECEPTION_BEFORE_TRANSPORT: &str =
    "The destination cannot sign the reception before the transporter signed the document.";
const ACCEPTATION_BEFORE_RECEPTION: &str =
    "Containers cannot be accepted before the destination signed the reception.";

/// Sealed from EMISSION, except that the emitter may edit until the
/// first transport signature.
fn emission_unless_emitter(_: &Document, ctx: &RuleContext) -> Stage {
    if ctx.roles.is_emitter {
        Stage::Transport(1)
    } else {
        Stage::Emission
    }
}

fn emitter_editable(label: &'static str) -> FieldRule<Document> {
    FieldRule::sealed(label, Rule::dynamic(emission_unless_emitter))
}

fn required_at_emission(label: &'static str) -> FieldRule<Document> {
    emitter_editable(label).required(Rule::at(Stage::Emission))
}

fn containers_supplied_by_caller(d: &Document, _: &RuleContext) -> bool {
    !d.kind.is_some_and(|k| k.derives_containers())
}

fn is_forwarding(d: &Document, _: &RuleContext) -> bool {
    d.is_kind(DocumentKind::Forwarding)
}

fn is_grouping(d: &Document, _: &RuleContext) -> bool {
    d.is_kind(DocumentKind::Grouping)
}

fn is_repackaging(d: &Document, _: &RuleContext) -> bool {
    d.is_kind(DocumentKind::Repackaging)
}

impl RuleField for DocumentField {
    const ALL: &'static [Self] = &[
        Self::Kind,
        Self::EmitterCompanyName,
        Self::EmitterCompanySiret,
        Self::EmitterCompanyAddress,
        Self::EmitterCompanyContact,
        Self::EmitterCompanyPhone,
        Self::EmitterCompanyMail,
        Self::EmitterCustomInfo,
        Self::EmissionSignatureAuthor,
        Self::EmissionSignatureDate,
        Self::TransportSignatureDate,
        Self::WasteCode,
        Self::WasteDescription,
        Self::WasteAdr,
        Self::WeightValue,
        Self::WeightIsEstimate,
        Self::DestinationCompanyName,
        Self::DestinationCompanySiret,
        Self::DestinationCompanyAddress,
        Self::DestinationCompanyContact,
        Self::DestinationCompanyPhone,
        Self::DestinationCompanyMail,
        Self::DestinationPlannedOperationCode,
        Self::DestinationCap,
        Self::DestinationCustomInfo,
        Self::DestinationReceptionDate,
        Self::ReceptionSignatureAuthor,
        Self::ReceptionSignatureDate,
        Self::InterventionSheets,
        Self::Transporters,
        Self::Containers,
        Self::Forwarding,
        Self::Grouping,
        Self::Repackaging,
    ];

    fn path(self) -> &'static [&'static str] {
        match self {
            Self::Kind => &["kind"],
            Self::EmitterCompanyName => &["emitter", "company", "name"],
            Self::EmitterCompanySiret => &["emitter", "company", "siret"],
            Self::EmitterCompanyAddress => &["emitter", "company", "address"],
            Self::EmitterCompanyContact => &["emitter", "company", "contact"],
            Self::EmitterCompanyPhone => &["emitter", "company", "phone"],
            Self::EmitterCompanyMail => &["emitter", "company", "mail"],
            Self::EmitterCustomInfo => &["emitter", "customInfo"],
            Self::EmissionSignatureAuthor => &["emitter", "emissionSignature", "author"],
            Self::EmissionSignatureDate => &["emitter", "emissionSignature", "date"],
            Self::TransportSignatureDate => &["transporters", "0", "transport", "signature", "date"],
            Self::WasteCode => &["waste", "code"],
            Self::WasteDescription => &["waste", "description"],
            Self::WasteAdr => &["waste", "adr"],
            Self::WeightValue => &["weight", "value"],
            Self::WeightIsEstimate => &["weight", "isEstimate"],
            Self::DestinationCompanyName => &["destination", "company", "name"],
            Self::DestinationCompanySiret => &["destination", "company", "siret"],
            Self::DestinationCompanyAddress => &["destination", "company", "address"],
            Self::DestinationCompanyContact => &["destination", "company", "contact"],
            Self::DestinationCompanyPhone => &["destination", "company", "phone"],
            Self::DestinationCompanyMail => &["destination", "company", "mail"],
            Self::DestinationPlannedOperationCode => &["destination", "plannedOperationCode"],
            Self::DestinationCap => &["destination", "cap"],
            Self::DestinationCustomInfo => &["destination", "customInfo"],
            Self::DestinationReceptionDate => &["destination", "receptionDate"],
            Self::ReceptionSignatureAuthor => &["destination", "receptionSignature", "author"],
            Self::ReceptionSignatureDate => &["destination", "receptionSignature", "date"],
            Self::InterventionSheets => &["interventionSheets"],
            Self::Transporters => &["transporters"],
            Self::Containers => &["containers"],
            Self::Forwarding => &["forwarding"],
            Self::Grouping => &["grouping"],
            Self::Repackaging => &["repackaging"],
        }
    }
}

impl RuledEntity for Document {
    type Field = DocumentField;

    fn rule(field: DocumentField) -> FieldRule<Document> {
        use DocumentField as F;
        match field {
            F::Kind => required_at_emission("Document kind"),
            F::EmitterCompanyName => required_at_emission("Emitter company name"),
            F::EmitterCompanySiret => required_at_emission("Emitter SIRET"),
            F::EmitterCompanyAddress => required_at_emission("Emitter address"),
            F::EmitterCompanyContact => required_at_emission("Emitter contact person"),
            F::EmitterCompanyPhone => required_at_emission("Emitter phone number"),
            F::EmitterCompanyMail => required_at_emission("Emitter e-mail address"),
            F::EmitterCustomInfo => emitter_editable("Emitter custom info"),
            F::EmissionSignatureAuthor => {
                FieldRule::sealed("Emitter signature author", Rule::at(Stage::Emission))
                    .required(Rule::at(Stage::Transport(1)).message(TRANSPORT_BEFORE_EMISSION))
            }
            F::EmissionSignatureDate => {
                FieldRule::sealed("Emitter signature date", Rule::at(Stage::Emission))
                    .required(Rule::at(Stage::Transport(1)).message(TRANSPORT_BEFORE_EMISSION))
            }
            F::TransportSignatureDate => {
                FieldRule::sealed("Transporter signature date", Rule::at(Stage::Transport(1)))
                    .required(Rule::at(Stage::Reception).message(RECEPTION_BEFORE_TRANSPORT))
            }
            F::WasteCode => required_at_emission("Waste code"),
            F::WasteDescription => required_at_emission("Waste description"),
            F::WasteAdr => required_at_emission("ADR mention"),
            F::WeightValue => required_at_emission("Total weight"),
            F::WeightIsEstimate => required_at_emission("Estimated weight flag"),
            F::DestinationCompanyName => required_at_emission("Destination company name"),
            F::DestinationCompanySiret => required_at_emission("Destination SIRET"),
            F::DestinationCompanyAddress => required_at_emission("Destination address"),
            F::DestinationCompanyContact => {
                FieldRule::sealed("Destination contact person", Rule::at(Stage::Operation))
                    .required(Rule::at(Stage::Emission))
            }
            F::DestinationCompanyPhone => {
                FieldRule::sealed("Destination phone number", Rule::at(Stage::Operation))
                    .required(Rule::at(Stage::Emission))
            }
            F::DestinationCompanyMail => {
                FieldRule::sealed("Destination e-mail address", Rule::at(Stage::Operation))
                    .required(Rule::at(Stage::Emission))
            }
            F::DestinationPlannedOperationCode => required_at_emission("Planned operation code"),
            F::DestinationCap => emitter_editable("Destination CAP"),
            F::DestinationCustomInfo => {
                FieldRule::sealed("Destination custom info", Rule::at(Stage::Operation))
            }
            F::DestinationReceptionDate => {
                FieldRule::sealed("Reception date", Rule::at(Stage::Reception))
                    .required(Rule::at(Stage::Reception))
            }
            F::ReceptionSignatureAuthor => {
                FieldRule::sealed("Reception signature author", Rule::at(Stage::Reception))
                    .required(Rule::at(Stage::Acceptation).message(ACCEPTATION_BEFORE_RECEPTION))
            }
            F::ReceptionSignatureDate => {
                FieldRule::sealed("Reception signature date", Rule::at(Stage::Reception))
                    .required(Rule::at(Stage::Acceptation).message(ACCEPTATION_BEFORE_RECEPTION))
            }
            F::InterventionSheets => emitter_editable("Intervention sheet list"),
            F::Transporters => FieldRule::sealed("Transporter list", Rule::at(Stage::Reception))
                .required(Rule::at(Stage::Transport(1))),
            F::Containers => emitter_editable("Container list")
                .required(Rule::at(Stage::Emission).when(containers_supplied_by_caller)),
            F::Forwarding => emitter_editable("List of containers to forward")
                .required(Rule::at(Stage::Emission).when(is_forwarding)),
            F::Grouping => emitter_editable("List of containers to group")
                .required(Rule::at(Stage::Emission).when(is_grouping)),
            F::Repackaging => emitter_editable("List of containers to repackage")
                .required(Rule::at(Stage::Emission).when(is_repackaging)),
        }
    }

    fn value(&self, field: DocumentField) -> FieldValue {
        use DocumentField as F;
        let emitter = &self.emitter.company;
        let destination = &self.destination.company;
        match field {
            F::Kind => FieldValue::text(self.kind.map(|k| k.as_str())),
            F::EmitterCompanyName => FieldValue::text(emitter.name.as_ref()),
            F::EmitterCompanySiret => FieldValue::text(emitter.siret.as_ref().map(|s| s.as_str())),
            F::EmitterCompanyAddress => FieldValue::text(emitter.address.as_ref()),
            F::EmitterCompanyContact => FieldValue::text(emitter.contact.as_ref()),
            F::EmitterCompanyPhone => FieldValue::text(emitter.phone.as_ref()),
            F::EmitterCompanyMail => FieldValue::text(emitter.mail.as_ref()),
            F::EmitterCustomInfo => FieldValue::text(self.emitter.custom_info.as_ref()),
            F::EmissionSignatureAuthor => {
                FieldValue::text(self.emitter.emission_signature.as_ref().map(|s| &s.author))
            }
            F::EmissionSignatureDate => {
                FieldValue::date(self.emitter.emission_signature.as_ref().map(|s| s.date))
            }
            F::TransportSignatureDate => FieldValue::date(
                self.transporter(1)
                    .and_then(|t| t.transport.signature.as_ref())
                    .map(|s| s.date),
            ),
            F::WasteCode => FieldValue::text(self.waste.code.as_ref()),
            F::WasteDescription => FieldValue::text(self.waste.description.as_ref()),
            F::WasteAdr => FieldValue::text(self.waste.adr.as_ref()),
            F::WeightValue => FieldValue::number(self.weight.value),
            F::WeightIsEstimate => FieldValue::flag(self.weight.is_estimate),
            F::DestinationCompanyName => FieldValue::text(destination.name.as_ref()),
            F::DestinationCompanySiret => {
                FieldValue::text(destination.siret.as_ref().map(|s| s.as_str()))
            }
            F::DestinationCompanyAddress => FieldValue::text(destination.address.as_ref()),
            F::DestinationCompanyContact => FieldValue::text(destination.contact.as_ref()),
            F::DestinationCompanyPhone => FieldValue::text(destination.phone.as_ref()),
            F::DestinationCompanyMail => FieldValue::text(destination.mail.as_ref()),
            F::DestinationPlannedOperationCode => FieldValue::text(
                self.destination.planned_operation_code.map(|c| c.as_str()),
            ),
            F::DestinationCap => FieldValue::text(self.destination.cap.as_ref()),
            F::DestinationCustomInfo => FieldValue::text(self.destination.custom_info.as_ref()),
            F::DestinationReceptionDate => FieldValue::date(self.destination.reception_date),
            F::ReceptionSignatureAuthor => FieldValue::text(
                self.destination.reception_signature.as_ref().map(|s| &s.author),
            ),
            F::ReceptionSignatureDate => {
                FieldValue::date(self.destination.reception_signature.as_ref().map(|s| s.date))
            }
            F::InterventionSheets => FieldValue::list(&self.intervention_sheets),
            F::Transporters => FieldValue::list(self.sorted_transporters().into_iter().map(|t| &t.id)),
            F::Containers => FieldValue::list(self.containers.iter().map(container_descriptor)),
            F::Forwarding => FieldValue::list(&self.forwarding),
            F::Grouping => FieldValue::list(&self.grouping),
            F::Repackaging => FieldValue::list(&self.repackaging),
        }
    }
}

/// Emission-time descriptor of a container, as compared by the
/// document-level container list rule.
fn container_descriptor(c: &crate::container::Container) -> String {
    format!(
        "{}|{}|{}|{}|{}|{}|{}",
        c.id,
        c.packaging_type.map(|t| t.as_str()).unwrap_or_default(),
        c.other.as_deref().unwrap_or_default(),
        c.volume.map(|v| v.to_string()).unwrap_or_default(),
        c.weight.map(|v| v.to_string()).unwrap_or_default(),
        c.emission_numero.as_deref().unwrap_or_default(),
        c.numero.as_deref().unwrap_or_default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::DOCUMENT_STAGES;
    use crate::rules::UserRoles;
    use bsff_core::{DocumentId, Timestamp};

    fn ctx(roles: UserRoles) -> RuleContext {
        RuleContext {
            roles,
            now: Timestamp::parse("2024-10-01T00:00:00Z").unwrap(),
            correction_window_days: 60,
        }
    }

    fn doc() -> Document {
        Document::new_draft(
            DocumentId("FF-1".into()),
            Timestamp::parse("2024-10-01T00:00:00Z").unwrap(),
        )
    }

    #[test]
    fn test_every_field_has_a_path() {
        for field in DocumentField::ALL {
            assert!(!field.path().is_empty(), "{field:?}");
        }
    }

    #[test]
    fn test_emitter_keeps_editing_until_transport() {
        let d = doc();
        let rule = Document::rule(DocumentField::WasteCode).sealed;
        let at_emission = DOCUMENT_STAGES.ancestor_stages(Some(Stage::Emission));
        let emitter = ctx(UserRoles {
            is_emitter: true,
            ..Default::default()
        });
        assert!(rule.applies(&d, at_emission, &ctx(UserRoles::default())));
        assert!(!rule.applies(&d, at_emission, &emitter));
        let at_transport = DOCUMENT_STAGES.ancestor_stages(Some(Stage::Transport(1)));
        assert!(rule.applies(&d, at_transport, &emitter));
    }

    #[test]
    fn test_containers_not_required_for_grouping() {
        let mut d = doc();
        let rule = Document::rule(DocumentField::Containers).required.unwrap();
        let set = DOCUMENT_STAGES.ancestor_stages(Some(Stage::Emission));
        d.kind = Some(DocumentKind::Direct);
        assert!(rule.applies(&d, set, &ctx(UserRoles::default())));
        d.kind = Some(DocumentKind::Grouping);
        assert!(!rule.applies(&d, set, &ctx(UserRoles::default())));
        d.kind = Some(DocumentKind::Repackaging);
        assert!(rule.applies(&d, set, &ctx(UserRoles::default())));
    }
}
