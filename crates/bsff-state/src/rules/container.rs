//! # Container Field Rules
//!
//! Emission descriptors are sealed by the emission signature. Acceptance
//! and operation data are required from their own stage but only sealed
//! once the container is locked (linked into a successor document, or past
//! the correction window). Signatures are sealed as soon as recorded.

use bsff_core::{OperationCode, PackagingType};

use super::{FieldRule, RuleContext, RuleField, RuledEntity, Rule};
use crate::container::Container;
use crate::stage::Stage;
use crate::value::FieldValue;

/// Ruled fields of a container, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerField {
    Type,
    Other,
    Volume,
    Weight,
    EmissionNumero,
    Numero,
    PreviousContainers,
    AcceptationDate,
    AcceptationStatus,
    AcceptationWeight,
    AcceptationWasteCode,
    AcceptationWasteDescription,
    AcceptationRefusalReason,
    AcceptationSignatureAuthor,
    AcceptationSignatureDate,
    OperationDate,
    OperationCode,
    OperationMode,
    OperationDescription,
    OperationNoTraceability,
    NextDestinationCompanyName,
    NextDestinationCompanySiret,
    NextDestinationCompanyVatNumber,
    NextDestinationCompanyAddress,
    NextDestinationCompanyContact,
    NextDestinationCompanyPhone,
    NextDestinationCompanyMail,
    NextDestinationPlannedOperationCode,
    NextDestinationCap,
    OperationSignatureAuthor,
    OperationSignatureDate,
}

const MODE_MISSING: &str = "You must specify a treatment mode.";

fn is_locked(c: &Container, ctx: &RuleContext) -> bool {
    c.is_locked(&ctx.now, ctx.correction_window_days)
}

fn is_other_type(c: &Container, _: &RuleContext) -> bool {
    c.packaging_type == Some(PackagingType::Other)
}

fn is_refused(c: &Container, _: &RuleContext) -> bool {
    c.is_refused()
}

fn is_operated(c: &Container, _: &RuleContext) -> bool {
    !c.is_refused()
}

fn code_has_modes(c: &Container, _: &RuleContext) -> bool {
    !c.is_refused() && c.operation.code.is_some_and(|code| !code.modes().is_empty())
}

/// The operation hands the container on to another facility.
fn has_next_destination(c: &Container, _: &RuleContext) -> bool {
    !c.is_refused() && c.operation.is_final() == Some(false)
}

fn next_destination_without_vat(c: &Container, ctx: &RuleContext) -> bool {
    has_next_destination(c, ctx) && c.operation.next_destination.company.vat_number.is_none()
}

fn next_destination_without_siret(c: &Container, ctx: &RuleContext) -> bool {
    has_next_destination(c, ctx) && c.operation.next_destination.company.siret.is_none()
}

fn descriptor(label: &'static str) -> FieldRule<Container> {
    FieldRule::sealed(label, Rule::at(Stage::Emission))
}

fn acceptation(label: &'static str) -> FieldRule<Container> {
    FieldRule::sealed(label, Rule::at(Stage::Acceptation).when(is_locked))
}

fn operation(label: &'static str) -> FieldRule<Container> {
    FieldRule::sealed(label, Rule::at(Stage::Operation).when(is_locked))
}

fn next_destination(label: &'static str) -> FieldRule<Container> {
    operation(label).required(Rule::at(Stage::Operation).when(has_next_destination))
}

impl RuleField for ContainerField {
    const ALL: &'static [Self] = &[
        Self::Type,
        Self::Other,
        Self::Volume,
        Self::Weight,
        Self::EmissionNumero,
        Self::Numero,
        Self::PreviousContainers,
        Self::AcceptationDate,
        Self::AcceptationStatus,
        Self::AcceptationWeight,
        Self::AcceptationWasteCode,
        Self::AcceptationWasteDescription,
        Self::AcceptationRefusalReason,
        Self::AcceptationSignatureAuthor,
        Self::AcceptationSignatureDate,
        Self::OperationDate,
        Self::OperationCode,
        Self::OperationMode,
        Self::OperationDescription,
        Self::OperationNoTraceability,
        Self::NextDestinationCompanyName,
        Self::NextDestinationCompanySiret,
        Self::NextDestinationCompanyVatNumber,
        Self::NextDestinationCompanyAddress,
        Self::NextDestinationCompanyContact,
        Self::NextDestinationCompanyPhone,
        Self::NextDestinationCompanyMail,
        Self::NextDestinationPlannedOperationCode,
        Self::NextDestinationCap,
        Self::OperationSignatureAuthor,
        Self::OperationSignatureDate,
    ];

    fn path(self) -> &'static [&'static str] {
        match self {
            Self::Type => &["type"],
            Self::Other => &["other"],
            Self::Volume => &["volume"],
            Self::Weight => &["weight"],
            Self::EmissionNumero => &["emissionNumero"],
            Self::Numero => &["numero"],
            Self::PreviousContainers => &["previousContainers"],
            Self::AcceptationDate => &["acceptation", "date"],
            Self::AcceptationStatus => &["acceptation", "status"],
            Self::AcceptationWeight => &["acceptation", "weight"],
            Self::AcceptationWasteCode => &["acceptation", "wasteCode"],
            Self::AcceptationWasteDescription => &["acceptation", "wasteDescription"],
            Self::AcceptationRefusalReason => &["acceptation", "refusalReason"],
            Self::AcceptationSignatureAuthor => &["acceptation", "signature", "author"],
            Self::AcceptationSignatureDate => &["acceptation", "signature", "date"],
            Self::OperationDate => &["operation", "date"],
            Self::OperationCode => &["operation", "code"],
            Self::OperationMode => &["operation", "mode"],
            Self::OperationDescription => &["operation", "description"],
            Self::OperationNoTraceability => &["operation", "noTraceability"],
            Self::NextDestinationCompanyName => &["operation", "nextDestination", "company", "name"],
            Self::NextDestinationCompanySiret => {
                &["operation", "nextDestination", "company", "siret"]
            }
            Self::NextDestinationCompanyVatNumber => {
                &["operation", "nextDestination", "company", "vatNumber"]
            }
            Self::NextDestinationCompanyAddress => {
                &["operation", "nextDestination", "company", "address"]
            }
            Self::NextDestinationCompanyContact => {
                &["operation", "nextDestination", "company", "contact"]
            }
            Self::NextDestinationCompanyPhone => {
                &["operation", "nextDestination", "company", "phone"]
            }
            Self::NextDestinationCompanyMail => &["operation", "nextDestination", "company", "mail"],
            Self::NextDestinationPlannedOperationCode => {
                &["operation", "nextDestination", "plannedOperationCode"]
            }
            Self::NextDestinationCap => &["operation", "nextDestination", "cap"],
            Self::OperationSignatureAuthor => &["operation", "signature", "author"],
            Self::OperationSignatureDate => &["operation", "signature", "date"],
        }
    }
}

impl RuledEntity for Container {
    type Field = ContainerField;

    fn rule(field: ContainerField) -> FieldRule<Container> {
        use ContainerField as F;
        let at_emission = Rule::at(Stage::Emission);
        let at_acceptation = Rule::at(Stage::Acceptation);
        let at_operation = Rule::at(Stage::Operation).when(is_operated);
        match field {
            F::Type => descriptor("Container type").required(at_emission),
            F::Other => descriptor("Container type description")
                .required(at_emission.when(is_other_type)),
            F::Volume => descriptor("Container volume"),
            F::Weight => descriptor("Fluid weight").required(at_emission),
            F::EmissionNumero => descriptor("Container number at emission").required(at_emission),
            F::Numero => descriptor("Container number").required(at_emission),
            F::PreviousContainers => descriptor("Previous containers"),
            F::AcceptationDate => acceptation("Acceptance date").required(at_acceptation),
            F::AcceptationStatus => acceptation("Acceptance status").required(at_acceptation),
            F::AcceptationWeight => acceptation("Accepted weight").required(at_acceptation),
            F::AcceptationWasteCode => acceptation("Waste code after analysis"),
            F::AcceptationWasteDescription => {
                acceptation("Waste description after analysis").required(at_acceptation)
            }
            F::AcceptationRefusalReason => {
                acceptation("Refusal reason").required(at_acceptation.when(is_refused))
            }
            F::AcceptationSignatureAuthor => {
                FieldRule::sealed("Acceptance signature author", at_acceptation)
            }
            F::AcceptationSignatureDate => {
                FieldRule::sealed("Acceptance signature date", at_acceptation)
            }
            F::OperationDate => operation("Operation date").required(at_operation),
            F::OperationCode => operation("Operation code").required(at_operation),
            F::OperationMode => operation("Operation mode").required(
                Rule::at(Stage::Operation)
                    .when(code_has_modes)
                    .message(MODE_MISSING),
            ),
            F::OperationDescription => operation("Operation description").required(at_operation),
            F::OperationNoTraceability => operation("Traceability interruption"),
            F::NextDestinationCompanyName => next_destination("Next destination company name"),
            F::NextDestinationCompanySiret => operation("Next destination SIRET").required(
                Rule::at(Stage::Operation).when(next_destination_without_vat),
            ),
            F::NextDestinationCompanyVatNumber => operation("Next destination VAT number")
                .required(Rule::at(Stage::Operation).when(next_destination_without_siret)),
            F::NextDestinationCompanyAddress => next_destination("Next destination address"),
            F::NextDestinationCompanyContact => {
                next_destination("Next destination contact person")
            }
            F::NextDestinationCompanyPhone => next_destination("Next destination phone number"),
            F::NextDestinationCompanyMail => next_destination("Next destination e-mail address"),
            F::NextDestinationPlannedOperationCode => {
                next_destination("Next destination planned operation code")
            }
            F::NextDestinationCap => operation("Next destination CAP"),
            F::OperationSignatureAuthor => {
                FieldRule::sealed("Operation signature author", Rule::at(Stage::Operation))
            }
            F::OperationSignatureDate => {
                FieldRule::sealed("Operation signature date", Rule::at(Stage::Operation))
            }
        }
    }

    fn value(&self, field: ContainerField) -> FieldValue {
        use ContainerField as F;
        let acc = &self.acceptation;
        let op = &self.operation;
        let next = &op.next_destination.company;
        match field {
            F::Type => FieldValue::text(self.packaging_type.map(|t| t.as_str())),
            F::Other => FieldValue::text(self.other.as_ref()),
            F::Volume => FieldValue::number(self.volume),
            F::Weight => FieldValue::number(self.weight),
            F::EmissionNumero => FieldValue::text(self.emission_numero.as_ref()),
            F::Numero => FieldValue::text(self.numero.as_ref()),
            F::PreviousContainers => FieldValue::list(&self.previous_containers),
            F::AcceptationDate => FieldValue::date(acc.date),
            F::AcceptationStatus => FieldValue::text(acc.status.map(|s| s.as_str())),
            F::AcceptationWeight => FieldValue::number(acc.weight),
            F::AcceptationWasteCode => FieldValue::text(acc.waste_code.as_ref()),
            F::AcceptationWasteDescription => FieldValue::text(acc.waste_description.as_ref()),
            F::AcceptationRefusalReason => FieldValue::text(acc.refusal_reason.as_ref()),
            F::AcceptationSignatureAuthor => {
                FieldValue::text(acc.signature.as_ref().map(|s| &s.author))
            }
            F::AcceptationSignatureDate => FieldValue::date(acc.signature.as_ref().map(|s| s.date)),
            F::OperationDate => FieldValue::date(op.date),
            F::OperationCode => FieldValue::text(op.code.map(|c| c.as_str())),
            F::OperationMode => FieldValue::text(op.mode.map(|m| m.as_str())),
            F::OperationDescription => FieldValue::text(op.description.as_ref()),
            F::OperationNoTraceability => FieldValue::flag(op.no_traceability),
            F::NextDestinationCompanyName => FieldValue::text(next.name.as_ref()),
            F::NextDestinationCompanySiret => {
                FieldValue::text(next.siret.as_ref().map(|s| s.as_str()))
            }
            F::NextDestinationCompanyVatNumber => {
                FieldValue::text(next.vat_number.as_ref().map(|v| v.as_str()))
            }
            F::NextDestinationCompanyAddress => FieldValue::text(next.address.as_ref()),
            F::NextDestinationCompanyContact => FieldValue::text(next.contact.as_ref()),
            F::NextDestinationCompanyPhone => FieldValue::text(next.phone.as_ref()),
            F::NextDestinationCompanyMail => FieldValue::text(next.mail.as_ref()),
            F::NextDestinationPlannedOperationCode => FieldValue::text(
                op.next_destination
                    .planned_operation_code
                    .map(|c: OperationCode| c.as_str()),
            ),
            F::NextDestinationCap => FieldValue::text(op.next_destination.cap.as_ref()),
            F::OperationSignatureAuthor => {
                FieldValue::text(op.signature.as_ref().map(|s| &s.author))
            }
            F::OperationSignatureDate => FieldValue::date(op.signature.as_ref().map(|s| s.date)),
        }
    }

    fn describe(&self, label: &str) -> String {
        match self.numero.as_deref().filter(|n| !n.trim().is_empty()) {
            Some(numero) => format!("{label} (container {numero})"),
            None => label.to_string(),
        }
    }
}
