//! # Transporter Field Rules
//!
//! Every field of a slot is sealed, and most are required, from the
//! slot's own transport stage: `TRANSPORT(number)`.

use super::{FieldRule, RuleContext, RuleField, RuledEntity, Rule};
use crate::stage::Stage;
use crate::transporter::Transporter;
use crate::value::FieldValue;

/// Ruled fields of a transporter slot, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransporterField {
    CompanyName,
    CompanySiret,
    CompanyVatNumber,
    CompanyAddress,
    CompanyContact,
    CompanyPhone,
    CompanyMail,
    CustomInfo,
    RecepisseIsExempted,
    RecepisseNumber,
    RecepisseDepartment,
    RecepisseValidityLimit,
    TransportMode,
    TransportPlates,
    TransportTakenOverAt,
}

const RECEPISSE_MISSING: &str = "The company must register its transport receipt.";

fn own_slot(t: &Transporter, _: &RuleContext) -> Stage {
    Stage::transport(usize::from(t.number)).unwrap_or(Stage::Transport(1))
}

fn slot_rule(label: &'static str) -> FieldRule<Transporter> {
    FieldRule::sealed(label, Rule::dynamic(own_slot))
}

fn required_at_slot(label: &'static str) -> FieldRule<Transporter> {
    slot_rule(label).required(Rule::dynamic(own_slot))
}

fn without_vat(t: &Transporter, _: &RuleContext) -> bool {
    t.company.vat_number.as_ref().map_or(true, |v| v.as_str().trim().is_empty())
}

fn without_siret(t: &Transporter, _: &RuleContext) -> bool {
    t.company.siret.as_ref().map_or(true, |s| s.as_str().trim().is_empty())
}

fn needs_recepisse(t: &Transporter, _: &RuleContext) -> bool {
    t.requires_recepisse()
}

fn by_road(t: &Transporter, _: &RuleContext) -> bool {
    t.is_road()
}

impl RuleField for TransporterField {
    const ALL: &'static [Self] = &[
        Self::CompanyName,
        Self::CompanySiret,
        Self::CompanyVatNumber,
        Self::CompanyAddress,
        Self::CompanyContact,
        Self::CompanyPhone,
        Self::CompanyMail,
        Self::CustomInfo,
        Self::RecepisseIsExempted,
        Self::RecepisseNumber,
        Self::RecepisseDepartment,
        Self::RecepisseValidityLimit,
        Self::TransportMode,
        Self::TransportPlates,
        Self::TransportTakenOverAt,
    ];

    fn path(self) -> &'static [&'static str] {
        match self {
            Self::CompanyName => &["company", "name"],
            Self::CompanySiret => &["company", "siret"],
            Self::CompanyVatNumber => &["company", "vatNumber"],
            Self::CompanyAddress => &["company", "address"],
            Self::CompanyContact => &["company", "contact"],
            Self::CompanyPhone => &["company", "phone"],
            Self::CompanyMail => &["company", "mail"],
            Self::CustomInfo => &["customInfo"],
            Self::RecepisseIsExempted => &["recepisse", "isExempted"],
            Self::RecepisseNumber => &["recepisse", "number"],
            Self::RecepisseDepartment => &["recepisse", "department"],
            Self::RecepisseValidityLimit => &["recepisse", "validityLimit"],
            Self::TransportMode => &["transport", "mode"],
            Self::TransportPlates => &["transport", "plates"],
            Self::TransportTakenOverAt => &["transport", "takenOverAt"],
        }
    }
}

impl RuledEntity for Transporter {
    type Field = TransporterField;

    fn rule(field: TransporterField) -> FieldRule<Transporter> {
        use TransporterField as F;
        match field {
            F::CompanyName => required_at_slot("Transporter company name"),
            F::CompanySiret => slot_rule("Transporter SIRET")
                .required(Rule::dynamic(own_slot).when(without_vat)),
            F::CompanyVatNumber => slot_rule("Transporter VAT number")
                .required(Rule::dynamic(own_slot).when(without_siret)),
            F::CompanyAddress => required_at_slot("Transporter address"),
            F::CompanyContact => required_at_slot("Transporter contact person"),
            F::CompanyPhone => required_at_slot("Transporter phone number"),
            F::CompanyMail => required_at_slot("Transporter e-mail address"),
            F::CustomInfo => slot_rule("Transporter custom info"),
            F::RecepisseIsExempted => required_at_slot("Transporter receipt exemption"),
            F::RecepisseNumber => slot_rule("Transporter receipt number").required(
                Rule::dynamic(own_slot).when(needs_recepisse).message(RECEPISSE_MISSING),
            ),
            F::RecepisseDepartment => slot_rule("Transporter receipt department").required(
                Rule::dynamic(own_slot).when(needs_recepisse).message(RECEPISSE_MISSING),
            ),
            F::RecepisseValidityLimit => slot_rule("Transporter receipt validity limit")
                .required(Rule::dynamic(own_slot).when(needs_recepisse).message(RECEPISSE_MISSING)),
            F::TransportMode => required_at_slot("Transport mode"),
            F::TransportPlates => slot_rule("Transporter plates")
                .required(Rule::dynamic(own_slot).when(by_road)),
            F::TransportTakenOverAt => slot_rule("Pickup date"),
        }
    }

    fn value(&self, field: TransporterField) -> FieldValue {
        use TransporterField as F;
        let company = &self.company;
        match field {
            F::CompanyName => FieldValue::text(company.name.as_ref()),
            F::CompanySiret => FieldValue::text(company.siret.as_ref().map(|s| s.as_str())),
            F::CompanyVatNumber => FieldValue::text(company.vat_number.as_ref().map(|v| v.as_str())),
            F::CompanyAddress => FieldValue::text(company.address.as_ref()),
            F::CompanyContact => FieldValue::text(company.contact.as_ref()),
            F::CompanyPhone => FieldValue::text(company.phone.as_ref()),
            F::CompanyMail => FieldValue::text(company.mail.as_ref()),
            F::CustomInfo => FieldValue::text(self.custom_info.as_ref()),
            F::RecepisseIsExempted => FieldValue::flag(self.recepisse.is_exempted),
            F::RecepisseNumber => FieldValue::text(self.recepisse.number.as_ref()),
            F::RecepisseDepartment => FieldValue::text(self.recepisse.department.as_ref()),
            F::RecepisseValidityLimit => FieldValue::date(self.recepisse.validity_limit),
            F::TransportMode => FieldValue::text(self.transport.mode.map(|m| m.as_str())),
            F::TransportPlates => FieldValue::list(&self.transport.plates),
            F::TransportTakenOverAt => FieldValue::date(self.transport.taken_over_at),
        }
    }

    fn describe(&self, label: &str) -> String {
        format!("{label} (transporter n°{})", self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::DOCUMENT_STAGES;
    use bsff_core::{Timestamp, TransportMode, TransporterId};

    fn ctx() -> RuleContext {
        RuleContext {
            roles: Default::default(),
            now: Timestamp::parse("2024-10-01T00:00:00Z").unwrap(),
            correction_window_days: 60,
        }
    }

    #[test]
    fn test_second_slot_sealed_from_its_own_stage() {
        let t = Transporter::new(TransporterId("t2".into()), 2);
        let rule = Transporter::rule(TransporterField::CompanyName).sealed;
        let after_first = DOCUMENT_STAGES.ancestor_stages(Some(Stage::Transport(1)));
        let after_second = DOCUMENT_STAGES.ancestor_stages(Some(Stage::Transport(2)));
        assert!(!rule.applies(&t, after_first, &ctx()));
        assert!(rule.applies(&t, after_second, &ctx()));
    }

    #[test]
    fn test_plates_required_by_road_only() {
        let mut t = Transporter::new(TransporterId("t1".into()), 1);
        let rule = Transporter::rule(TransporterField::TransportPlates).required.unwrap();
        let set = DOCUMENT_STAGES.ancestor_stages(Some(Stage::Transport(1)));
        t.transport.mode = Some(TransportMode::Rail);
        assert!(!rule.applies(&t, set, &ctx()));
        t.transport.mode = Some(TransportMode::Road);
        assert!(rule.applies(&t, set, &ctx()));
    }

    #[test]
    fn test_describe_mentions_slot() {
        let t = Transporter::new(TransporterId("t3".into()), 3);
        assert_eq!(t.describe("Transport mode"), "Transport mode (transporter n°3)");
    }
}
