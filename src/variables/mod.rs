//! # Variable Substitution
//!
//! Templates carry placeholders such as `{{betreff}}` or `{{anrede}}` in
//! their zone content. Before every render a fresh [`VariableMap`] is built
//! from the current letter, sender, recipient, information block and
//! attachments, and substituted into copies of the zone content.
//!
//! Missing upstream data resolves to an empty string. Tokens the map doesn't
//! know are left verbatim so the letter author sees them and can fix the
//! template.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate};

use crate::content::{BlockLine, HeaderElement, ZoneContent};
use crate::model::{non_empty, Attachment, InformationBlock, Letter, Recipient, SenderInfo};
use crate::settings::SalutationSettings;

pub const GENERIC_SALUTATION: &str = "Sehr geehrte Damen und Herren,";

/// Placeholder → resolved text. Keys are stored as full tokens (`{{name}}`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableMap(BTreeMap<String, String>);

impl VariableMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert under `name` (without braces).
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.0.insert(token(name), value.into());
    }

    /// Look up by name (without braces).
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&token(name)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Replace every known `{{token}}` in `text` in a single left-to-right
    /// pass. Substituted values are not scanned again, and unknown tokens
    /// stay as they are.
    pub fn substitute(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let candidate = &rest[start..];
            let known = candidate
                .find("}}")
                .and_then(|end| self.0.get(&candidate[..end + 2]).map(|value| (end, value)));
            match known {
                Some((end, value)) => {
                    out.push_str(value);
                    rest = &candidate[end + 2..];
                }
                // Not a known token: keep one brace and look for a token
                // starting right after it.
                None => {
                    out.push('{');
                    rest = &candidate[1..];
                }
            }
        }
        out.push_str(rest);
        out
    }
}

fn token(name: &str) -> String {
    format!("{{{{{name}}}}}")
}

/// Build the placeholder map for one render pass.
pub fn build_variable_map(
    letter: &Letter,
    sender: Option<&SenderInfo>,
    recipient: Option<&Recipient>,
    info_block: Option<&InformationBlock>,
    attachments: &[Attachment],
) -> VariableMap {
    let mut vars = VariableMap::new();
    let text = |v: Option<&str>| non_empty(v).unwrap_or("").to_string();

    vars.insert("betreff", letter.subject_text());
    vars.insert(
        "datum",
        letter
            .letter_date
            .as_deref()
            .map(format_letter_date)
            .unwrap_or_default(),
    );
    vars.insert("aktenzeichen", text(letter.reference_number.as_deref()));
    vars.insert(
        "anrede",
        non_empty(letter.salutation_override.as_deref())
            .map(str::to_string)
            .unwrap_or_else(|| derive_salutation(recipient)),
    );
    vars.insert("anlagen_liste", attachment_list(attachments));
    vars.insert("grussformel", text(letter.closing_formula.as_deref()));
    vars.insert("unterzeichner", text(letter.closing_name.as_deref()));

    let sender = sender.cloned().unwrap_or_default();
    vars.insert("absender_name", text(sender.name.as_deref()));
    vars.insert("absender_organisation", text(sender.organization.as_deref()));
    vars.insert("absender_strasse", text(sender.street.as_deref()));
    vars.insert("absender_plz", text(sender.postal_code.as_deref()));
    vars.insert("absender_ort", text(sender.city.as_deref()));
    vars.insert("absender_telefon", text(sender.phone.as_deref()));
    vars.insert("absender_fax", text(sender.fax.as_deref()));
    vars.insert("absender_email", text(sender.email.as_deref()));
    vars.insert("absender_website", text(sender.website.as_deref()));
    vars.insert("absender_zeile", sender.return_address());

    let rec = recipient.cloned().unwrap_or_default();
    let display_name = non_empty(Some(rec.display_name().as_str()))
        .map(str::to_string)
        .unwrap_or_else(|| text(letter.recipient_name.as_deref()));
    vars.insert("empfaenger_name", display_name);
    vars.insert("empfaenger_vorname", rec.derived_first_name().unwrap_or_default());
    vars.insert("empfaenger_nachname", rec.derived_last_name().unwrap_or_default());
    vars.insert("empfaenger_organisation", text(rec.organization.as_deref()));
    vars.insert("empfaenger_strasse", text(rec.street.as_deref()));
    vars.insert("empfaenger_plz", text(rec.postal_code.as_deref()));
    vars.insert("empfaenger_ort", text(rec.city.as_deref()));
    vars.insert("empfaenger_land", text(rec.country.as_deref()));
    vars.insert(
        "empfaenger_anschrift",
        non_empty(letter.recipient_address.as_deref())
            .map(str::to_string)
            .unwrap_or_else(|| rec.address_lines().join("\n")),
    );

    let info = info_block.cloned().unwrap_or_default();
    vars.insert("ansprechpartner", text(info.contact_person.as_deref()));
    vars.insert("abteilung", text(info.department.as_deref()));
    vars.insert("telefon", text(info.phone.as_deref()));
    vars.insert("email", text(info.email.as_deref()));
    vars.insert("ihr_zeichen", text(info.your_reference.as_deref()));
    vars.insert(
        "unser_zeichen",
        non_empty(info.our_reference.as_deref())
            .or(non_empty(letter.reference_number.as_deref()))
            .unwrap_or(""),
    );
    for (key, value) in &info.extra {
        if vars.get(key).is_none() {
            vars.insert(key, value.trim());
        }
    }

    vars
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gender {
    Male,
    Female,
}

fn parse_gender(raw: &str) -> Option<Gender> {
    match raw.trim().to_lowercase().as_str() {
        "male" | "m" | "herr" | "mann" | "männlich" => Some(Gender::Male),
        "female" | "f" | "w" | "frau" | "weiblich" => Some(Gender::Female),
        _ => None,
    }
}

/// Derive the DIN salutation from recipient gender and name.
///
/// Falls back to the generic form when the gender is unknown or no last
/// name can be found.
pub fn derive_salutation(recipient: Option<&Recipient>) -> String {
    let Some(recipient) = recipient else {
        return GENERIC_SALUTATION.to_string();
    };
    let gender = recipient.gender.as_deref().and_then(parse_gender);
    let last_name = recipient.derived_last_name();
    let title = non_empty(recipient.title.as_deref());

    match (gender, last_name) {
        (Some(gender), Some(last)) => {
            let name = match title {
                Some(t) => format!("{t} {last}"),
                None => last,
            };
            match gender {
                Gender::Male => format!("Sehr geehrter Herr {name},"),
                Gender::Female => format!("Sehr geehrte Frau {name},"),
            }
        }
        _ => GENERIC_SALUTATION.to_string(),
    }
}

/// The salutation line for a template: the auto sentinel passes through to
/// the derived `{{anrede}}`; literal text gets the usual substitution.
pub fn resolve_salutation(settings: &SalutationSettings, vars: &VariableMap) -> String {
    if settings.is_auto() {
        vars.get("anrede").unwrap_or(GENERIC_SALUTATION).to_string()
    } else {
        vars.substitute(settings.template.trim())
    }
}

/// One line per attachment, `- ` prefixed, in attachment order.
pub fn attachment_list(attachments: &[Attachment]) -> String {
    attachments
        .iter()
        .map(|a| format!("- {}", a.label()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// `2024-03-07` / RFC 3339 → `07.03.2024`. Anything else passes through.
pub fn format_letter_date(raw: &str) -> String {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.format("%d.%m.%Y").to_string();
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return ts.date_naive().format("%d.%m.%Y").to_string();
    }
    raw.to_string()
}

/// Deep copy of canvas elements with placeholders substituted in text content.
pub fn substitute_variables(elements: &[HeaderElement], vars: &VariableMap) -> Vec<HeaderElement> {
    elements
        .iter()
        .map(|el| match el {
            HeaderElement::Text(t) => {
                let mut t = t.clone();
                t.content = vars.substitute(&t.content);
                HeaderElement::Text(t)
            }
            HeaderElement::Image(i) => HeaderElement::Image(i.clone()),
        })
        .collect()
}

/// Copy of line-mode content with placeholders substituted in labels and values.
pub fn substitute_block_lines(lines: &[BlockLine], vars: &VariableMap) -> Vec<BlockLine> {
    lines
        .iter()
        .map(|line| match line {
            BlockLine::LabelValue(l) => {
                let mut l = l.clone();
                l.label = vars.substitute(&l.label);
                l.value = vars.substitute(&l.value);
                BlockLine::LabelValue(l)
            }
            BlockLine::TextOnly(l) => {
                let mut l = l.clone();
                l.value = vars.substitute(&l.value);
                BlockLine::TextOnly(l)
            }
            BlockLine::Spacer(_) => line.clone(),
        })
        .collect()
}

impl ZoneContent {
    /// This zone with placeholders resolved.
    pub fn substituted(&self, vars: &VariableMap) -> ZoneContent {
        match self {
            ZoneContent::Lines(lines) => ZoneContent::Lines(substitute_block_lines(lines, vars)),
            ZoneContent::Canvas(elements) => ZoneContent::Canvas(substitute_variables(elements, vars)),
            ZoneContent::Empty => ZoneContent::Empty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::TextElement;

    fn recipient(gender: &str, name: Option<&str>, last: Option<&str>) -> Recipient {
        Recipient {
            gender: Some(gender.into()),
            name: name.map(Into::into),
            last_name: last.map(Into::into),
            ..Default::default()
        }
    }

    #[test]
    fn salutation_from_gender_and_name() {
        assert_eq!(
            derive_salutation(Some(&recipient("male", None, Some("Müller")))),
            "Sehr geehrter Herr Müller,"
        );
        assert_eq!(
            derive_salutation(Some(&recipient("female", Some("Anna Schmidt"), None))),
            "Sehr geehrte Frau Schmidt,"
        );
        assert_eq!(derive_salutation(None), GENERIC_SALUTATION);
    }

    #[test]
    fn salutation_falls_back_for_unknown_gender_or_name() {
        assert_eq!(
            derive_salutation(Some(&recipient("divers", Some("Kim Berg"), None))),
            GENERIC_SALUTATION
        );
        assert_eq!(
            derive_salutation(Some(&recipient("male", None, None))),
            GENERIC_SALUTATION
        );
    }

    #[test]
    fn salutation_includes_title() {
        let mut r = recipient("Frau", Some("Eva Lang"), None);
        r.title = Some("Prof. Dr.".into());
        assert_eq!(derive_salutation(Some(&r)), "Sehr geehrte Frau Prof. Dr. Lang,");
    }

    #[test]
    fn override_wins_over_derivation() {
        let letter = Letter {
            salutation_override: Some("Liebe Frau Schmidt,".into()),
            ..Default::default()
        };
        let vars = build_variable_map(&letter, None, None, None, &[]);
        assert_eq!(vars.get("anrede"), Some("Liebe Frau Schmidt,"));
    }

    #[test]
    fn missing_values_are_empty_not_tokens() {
        let vars = build_variable_map(&Letter::default(), None, None, None, &[]);
        assert_eq!(vars.get("betreff"), Some(""));
        assert_eq!(vars.get("datum"), Some(""));
        assert_eq!(vars.get("absender_ort"), Some(""));
        assert_eq!(vars.substitute("Az. {{aktenzeichen}}"), "Az. ");
    }

    #[test]
    fn attachment_list_keeps_order() {
        let attachments = vec![
            Attachment::new("b.pdf"),
            Attachment {
                file_name: "a.pdf".into(),
                display_name: Some("Antrag".into()),
            },
        ];
        assert_eq!(attachment_list(&attachments), "- b.pdf\n- Antrag");
    }

    #[test]
    fn dates_are_german() {
        assert_eq!(format_letter_date("2024-03-07"), "07.03.2024");
        assert_eq!(format_letter_date("2024-03-07T10:00:00+01:00"), "07.03.2024");
        assert_eq!(format_letter_date("im März"), "im März");
    }

    #[test]
    fn substitution_replaces_known_and_keeps_unknown() {
        let mut vars = VariableMap::new();
        vars.insert("aktenzeichen", "2024-17");
        let elements = vec![HeaderElement::Text(TextElement::at(0.0, 0.0, "Az. {{aktenzeichen}}"))];
        let out = substitute_variables(&elements, &vars);
        match &out[0] {
            HeaderElement::Text(t) => assert_eq!(t.content, "Az. 2024-17"),
            other => panic!("unexpected {other:?}"),
        }

        let unknown = vec![HeaderElement::Text(TextElement::at(0.0, 0.0, "{{unknown_token}}"))];
        let again = substitute_variables(&unknown, &VariableMap::new());
        assert_eq!(again, unknown);
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let mut vars = VariableMap::new();
        vars.insert("betreff", "Frist {{datum}}");
        vars.insert("datum", "01.01.2025");
        assert_eq!(vars.substitute("{{betreff}}"), "Frist {{datum}}");
        assert_eq!(vars.substitute("open {{ end"), "open {{ end");
    }

    #[test]
    fn stray_braces_do_not_hide_tokens() {
        let mut vars = VariableMap::new();
        vars.insert("betreff", "Antrag");
        assert_eq!(vars.substitute("Hinweis {{ siehe {{betreff}}"), "Hinweis {{ siehe Antrag");
        assert_eq!(vars.substitute("{{unbekannt}} {{betreff}}"), "{{unbekannt}} Antrag");
        assert_eq!(vars.substitute("{{{betreff}}}"), "{Antrag}");
    }

    #[test]
    fn block_lines_substitute_labels_and_values() {
        let mut vars = VariableMap::new();
        vars.insert("telefon", "030 123");
        vars.insert("label", "Tel.");
        let lines = vec![
            BlockLine::label_value("{{label}}", "{{telefon}}"),
            BlockLine::spacer(3.0),
            BlockLine::text("{{telefon}}"),
        ];
        let out = substitute_block_lines(&lines, &vars);
        assert_eq!(out[0], BlockLine::label_value("Tel.", "030 123"));
        assert_eq!(out[1], lines[1]);
        assert_eq!(out[2], BlockLine::text("030 123"));
    }

    #[test]
    fn literal_salutation_template_is_substituted() {
        let vars = build_variable_map(
            &Letter::default(),
            None,
            Some(&recipient("male", Some("Herbert Klein"), None)),
            None,
            &[],
        );
        let auto = SalutationSettings::default();
        assert_eq!(resolve_salutation(&auto, &vars), "Sehr geehrter Herr Klein,");

        let literal = SalutationSettings {
            template: "Hallo {{empfaenger_vorname}},".into(),
            font_size: 11.0,
        };
        assert_eq!(resolve_salutation(&literal, &vars), "Hallo Herbert,");
    }

    #[test]
    fn info_block_extras_become_placeholders() {
        let mut info = InformationBlock {
            phone: Some("030 1".into()),
            ..Default::default()
        };
        info.extra.insert("zimmer".into(), " 4.12 ".into());
        info.extra.insert("telefon".into(), "shadowed".into());
        let vars = build_variable_map(&Letter::default(), None, None, Some(&info), &[]);
        assert_eq!(vars.get("zimmer"), Some("4.12"));
        assert_eq!(vars.get("telefon"), Some("030 1"));
    }
}
