//! Record normalization and context assembly.
//!
//! Deployments name their columns differently ("Company" vs "company_name",
//! "Notes" vs "Call notes"). Each semantic slot is resolved by probing an
//! ordered alias list; the first alias with a non-empty value wins.
//!
//! ```text
//! === VC DATABASE ===
//!
//!
//! Company: Acme
//! Status: Diligence
//! Notes: Strong team...
//!
//! Company: Globex
//! ```
//!
//! Everything here is pure: no I/O, same input gives the same output.

use serde_json::Value;
use std::collections::BTreeSet;

use crate::models::Record;

/// Header line that starts every context blob.
pub const CONTEXT_HEADER: &str = "=== VC DATABASE ===";

/// Character budget for free-text slots.
pub const FREE_TEXT_LIMIT: usize = 500;

/// A semantic field of a canonical entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Company,
    Status,
    Date,
    Notes,
    DeckSummary,
}

impl Slot {
    pub fn label(self) -> &'static str {
        match self {
            Slot::Company => "Company",
            Slot::Status => "Status",
            Slot::Date => "Date",
            Slot::Notes => "Notes",
            Slot::DeckSummary => "Deck Summary",
        }
    }

    fn is_free_text(self) -> bool {
        matches!(self, Slot::Notes | Slot::DeckSummary)
    }
}

/// One slot and the field names that may carry it, highest priority first.
#[derive(Debug, Clone, Copy)]
pub struct SlotRule {
    pub slot: Slot,
    pub aliases: &'static [&'static str],
}

/// Resolution rules in emission order.
pub const SLOT_RULES: &[SlotRule] = &[
    SlotRule {
        slot: Slot::Company,
        aliases: &["company_name", "Company Name", "Company", "name"],
    },
    SlotRule {
        slot: Slot::Status,
        aliases: &["status", "Status", "Current status", "Current Status"],
    },
    SlotRule {
        slot: Slot::Date,
        aliases: &["date", "Date", "Last Contact", "last_contact"],
    },
    SlotRule {
        slot: Slot::Notes,
        aliases: &["notes", "Notes", "call notes", "Call Notes", "Call notes"],
    },
    SlotRule {
        slot: Slot::DeckSummary,
        aliases: &[
            "pitch_deck_summary",
            "Pitch Deck Summary",
            "summary",
            "Summary",
            "deck_summary",
            "Deck Summary",
        ],
    },
];

/// A record reduced to the slots the model needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalEntry {
    pub company: String,
    pub status: Option<String>,
    pub date: Option<String>,
    pub notes: Option<String>,
    pub deck_summary: Option<String>,
}

impl CanonicalEntry {
    pub fn from_record(record: &Record) -> Self {
        Self::with_rules(record, SLOT_RULES)
    }

    /// Resolve slots using an arbitrary rule table. Slots with no rule stay unset.
    pub fn with_rules(record: &Record, rules: &[SlotRule]) -> Self {
        let mut entry = CanonicalEntry {
            company: "Unknown".to_string(),
            status: None,
            date: None,
            notes: None,
            deck_summary: None,
        };

        for rule in rules {
            let Some(value) = resolve_slot(record, rule) else {
                continue;
            };
            match rule.slot {
                Slot::Company => entry.company = value,
                Slot::Status => entry.status = Some(value),
                Slot::Date => entry.date = Some(value),
                Slot::Notes => entry.notes = Some(value),
                Slot::DeckSummary => entry.deck_summary = Some(value),
            }
        }

        entry
    }

    /// Labeled lines in fixed order; unresolved slots produce no line.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![format!("{}: {}", Slot::Company.label(), self.company)];
        let optional = [
            (Slot::Status, &self.status),
            (Slot::Date, &self.date),
            (Slot::Notes, &self.notes),
            (Slot::DeckSummary, &self.deck_summary),
        ];
        for (slot, value) in optional {
            if let Some(v) = value {
                lines.push(format!("{}: {}", slot.label(), v));
            }
        }
        lines
    }
}

/// Probe the rule's aliases in order and render the first usable value.
pub fn resolve_slot(record: &Record, rule: &SlotRule) -> Option<String> {
    let value = rule
        .aliases
        .iter()
        .filter_map(|alias| record.fields.get(*alias))
        .find_map(render_value)?;

    if rule.slot.is_free_text() {
        Some(truncate_chars(&value, FREE_TEXT_LIMIT))
    } else {
        Some(value)
    }
}

/// Render a field value as text. Falsy values (null, `false`, `0`, empty
/// strings, arrays or objects) count as missing.
pub fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::Bool(true) => Some("true".to_string()),
        Value::Number(n) => {
            if n.as_f64() == Some(0.0) {
                None
            } else {
                Some(n.to_string())
            }
        }
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(render_value).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(", "))
            }
        }
        Value::Object(map) if map.is_empty() => None,
        Value::Object(_) => Some(value.to_string()),
    }
}

/// Keep at most `limit` characters (not bytes).
pub fn truncate_chars(s: &str, limit: usize) -> String {
    match s.char_indices().nth(limit) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Fold records into a single context string, preserving input order.
pub fn build_context(records: &[Record]) -> String {
    let mut parts = vec![format!("{}\n", CONTEXT_HEADER)];

    for record in records {
        let entry = CanonicalEntry::from_record(record);
        let mut lines = entry.lines().into_iter();
        if let Some(first) = lines.next() {
            parts.push(format!("\n{}", first));
        }
        parts.extend(lines);
    }

    parts.join("\n")
}

/// Sorted union of field names across all records.
pub fn field_inventory(records: &[Record]) -> Vec<String> {
    let names: BTreeSet<&str> = records
        .iter()
        .flat_map(|r| r.fields.keys().map(String::as_str))
        .collect();
    names.into_iter().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(fields: Value) -> Record {
        let Value::Object(map) = fields else {
            panic!("fields must be an object");
        };
        Record::new("rec", map)
    }

    #[test]
    fn test_empty_input_is_header_only() {
        assert_eq!(build_context(&[]), "=== VC DATABASE ===\n");
    }

    #[test]
    fn test_full_record_layout() {
        let ctx = build_context(&[record(json!({
            "Company": "Acme",
            "Status": "Diligence",
            "Date": "2024-05-01",
            "Notes": "Great founders",
            "Summary": "B2B payments"
        }))]);
        assert_eq!(
            ctx,
            "=== VC DATABASE ===\n\n\nCompany: Acme\nStatus: Diligence\nDate: 2024-05-01\nNotes: Great founders\nDeck Summary: B2B payments"
        );
    }

    #[test]
    fn test_missing_company_is_unknown_and_absent_slots_omitted() {
        let ctx = build_context(&[record(json!({ "Sector": "Fintech" }))]);
        assert_eq!(ctx, "=== VC DATABASE ===\n\n\nCompany: Unknown");
        assert!(!ctx.contains("Status:"));
        assert!(!ctx.contains("Notes:"));
    }

    #[test]
    fn test_alias_priority() {
        let entry = CanonicalEntry::from_record(&record(json!({
            "name": "Lower priority",
            "company_name": "Winner",
            "Current Status": "Passed",
            "status": "Active",
        })));
        assert_eq!(entry.company, "Winner");
        assert_eq!(entry.status.as_deref(), Some("Active"));
    }

    #[test]
    fn test_empty_value_falls_through_to_next_alias() {
        let entry = CanonicalEntry::from_record(&record(json!({
            "notes": "",
            "Call notes": "Follow up in Q3",
        })));
        assert_eq!(entry.notes.as_deref(), Some("Follow up in Q3"));
    }

    #[test]
    fn test_free_text_truncated_independently() {
        let long_notes = "n".repeat(900);
        let long_summary = "é".repeat(700);
        let entry = CanonicalEntry::from_record(&record(json!({
            "Company": "Acme",
            "Notes": long_notes,
            "Deck Summary": long_summary,
            "Status": "s".repeat(800),
        })));
        assert_eq!(entry.notes.as_ref().unwrap().chars().count(), 500);
        assert_eq!(entry.deck_summary.as_ref().unwrap().chars().count(), 500);
        // Only the free-text slots are bounded.
        assert_eq!(entry.status.as_ref().unwrap().len(), 800);
    }

    #[test]
    fn test_record_order_preserved() {
        let ctx = build_context(&[
            record(json!({ "Company": "Zeta" })),
            record(json!({ "Company": "Alpha" })),
            record(json!({ "Company": "Mu" })),
        ]);
        let z = ctx.find("Zeta").unwrap();
        let a = ctx.find("Alpha").unwrap();
        let m = ctx.find("Mu").unwrap();
        assert!(z < a && a < m);
        assert!(ctx.contains("Company: Zeta\n\nCompany: Alpha\n\nCompany: Mu"));
    }

    #[test]
    fn test_render_non_string_values() {
        assert_eq!(render_value(&json!(42)), Some("42".to_string()));
        assert_eq!(render_value(&json!(0)), None);
        assert_eq!(render_value(&json!(null)), None);
        assert_eq!(render_value(&json!(false)), None);
        assert_eq!(render_value(&json!([])), None);
        assert_eq!(
            render_value(&json!(["Seed", "", "Series A"])),
            Some("Seed, Series A".to_string())
        );
    }

    #[test]
    fn test_custom_rule_table() {
        const RULES: &[SlotRule] = &[SlotRule {
            slot: Slot::Status,
            aliases: &["Stage"],
        }];
        let entry = CanonicalEntry::with_rules(
            &record(json!({ "Stage": "Term sheet", "Company": "Ignored" })),
            RULES,
        );
        assert_eq!(entry.company, "Unknown");
        assert_eq!(entry.status.as_deref(), Some("Term sheet"));
    }

    #[test]
    fn test_truncate_chars_short_input_unchanged() {
        assert_eq!(truncate_chars("abc", 500), "abc");
        assert_eq!(truncate_chars("abcdef", 3), "abc");
    }

    #[test]
    fn test_field_inventory_sorted_and_deduplicated() {
        let fields = field_inventory(&[
            record(json!({ "Status": "a", "Company": "b" })),
            record(json!({ "Company": "c", "Notes": "d" })),
        ]);
        assert_eq!(fields, vec!["Company", "Notes", "Status"]);
    }

    #[test]
    fn test_deterministic() {
        let records = vec![
            record(json!({ "Company": "Acme", "Notes": "x" })),
            record(json!({ "name": "Globex" })),
        ];
        assert_eq!(build_context(&records), build_context(&records));
    }
}
