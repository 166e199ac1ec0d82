//! # Domain Model
//!
//! The whole application state is one [`Document`]: the supplement catalog, the
//! slot definitions, the date-indexed plan, the rule list and the appointments.
//! It is persisted as a single JSON value and always read and written in full.
//!
//! ## JSON Shape
//!
//! ```text
//! { version, supplements: [Supplement...], slots: [Slot...],
//!   plans: { "YYYY-MM-DD": { slotId: [itemId...] } },
//!   rules: [Rule...], appointments: [Appointment...] }
//! ```
//!
//! Field names follow the camelCase keys of earlier backups (`photoDataUrl`,
//! `defaultSlot`, `freq`, `type`, `dateISO`, `timeHHMM`) so those files load
//! without migration. Timestamps are epoch milliseconds.
//!
//! ## References
//!
//! Plan lists and rules refer to supplements by id and never own them. The
//! cascade operations in `commands` keep those references live; anything that
//! still dangles is treated as "not found" and skipped when resolved.
//!
//! ## Optional Text
//!
//! Optional text fields are `None` when empty. Older files store `""` for an
//! unset field, which is read back as `None` (see [`empty_as_none`]).

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

pub type ItemId = String;
pub type SlotId = String;
pub type RuleId = String;
pub type AppointmentId = String;

/// Slot-id → ordered item ids for one calendar date.
pub type DayPlan = BTreeMap<SlotId, Vec<ItemId>>;

/// Current on-disk format version of [`Document`].
pub const DOCUMENT_VERSION: u32 = 7;

pub const DEFAULT_FREQUENCY: &str = "daily";

pub const DEFAULT_SLOT_NAMES: [&str; 4] = ["Morning", "Midday", "Evening", "Bedtime"];

/// Generates a fresh identifier such as `supp_6f1c...`.
pub fn new_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}

/// The local calendar date.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn default_frequency() -> String {
    DEFAULT_FREQUENCY.to_string()
}

fn default_version() -> u32 {
    DOCUMENT_VERSION
}

/// Reads `null`, a missing field, or a blank string as `None`.
pub(crate) fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(clean_optional(raw))
}

pub(crate) fn clean_optional(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Trims tags, drops empty ones and removes duplicates (first occurrence wins).
pub fn normalize_tags<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut tags: Vec<String> = Vec::new();
    for tag in raw {
        let tag = tag.as_ref().trim();
        if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}

/// Parses a comma separated tag list ("iron, morning").
pub fn parse_tags(csv: &str) -> Vec<String> {
    normalize_tags(csv.split(','))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Supplement {
    pub id: ItemId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "empty_as_none")]
    pub dose: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "empty_as_none")]
    pub form: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "empty_as_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(
        rename = "photoDataUrl",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "empty_as_none"
    )]
    pub photo_ref: Option<String>,
    #[serde(
        rename = "defaultSlot",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "empty_as_none"
    )]
    pub default_slot_name: Option<String>,
    #[serde(rename = "freq", default = "default_frequency")]
    pub frequency: String,
}

impl Supplement {
    /// "500 mg • capsule" style subtitle; empty when neither is set.
    pub fn subtitle(&self) -> String {
        [self.dose.as_deref(), self.form.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" • ")
    }

    /// Lowercased text used by catalog search.
    pub fn haystack(&self) -> String {
        let tags = self.tags.join(",");
        [
            self.name.as_str(),
            self.dose.as_deref().unwrap_or_default(),
            self.form.as_deref().unwrap_or_default(),
            self.notes.as_deref().unwrap_or_default(),
            tags.as_str(),
        ]
        .join(" ")
        .to_lowercase()
    }
}

/// User input for creating or replacing a supplement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupplementDraft {
    pub name: String,
    pub dose: Option<String>,
    pub form: Option<String>,
    pub notes: Option<String>,
    pub tags: Vec<String>,
    pub photo_ref: Option<String>,
    pub default_slot_name: Option<String>,
    pub frequency: Option<String>,
}

impl SupplementDraft {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub(crate) fn into_supplement(self, id: ItemId) -> Supplement {
        Supplement {
            id,
            name: self.name.trim().to_string(),
            dose: clean_optional(self.dose),
            form: clean_optional(self.form),
            notes: clean_optional(self.notes),
            tags: normalize_tags(self.tags),
            photo_ref: clean_optional(self.photo_ref),
            default_slot_name: clean_optional(self.default_slot_name),
            frequency: clean_optional(self.frequency).unwrap_or_else(default_frequency),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub id: SlotId,
    pub name: String,
}

impl Slot {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id("slot"),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    Avoid,
    Space,
    Note,
}

impl RuleKind {
    pub fn label(&self) -> &'static str {
        match self {
            RuleKind::Avoid => "Do not combine",
            RuleKind::Space => "Space apart",
            RuleKind::Note => "Note",
        }
    }
}

impl std::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RuleKind::Avoid => "avoid",
            RuleKind::Space => "space",
            RuleKind::Note => "note",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for RuleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "avoid" => Ok(RuleKind::Avoid),
            "space" => Ok(RuleKind::Space),
            "note" => Ok(RuleKind::Note),
            other => Err(format!("Unknown rule kind: {}", other)),
        }
    }
}

/// A user-authored note about a pair of supplements.
///
/// `a_id < b_id` always holds for stored rules; see
/// [`crate::commands::rules::canonical_pair`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: RuleId,
    pub a_id: ItemId,
    pub b_id: ItemId,
    #[serde(rename = "type")]
    pub kind: RuleKind,
    pub text: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Rule {
    pub fn involves(&self, item_id: &str) -> bool {
        self.a_id == item_id || self.b_id == item_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: AppointmentId,
    pub title: String,
    #[serde(rename = "dateISO")]
    pub date: NaiveDate,
    #[serde(
        rename = "timeHHMM",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "empty_as_none"
    )]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "empty_as_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "empty_as_none")]
    pub notes: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentDraft {
    pub title: String,
    pub date: NaiveDate,
    pub time: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
}

impl AppointmentDraft {
    pub fn new(title: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            title: title.into(),
            date,
            time: None,
            location: None,
            notes: None,
        }
    }
}

/// The single persisted document.
///
/// Fields are crate-private: outside code reads through the accessors and
/// mutates only through [`crate::api::OrganizerApi`], which keeps the
/// cascade and canonical-pair invariants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default = "default_version")]
    pub(crate) version: u32,
    #[serde(default)]
    pub(crate) supplements: Vec<Supplement>,
    #[serde(default)]
    pub(crate) slots: Vec<Slot>,
    #[serde(default)]
    pub(crate) plans: BTreeMap<NaiveDate, DayPlan>,
    #[serde(default)]
    pub(crate) rules: Vec<Rule>,
    #[serde(default)]
    pub(crate) appointments: Vec<Appointment>,
}

impl Default for Document {
    fn default() -> Self {
        Self::with_slots(DEFAULT_SLOT_NAMES)
    }
}

impl Document {
    /// A document with no data besides the given slots.
    pub fn with_slots<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            version: DOCUMENT_VERSION,
            supplements: Vec::new(),
            slots: names.into_iter().map(|n| Slot::new(n.as_ref())).collect(),
            plans: BTreeMap::new(),
            rules: Vec::new(),
            appointments: Vec::new(),
        }
    }

    /// Completes a freshly loaded document: a slotless document gets the
    /// given default slots.
    pub fn normalize<S: AsRef<str>>(&mut self, default_slots: &[S]) {
        if self.slots.is_empty() {
            self.slots = default_slots.iter().map(|n| Slot::new(n.as_ref())).collect();
        }
        self.version = DOCUMENT_VERSION;
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn supplements(&self) -> &[Supplement] {
        &self.supplements
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn plans(&self) -> &BTreeMap<NaiveDate, DayPlan> {
        &self.plans
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn appointments(&self) -> &[Appointment] {
        &self.appointments
    }

    pub fn supplement(&self, id: &str) -> Option<&Supplement> {
        self.supplements.iter().find(|s| s.id == id)
    }

    pub fn slot(&self, id: &str) -> Option<&Slot> {
        self.slots.iter().find(|s| s.id == id)
    }

    /// Resolved name for an item id, `"Unknown"` when it dangles.
    pub fn supplement_name(&self, id: &str) -> String {
        self.supplement(id)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| "Unknown".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_document_has_four_slots() {
        let doc = Document::default();
        let names: Vec<_> = doc.slots().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Morning", "Midday", "Evening", "Bedtime"]);
        assert!(doc.plans().is_empty());
    }

    #[test]
    fn new_ids_are_prefixed_and_unique() {
        let a = new_id("supp");
        let b = new_id("supp");
        assert!(a.starts_with("supp_"));
        assert_ne!(a, b);
    }

    #[test]
    fn tags_are_trimmed_and_deduplicated() {
        assert_eq!(
            parse_tags(" iron, , morning,iron "),
            vec!["iron".to_string(), "morning".to_string()]
        );
    }

    #[test]
    fn legacy_supplement_with_blank_fields_loads() {
        let json = r#"{
            "id": "supp_1", "name": "Iron", "dose": "", "form": "tablet",
            "notes": "", "tags": ["blood"], "photoDataUrl": "",
            "defaultSlot": "Morning", "freq": "daily"
        }"#;
        let s: Supplement = serde_json::from_str(json).unwrap();
        assert_eq!(s.dose, None);
        assert_eq!(s.form.as_deref(), Some("tablet"));
        assert_eq!(s.photo_ref, None);
        assert_eq!(s.default_slot_name.as_deref(), Some("Morning"));
        assert_eq!(s.subtitle(), "tablet");
    }

    #[test]
    fn supplement_without_freq_defaults_to_daily() {
        let s: Supplement = serde_json::from_str(r#"{"id":"a","name":"Zinc"}"#).unwrap();
        assert_eq!(s.frequency, "daily");
        assert!(s.tags.is_empty());
    }

    #[test]
    fn rule_uses_type_key_and_millisecond_timestamps() {
        let json = r#"{"id":"rule_1","aId":"a","bId":"b","type":"avoid","text":"4h","createdAt":1700000000000}"#;
        let rule: Rule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.kind, RuleKind::Avoid);
        assert_eq!(rule.created_at.timestamp_millis(), 1_700_000_000_000);

        let back = serde_json::to_value(&rule).unwrap();
        assert_eq!(back["type"], "avoid");
        assert_eq!(back["createdAt"], 1_700_000_000_000i64);
    }

    #[test]
    fn plans_are_keyed_by_iso_date() {
        let json = r#"{"supplements":[],"slots":[{"id":"s1","name":"Morning"}],
            "plans":{"2024-03-01":{"s1":["a"]}},"rules":[]}"#;
        let doc: Document = serde_json::from_str(json).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(doc.plans()[&date]["s1"], vec!["a".to_string()]);
        assert!(doc.appointments().is_empty());
        assert_eq!(doc.version(), DOCUMENT_VERSION);
    }

    #[test]
    fn normalize_backfills_missing_slots() {
        let mut doc: Document = serde_json::from_str("{}").unwrap();
        assert!(doc.slots().is_empty());
        doc.normalize(&DEFAULT_SLOT_NAMES);
        assert_eq!(doc.slots().len(), 4);
    }

    #[test]
    fn rule_kind_parses_case_insensitively() {
        assert_eq!("Space".parse::<RuleKind>().unwrap(), RuleKind::Space);
        assert!("mix".parse::<RuleKind>().is_err());
    }
}
