//! # Pairwise Rules
//!
//! A rule is a note about two supplements ("do not combine", "space apart",
//! or a free note). The relation is symmetric, so every stored rule keeps its
//! pair in canonical order: [`canonical_pair`] puts the lexicographically
//! smaller id first. Writes and lookups both go through it, which is why a
//! lookup never needs to try both orderings.
//!
//! Several rules may exist for the same pair; nothing de-duplicates them.
//!
//! ## Checking a Selection
//!
//! [`check_selection`] takes any set of supplement ids. With fewer than two
//! distinct ids there is nothing to check and the result is
//! [`SelectionCheck::Insufficient`], which is distinct from a check that ran
//! and matched nothing. Otherwise every unordered pair in the selection is
//! looked up and all matches are returned, each rule once. Names are resolved
//! at query time so renames show up without touching stored rules.

use crate::commands::{CmdMessage, CmdResult};
use crate::error::{Result, SupporgError};
use crate::model::{new_id, Document, ItemId, Rule, RuleKind};
use chrono::Utc;
use std::collections::BTreeSet;

/// Orders a pair so the smaller id comes first.
pub fn canonical_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

pub fn add_rule(
    doc: &mut Document,
    a_id: &str,
    b_id: &str,
    kind: RuleKind,
    text: &str,
) -> Result<CmdResult> {
    let (a_id, b_id, text) = (a_id.trim(), b_id.trim(), text.trim());
    if a_id.is_empty() || b_id.is_empty() {
        return Err(SupporgError::validation("Pick both supplements."));
    }
    if a_id == b_id {
        return Err(SupporgError::validation("Pick two different supplements."));
    }
    if text.is_empty() {
        return Err(SupporgError::validation(
            "Add details (e.g., spacing time or note).",
        ));
    }
    for id in [a_id, b_id] {
        if doc.supplement(id).is_none() {
            return Err(SupporgError::ItemNotFound(id.to_string()));
        }
    }

    let (x, y) = canonical_pair(a_id, b_id);
    let rule = Rule {
        id: new_id("rule"),
        a_id: x.to_string(),
        b_id: y.to_string(),
        kind,
        text: text.to_string(),
        created_at: Utc::now(),
    };
    doc.rules.push(rule.clone());

    Ok(CmdResult::changed()
        .with_message(CmdMessage::success(format!(
            "Rule saved: {} ↔ {} ({})",
            doc.supplement_name(x),
            doc.supplement_name(y),
            kind.label()
        )))
        .with_rule(rule))
}

pub fn delete_rule(doc: &mut Document, rule_id: &str) -> CmdResult {
    let Some(pos) = doc.rules.iter().position(|r| r.id == rule_id) else {
        return CmdResult::unchanged(CmdMessage::info("No such rule."));
    };
    let rule = doc.rules.remove(pos);
    CmdResult::changed()
        .with_message(CmdMessage::success("Rule deleted."))
        .with_rule(rule)
}

pub fn delete_all_rules(doc: &mut Document) -> CmdResult {
    let count = doc.rules.len();
    doc.rules.clear();
    CmdResult {
        changed: count > 0,
        ..CmdResult::default()
    }
    .with_message(CmdMessage::success(format!("Deleted {} rule(s).", count)))
}

/// Drops every rule that mentions `item_id`. Returns how many went.
pub(crate) fn purge_item(doc: &mut Document, item_id: &str) -> usize {
    let before = doc.rules.len();
    doc.rules.retain(|r| !r.involves(item_id));
    before - doc.rules.len()
}

/// All rules stored for the pair, in either order.
pub fn find_rules_for_pair<'a>(doc: &'a Document, a_id: &str, b_id: &str) -> Vec<&'a Rule> {
    let (x, y) = canonical_pair(a_id, b_id);
    doc.rules
        .iter()
        .filter(|r| r.a_id == x && r.b_id == y)
        .collect()
}

/// A rule with both supplement names resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    pub rule: Rule,
    pub a_name: String,
    pub b_name: String,
}

impl RuleMatch {
    fn resolve(doc: &Document, rule: &Rule) -> Self {
        Self {
            rule: rule.clone(),
            a_name: doc.supplement_name(&rule.a_id),
            b_name: doc.supplement_name(&rule.b_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionCheck {
    /// Fewer than two distinct supplements were selected.
    Insufficient,
    /// The check ran; the list may be empty.
    Checked(Vec<RuleMatch>),
}

impl SelectionCheck {
    pub fn matches(&self) -> &[RuleMatch] {
        match self {
            SelectionCheck::Insufficient => &[],
            SelectionCheck::Checked(m) => m,
        }
    }
}

pub fn check_selection<I, S>(doc: &Document, selection: I) -> SelectionCheck
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let ids: Vec<ItemId> = selection
        .into_iter()
        .map(|s| s.as_ref().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if ids.len() < 2 {
        return SelectionCheck::Insufficient;
    }

    let mut found = Vec::new();
    for (i, a) in ids.iter().enumerate() {
        for b in &ids[i + 1..] {
            found.extend(
                find_rules_for_pair(doc, a, b)
                    .into_iter()
                    .map(|rule| RuleMatch::resolve(doc, rule)),
            );
        }
    }
    SelectionCheck::Checked(found)
}

/// Every rule, newest first.
pub fn list_rules(doc: &Document) -> Vec<RuleMatch> {
    let mut rules: Vec<RuleMatch> = doc
        .rules
        .iter()
        .map(|r| RuleMatch::resolve(doc, r))
        .collect();
    rules.sort_by(|a, b| b.rule.created_at.cmp(&a.rule.created_at));
    rules
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SupplementDraft;

    /// Vitamin D (A), Iron (B), Calcium (C).
    fn doc() -> Document {
        let mut doc = Document::with_slots(["Morning"]);
        for (id, name) in [("A", "Vitamin D"), ("B", "Iron"), ("C", "Calcium")] {
            doc.supplements
                .push(SupplementDraft::named(name).into_supplement(id.to_string()));
        }
        doc
    }

    #[test]
    fn canonical_pair_orders_lexicographically() {
        assert_eq!(canonical_pair("b", "a"), ("a", "b"));
        assert_eq!(canonical_pair("a", "b"), ("a", "b"));
        assert_eq!(canonical_pair("supp_10", "supp_9"), ("supp_10", "supp_9"));
    }

    #[test]
    fn add_rule_stores_canonical_pair() {
        let mut doc = doc();
        add_rule(&mut doc, "B", "A", RuleKind::Avoid, "take 4h apart").unwrap();
        let rule = &doc.rules()[0];
        assert_eq!((rule.a_id.as_str(), rule.b_id.as_str()), ("A", "B"));
        assert_eq!(rule.text, "take 4h apart");
    }

    #[test]
    fn pair_lookup_is_order_independent() {
        let mut doc = doc();
        add_rule(&mut doc, "A", "B", RuleKind::Space, "2h").unwrap();
        add_rule(&mut doc, "B", "A", RuleKind::Note, "with food").unwrap();

        assert_eq!(find_rules_for_pair(&doc, "A", "B").len(), 2);
        assert_eq!(find_rules_for_pair(&doc, "B", "A").len(), 2);
        assert!(find_rules_for_pair(&doc, "A", "C").is_empty());
    }

    #[test]
    fn validation_failures_leave_rules_untouched() {
        let mut doc = doc();
        let cases = [
            ("", "B", "x"),
            ("A", "", "x"),
            ("A", "A", "x"),
            ("A", "B", "   "),
        ];
        for (a, b, text) in cases {
            assert!(matches!(
                add_rule(&mut doc, a, b, RuleKind::Note, text),
                Err(SupporgError::Validation(_))
            ));
        }
        assert!(matches!(
            add_rule(&mut doc, "A", "ghost", RuleKind::Note, "x"),
            Err(SupporgError::ItemNotFound(_))
        ));
        assert!(doc.rules().is_empty());
    }

    #[test]
    fn duplicate_notes_for_a_pair_are_kept() {
        let mut doc = doc();
        add_rule(&mut doc, "A", "B", RuleKind::Note, "same").unwrap();
        add_rule(&mut doc, "A", "B", RuleKind::Note, "same").unwrap();
        assert_eq!(doc.rules().len(), 2);
    }

    #[test]
    fn delete_rule_by_id_and_noop_when_absent() {
        let mut doc = doc();
        let res = add_rule(&mut doc, "A", "B", RuleKind::Note, "n").unwrap();
        let id = res.affected_rules[0].id.clone();

        assert!(delete_rule(&mut doc, &id).changed);
        assert!(!delete_rule(&mut doc, &id).changed);
        assert!(doc.rules().is_empty());
    }

    #[test]
    fn delete_all_clears_list() {
        let mut doc = doc();
        add_rule(&mut doc, "A", "B", RuleKind::Note, "n").unwrap();
        add_rule(&mut doc, "A", "C", RuleKind::Note, "n").unwrap();
        delete_all_rules(&mut doc);
        assert!(doc.rules().is_empty());
    }

    #[test]
    fn selection_scenario() {
        let mut doc = doc();
        add_rule(&mut doc, "A", "B", RuleKind::Avoid, "take 4h apart").unwrap();

        let ab = check_selection(&doc, ["A", "B"]);
        assert_eq!(ab.matches().len(), 1);
        let m = &ab.matches()[0];
        assert_eq!((m.a_name.as_str(), m.b_name.as_str()), ("Vitamin D", "Iron"));
        assert_eq!(m.rule.kind, RuleKind::Avoid);

        assert_eq!(check_selection(&doc, ["A", "C"]), SelectionCheck::Checked(vec![]));

        let abc = check_selection(&doc, ["C", "B", "A"]);
        assert_eq!(abc.matches().len(), 1);
    }

    #[test]
    fn small_selections_are_insufficient() {
        let mut doc = doc();
        add_rule(&mut doc, "A", "B", RuleKind::Avoid, "x").unwrap();
        let empty: [&str; 0] = [];
        assert_eq!(check_selection(&doc, empty), SelectionCheck::Insufficient);
        assert_eq!(check_selection(&doc, ["A"]), SelectionCheck::Insufficient);
        assert_eq!(check_selection(&doc, ["A", "A"]), SelectionCheck::Insufficient);
    }

    #[test]
    fn selection_returns_union_over_all_pairs() {
        let mut doc = doc();
        add_rule(&mut doc, "A", "B", RuleKind::Avoid, "1").unwrap();
        add_rule(&mut doc, "B", "C", RuleKind::Space, "2").unwrap();
        add_rule(&mut doc, "C", "A", RuleKind::Note, "3").unwrap();
        add_rule(&mut doc, "A", "B", RuleKind::Note, "4").unwrap();

        let check = check_selection(&doc, ["A", "B", "C"]);
        let mut texts: Vec<_> = check.matches().iter().map(|m| m.rule.text.as_str()).collect();
        texts.sort();
        assert_eq!(texts, vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn names_resolve_at_query_time() {
        let mut doc = doc();
        add_rule(&mut doc, "A", "B", RuleKind::Avoid, "x").unwrap();
        doc.supplements[1].name = "Iron bisglycinate".into();

        let check = check_selection(&doc, ["A", "B"]);
        assert_eq!(check.matches()[0].b_name, "Iron bisglycinate");
    }

    #[test]
    fn purge_item_drops_rules_on_either_side() {
        let mut doc = doc();
        add_rule(&mut doc, "A", "B", RuleKind::Avoid, "x").unwrap();
        add_rule(&mut doc, "C", "B", RuleKind::Avoid, "y").unwrap();
        add_rule(&mut doc, "A", "C", RuleKind::Avoid, "z").unwrap();

        assert_eq!(purge_item(&mut doc, "B"), 2);
        assert_eq!(doc.rules().len(), 1);
        assert!(doc.rules().iter().all(|r| !r.involves("B")));
    }

    #[test]
    fn list_rules_is_newest_first() {
        let mut doc = doc();
        add_rule(&mut doc, "A", "B", RuleKind::Avoid, "old").unwrap();
        add_rule(&mut doc, "A", "C", RuleKind::Avoid, "new").unwrap();
        doc.rules[0].created_at = doc.rules[1].created_at - chrono::Duration::seconds(5);

        let listed = list_rules(&doc);
        assert_eq!(listed[0].rule.text, "new");
        assert_eq!(listed[1].a_name, "Vitamin D");
    }
}
