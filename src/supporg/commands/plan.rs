//! # Daily Plan
//!
//! The plan maps each calendar date to `slot id → ordered item ids`. It is
//! sparse: a date only appears once something reads or writes it.
//!
//! ## Materialize-on-read
//!
//! [`ensure_plan`] is the single place that creates plan entries. It gives a
//! date an (empty) list for every slot that currently exists and leaves
//! existing lists alone, so calling it any number of times yields the same
//! structure. Every other function here assumes it ran for the date.
//!
//! ## Membership
//!
//! A slot list behaves like an ordered set: [`add_item`] appends only when
//! the id is absent, so user-visible order is insertion order and duplicates
//! never appear.
//!
//! ## Stale References
//!
//! Placing an item into a slot or item that no longer exists is a no-op, not
//! an error. Reads go through [`day_view`], which drops ids that no longer
//! resolve.

use crate::commands::{CmdMessage, CmdResult};
use crate::error::{Result, SupporgError};
use crate::model::{DayPlan, Document, Slot, Supplement};
use chrono::NaiveDate;

/// Guarantees `date` has a list for every current slot.
pub fn ensure_plan(doc: &mut Document, date: NaiveDate) -> &mut DayPlan {
    let plan = doc.plans.entry(date).or_default();
    for slot in &doc.slots {
        plan.entry(slot.id.clone()).or_default();
    }
    plan
}

pub fn add_item(doc: &mut Document, date: NaiveDate, slot_id: &str, item_id: &str) -> CmdResult {
    let Some(slot_name) = doc.slot(slot_id).map(|s| s.name.clone()) else {
        return CmdResult::unchanged(CmdMessage::info("Slot no longer exists."));
    };
    let Some(item) = doc.supplement(item_id).cloned() else {
        return CmdResult::unchanged(CmdMessage::info("Supplement no longer exists."));
    };

    let Some(list) = ensure_plan(doc, date).get_mut(slot_id) else {
        return CmdResult::unchanged(CmdMessage::info("Slot no longer exists."));
    };
    if list.iter().any(|id| id == item_id) {
        return CmdResult::unchanged(CmdMessage::info(format!(
            "{} is already in {} for {}.",
            item.name, slot_name, date
        )));
    }
    list.push(item_id.to_string());

    CmdResult::changed()
        .with_message(CmdMessage::success(format!(
            "Added {} to {} for {}.",
            item.name, slot_name, date
        )))
        .with_item(item)
}

pub fn remove_item(
    doc: &mut Document,
    date: NaiveDate,
    slot_id: &str,
    item_id: &str,
) -> CmdResult {
    let plan = ensure_plan(doc, date);
    let Some(list) = plan.get_mut(slot_id) else {
        return CmdResult::unchanged(CmdMessage::info("Slot no longer exists."));
    };

    let before = list.len();
    list.retain(|id| id != item_id);
    if list.len() == before {
        return CmdResult::unchanged(CmdMessage::info("Nothing to remove."));
    }

    let name = doc.supplement_name(item_id);
    CmdResult::changed().with_message(CmdMessage::success(format!(
        "Removed {} from {}.",
        name, date
    )))
}

pub fn clear_slot(doc: &mut Document, date: NaiveDate, slot_id: &str) -> CmdResult {
    let plan = ensure_plan(doc, date);
    let Some(list) = plan.get_mut(slot_id) else {
        return CmdResult::unchanged(CmdMessage::info("Slot no longer exists."));
    };
    let cleared = list.len();
    list.clear();

    CmdResult {
        changed: cleared > 0,
        ..CmdResult::default()
    }
    .with_message(CmdMessage::success(format!(
        "Cleared {} item(s) for {}.",
        cleared, date
    )))
}

/// Places an item in the slot named by its `default_slot_name`, or in the
/// first slot when that name matches nothing.
pub fn add_to_default_slot(doc: &mut Document, date: NaiveDate, item_id: &str) -> Result<CmdResult> {
    let item = doc
        .supplement(item_id)
        .ok_or_else(|| SupporgError::ItemNotFound(item_id.to_string()))?;
    let slot_id = default_slot_for(doc, item)
        .or_else(|| doc.slots.first())
        .map(|s| s.id.clone())
        .ok_or_else(|| SupporgError::validation("Create a slot first."))?;
    Ok(add_item(doc, date, &slot_id, item_id))
}

/// The slot whose name equals the item's default slot name, if any.
pub(crate) fn default_slot_for<'a>(doc: &'a Document, item: &Supplement) -> Option<&'a Slot> {
    let wanted = item.default_slot_name.as_deref()?;
    doc.slots.iter().find(|s| s.name == wanted)
}

/// Removes an item id from every list on every date. Returns how many
/// entries were dropped.
pub(crate) fn purge_item(doc: &mut Document, item_id: &str) -> usize {
    let mut removed = 0;
    for day in doc.plans.values_mut() {
        for list in day.values_mut() {
            let before = list.len();
            list.retain(|id| id != item_id);
            removed += before - list.len();
        }
    }
    removed
}

/// Removes a slot's key from every date.
pub(crate) fn purge_slot(doc: &mut Document, slot_id: &str) {
    for day in doc.plans.values_mut() {
        day.remove(slot_id);
    }
}

#[derive(Debug, Clone)]
pub struct SlotEntry {
    pub slot: Slot,
    pub items: Vec<Supplement>,
}

/// A date's plan resolved for display, in slot order.
#[derive(Debug, Clone)]
pub struct DayView {
    pub date: NaiveDate,
    pub slots: Vec<SlotEntry>,
}

impl DayView {
    pub fn slot(&self, slot_id: &str) -> Option<&SlotEntry> {
        self.slots.iter().find(|e| e.slot.id == slot_id)
    }
}

/// Resolves a date's plan. Ids that no longer name a supplement are skipped.
pub fn day_view(doc: &Document, date: NaiveDate) -> DayView {
    let day = doc.plans.get(&date);
    let slots = doc
        .slots
        .iter()
        .map(|slot| {
            let items = day
                .and_then(|d| d.get(&slot.id))
                .map(|ids| {
                    ids.iter()
                        .filter_map(|id| doc.supplement(id).cloned())
                        .collect()
                })
                .unwrap_or_default();
            SlotEntry {
                slot: slot.clone(),
                items,
            }
        })
        .collect();
    DayView { date, slots }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SupplementDraft;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn doc_with(items: &[(&str, &str)]) -> Document {
        let mut doc = Document::with_slots(["Morning", "Evening"]);
        for (id, name) in items {
            doc.supplements
                .push(SupplementDraft::named(*name).into_supplement(id.to_string()));
        }
        doc
    }

    fn slot_id(doc: &Document, i: usize) -> String {
        doc.slots()[i].id.clone()
    }

    #[test]
    fn ensure_plan_creates_list_for_every_slot() {
        let mut doc = doc_with(&[]);
        let plan = ensure_plan(&mut doc, date(1));
        assert_eq!(plan.len(), 2);
        assert!(plan.values().all(|l| l.is_empty()));
    }

    #[test]
    fn ensure_plan_is_idempotent() {
        let mut doc = doc_with(&[("a", "Iron")]);
        let morning = slot_id(&doc, 0);
        add_item(&mut doc, date(1), &morning, "a");

        ensure_plan(&mut doc, date(1));
        let once = doc.plans().clone();
        ensure_plan(&mut doc, date(1));
        assert_eq!(doc.plans(), &once);
        assert_eq!(doc.plans()[&date(1)][&morning], vec!["a".to_string()]);
    }

    #[test]
    fn ensure_plan_backfills_new_slots_only() {
        let mut doc = doc_with(&[("a", "Iron")]);
        let morning = slot_id(&doc, 0);
        add_item(&mut doc, date(1), &morning, "a");

        doc.slots.push(Slot::new("Bedtime"));
        let plan = ensure_plan(&mut doc, date(1));
        assert_eq!(plan.len(), 3);
        assert_eq!(plan[&morning], vec!["a".to_string()]);
    }

    #[test]
    fn adding_twice_keeps_one_entry() {
        let mut doc = doc_with(&[("a", "Iron")]);
        let morning = slot_id(&doc, 0);

        assert!(add_item(&mut doc, date(2), &morning, "a").changed);
        assert!(!add_item(&mut doc, date(2), &morning, "a").changed);
        assert_eq!(doc.plans()[&date(2)][&morning], vec!["a".to_string()]);
    }

    #[test]
    fn adding_preserves_insertion_order() {
        let mut doc = doc_with(&[("b", "Zinc"), ("a", "Iron")]);
        let morning = slot_id(&doc, 0);
        add_item(&mut doc, date(2), &morning, "b");
        add_item(&mut doc, date(2), &morning, "a");
        assert_eq!(
            doc.plans()[&date(2)][&morning],
            vec!["b".to_string(), "a".to_string()]
        );
    }

    #[test]
    fn adding_missing_item_or_slot_is_a_noop() {
        let mut doc = doc_with(&[("a", "Iron")]);
        let morning = slot_id(&doc, 0);

        let res = add_item(&mut doc, date(3), &morning, "ghost");
        assert!(!res.changed);
        let res = add_item(&mut doc, date(3), "slot_ghost", "a");
        assert!(!res.changed);
        assert!(doc.plans().get(&date(3)).is_none());
    }

    #[test]
    fn remove_filters_item_and_ignores_absent() {
        let mut doc = doc_with(&[("a", "Iron"), ("b", "Zinc")]);
        let morning = slot_id(&doc, 0);
        add_item(&mut doc, date(4), &morning, "a");
        add_item(&mut doc, date(4), &morning, "b");

        assert!(remove_item(&mut doc, date(4), &morning, "a").changed);
        assert!(!remove_item(&mut doc, date(4), &morning, "a").changed);
        assert_eq!(doc.plans()[&date(4)][&morning], vec!["b".to_string()]);
    }

    #[test]
    fn clear_slot_empties_only_that_slot() {
        let mut doc = doc_with(&[("a", "Iron")]);
        let morning = slot_id(&doc, 0);
        let evening = slot_id(&doc, 1);
        add_item(&mut doc, date(5), &morning, "a");
        add_item(&mut doc, date(5), &evening, "a");

        clear_slot(&mut doc, date(5), &morning);
        assert!(doc.plans()[&date(5)][&morning].is_empty());
        assert_eq!(doc.plans()[&date(5)][&evening], vec!["a".to_string()]);
    }

    #[test]
    fn default_slot_placement_uses_name_then_first_slot() {
        let mut doc = doc_with(&[("a", "Iron"), ("b", "Zinc")]);
        doc.supplements[0].default_slot_name = Some("Evening".into());
        let morning = slot_id(&doc, 0);
        let evening = slot_id(&doc, 1);

        add_to_default_slot(&mut doc, date(6), "a").unwrap();
        add_to_default_slot(&mut doc, date(6), "b").unwrap();
        assert_eq!(doc.plans()[&date(6)][&evening], vec!["a".to_string()]);
        assert_eq!(doc.plans()[&date(6)][&morning], vec!["b".to_string()]);
    }

    #[test]
    fn default_slot_placement_requires_a_slot() {
        let mut doc = doc_with(&[("a", "Iron")]);
        doc.slots.clear();
        assert!(matches!(
            add_to_default_slot(&mut doc, date(6), "a"),
            Err(SupporgError::Validation(_))
        ));
    }

    #[test]
    fn purge_item_removes_from_every_date() {
        let mut doc = doc_with(&[("a", "Iron"), ("b", "Zinc")]);
        let morning = slot_id(&doc, 0);
        let evening = slot_id(&doc, 1);
        add_item(&mut doc, date(1), &morning, "a");
        add_item(&mut doc, date(2), &evening, "a");
        add_item(&mut doc, date(2), &evening, "b");

        assert_eq!(purge_item(&mut doc, "a"), 2);
        for day in doc.plans().values() {
            assert!(day.values().all(|l| !l.contains(&"a".to_string())));
        }
        assert_eq!(doc.plans()[&date(2)][&evening], vec!["b".to_string()]);
    }

    #[test]
    fn day_view_skips_dangling_ids() {
        let mut doc = doc_with(&[("a", "Iron")]);
        let morning = slot_id(&doc, 0);
        ensure_plan(&mut doc, date(7))
            .get_mut(&morning)
            .unwrap()
            .extend(["a".to_string(), "ghost".to_string()]);

        let view = day_view(&doc, date(7));
        let names: Vec<_> = view.slots[0].items.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Iron"]);
        assert!(view.slots[1].items.is_empty());
    }
}
