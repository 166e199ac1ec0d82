use crate::commands::plan::{self, default_slot_for};
use crate::commands::{rules, CmdMessage, CmdResult};
use crate::error::{Result, SupporgError};
use crate::model::{new_id, Document, Supplement, SupplementDraft};
use chrono::NaiveDate;

fn validate(draft: &SupplementDraft) -> Result<()> {
    if draft.name.trim().is_empty() {
        return Err(SupporgError::validation("Name is required."));
    }
    Ok(())
}

/// Adds a supplement. When its default slot names an existing slot it is
/// also placed there for `date`.
pub fn create_item(doc: &mut Document, draft: SupplementDraft, date: NaiveDate) -> Result<CmdResult> {
    validate(&draft)?;
    let item = draft.into_supplement(new_id("supp"));
    doc.supplements.push(item.clone());

    let mut result = CmdResult::changed()
        .with_message(CmdMessage::success(format!("Supplement added: {}", item.name)))
        .with_item(item.clone());

    if let Some(slot_id) = default_slot_for(doc, &item).map(|s| s.id.clone()) {
        let placed = plan::add_item(doc, date, &slot_id, &item.id);
        result.messages.extend(placed.messages);
    }
    Ok(result)
}

/// Replaces a supplement's fields. The id never changes.
pub fn update_item(doc: &mut Document, item_id: &str, draft: SupplementDraft) -> Result<CmdResult> {
    validate(&draft)?;
    let entry = doc
        .supplements
        .iter_mut()
        .find(|s| s.id == item_id)
        .ok_or_else(|| SupporgError::ItemNotFound(item_id.to_string()))?;
    *entry = draft.into_supplement(item_id.to_string());
    let item = entry.clone();
    Ok(CmdResult::changed()
        .with_message(CmdMessage::success(format!("Supplement updated: {}", item.name)))
        .with_item(item))
}

/// Deletes a supplement together with every plan entry and rule that
/// references it.
pub fn delete_item(doc: &mut Document, item_id: &str) -> Result<CmdResult> {
    let pos = doc
        .supplements
        .iter()
        .position(|s| s.id == item_id)
        .ok_or_else(|| SupporgError::ItemNotFound(item_id.to_string()))?;
    let item = doc.supplements.remove(pos);
    let plan_entries = plan::purge_item(doc, item_id);
    let rule_count = rules::purge_item(doc, item_id);

    let mut result = CmdResult::changed()
        .with_message(CmdMessage::success(format!("Supplement deleted: {}", item.name)))
        .with_item(item);
    if plan_entries > 0 || rule_count > 0 {
        result.add_message(CmdMessage::info(format!(
            "Removed {} plan entr{} and {} rule(s).",
            plan_entries,
            if plan_entries == 1 { "y" } else { "ies" },
            rule_count
        )));
    }
    Ok(result)
}

pub fn get_item<'a>(doc: &'a Document, item_id: &str) -> Result<&'a Supplement> {
    doc.supplement(item_id)
        .ok_or_else(|| SupporgError::ItemNotFound(item_id.to_string()))
}

/// Supplements sorted by name.
pub fn sorted_items(doc: &Document) -> Vec<Supplement> {
    let mut items = doc.supplements.clone();
    items.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
    });
    items
}

/// Case-insensitive substring search over name, dose, form, notes and tags.
pub fn search_items(doc: &Document, query: &str) -> Vec<Supplement> {
    let query = query.trim().to_lowercase();
    sorted_items(doc)
        .into_iter()
        .filter(|s| query.is_empty() || s.haystack().contains(&query))
        .collect()
}
