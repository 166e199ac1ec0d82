use crate::commands::plan::purge_slot;
use crate::commands::{CmdMessage, CmdResult};
use crate::error::{Result, SupporgError};
use crate::model::{Document, Slot};

fn clean_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(SupporgError::validation("Slot name cannot be empty."));
    }
    Ok(name.to_string())
}

pub fn create_slot(doc: &mut Document, name: &str) -> Result<CmdResult> {
    let slot = Slot::new(clean_name(name)?);
    doc.slots.push(slot.clone());
    Ok(CmdResult::changed()
        .with_message(CmdMessage::success(format!("Slot created: {}", slot.name)))
        .with_slot(slot))
}

pub fn rename_slot(doc: &mut Document, slot_id: &str, name: &str) -> Result<CmdResult> {
    let name = clean_name(name)?;
    let slot = doc
        .slots
        .iter_mut()
        .find(|s| s.id == slot_id)
        .ok_or_else(|| SupporgError::SlotNotFound(slot_id.to_string()))?;
    let old = std::mem::replace(&mut slot.name, name);
    let slot = slot.clone();
    Ok(CmdResult::changed()
        .with_message(CmdMessage::success(format!(
            "Slot renamed: {} -> {}",
            old, slot.name
        )))
        .with_slot(slot))
}

/// Deletes a slot and drops its list from every date. Supplements stay in
/// the catalog.
pub fn delete_slot(doc: &mut Document, slot_id: &str) -> Result<CmdResult> {
    let pos = doc
        .slots
        .iter()
        .position(|s| s.id == slot_id)
        .ok_or_else(|| SupporgError::SlotNotFound(slot_id.to_string()))?;
    let slot = doc.slots.remove(pos);
    purge_slot(doc, slot_id);
    Ok(CmdResult::changed()
        .with_message(CmdMessage::success(format!("Slot deleted: {}", slot.name)))
        .with_slot(slot))
}
