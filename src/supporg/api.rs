//! # API Facade
//!
//! The API layer is the single entry point for every organizer operation,
//! whatever the UI. It owns the in-memory [`Document`], the current date and
//! the slot selection, and it is the only code that mutates the document.
//!
//! ## Role and Responsibilities
//!
//! - **Dispatches** to the command functions in `commands/*.rs`
//! - **Materializes** the plan of the date it reads or writes
//!   ([`plan::ensure_plan`]) before handing it to a command
//! - **Persists** the whole document after every mutation, exactly once
//! - **Resolves selectors** (positions, names, ids) into ids for clients
//!   that want them
//!
//! ## What the API Does NOT Do
//!
//! - **Business logic**: that belongs in `commands/*.rs`
//! - **Presentation**: it returns data, never strings for a terminal
//!
//! ## Failure Model
//!
//! Validation happens inside the command before anything is touched, so a
//! rejected call leaves the document as it was. A failed save is returned as
//! an error, but the in-memory change stays: the next successful save
//! writes it out.
//!
//! ## Generic Over DocumentStore
//!
//! `OrganizerApi<S: DocumentStore>` runs on `FileStore` in production and on
//! `InMemoryStore` in tests.

use crate::commands::appointments;
use crate::commands::backup;
use crate::commands::catalog;
use crate::commands::plan::{self, DayView};
use crate::commands::rules::{self, RuleMatch, SelectionCheck};
use crate::commands::slots;
use crate::commands::CmdResult;
use crate::error::{Result, SupporgError};
use crate::model::{
    Appointment, AppointmentDraft, Document, ItemId, Rule, RuleKind, SlotId, Supplement,
    SupplementDraft,
};
use crate::selector;
use crate::store::{load_or_default, DocumentStore};
use chrono::NaiveDate;
use std::collections::BTreeSet;
use tracing::debug;

pub struct OrganizerApi<S: DocumentStore> {
    store: S,
    doc: Document,
    current_date: NaiveDate,
    selected_slot: Option<SlotId>,
}

impl<S: DocumentStore> OrganizerApi<S> {
    /// Boots from the store: loads (or creates) the document and
    /// materializes `today`. Nothing is written until the first mutation.
    pub fn open<N: AsRef<str>>(store: S, default_slots: &[N], today: NaiveDate) -> Self {
        let mut doc = load_or_default(&store, default_slots);
        plan::ensure_plan(&mut doc, today);
        Self {
            store,
            doc,
            current_date: today,
            selected_slot: None,
        }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    fn persist(&mut self) -> Result<()> {
        self.store.save(&self.doc)?;
        debug!(location = %self.store.location().display(), "document saved");
        Ok(())
    }

    fn persisted(&mut self, result: CmdResult) -> Result<CmdResult> {
        self.persist()?;
        Ok(result)
    }

    // --- date and selection -------------------------------------------

    pub fn current_date(&self) -> NaiveDate {
        self.current_date
    }

    /// Moves to another date. The selection is dropped, as it belongs to
    /// the previous day's view.
    pub fn set_date(&mut self, date: NaiveDate) {
        self.current_date = date;
        self.selected_slot = None;
        plan::ensure_plan(&mut self.doc, date);
    }

    pub fn selected_slot(&self) -> Option<&SlotId> {
        self.selected_slot.as_ref()
    }

    pub fn select_slot(&mut self, slot_id: &str) -> Result<()> {
        if self.doc.slot(slot_id).is_none() {
            return Err(SupporgError::SlotNotFound(slot_id.to_string()));
        }
        self.selected_slot = Some(slot_id.to_string());
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selected_slot = None;
    }

    // --- plan ----------------------------------------------------------

    /// The current date's plan, resolved for display.
    pub fn day_view(&mut self) -> DayView {
        plan::ensure_plan(&mut self.doc, self.current_date);
        plan::day_view(&self.doc, self.current_date)
    }

    pub fn add_to_slot(&mut self, slot_id: &str, item_id: &str) -> Result<CmdResult> {
        let result = plan::add_item(&mut self.doc, self.current_date, slot_id, item_id);
        self.persisted(result)
    }

    /// Adds to the selected slot; a validation error when nothing is selected.
    pub fn add_to_selected_slot(&mut self, item_id: &str) -> Result<CmdResult> {
        let slot_id = self
            .selected_slot
            .clone()
            .ok_or_else(|| SupporgError::validation("Select a slot first."))?;
        self.add_to_slot(&slot_id, item_id)
    }

    pub fn add_to_default_slot(&mut self, item_id: &str) -> Result<CmdResult> {
        let result = plan::add_to_default_slot(&mut self.doc, self.current_date, item_id)?;
        self.persisted(result)
    }

    pub fn remove_from_slot(&mut self, slot_id: &str, item_id: &str) -> Result<CmdResult> {
        let result = plan::remove_item(&mut self.doc, self.current_date, slot_id, item_id);
        self.persisted(result)
    }

    pub fn clear_slot(&mut self, slot_id: &str) -> Result<CmdResult> {
        let result = plan::clear_slot(&mut self.doc, self.current_date, slot_id);
        self.persisted(result)
    }

    // --- slots ---------------------------------------------------------

    pub fn create_slot(&mut self, name: &str) -> Result<CmdResult> {
        let result = slots::create_slot(&mut self.doc, name)?;
        plan::ensure_plan(&mut self.doc, self.current_date);
        self.persisted(result)
    }

    pub fn rename_slot(&mut self, slot_id: &str, name: &str) -> Result<CmdResult> {
        let result = slots::rename_slot(&mut self.doc, slot_id, name)?;
        self.persisted(result)
    }

    pub fn delete_slot(&mut self, slot_id: &str) -> Result<CmdResult> {
        let result = slots::delete_slot(&mut self.doc, slot_id)?;
        if self.selected_slot.as_deref() == Some(slot_id) {
            self.selected_slot = None;
        }
        plan::ensure_plan(&mut self.doc, self.current_date);
        self.persisted(result)
    }

    // --- catalog -------------------------------------------------------

    /// Creates a supplement; one with a matching default slot is placed on
    /// the current date as well.
    pub fn create_item(&mut self, draft: SupplementDraft) -> Result<CmdResult> {
        let result = catalog::create_item(&mut self.doc, draft, self.current_date)?;
        self.persisted(result)
    }

    pub fn update_item(&mut self, item_id: &str, draft: SupplementDraft) -> Result<CmdResult> {
        let result = catalog::update_item(&mut self.doc, item_id, draft)?;
        self.persisted(result)
    }

    /// Deletes a supplement and, in the same save, every plan entry and
    /// rule that mentions it.
    pub fn delete_item(&mut self, item_id: &str) -> Result<CmdResult> {
        let result = catalog::delete_item(&mut self.doc, item_id)?;
        self.persisted(result)
    }

    pub fn get_item(&self, item_id: &str) -> Result<&Supplement> {
        catalog::get_item(&self.doc, item_id)
    }

    pub fn search_items(&self, query: &str) -> Vec<Supplement> {
        catalog::search_items(&self.doc, query)
    }

    // --- rules ---------------------------------------------------------

    pub fn add_rule(
        &mut self,
        a_id: &str,
        b_id: &str,
        kind: RuleKind,
        text: &str,
    ) -> Result<CmdResult> {
        let result = rules::add_rule(&mut self.doc, a_id, b_id, kind, text)?;
        self.persisted(result)
    }

    pub fn delete_rule(&mut self, rule_id: &str) -> Result<CmdResult> {
        let result = rules::delete_rule(&mut self.doc, rule_id);
        self.persisted(result)
    }

    pub fn delete_all_rules(&mut self) -> Result<CmdResult> {
        let result = rules::delete_all_rules(&mut self.doc);
        self.persisted(result)
    }

    pub fn find_rules_for_pair(&self, a_id: &str, b_id: &str) -> Vec<Rule> {
        rules::find_rules_for_pair(&self.doc, a_id, b_id)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn check_selection<I, T>(&self, selection: I) -> SelectionCheck
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        rules::check_selection(&self.doc, selection)
    }

    pub fn list_rules(&self) -> Vec<RuleMatch> {
        rules::list_rules(&self.doc)
    }

    // --- appointments --------------------------------------------------

    pub fn create_appointment(&mut self, draft: AppointmentDraft) -> Result<CmdResult> {
        let result = appointments::create_appointment(&mut self.doc, draft)?;
        self.persisted(result)
    }

    pub fn update_appointment(&mut self, id: &str, draft: AppointmentDraft) -> Result<CmdResult> {
        let result = appointments::update_appointment(&mut self.doc, id, draft)?;
        self.persisted(result)
    }

    pub fn delete_appointment(&mut self, id: &str) -> Result<CmdResult> {
        let result = appointments::delete_appointment(&mut self.doc, id)?;
        self.persisted(result)
    }

    pub fn get_appointment(&self, id: &str) -> Result<&Appointment> {
        appointments::get_appointment(&self.doc, id)
    }

    pub fn appointments_for_day(&self, date: NaiveDate) -> Vec<Appointment> {
        appointments::appointments_for_day(&self.doc, date)
    }

    pub fn appointment_days(&self, year: i32, month: u32) -> BTreeSet<u32> {
        appointments::appointment_days(&self.doc, year, month)
    }

    // --- backup --------------------------------------------------------

    pub fn export(&self) -> Result<String> {
        backup::export(&self.doc)
    }

    /// Replaces the whole document with a validated backup. A rejected file
    /// changes nothing.
    pub fn import(&mut self, raw: &str) -> Result<()> {
        let doc = backup::import(raw)?;
        self.doc = doc;
        let stale = self
            .selected_slot
            .as_deref()
            .is_some_and(|id| self.doc.slot(id).is_none());
        if stale {
            self.selected_slot = None;
        }
        plan::ensure_plan(&mut self.doc, self.current_date);
        self.persist()
    }

    // --- selectors -----------------------------------------------------

    /// Resolves positions (`3`, `1-4`), ids and names to supplement ids.
    pub fn resolve_items<I: AsRef<str>>(&self, inputs: &[I]) -> Result<Vec<ItemId>> {
        selector::resolve_items(&self.doc, inputs)
    }

    pub fn resolve_item(&self, input: &str) -> Result<ItemId> {
        let mut ids = self.resolve_items(&[input])?;
        match ids.len() {
            1 => Ok(ids.remove(0)),
            n => Err(SupporgError::Api(format!(
                "Expected one supplement, {} selected",
                n
            ))),
        }
    }

    pub fn resolve_slot(&self, input: &str) -> Result<SlotId> {
        selector::resolve_slot(&self.doc, input)
    }

    /// Supplements in listing order (the order positions refer to).
    pub fn items(&self) -> Vec<Supplement> {
        catalog::sorted_items(&self.doc)
    }
}

pub use crate::commands::plan::SlotEntry;
pub use crate::commands::{CmdMessage, MessageLevel};
