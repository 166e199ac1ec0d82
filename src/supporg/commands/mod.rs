//! # Command Layer
//!
//! Pure business logic over a [`Document`](crate::model::Document). Every
//! function here takes the document by reference, validates its inputs
//! before touching anything, and reports what happened through a
//! [`CmdResult`]. Nothing in this layer persists, prints or reads the clock
//! for "today"; the API facade owns those concerns.
//!
//! - [`plan`]: materialization and item placement per date and slot
//! - [`slots`]: slot create/rename/delete with plan cascade
//! - [`catalog`]: supplement CRUD, search, delete cascade
//! - [`rules`]: canonical pairs, rule CRUD, selection checking
//! - [`appointments`]: calendar entries and day/month queries
//! - [`backup`]: whole-document export and validated import

use crate::model::{Appointment, Rule, Slot, Supplement};

pub mod appointments;
pub mod backup;
pub mod catalog;
pub mod plan;
pub mod rules;
pub mod slots;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

/// Outcome of a mutating command.
#[derive(Debug, Default)]
pub struct CmdResult {
    pub affected_items: Vec<Supplement>,
    pub affected_slots: Vec<Slot>,
    pub affected_rules: Vec<Rule>,
    pub affected_appointments: Vec<Appointment>,
    /// False when the command turned out to be a no-op.
    pub changed: bool,
    pub messages: Vec<CmdMessage>,
}

impl CmdResult {
    pub fn changed() -> Self {
        Self {
            changed: true,
            ..Self::default()
        }
    }

    pub fn unchanged(message: CmdMessage) -> Self {
        let mut result = Self::default();
        result.add_message(message);
        result
    }

    pub fn add_message(&mut self, message: CmdMessage) {
        self.messages.push(message);
    }

    pub fn with_message(mut self, message: CmdMessage) -> Self {
        self.messages.push(message);
        self
    }

    pub fn with_item(mut self, item: Supplement) -> Self {
        self.affected_items.push(item);
        self
    }

    pub fn with_slot(mut self, slot: Slot) -> Self {
        self.affected_slots.push(slot);
        self
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.affected_rules.push(rule);
        self
    }

    pub fn with_appointment(mut self, appointment: Appointment) -> Self {
        self.affected_appointments.push(appointment);
        self
    }

    /// Folds another result into this one.
    pub fn merge(&mut self, other: CmdResult) {
        self.affected_items.extend(other.affected_items);
        self.affected_slots.extend(other.affected_slots);
        self.affected_rules.extend(other.affected_rules);
        self.affected_appointments.extend(other.affected_appointments);
        self.changed |= other.changed;
        self.messages.extend(other.messages);
    }
}
