//! # Selectors
//!
//! Users refer to supplements and slots in three ways:
//!
//! - a 1-based position: `3` is the third entry of the listing (the
//!   name-sorted catalog for supplements, definition order for slots)
//! - a position range: `2-4` expands to `2`, `3`, `4`
//! - any other text: matched against ids first, then against names
//!   case-insensitively
//!
//! Positions are only a view concern. Everything below the API works with
//! ids, so a selector is resolved once, up front, and never stored.

use crate::commands::catalog::sorted_items;
use crate::error::{Result, SupporgError};
use crate::model::{Document, ItemId, SlotId, Supplement};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Position(usize),
    Text(String),
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Selector::Position(n) => write!(f, "{}", n),
            Selector::Text(t) => write!(f, "\"{}\"", t),
        }
    }
}

impl FromStr for Selector {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("Empty selector".to_string());
        }
        match s.parse::<usize>() {
            Ok(0) => Err("Positions start at 1".to_string()),
            Ok(n) => Ok(Selector::Position(n)),
            Err(_) => Ok(Selector::Text(s.to_string())),
        }
    }
}

/// Parses one input that may be a single selector or a position range.
///
/// A dash only forms a range when both sides are positions, so names such
/// as "B-complex" stay text. A range may not end past `listed`, the number
/// of entries it selects from.
pub fn parse_selector_or_range(
    s: &str,
    listed: usize,
) -> std::result::Result<Vec<Selector>, String> {
    if let Some((start, end)) = s.trim().split_once('-') {
        if let (Ok(a), Ok(b)) = (start.parse::<usize>(), end.parse::<usize>()) {
            if a == 0 {
                return Err("Positions start at 1".to_string());
            }
            if a > b {
                return Err(format!(
                    "Invalid range: start ({}) must be <= end ({})",
                    a, b
                ));
            }
            if b > listed {
                return Err(format!("Position {} not found ({} listed)", b, listed));
            }
            return Ok((a..=b).map(Selector::Position).collect());
        }
    }
    Selector::from_str(s).map(|sel| vec![sel])
}

pub fn parse_selectors<I: AsRef<str>>(inputs: &[I], listed: usize) -> Result<Vec<Selector>> {
    let mut selectors = Vec::new();
    for input in inputs {
        selectors.extend(
            parse_selector_or_range(input.as_ref(), listed).map_err(SupporgError::Api)?,
        );
    }
    Ok(selectors)
}

fn resolve_in<'a, T>(
    entries: &'a [T],
    selector: &Selector,
    what: &str,
    id_of: impl Fn(&T) -> &str,
    name_of: impl Fn(&T) -> &str,
) -> Result<&'a T> {
    match selector {
        Selector::Position(n) => entries.get(n - 1).ok_or_else(|| {
            SupporgError::Api(format!("{} {} not found ({} listed)", what, n, entries.len()))
        }),
        Selector::Text(text) => {
            if let Some(hit) = entries.iter().find(|e| id_of(*e) == text.as_str()) {
                return Ok(hit);
            }
            let wanted = text.to_lowercase();
            let hits: Vec<&T> = entries
                .iter()
                .filter(|e| name_of(*e).to_lowercase() == wanted)
                .collect();
            match hits.as_slice() {
                [one] => Ok(*one),
                [] => Err(SupporgError::Api(format!("No {} matches {}", what, selector))),
                many => Err(SupporgError::Api(format!(
                    "{} {}s match {}, use a position or id",
                    many.len(),
                    what,
                    selector
                ))),
            }
        }
    }
}

/// Resolves one selector to a supplement id.
pub fn resolve_item(doc: &Document, selector: &Selector) -> Result<ItemId> {
    let items = sorted_items(doc);
    resolve_supplement(&items, selector)
}

fn resolve_supplement(items: &[Supplement], selector: &Selector) -> Result<ItemId> {
    resolve_in(
        items,
        selector,
        "supplement",
        |s| s.id.as_str(),
        |s| s.name.as_str(),
    )
    .map(|s| s.id.clone())
}

/// Resolves raw inputs (ranges allowed) to supplement ids, in input order.
pub fn resolve_items<I: AsRef<str>>(doc: &Document, inputs: &[I]) -> Result<Vec<ItemId>> {
    let items = sorted_items(doc);
    parse_selectors(inputs, items.len())?
        .iter()
        .map(|sel| resolve_supplement(&items, sel))
        .collect()
}

pub fn resolve_slot(doc: &Document, input: &str) -> Result<SlotId> {
    let selector = Selector::from_str(input).map_err(SupporgError::Api)?;
    resolve_in(
        doc.slots(),
        &selector,
        "slot",
        |s| s.id.as_str(),
        |s| s.name.as_str(),
    )
    .map(|s| s.id.clone())
}
