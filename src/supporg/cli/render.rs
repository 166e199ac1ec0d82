//! # Rendering
//!
//! Every function here turns library data into a `String` for the terminal.
//! Layout math (width, truncation, padding) is Unicode-aware; colors come
//! from `colored` and switch off on their own when stdout is not a terminal.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use colored::Colorize;
use std::collections::BTreeSet;
use supporg::api::{CmdMessage, MessageLevel};
use supporg::cache::{CacheStatus, WorkerState};
use supporg::commands::plan::DayView;
use supporg::commands::rules::{RuleMatch, SelectionCheck};
use supporg::model::{Appointment, RuleKind, Slot, Supplement};
use supporg::weather::WeatherSnapshot;
use timeago::Formatter;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

pub const LINE_WIDTH: usize = 100;
const TIME_WIDTH: usize = 14;
const INDEX_WIDTH: usize = 5;

pub fn render_messages(messages: &[CmdMessage]) -> String {
    let mut out = String::new();
    for message in messages {
        let line = match message.level {
            MessageLevel::Info => message.content.dimmed(),
            MessageLevel::Success => message.content.green(),
            MessageLevel::Warning => message.content.yellow(),
            MessageLevel::Error => message.content.red(),
        };
        out.push_str(&format!("{}\n", line));
    }
    out
}

/// Catalog lines, each with the position selectors refer to.
pub fn render_item_list(entries: &[(usize, &Supplement)]) -> String {
    if entries.is_empty() {
        return "No supplements found.\n".to_string();
    }
    let mut out = String::new();
    for (position, item) in entries {
        let idx = format!("{:>width$}. ", position, width = INDEX_WIDTH - 2);
        let mut text = item.name.clone();
        let subtitle = item.subtitle();
        if !subtitle.is_empty() {
            text.push_str("  ");
            text.push_str(&subtitle);
        }
        if !item.tags.is_empty() {
            text.push_str("  #");
            text.push_str(&item.tags.join(" #"));
        }
        let available = LINE_WIDTH.saturating_sub(idx.width());
        out.push_str(&format!(
            "{}{}\n",
            idx.yellow(),
            truncate_to_width(&text, available)
        ));
    }
    out
}

pub fn render_item(item: &Supplement) -> String {
    let mut out = format!("{}\n", item.name.bold());
    let rows = [
        ("Dose", item.dose.as_deref()),
        ("Form", item.form.as_deref()),
        ("Slot", item.default_slot_name.as_deref()),
        ("Frequency", Some(item.frequency.as_str())),
        ("Notes", item.notes.as_deref()),
        ("Photo", item.photo_ref.as_deref()),
    ];
    for (label, value) in rows {
        if let Some(value) = value {
            out.push_str(&format!("  {:<10} {}\n", label.dimmed(), value));
        }
    }
    if !item.tags.is_empty() {
        out.push_str(&format!("  {:<10} {}\n", "Tags".dimmed(), item.tags.join(", ")));
    }
    out.push_str(&format!("  {:<10} {}\n", "Id".dimmed(), item.id.dimmed()));
    out
}

pub fn render_slots(slots: &[Slot]) -> String {
    if slots.is_empty() {
        return "No slots.\n".to_string();
    }
    slots
        .iter()
        .enumerate()
        .map(|(i, slot)| format!("{:>3}. {}\n", i + 1, slot.name))
        .collect()
}

pub fn render_day(view: &DayView) -> String {
    let mut out = format!(
        "{}\n",
        view.date.format("%A, %B %-d, %Y").to_string().bold()
    );
    for entry in &view.slots {
        out.push('\n');
        out.push_str(&format!(
            "{} {}\n",
            entry.slot.name.cyan().bold(),
            format!("({})", entry.items.len()).dimmed()
        ));
        if entry.items.is_empty() {
            out.push_str(&format!("    {}\n", "—".dimmed()));
        }
        for item in &entry.items {
            let subtitle = item.subtitle();
            let line = if subtitle.is_empty() {
                item.name.clone()
            } else {
                format!("{}  {}", item.name, subtitle)
            };
            out.push_str(&format!("    {}\n", truncate_to_width(&line, LINE_WIDTH - 4)));
        }
    }
    out
}

fn kind_label(kind: RuleKind) -> String {
    let label = kind.label();
    match kind {
        RuleKind::Avoid => label.red().to_string(),
        RuleKind::Space => label.yellow().to_string(),
        RuleKind::Note => label.blue().to_string(),
    }
}

fn rule_line(m: &RuleMatch) -> String {
    format!("{} + {}  {}: {}", m.a_name, m.b_name, kind_label(m.rule.kind), m.rule.text)
}

/// Rules with their `rule rm` positions and age.
pub fn render_rules(rules: &[RuleMatch]) -> String {
    if rules.is_empty() {
        return "No rules yet.\n".to_string();
    }
    let mut out = String::new();
    for (i, m) in rules.iter().enumerate() {
        let idx = format!("{:>3}. ", i + 1);
        let line = format!(
            "{} + {}  {}: {}",
            m.a_name,
            m.b_name,
            m.rule.kind.label(),
            m.rule.text
        );
        let available = LINE_WIDTH.saturating_sub(idx.width() + TIME_WIDTH);
        let line = truncate_to_width(&line, available);
        let padding = available.saturating_sub(line.width());
        out.push_str(&format!(
            "{}{}{}{}\n",
            idx.yellow(),
            line,
            " ".repeat(padding),
            format_time_ago(m.rule.created_at).dimmed()
        ));
    }
    out
}

pub fn render_check(check: &SelectionCheck) -> String {
    match check {
        SelectionCheck::Insufficient => "Select at least two supplements to check.\n".to_string(),
        SelectionCheck::Checked(matches) if matches.is_empty() => {
            format!("{}\n", "No rules apply to this selection.".green())
        }
        SelectionCheck::Checked(matches) => matches
            .iter()
            .map(|m| format!("  {}\n", rule_line(m)))
            .collect(),
    }
}

pub fn render_appointments(date: NaiveDate, appointments: &[Appointment]) -> String {
    let mut out = format!("{}\n", date.format("%A, %B %-d, %Y").to_string().bold());
    if appointments.is_empty() {
        out.push_str("No appointments.\n");
        return out;
    }
    for appt in appointments {
        let time = appt.time.as_deref().unwrap_or("--:--");
        out.push_str(&format!("  {}  {}", time.cyan(), appt.title));
        if let Some(location) = &appt.location {
            out.push_str(&format!(" @ {}", location));
        }
        out.push_str(&format!("  {}\n", appt.id.dimmed()));
        if let Some(notes) = &appt.notes {
            out.push_str(&format!("         {}\n", notes.dimmed()));
        }
    }
    out
}

/// Sunday-first month grid; days with appointments are marked with `*`.
pub fn render_month(year: i32, month: u32, marked: &BTreeSet<u32>, today: NaiveDate) -> String {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return String::new();
    };
    let mut out = format!("{}\n", first.format("%B %Y").to_string().bold());
    out.push_str(" Sun  Mon  Tue  Wed  Thu  Fri  Sat\n");

    let lead = first.weekday().num_days_from_sunday() as usize;
    out.push_str(&"     ".repeat(lead));
    let mut col = lead;

    let mut day = first;
    while day.month() == month {
        let mark = if marked.contains(&day.day()) { "*" } else { " " };
        let cell = format!("{:>3}{} ", day.day(), mark);
        if day == today {
            out.push_str(&cell.reversed().to_string());
        } else if mark == "*" {
            out.push_str(&cell.green().to_string());
        } else {
            out.push_str(&cell);
        }
        col += 1;
        if col % 7 == 0 {
            out.push('\n');
        }
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    if col % 7 != 0 {
        out.push('\n');
    }
    out
}

pub fn render_cache_status(status: &CacheStatus) -> String {
    let state = match status.state {
        WorkerState::Activated => status.state.to_string().green(),
        WorkerState::Redundant => status.state.to_string().red(),
        _ => status.state.to_string().yellow(),
    };
    let mut out = format!("State:   {}\nVersion: {}\n", state, status.version);
    if status.generations.is_empty() {
        out.push_str("No cached generations.\n");
    }
    for (tag, count) in &status.generations {
        let marker = if *tag == status.version { "*" } else { " " };
        out.push_str(&format!("  {} {}  {}\n", marker, tag, format!("{} entries", count).dimmed()));
    }
    out
}

pub fn render_weather(city: &str, snapshot: Option<&WeatherSnapshot>, now: DateTime<Utc>) -> String {
    let mut out = format!("{}\n", city.bold());
    match snapshot {
        Some(s) => {
            out.push_str(&format!(
                "  {}  {}  {}\n",
                s.temperature_label(),
                s.description(),
                s.city_label.dimmed()
            ));
            out.push_str(&format!("  {}\n", s.updated_label(now).dimmed()));
        }
        None => out.push_str("  No saved weather yet.\n"),
    }
    out
}

pub fn render_config(entries: &[(&str, String)]) -> String {
    entries
        .iter()
        .map(|(key, value)| format!("{:<16} {}\n", key, value))
        .collect()
}

fn truncate_to_width(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }
    let mut result = String::new();
    let mut current_width = 0;
    for c in s.chars() {
        let char_width = c.width().unwrap_or(0);
        if current_width + char_width > max_width.saturating_sub(1) {
            result.push('…');
            return result;
        }
        result.push(c);
        current_width += char_width;
    }
    result
}

fn format_time_ago(timestamp: DateTime<Utc>) -> String {
    let duration = Utc::now().signed_duration_since(timestamp);
    let formatter = Formatter::new();
    let time_str = formatter.convert(duration.to_std().unwrap_or_default());
    format!("{:>width$}", time_str, width = TIME_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use supporg::model::Rule;

    fn plain() {
        colored::control::set_override(false);
    }

    fn item(name: &str, dose: Option<&str>) -> Supplement {
        Supplement {
            id: format!("supp_{}", name.to_lowercase()),
            name: name.to_string(),
            dose: dose.map(String::from),
            form: None,
            notes: None,
            tags: vec!["morning".to_string()],
            photo_ref: None,
            default_slot_name: None,
            frequency: "daily".to_string(),
        }
    }

    #[test]
    fn item_list_shows_positions_and_tags() {
        plain();
        let a = item("Iron", Some("18 mg"));
        let b = item("Zinc", None);
        let out = render_item_list(&[(1, &a), (2, &b)]);
        assert!(out.contains("  1. Iron  18 mg  #morning"));
        assert!(out.contains("  2. Zinc  #morning"));
        assert_eq!(render_item_list(&[]), "No supplements found.\n");
    }

    #[test]
    fn long_lines_are_truncated() {
        let long = "x".repeat(200);
        let out = truncate_to_width(&long, 10);
        assert_eq!(out.width(), 10);
        assert!(out.ends_with('…'));
        assert_eq!(truncate_to_width("short", 10), "short");
    }

    #[test]
    fn check_reports_each_outcome() {
        plain();
        assert!(render_check(&SelectionCheck::Insufficient).contains("at least two"));
        assert!(render_check(&SelectionCheck::Checked(vec![])).contains("No rules apply"));

        let m = RuleMatch {
            rule: Rule {
                id: "rule_1".into(),
                a_id: "A".into(),
                b_id: "B".into(),
                kind: RuleKind::Avoid,
                text: "Take 2h apart".into(),
                created_at: Utc::now() - Duration::hours(3),
            },
            a_name: "Calcium".into(),
            b_name: "Iron".into(),
        };
        let out = render_check(&SelectionCheck::Checked(vec![m.clone()]));
        assert!(out.contains("Calcium + Iron  Do not combine: Take 2h apart"));
        assert!(render_rules(&[m]).contains("3 hours ago"));
    }

    #[test]
    fn month_grid_starts_on_sunday() {
        plain();
        // May 2024 starts on a Wednesday.
        let marked = BTreeSet::from([15]);
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let out = render_month(2024, 5, &marked, today);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "May 2024");
        assert!(lines[2].starts_with(&" ".repeat(15)));
        assert!(lines[2].contains("  1  "));
        assert!(out.contains(" 15*"));
        assert!(out.contains(" 31 "));
    }

    #[test]
    fn cache_status_marks_current_generation() {
        plain();
        let status = CacheStatus {
            state: WorkerState::Installed,
            version: "v2".into(),
            generations: vec![("v1".into(), 7), ("v2".into(), 7)],
        };
        let out = render_cache_status(&status);
        assert!(out.contains("State:   installed"));
        assert!(out.contains("  * v2  7 entries"));
        assert!(out.contains("    v1  7 entries"));
    }
}
