//! Dispatch from parsed arguments to the API, one `handle_*` per command.
//!
//! Handlers resolve selectors, call the facade, and print what comes back.
//! Anything that fails is returned as a [`SupporgError`] and reported by
//! `main` on stderr.

use super::render::{
    render_appointments, render_cache_status, render_check, render_config, render_day,
    render_item, render_item_list, render_messages, render_month, render_rules, render_slots,
    render_weather,
};
use super::setup::{
    ApptCommands, ApptFields, BackupCommands, CacheCommands, Cli, Commands, ItemCommands,
    ItemFields, PlanCommands, RuleCommands, SlotCommands, WeatherCommands,
};
use chrono::{Datelike, NaiveDate, Utc};
use clap::Parser;
use console::Term;
use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use supporg::api::CmdMessage;
use supporg::cache::fs::FsCacheStorage;
use supporg::cache::http::HttpNetwork;
use supporg::cache::{ResourceCache, WorkerState};
use supporg::commands::backup::backup_file_name;
use supporg::commands::rules::{RuleMatch, SelectionCheck};
use supporg::error::{Result, SupporgError};
use supporg::init::{initialize, resolve_data_dir, SupporgContext, DATA_DIR_ENV};
use supporg::model::{parse_tags, today, AppointmentDraft, RuleKind, Supplement, SupplementDraft};
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log filter override, e.g. `SUPPORG_LOG=supporg=debug`.
const LOG_ENV: &str = "SUPPORG_LOG";

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let data_dir = resolve_data_dir(std::env::var(DATA_DIR_ENV).ok().as_deref())?;
    let mut ctx = initialize(&data_dir);

    match cli.command {
        Some(Commands::Item(cmd)) => match cmd {
            ItemCommands::Add { name, fields } => handle_item_add(&mut ctx, name, fields),
            ItemCommands::Edit { item, name, fields } => {
                handle_item_edit(&mut ctx, &item, name, fields)
            }
            ItemCommands::Rm { items } => handle_item_rm(&mut ctx, &items),
            ItemCommands::List { search } => handle_item_list(&ctx, search.as_deref()),
            ItemCommands::Show { item } => handle_item_show(&ctx, &item),
            ItemCommands::Place { item, date } => handle_item_place(&mut ctx, &item, date),
        },
        Some(Commands::Slot(cmd)) => match cmd {
            SlotCommands::Add { name } => {
                let result = ctx.api.create_slot(&name)?;
                print_messages(&result.messages);
                Ok(())
            }
            SlotCommands::Rename { slot, name } => handle_slot_rename(&mut ctx, &slot, &name),
            SlotCommands::Rm { slot, yes } => handle_slot_rm(&mut ctx, &slot, yes),
            SlotCommands::List => {
                print!("{}", render_slots(ctx.api.document().slots()));
                Ok(())
            }
            SlotCommands::Clear { slot, date } => handle_slot_clear(&mut ctx, &slot, date),
        },
        Some(Commands::Plan(cmd)) => match cmd {
            PlanCommands::Show { date } => handle_plan_show(&mut ctx, date),
            PlanCommands::Add { slot, items, date } => {
                handle_plan_add(&mut ctx, &slot, &items, date)
            }
            PlanCommands::Remove { slot, items, date } => {
                handle_plan_remove(&mut ctx, &slot, &items, date)
            }
        },
        Some(Commands::Rule(cmd)) => match cmd {
            RuleCommands::Add { a, b, kind, text } => {
                handle_rule_add(&mut ctx, &a, &b, kind, &text.join(" "))
            }
            RuleCommands::Rm { rule } => handle_rule_rm(&mut ctx, &rule),
            RuleCommands::Clear { yes } => handle_rule_clear(&mut ctx, yes),
            RuleCommands::List => {
                print!("{}", render_rules(&ctx.api.list_rules()));
                Ok(())
            }
            RuleCommands::Check { items, slot, date } => {
                handle_rule_check(&mut ctx, &items, slot.as_deref(), date)
            }
            RuleCommands::Pair { a, b } => handle_rule_pair(&ctx, &a, &b),
        },
        Some(Commands::Appt(cmd)) => match cmd {
            ApptCommands::Add {
                title,
                date,
                fields,
            } => handle_appt_add(&mut ctx, title, date, fields),
            ApptCommands::Edit {
                id,
                title,
                date,
                fields,
            } => handle_appt_edit(&mut ctx, &id, title, date, fields),
            ApptCommands::Rm { id } => {
                let result = ctx.api.delete_appointment(&id)?;
                print_messages(&result.messages);
                Ok(())
            }
            ApptCommands::Day { date } => {
                let date = date.unwrap_or_else(today);
                let appointments = ctx.api.appointments_for_day(date);
                print!("{}", render_appointments(date, &appointments));
                Ok(())
            }
            ApptCommands::Month { month } => handle_appt_month(&ctx, month),
        },
        Some(Commands::Backup(cmd)) => match cmd {
            BackupCommands::Export { output } => handle_export(&ctx, output.as_deref()),
            BackupCommands::Import { path } => handle_import(&mut ctx, &path),
        },
        Some(Commands::Cache(cmd)) => handle_cache(&ctx, cmd),
        Some(Commands::Weather(cmd)) => handle_weather(&ctx, cmd),
        Some(Commands::Config { key, value }) => handle_config(&mut ctx, key, value),
        None => handle_plan_show(&mut ctx, None),
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}

fn print_messages(messages: &[CmdMessage]) {
    print!("{}", render_messages(messages));
}

/// Asks on the terminal unless `yes` is set. Without a terminal the
/// action is refused rather than assumed.
fn confirm(prompt: &str, yes: bool) -> Result<bool> {
    if yes {
        return Ok(true);
    }
    let term = Term::stderr();
    if !term.is_term() {
        return Err(SupporgError::Api(format!(
            "{} Pass --yes to confirm.",
            prompt
        )));
    }
    term.write_str(&format!("{} [y/N] ", prompt))?;
    let answer = term.read_line()?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn move_to(ctx: &mut SupporgContext, date: Option<NaiveDate>) {
    if let Some(date) = date {
        ctx.api.set_date(date);
    }
}

// --- items ---------------------------------------------------------------

fn apply_item_fields(draft: &mut SupplementDraft, fields: ItemFields) {
    if fields.dose.is_some() {
        draft.dose = fields.dose;
    }
    if fields.form.is_some() {
        draft.form = fields.form;
    }
    if fields.notes.is_some() {
        draft.notes = fields.notes;
    }
    if let Some(tags) = fields.tags {
        draft.tags = parse_tags(&tags);
    }
    if fields.photo.is_some() {
        draft.photo_ref = fields.photo;
    }
    if fields.default_slot.is_some() {
        draft.default_slot_name = fields.default_slot;
    }
    if fields.frequency.is_some() {
        draft.frequency = fields.frequency;
    }
}

fn draft_from(item: &Supplement) -> SupplementDraft {
    SupplementDraft {
        name: item.name.clone(),
        dose: item.dose.clone(),
        form: item.form.clone(),
        notes: item.notes.clone(),
        tags: item.tags.clone(),
        photo_ref: item.photo_ref.clone(),
        default_slot_name: item.default_slot_name.clone(),
        frequency: Some(item.frequency.clone()),
    }
}

fn handle_item_add(ctx: &mut SupporgContext, name: String, fields: ItemFields) -> Result<()> {
    let mut draft = SupplementDraft::named(name);
    apply_item_fields(&mut draft, fields);
    let result = ctx.api.create_item(draft)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_item_edit(
    ctx: &mut SupporgContext,
    selector: &str,
    name: Option<String>,
    fields: ItemFields,
) -> Result<()> {
    let id = ctx.api.resolve_item(selector)?;
    let mut draft = draft_from(ctx.api.get_item(&id)?);
    if let Some(name) = name {
        draft.name = name;
    }
    apply_item_fields(&mut draft, fields);
    let result = ctx.api.update_item(&id, draft)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_item_rm(ctx: &mut SupporgContext, selectors: &[String]) -> Result<()> {
    let ids = ctx.api.resolve_items(selectors)?;
    for id in ids {
        let result = ctx.api.delete_item(&id)?;
        print_messages(&result.messages);
    }
    Ok(())
}

fn handle_item_list(ctx: &SupporgContext, search: Option<&str>) -> Result<()> {
    let items = ctx.api.items();
    let matching: Option<BTreeSet<String>> =
        search.map(|q| ctx.api.search_items(q).into_iter().map(|s| s.id).collect());
    let entries: Vec<(usize, &Supplement)> = items
        .iter()
        .enumerate()
        .filter(|(_, item)| matching.as_ref().map_or(true, |ids| ids.contains(&item.id)))
        .map(|(i, item)| (i + 1, item))
        .collect();
    print!("{}", render_item_list(&entries));
    Ok(())
}

fn handle_item_show(ctx: &SupporgContext, selector: &str) -> Result<()> {
    let id = ctx.api.resolve_item(selector)?;
    print!("{}", render_item(ctx.api.get_item(&id)?));
    Ok(())
}

fn handle_item_place(
    ctx: &mut SupporgContext,
    selector: &str,
    date: Option<NaiveDate>,
) -> Result<()> {
    move_to(ctx, date);
    let id = ctx.api.resolve_item(selector)?;
    let result = ctx.api.add_to_default_slot(&id)?;
    print_messages(&result.messages);
    Ok(())
}

// --- slots ---------------------------------------------------------------

fn handle_slot_rename(ctx: &mut SupporgContext, slot: &str, name: &str) -> Result<()> {
    let id = ctx.api.resolve_slot(slot)?;
    let result = ctx.api.rename_slot(&id, name)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_slot_rm(ctx: &mut SupporgContext, slot: &str, yes: bool) -> Result<()> {
    let id = ctx.api.resolve_slot(slot)?;
    let name = ctx
        .api
        .document()
        .slot(&id)
        .map(|s| s.name.clone())
        .unwrap_or_default();
    let prompt = format!("Delete slot '{}' and its entries on every date?", name);
    if !confirm(&prompt, yes)? {
        println!("Aborted.");
        return Ok(());
    }
    let result = ctx.api.delete_slot(&id)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_slot_clear(ctx: &mut SupporgContext, slot: &str, date: Option<NaiveDate>) -> Result<()> {
    move_to(ctx, date);
    let id = ctx.api.resolve_slot(slot)?;
    let result = ctx.api.clear_slot(&id)?;
    print_messages(&result.messages);
    Ok(())
}

// --- plan ----------------------------------------------------------------

fn handle_plan_show(ctx: &mut SupporgContext, date: Option<NaiveDate>) -> Result<()> {
    move_to(ctx, date);
    print!("{}", render_day(&ctx.api.day_view()));
    Ok(())
}

fn handle_plan_add(
    ctx: &mut SupporgContext,
    slot: &str,
    selectors: &[String],
    date: Option<NaiveDate>,
) -> Result<()> {
    move_to(ctx, date);
    let slot_id = ctx.api.resolve_slot(slot)?;
    let ids = ctx.api.resolve_items(selectors)?;
    ctx.api.select_slot(&slot_id)?;
    for id in ids {
        let result = ctx.api.add_to_selected_slot(&id)?;
        print_messages(&result.messages);
    }
    Ok(())
}

fn handle_plan_remove(
    ctx: &mut SupporgContext,
    slot: &str,
    selectors: &[String],
    date: Option<NaiveDate>,
) -> Result<()> {
    move_to(ctx, date);
    let slot_id = ctx.api.resolve_slot(slot)?;
    let ids = ctx.api.resolve_items(selectors)?;
    for id in ids {
        let result = ctx.api.remove_from_slot(&slot_id, &id)?;
        print_messages(&result.messages);
    }
    Ok(())
}

// --- rules ---------------------------------------------------------------

fn handle_rule_add(
    ctx: &mut SupporgContext,
    a: &str,
    b: &str,
    kind: RuleKind,
    text: &str,
) -> Result<()> {
    let a_id = ctx.api.resolve_item(a)?;
    let b_id = ctx.api.resolve_item(b)?;
    let result = ctx.api.add_rule(&a_id, &b_id, kind, text)?;
    print_messages(&result.messages);
    Ok(())
}

/// Accepts a rule id or its 1-based position in `rule list`.
fn handle_rule_rm(ctx: &mut SupporgContext, rule: &str) -> Result<()> {
    let listed = ctx.api.list_rules();
    let id = match rule.parse::<usize>() {
        Ok(n) if (1..=listed.len()).contains(&n) => listed[n - 1].rule.id.clone(),
        _ => rule.to_string(),
    };
    let result = ctx.api.delete_rule(&id)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_rule_clear(ctx: &mut SupporgContext, yes: bool) -> Result<()> {
    let count = ctx.api.document().rules().len();
    if count == 0 {
        println!("No rules to delete.");
        return Ok(());
    }
    if !confirm(&format!("Delete all {} rule(s)?", count), yes)? {
        println!("Aborted.");
        return Ok(());
    }
    let result = ctx.api.delete_all_rules()?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_rule_check(
    ctx: &mut SupporgContext,
    selectors: &[String],
    slot: Option<&str>,
    date: Option<NaiveDate>,
) -> Result<()> {
    move_to(ctx, date);
    let mut ids = ctx.api.resolve_items(selectors)?;
    if let Some(slot) = slot {
        let slot_id = ctx.api.resolve_slot(slot)?;
        if let Some(entry) = ctx.api.day_view().slot(&slot_id) {
            ids.extend(entry.items.iter().map(|item| item.id.clone()));
        }
    }
    debug!(count = ids.len(), "checking selection");
    print!("{}", render_check(&ctx.api.check_selection(&ids)));
    Ok(())
}

fn handle_rule_pair(ctx: &SupporgContext, a: &str, b: &str) -> Result<()> {
    let a_id = ctx.api.resolve_item(a)?;
    let b_id = ctx.api.resolve_item(b)?;
    let doc = ctx.api.document();
    let matches: Vec<RuleMatch> = ctx
        .api
        .find_rules_for_pair(&a_id, &b_id)
        .into_iter()
        .map(|rule| RuleMatch {
            a_name: doc.supplement_name(&rule.a_id),
            b_name: doc.supplement_name(&rule.b_id),
            rule,
        })
        .collect();
    if matches.is_empty() {
        println!("No rules for this pair.");
    } else {
        print!("{}", render_check(&SelectionCheck::Checked(matches)));
    }
    Ok(())
}

// --- appointments --------------------------------------------------------

fn handle_appt_add(
    ctx: &mut SupporgContext,
    title: String,
    date: Option<NaiveDate>,
    fields: ApptFields,
) -> Result<()> {
    let mut draft = AppointmentDraft::new(title, date.unwrap_or_else(today));
    draft.time = fields.time;
    draft.location = fields.location;
    draft.notes = fields.notes;
    let result = ctx.api.create_appointment(draft)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_appt_edit(
    ctx: &mut SupporgContext,
    id: &str,
    title: Option<String>,
    date: Option<NaiveDate>,
    fields: ApptFields,
) -> Result<()> {
    let existing = ctx.api.get_appointment(id)?.clone();
    let draft = AppointmentDraft {
        title: title.unwrap_or(existing.title),
        date: date.unwrap_or(existing.date),
        time: fields.time.or(existing.time),
        location: fields.location.or(existing.location),
        notes: fields.notes.or(existing.notes),
    };
    let result = ctx.api.update_appointment(id, draft)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_appt_month(ctx: &SupporgContext, month: Option<(i32, u32)>) -> Result<()> {
    let now = today();
    let (year, month) = month.unwrap_or((now.year(), now.month()));
    let days = ctx.api.appointment_days(year, month);
    print!("{}", render_month(year, month, &days, now));
    Ok(())
}

// --- backup --------------------------------------------------------------

fn handle_export(ctx: &SupporgContext, output: Option<&str>) -> Result<()> {
    let json = ctx.api.export()?;
    let path = match output {
        Some("-") => {
            println!("{}", json);
            return Ok(());
        }
        Some(path) => path.to_string(),
        None => backup_file_name(today()),
    };
    fs::write(&path, json)?;
    print_messages(&[CmdMessage::success(format!("Backup written to {}", path))]);
    Ok(())
}

fn handle_import(ctx: &mut SupporgContext, path: &str) -> Result<()> {
    let raw = fs::read_to_string(path)?;
    ctx.api.import(&raw)?;
    let doc = ctx.api.document();
    print_messages(&[CmdMessage::success(format!(
        "Backup imported: {} supplement(s), {} slot(s), {} rule(s).",
        doc.supplements().len(),
        doc.slots().len(),
        doc.rules().len()
    ))]);
    Ok(())
}

// --- cache ---------------------------------------------------------------

fn open_cache(ctx: &SupporgContext) -> Result<ResourceCache<FsCacheStorage, HttpNetwork>> {
    let cache = ResourceCache::resume(
        ctx.cache_storage(),
        HttpNetwork::new()?,
        ctx.config.manifest(),
        &ctx.config.cache_origin,
    )?;
    Ok(cache)
}

fn handle_cache(ctx: &SupporgContext, cmd: CacheCommands) -> Result<()> {
    let mut cache = open_cache(ctx)?;
    match cmd {
        CacheCommands::Install => {
            match cache.state() {
                WorkerState::Activated => {
                    println!("Generation {} is already installed.", cache.version());
                    return Ok(());
                }
                WorkerState::Installed => {
                    println!(
                        "Generation {} is already installed, run `supporg cache activate`.",
                        cache.version()
                    );
                    return Ok(());
                }
                _ => {}
            }
            cache.install()?;
            print_messages(&[CmdMessage::success(format!(
                "Installed {} ({} resources).",
                cache.version(),
                ctx.config.cache_manifest.len()
            ))]);
        }
        CacheCommands::Activate => {
            if cache.state() == WorkerState::Activated {
                println!("Generation {} is already active.", cache.version());
                return Ok(());
            }
            let removed = cache.activate()?;
            let mut messages = vec![CmdMessage::success(format!(
                "Activated {}.",
                cache.version()
            ))];
            if !removed.is_empty() {
                messages.push(CmdMessage::info(format!("Removed {}", removed.join(", "))));
            }
            print_messages(&messages);
        }
        CacheCommands::Fetch { path, output } => {
            let response = cache.fetch_path(&path)?;
            match output {
                Some(out) => fs::write(out, &response.body)?,
                None => std::io::stdout().write_all(&response.body)?,
            }
        }
        CacheCommands::Status => print!("{}", render_cache_status(&cache.status()?)),
    }
    Ok(())
}

// --- weather / config ----------------------------------------------------

fn handle_weather(ctx: &SupporgContext, cmd: WeatherCommands) -> Result<()> {
    let mut weather = ctx.weather();
    match cmd {
        WeatherCommands::Show => {
            print!("{}", render_weather(weather.city(), weather.snapshot(), Utc::now()));
        }
        WeatherCommands::City { name: Some(name) } => {
            weather.set_city(&name);
            print_messages(&[CmdMessage::success(format!("City set to {}", weather.city()))]);
        }
        WeatherCommands::City { name: None } => println!("{}", weather.city()),
    }
    Ok(())
}

fn handle_config(
    ctx: &mut SupporgContext,
    key: Option<String>,
    value: Option<String>,
) -> Result<()> {
    match (key, value) {
        (None, _) => print!("{}", render_config(&ctx.config.entries())),
        (Some(key), None) => {
            let entries = ctx.config.entries();
            let (_, value) = entries
                .iter()
                .find(|(k, _)| *k == key)
                .ok_or_else(|| SupporgError::validation(format!("Unknown config key: {}", key)))?;
            println!("{}", value);
        }
        (Some(key), Some(value)) => {
            ctx.config.set(&key, &value)?;
            ctx.config.save(&ctx.data_dir)?;
            print_messages(&[CmdMessage::success(format!("{} updated", key))]);
        }
    }
    Ok(())
}
