use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use supporg::model::RuleKind;

/// Parses `YYYY-MM-DD` or `today`.
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    if s.eq_ignore_ascii_case("today") {
        return Ok(supporg::model::today());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| format!("Invalid date '{}', expected YYYY-MM-DD", s))
}

/// Parses `YYYY-MM` into (year, month).
pub fn parse_month(s: &str) -> Result<(i32, u32), String> {
    let err = || format!("Invalid month '{}', expected YYYY-MM", s);
    let (year, month) = s.split_once('-').ok_or_else(err)?;
    let year: i32 = year.parse().map_err(|_| err())?;
    let month: u32 = month.parse().map_err(|_| err())?;
    if !(1..=12).contains(&month) {
        return Err(err());
    }
    Ok((year, month))
}

#[derive(Parser, Debug)]
#[command(name = "supporg", bin_name = "supporg", version)]
#[command(about = "Local-first supplements organizer", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true, help_heading = "Options")]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage the supplement catalog
    #[command(subcommand, display_order = 1)]
    Item(ItemCommands),

    /// Manage the daily slots
    #[command(subcommand, display_order = 2)]
    Slot(SlotCommands),

    /// Show or edit the plan of a date
    #[command(subcommand, display_order = 3)]
    Plan(PlanCommands),

    /// Manage pairwise rules and check selections against them
    #[command(subcommand, display_order = 4)]
    Rule(RuleCommands),

    /// Manage appointments
    #[command(subcommand, alias = "appointment", display_order = 5)]
    Appt(ApptCommands),

    /// Export or import a full backup
    #[command(subcommand, display_order = 6)]
    Backup(BackupCommands),

    /// Offline resource cache
    #[command(subcommand, display_order = 7)]
    Cache(CacheCommands),

    /// Saved weather snapshot and city
    #[command(subcommand, display_order = 8)]
    Weather(WeatherCommands),

    /// Get or set configuration
    #[command(display_order = 9)]
    Config {
        /// Configuration key (e.g. default_city)
        key: Option<String>,

        /// Value to set (if omitted, prints current value)
        value: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ItemCommands {
    /// Add a supplement and place it in today's plan
    #[command(alias = "new")]
    Add {
        name: String,

        #[command(flatten)]
        fields: ItemFields,
    },

    /// Edit a supplement (only the given fields change)
    #[command(alias = "e")]
    Edit {
        /// Position, id or name
        item: String,

        /// New name
        #[arg(long)]
        name: Option<String>,

        #[command(flatten)]
        fields: ItemFields,
    },

    /// Delete supplements, with their plan entries and rules
    #[command(alias = "delete")]
    Rm {
        /// Positions, ranges, ids or names (e.g. 1 3-4 Iron)
        #[arg(required = true, num_args = 1..)]
        items: Vec<String>,
    },

    /// List the catalog
    #[command(alias = "ls")]
    List {
        /// Only show supplements matching this text
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Show one supplement
    #[command(alias = "view")]
    Show { item: String },

    /// Place a supplement into its default slot on a date
    Place {
        item: String,

        #[arg(short, long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },
}

#[derive(clap::Args, Debug, Default)]
pub struct ItemFields {
    #[arg(long)]
    pub dose: Option<String>,

    #[arg(long)]
    pub form: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,

    /// Comma separated tags
    #[arg(long)]
    pub tags: Option<String>,

    /// Photo reference (data URL or path)
    #[arg(long)]
    pub photo: Option<String>,

    /// Slot name the supplement is placed into when added
    #[arg(long = "slot")]
    pub default_slot: Option<String>,

    /// Frequency label (default "daily")
    #[arg(long = "freq")]
    pub frequency: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum SlotCommands {
    /// Add a slot
    Add { name: String },

    /// Rename a slot
    Rename {
        /// Position, id or name of the slot
        slot: String,
        name: String,
    },

    /// Delete a slot and its plan entries on every date
    #[command(alias = "delete")]
    Rm {
        slot: String,

        /// Skip confirmation
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// List slots
    #[command(alias = "ls")]
    List,

    /// Empty a slot on one date
    Clear {
        slot: String,

        #[arg(short, long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },
}

#[derive(Subcommand, Debug)]
pub enum PlanCommands {
    /// Show the plan of a date
    Show {
        #[arg(short, long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },

    /// Add supplements to a slot
    Add {
        slot: String,

        #[arg(required = true, num_args = 1..)]
        items: Vec<String>,

        #[arg(short, long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },

    /// Remove supplements from a slot
    #[command(alias = "rm")]
    Remove {
        slot: String,

        #[arg(required = true, num_args = 1..)]
        items: Vec<String>,

        #[arg(short, long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },
}

#[derive(Subcommand, Debug)]
pub enum RuleCommands {
    /// Add a rule between two supplements
    Add {
        a: String,
        b: String,

        /// avoid, space or note
        #[arg(short, long, default_value = "note")]
        kind: RuleKind,

        /// Rule text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Delete a rule by id or by its position in `rule list`
    #[command(alias = "delete")]
    Rm { rule: String },

    /// Delete every rule
    Clear {
        /// Skip confirmation
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// List rules, newest first
    #[command(alias = "ls")]
    List,

    /// Check a selection of supplements against the rules
    Check {
        /// Positions, ranges, ids or names
        #[arg(num_args = 0.., required_unless_present = "slot")]
        items: Vec<String>,

        /// Check everything planned in this slot
        #[arg(short, long)]
        slot: Option<String>,

        #[arg(short, long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },

    /// Show the rules for one pair
    Pair { a: String, b: String },
}

#[derive(Subcommand, Debug)]
pub enum ApptCommands {
    /// Add an appointment
    Add {
        title: String,

        #[arg(short, long, value_parser = parse_date)]
        date: Option<NaiveDate>,

        #[command(flatten)]
        fields: ApptFields,
    },

    /// Edit an appointment (only the given fields change)
    #[command(alias = "e")]
    Edit {
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(short, long, value_parser = parse_date)]
        date: Option<NaiveDate>,

        #[command(flatten)]
        fields: ApptFields,
    },

    /// Delete an appointment
    #[command(alias = "delete")]
    Rm { id: String },

    /// List the appointments of a date
    Day {
        #[arg(short, long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },

    /// Show a month with the days that have appointments
    Month {
        /// YYYY-MM (default: current month)
        #[arg(value_parser = parse_month)]
        month: Option<(i32, u32)>,
    },
}

#[derive(clap::Args, Debug, Default)]
pub struct ApptFields {
    /// HH:MM
    #[arg(short, long)]
    pub time: Option<String>,

    #[arg(short, long)]
    pub location: Option<String>,

    #[arg(short, long)]
    pub notes: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum BackupCommands {
    /// Write the whole document as JSON
    Export {
        /// Output file ("-" for stdout). Defaults to a dated file in the current directory
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Replace the whole document with a backup file
    Import { path: String },
}

#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Fetch every manifest resource into the current generation
    Install,

    /// Drop every other generation and start serving from the current one
    Activate,

    /// Fetch one resource through the cache
    Fetch {
        /// Path relative to the cache origin (e.g. ./app.js)
        path: String,

        /// Write the body here instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Show the lifecycle state and stored generations
    Status,
}

#[derive(Subcommand, Debug)]
pub enum WeatherCommands {
    /// Show the saved snapshot
    Show,

    /// Show or set the city
    City { name: Option<String> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_subcommands() {
        let cli = Cli::try_parse_from([
            "supporg", "plan", "add", "Morning", "1", "Iron", "-d", "2024-05-01",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Plan(PlanCommands::Add { slot, items, date })) => {
                assert_eq!(slot, "Morning");
                assert_eq!(items, vec!["1", "Iron"]);
                assert_eq!(date, NaiveDate::from_ymd_opt(2024, 5, 1));
            }
            other => panic!("unexpected parse: {:?}", other),
        }
    }

    #[test]
    fn rule_kind_defaults_to_note() {
        let cli =
            Cli::try_parse_from(["supporg", "rule", "add", "1", "2", "take", "apart"]).unwrap();
        match cli.command {
            Some(Commands::Rule(RuleCommands::Add { kind, text, .. })) => {
                assert_eq!(kind, RuleKind::Note);
                assert_eq!(text.join(" "), "take apart");
            }
            other => panic!("unexpected parse: {:?}", other),
        }
    }

    #[test]
    fn rejects_bad_dates_and_months() {
        assert!(Cli::try_parse_from(["supporg", "plan", "show", "-d", "05/01/2024"]).is_err());
        assert!(parse_month("2024-13").is_err());
        assert_eq!(parse_month("2024-02"), Ok((2024, 2)));
    }

    #[test]
    fn check_needs_items_or_slot() {
        assert!(Cli::try_parse_from(["supporg", "rule", "check"]).is_err());
        assert!(Cli::try_parse_from(["supporg", "rule", "check", "--slot", "Morning"]).is_ok());
    }
}
