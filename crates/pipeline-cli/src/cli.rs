//! Command-line definition

use clap::{value_parser, Arg, ArgAction, Command};
use std::path::PathBuf;

fn actor_arg() -> Arg {
    Arg::new("actor")
        .long("actor")
        .default_value("")
        .help("Staff member performing the change (defaults to the configured actor)")
}

/// Full `pipeline` command tree
#[must_use]
pub fn command() -> Command {
    Command::new("pipeline")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Lead and job-posting pipeline over a JSON record file")
        .subcommand_required(true)
        .arg(
            Arg::new("store")
                .long("store")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("JSON file holding the records"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(
            Command::new("list")
                .about("List records, most recent activity first")
                .arg(Arg::new("term").long("term").help("Case-insensitive text search"))
                .arg(Arg::new("stage").long("stage").help("Exact stage"))
                .arg(Arg::new("owner").long("owner").help("Exact owner"))
                .arg(Arg::new("source").long("source").help("Exact source tag"))
                .arg(Arg::new("sector").long("sector").help("Exact aligned sector tag"))
                .arg(Arg::new("from").long("from").help("Earliest activity date, MM/DD/YYYY"))
                .arg(Arg::new("to").long("to").help("Latest activity date, MM/DD/YYYY")),
        )
        .subcommand(
            Command::new("suggest")
                .about("Autocomplete suggestions for a partial term")
                .arg(Arg::new("term").required(true)),
        )
        .subcommand(
            Command::new("timeline")
                .about("Show a record's history, most recent first")
                .arg(Arg::new("id").required(true)),
        )
        .subcommand(
            Command::new("update")
                .about("Change stage, add a note, add a next step or reassign")
                .arg(Arg::new("id").required(true))
                .arg(Arg::new("stage").long("stage").help("New stage"))
                .arg(Arg::new("detail").long("detail").help("Stage detail"))
                .arg(Arg::new("note").long("note").help("History note"))
                .arg(Arg::new("step").long("step").help("Next step to add"))
                .arg(Arg::new("owner").long("owner").help("New owner"))
                .arg(
                    Arg::new("date")
                        .long("date")
                        .help("Date for the history entry, MM/DD/YYYY (defaults to today)"),
                )
                .arg(actor_arg()),
        )
        .subcommand(
            Command::new("complete")
                .about("Mark a next step completed")
                .arg(Arg::new("id").required(true))
                .arg(Arg::new("step-id").required(true))
                .arg(actor_arg()),
        )
        .subcommand(
            Command::new("steps")
                .about("Show next steps with age bands")
                .arg(Arg::new("id").required(true)),
        )
}
