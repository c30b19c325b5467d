pub mod handlers;
pub mod setup;

use std::path::PathBuf;

use clap::{crate_version, value_parser, Arg, ArgAction, Command};

pub fn build_cli() -> Command {
    Command::new("doclock")
        .version(crate_version!())
        .about("Advisory edit locks embedded in shared documents")
        .long_about(
            "Coordinates edits to shared documents between agents. Each document \
             carries its own lock record in a metadata block at the top of the file; \
             sync the documents with your usual tool before and after each command.",
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("root")
                .long("root")
                .value_name("DIR")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Directory holding the managed documents [default: current directory]"),
        )
        .arg(
            Arg::new("agent")
                .long("agent")
                .value_name("ID")
                .global(true)
                .help("Agent identity recorded in lock records"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Print results as JSON"),
        )
        .arg(
            Arg::new("stale-after")
                .long("stale-after")
                .value_name("SECS")
                .global(true)
                .value_parser(value_parser!(u64).range(1..))
                .help("Seconds after which an editing lock may be reclaimed"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Log lock decisions to stderr"),
        )
        .subcommand(cmd_checkout())
        .subcommand(cmd_checkin())
        .subcommand(cmd_status())
        .subcommand(cmd_force_unlock())
        .subcommand(cmd_init())
}

fn path_arg(required: bool) -> Arg {
    Arg::new("path")
        .value_name("PATH")
        .required(required)
        .value_parser(value_parser!(PathBuf))
        .help("Document to operate on")
}

fn cmd_checkout() -> Command {
    Command::new("checkout")
        .about("Take the editing lock on a document")
        .arg(path_arg(true))
}

fn cmd_checkin() -> Command {
    Command::new("checkin")
        .about("Release the editing lock on a document")
        .arg(path_arg(true))
        .arg(
            Arg::new("review")
                .long("review")
                .action(ArgAction::SetTrue)
                .help("Hand the document to review instead of making it available"),
        )
}

fn cmd_status() -> Command {
    Command::new("status")
        .about("Show one document's lock, or scan every managed document")
        .arg(path_arg(false))
}

fn cmd_force_unlock() -> Command {
    Command::new("force-unlock")
        .about("Reset a document to available regardless of who holds it")
        .arg(path_arg(true))
        .arg(
            Arg::new("reason")
                .long("reason")
                .value_name("TEXT")
                .required(true)
                .help("Why the lock is being broken (recorded in the history)"),
        )
}

fn cmd_init() -> Command {
    Command::new("init")
        .about("Add a lock record to a document that has none")
        .arg(path_arg(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        build_cli().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let matches = build_cli()
            .try_get_matches_from(["doclock", "checkout", "a.md", "--agent", "a1", "--json"])
            .unwrap();
        assert_eq!(matches.get_one::<String>("agent").map(String::as_str), Some("a1"));
        assert!(matches.get_flag("json"));
    }

    #[test]
    fn test_force_unlock_requires_reason_flag() {
        assert!(build_cli()
            .try_get_matches_from(["doclock", "force-unlock", "a.md"])
            .is_err());
    }

    #[test]
    fn test_stale_after_must_be_positive() {
        assert!(build_cli()
            .try_get_matches_from(["doclock", "status", "--stale-after", "0"])
            .is_err());
    }
}
