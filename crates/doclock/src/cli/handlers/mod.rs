use std::path::PathBuf;

use anyhow::Result;
use clap::ArgMatches;

use crate::commands::{
    checkin::{self, CheckinOptions},
    checkout::{self, CheckoutOptions},
    force_unlock::{self, ForceUnlockOptions},
    init::{self, InitOptions},
    status::{self, StatusOptions},
    Context, GlobalOptions,
};

/// Global flags as parsed by clap
pub fn global_options(matches: &ArgMatches) -> GlobalOptions {
    GlobalOptions {
        root: matches.get_one::<PathBuf>("root").cloned(),
        agent: matches.get_one::<String>("agent").cloned(),
        json: matches.get_flag("json"),
        stale_after: matches.get_one::<u64>("stale-after").copied(),
    }
}

pub fn dispatch(matches: &ArgMatches) -> Result<()> {
    let ctx = Context::load(&global_options(matches))?;

    match matches.subcommand() {
        Some(("checkout", sub_m)) => checkout::run(
            &ctx,
            &CheckoutOptions {
                path: required_path(sub_m)?,
            },
        ),
        Some(("checkin", sub_m)) => checkin::run(
            &ctx,
            &CheckinOptions {
                path: required_path(sub_m)?,
                review: sub_m.get_flag("review"),
            },
        ),
        Some(("status", sub_m)) => status::run(
            &ctx,
            &StatusOptions {
                path: sub_m.get_one::<PathBuf>("path").cloned(),
            },
        ),
        Some(("force-unlock", sub_m)) => force_unlock::run(
            &ctx,
            &ForceUnlockOptions {
                path: required_path(sub_m)?,
                reason: sub_m
                    .get_one::<String>("reason")
                    .cloned()
                    .unwrap_or_default(),
            },
        ),
        Some(("init", sub_m)) => init::run(
            &ctx,
            &InitOptions {
                path: required_path(sub_m)?,
            },
        ),
        _ => anyhow::bail!("Unknown command. Run 'doclock --help' for usage."),
    }
}

fn required_path(matches: &ArgMatches) -> Result<PathBuf> {
    matches
        .get_one::<PathBuf>("path")
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("A document path is required"))
}

/// Exit code for a failed command.
///
/// Core errors carry their own category; anything else is a usage error.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|e| e.downcast_ref::<doclock_core::Error>())
        .map_or(1, doclock_core::Error::exit_code)
}

pub fn format_error(err: &anyhow::Error) -> String {
    let msg = err.to_string();
    if let Some(source) = err.source() {
        let source_msg = source.to_string();
        if !msg.contains(&source_msg) && !source_msg.is_empty() {
            return format!("{msg}\nCause: {source_msg}");
        }
    }
    msg
}
