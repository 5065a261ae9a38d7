//! habit CLI - Track daily habits from the command line
//!
//! Signs in anonymously on first use and renders each habit's completion grid.

mod auth;
mod cli;
mod commands;
mod config_profiles;
mod error;

use clap::{CommandFactory, Parser};
use habit_core::{DayKey, HabitStore};

use crate::cli::{Cli, Commands};
use crate::commands::add::{build_fields, run_add};
use crate::commands::auth_cmd::run_auth;
use crate::commands::common::{open_store, parse_day_arg};
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::delete::run_delete;
use crate::commands::edit::{run_edit, FieldChanges};
use crate::commands::grid::run_grid;
use crate::commands::icons::run_icons;
use crate::commands::list::run_list;
use crate::commands::reorder::run_reorder;
use crate::commands::toggle::{run_toggle, run_yesterday};
use crate::error::CliError;


#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let default_directive: tracing_subscriber::filter::Directive = "habit=info"
        .parse()
        .map_err(|error| CliError::Config(format!("invalid log directive: {error}")))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_directive),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let profile = cli.profile.as_deref();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    match command {
        Commands::Icons => run_icons(),
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref())?,
        Commands::Config { command } => run_config(command, profile)?,
        Commands::Auth { command } => run_auth(command, profile).await?,
        command => {
            let mut store = open_store(profile).await?;
            run_habit_command(command, &mut store, DayKey::today()).await?;
        }
    }

    Ok(())
}

/// Commands that operate on the signed-in user's habits.
async fn run_habit_command(
    command: Commands,
    store: &mut HabitStore,
    today: DayKey,
) -> Result<(), CliError> {
    match command {
        Commands::List { weeks, json } => run_list(store, weeks, json, today)?,
        Commands::Add {
            name,
            icon,
            description,
            color,
        } => run_add(store, build_fields(&name, icon, description, color)?).await?,
        Commands::Edit {
            habit,
            name,
            icon,
            description,
            color,
        } => {
            let changes = FieldChanges {
                name,
                icon,
                description,
                color,
            };
            run_edit(store, &habit, changes).await?;
        }
        Commands::Delete { habit } => run_delete(store, &habit).await?,
        Commands::Toggle { habit, date } => {
            let day = parse_day_arg(date.as_deref(), today)?;
            run_toggle(store, &habit, day, today).await?;
        }
        Commands::Yesterday { habit } => {
            run_yesterday(store, &habit, today).await?;
        }
        Commands::Grid {
            habit,
            layout,
            days,
            json,
        } => run_grid(store, &habit, layout.to_layout(days), json, today)?,
        Commands::Reorder { habit, position } => run_reorder(store, &habit, position).await?,
        Commands::Icons
        | Commands::Completions { .. }
        | Commands::Config { .. }
        | Commands::Auth { .. } => {}
    }
    Ok(())
}
