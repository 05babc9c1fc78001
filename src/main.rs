mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::Command;
use commands::Session;

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "taskboard=warn".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let args = cli::Cli::parse();
    let command = args.command.unwrap_or(Command::List {
        filter: Default::default(),
        preset: None,
    });
    match command {
        Command::Init => commands::init(),
        command => run(command, args.data_dir),
    }
}

fn run(command: Command, data_dir: Option<PathBuf>) -> Result<()> {
    let session = Session::open(data_dir)?;
    match command {
        Command::Init => commands::init(),
        Command::Boards { action } => commands::boards(session, action),
        Command::Columns { action } => commands::columns(session, action),
        Command::Labels { action } => commands::labels(session, action),
        Command::List { filter, preset } => commands::list(session, filter, preset),
        Command::Add {
            text,
            column,
            description,
            start,
            due,
            priority,
            effort,
            labels,
        } => commands::add(
            session,
            text,
            column,
            description,
            start,
            due,
            priority,
            effort,
            labels,
        ),
        Command::Edit {
            card_id,
            text,
            description,
            start,
            clear_start,
            due,
            clear_due,
            priority,
            effort,
        } => commands::edit(
            session,
            card_id,
            text,
            description,
            start,
            clear_start,
            due,
            clear_due,
            priority,
            effort,
        ),
        Command::Move {
            card_id,
            column_id,
            position,
        } => commands::move_card(session, card_id, column_id, position),
        Command::Done { card_id } => commands::done(session, card_id),
        Command::Rm { card_id } => commands::remove(session, card_id),
        Command::Dup { card_id } => commands::duplicate(session, card_id),
        Command::Log { card_id, text } => commands::log(session, card_id, text),
        Command::Tag { card_id, label_id } => commands::tag(session, card_id, label_id),
        Command::Depend {
            card_id,
            on,
            kind,
            remove,
        } => commands::depend(session, card_id, on, kind, remove),
        Command::Gantt { zoom } => commands::gantt(session, zoom),
        Command::Validate => commands::validate(session),
        Command::Pick {
            columns,
            include_completed,
            no_priority,
            no_due,
            aging,
            save,
        } => commands::pick(
            session,
            columns,
            include_completed,
            no_priority,
            no_due,
            aging,
            save,
        ),
        Command::Export { path } => commands::export(session, path),
        Command::Import { path } => commands::import(session, path),
        Command::Presets { action } => commands::presets(session, action),
    }
}
