mod calendar;
mod cli;
mod commands;
mod config;
mod date_key;
mod grid;
mod locale;
mod logging;
mod model;
mod storage;
mod store;
mod ui;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let config = config::Config::load()?;
    logging::init(&config);
    let file = args.file.as_deref();
    let command = args.command.unwrap_or(cli::Command::Tui);
    match command {
        cli::Command::Init => commands::init(),
        cli::Command::Add {
            title,
            date,
            time,
            location,
            description,
        } => commands::add(
            &config,
            file,
            model::EventFields {
                time: time.unwrap_or_default(),
                location: location.unwrap_or_default(),
                description: description.unwrap_or_default(),
                ..model::EventFields::new(title, date)
            },
        ),
        cli::Command::Day { date } => commands::day(&config, file, date),
        cli::Command::Month { month } => commands::month(&config, file, month),
        cli::Command::Tui => commands::tui(&config, file),
    }
}
