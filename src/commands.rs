use crate::calendar::{Calendar, EventView, EMPTY_DAY};
use crate::config::Config;
use crate::date_key;
use crate::grid::{CalendarMonth, DayCell, GridContext, MonthGrid};
use crate::locale::{self, WEEKDAYS};
use crate::model::EventFields;
use crate::storage::{init_project_store, locate_store, StoreLocation};
use crate::store::EventStore;
use crate::ui;
use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDate};
use std::env;
use std::path::Path;
use tracing::info;

pub fn init() -> Result<()> {
    let location = init_project_store()?;
    println!("Initialized events store at {}", location.path.display());
    Ok(())
}

pub fn add(config: &Config, file: Option<&Path>, fields: EventFields) -> Result<()> {
    let event = fields.into_event().context("invalid event")?;
    let (mut store, location) = load_current_store(config, file)?;
    let summary = format!("{} on {}", event.title, date_key::encode(event.date));
    store
        .append(event)
        .with_context(|| format!("writing {}", location.path.display()))?;
    info!(%summary, path = %location.path.display(), "added event");
    println!("Added {}", summary);
    Ok(())
}

pub fn day(config: &Config, file: Option<&Path>, date: Option<String>) -> Result<()> {
    let date = match date {
        Some(raw) => date_key::decode(raw.trim())?,
        None => today(),
    };
    let (store, _) = load_current_store(config, file)?;
    println!("{}", locale::capitalize_first(&locale::long_date(date)));
    let events = store.events_for_date(date);
    if events.is_empty() {
        println!("  {}", EMPTY_DAY);
    }
    for event in events {
        print_event(&EventView::from(event));
    }
    Ok(())
}

pub fn month(config: &Config, file: Option<&Path>, month: Option<String>) -> Result<()> {
    let today = today();
    let target = match month {
        Some(raw) => {
            let (year, month) = date_key::decode_month(raw.trim())?;
            CalendarMonth::new(year, month)
        }
        None => CalendarMonth::containing(today),
    }
    .ok_or_else(|| anyhow!("month out of range"))?;
    let (store, _) = load_current_store(config, file)?;
    let ctx = GridContext {
        today,
        selected: None,
        max_markers: config.markers_per_day,
    };
    let grid = MonthGrid::build(target, &store, &ctx);
    print_grid(&grid);
    Ok(())
}

pub fn tui(config: &Config, file: Option<&Path>) -> Result<()> {
    let (store, location) = load_current_store(config, file)?;
    let calendar = Calendar::new(store, today())
        .ok_or_else(|| anyhow!("today is outside the supported calendar range"))?
        .with_max_markers(config.markers_per_day);
    ui::run(calendar, location)
}

fn load_current_store(config: &Config, file: Option<&Path>) -> Result<(EventStore, StoreLocation)> {
    let cwd = env::current_dir()?;
    let explicit = file.or(config.events_file.as_deref());
    let location = locate_store(explicit, &cwd)?;
    let store = EventStore::load(Box::new(location.storage()), today());
    Ok((store, location))
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn print_event(event: &EventView) {
    println!("  - {}  {}", event.time, event.title);
    if let Some(location) = &event.location {
        println!("    @ {}", location);
    }
    if let Some(description) = &event.description {
        println!("    {}", description);
    }
}

fn print_grid(grid: &MonthGrid) {
    println!("{}", grid.month.title());
    let header: Vec<String> = WEEKDAYS.iter().map(|(short, _)| format!("{:>5}", short)).collect();
    println!("{}", header.join(""));
    for week in grid.weeks() {
        let row: String = week.iter().map(grid_cell_text).collect();
        println!("{}", row);
    }
}

fn grid_cell_text(cell: &DayCell) -> String {
    if cell.is_outside() {
        return format!("{:>5}", "·");
    }
    let mark = if cell.is_today {
        '*'
    } else if cell.event_count > 0 {
        '+'
    } else {
        ' '
    };
    format!("{:>4}{}", cell.day, mark)
}
