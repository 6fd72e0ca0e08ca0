use crate::date_key;
use crate::locale;
use crate::store::EventStore;
use chrono::{Datelike, Duration, NaiveDate};

pub const GRID_CELLS: usize = 42;
pub const DEFAULT_MARKERS: usize = 3;

/// A year and 1-based month whose 6-week grid fits in the supported date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CalendarMonth {
    first_day: NaiveDate,
}

impl CalendarMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        let first_day = NaiveDate::from_ymd_opt(year, month, 1)?;
        let month = CalendarMonth { first_day };
        month.grid_start()?.checked_add_signed(Duration::days(GRID_CELLS as i64))?;
        Some(month)
    }

    /// Builds a month from a 0-based index that may overflow into adjacent years.
    pub fn from_index(year: i32, month_index: i32) -> Option<Self> {
        let year = year.checked_add(month_index.div_euclid(12))?;
        CalendarMonth::new(year, month_index.rem_euclid(12) as u32 + 1)
    }

    pub fn containing(date: NaiveDate) -> Option<Self> {
        CalendarMonth::new(date.year(), date.month())
    }

    pub fn year(&self) -> i32 {
        self.first_day.year()
    }

    pub fn month(&self) -> u32 {
        self.first_day.month()
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first_day
    }

    pub fn days(&self) -> u32 {
        days_in_month(self.year(), self.month())
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year() && date.month() == self.month()
    }

    pub fn offset(&self, delta: i32) -> Option<Self> {
        let index = (self.month() as i32 - 1).checked_add(delta)?;
        CalendarMonth::from_index(self.year(), index)
    }

    pub fn title(&self) -> String {
        locale::month_title(self.year(), self.month())
    }

    /// Monday-based column of the first day (0..=6).
    pub fn start_offset(&self) -> u32 {
        (self.first_day.weekday().num_days_from_sunday() + 6) % 7
    }

    fn grid_start(&self) -> Option<NaiveDate> {
        self.first_day
            .checked_sub_signed(Duration::days(self.start_offset() as i64))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayCell {
    pub date: NaiveDate,
    pub key: String,
    pub day: u32,
    /// In the displayed month and selectable.
    pub interactive: bool,
    pub is_today: bool,
    pub is_selected: bool,
    pub event_count: usize,
    pub markers: usize,
    pub label: Option<String>,
}

impl DayCell {
    pub fn is_outside(&self) -> bool {
        !self.interactive
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GridContext {
    pub today: NaiveDate,
    pub selected: Option<NaiveDate>,
    pub max_markers: usize,
}

#[derive(Debug, Clone)]
pub struct MonthGrid {
    pub month: CalendarMonth,
    pub cells: Vec<DayCell>,
}

impl MonthGrid {
    pub fn build(month: CalendarMonth, store: &EventStore, ctx: &GridContext) -> Self {
        let start_offset = month.start_offset() as usize;
        let days = month.days() as usize;
        let prev_days = month
            .offset(-1)
            .map(|m| m.days())
            .unwrap_or_else(|| days_in_month(month.year() - 1, 12)) as usize;
        let today_key = date_key::encode(ctx.today);
        let selected_key = ctx.selected.map(date_key::encode);

        let mut cells = Vec::with_capacity(GRID_CELLS);
        let start = month.grid_start().unwrap_or(month.first_day());
        for (index, date) in start.iter_days().take(GRID_CELLS).enumerate() {
            let key = date_key::encode(date);
            let (day, interactive) = if index < start_offset {
                (prev_days - start_offset + index + 1, false)
            } else if index < start_offset + days {
                (index - start_offset + 1, true)
            } else {
                (index - start_offset - days + 1, false)
            };

            let count = store.events_for_date(date).len();
            let mut cell = DayCell {
                date,
                key,
                day: day as u32,
                interactive,
                is_today: false,
                is_selected: false,
                event_count: count,
                markers: count.min(ctx.max_markers),
                label: None,
            };
            if interactive {
                cell.is_today = cell.key == today_key;
                cell.is_selected = selected_key.as_deref() == Some(cell.key.as_str());
                cell.label = Some(day_label(date, count));
            }
            cells.push(cell);
        }
        MonthGrid { month, cells }
    }

    pub fn weeks(&self) -> impl Iterator<Item = &[DayCell]> {
        self.cells.chunks(7)
    }

    pub fn cell_for(&self, date: NaiveDate) -> Option<&DayCell> {
        self.cells.iter().find(|c| c.interactive && c.date == date)
    }
}

/// Accessible description of a day: long date, then the event count when there is one.
pub fn day_label(date: NaiveDate, event_count: usize) -> String {
    let mut parts = vec![locale::capitalize_first(&locale::long_date(date))];
    if event_count > 0 {
        parts.push(locale::event_count_phrase(event_count));
    }
    parts.join(". ")
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    next.and_then(|d| d.pred_opt()).map(|d| d.day()).unwrap_or(31)
}
