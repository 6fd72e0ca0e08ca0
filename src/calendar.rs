use crate::date_key;
use crate::grid::{CalendarMonth, GridContext, MonthGrid, DEFAULT_MARKERS};
use crate::locale;
use crate::model::{Event, EventFields};
use crate::store::EventStore;
use chrono::NaiveDate;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    NavigateMonth(i32),
    SelectDate(NaiveDate),
    SubmitEvent(EventFields),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Changed,
    Unchanged,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarState {
    pub current_month: CalendarMonth,
    pub selected: Option<NaiveDate>,
}

/// Owns the calendar state and the event store; every change goes through [`Calendar::apply`].
pub struct Calendar {
    state: CalendarState,
    store: EventStore,
    today: NaiveDate,
    max_markers: usize,
    unsaved: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventView {
    pub title: String,
    pub time: String,
    pub location: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DayDetail {
    pub date: Option<NaiveDate>,
    pub heading: String,
    pub events: Vec<EventView>,
    /// Date the new-event form starts from.
    pub form_date: String,
}

#[derive(Debug, Clone)]
pub struct CalendarView {
    pub title: String,
    pub grid: MonthGrid,
    pub detail: DayDetail,
}

pub const NO_SELECTION: &str = "Selecciona un día";
pub const EMPTY_DAY: &str = "No hay eventos programados para este día.";

impl Calendar {
    /// Starts on today's month with nothing selected. Returns `None` only for
    /// dates at the edge of the supported range.
    pub fn new(store: EventStore, today: NaiveDate) -> Option<Self> {
        let current_month = CalendarMonth::containing(today)?;
        Some(Calendar {
            state: CalendarState {
                current_month,
                selected: None,
            },
            store,
            today,
            max_markers: DEFAULT_MARKERS,
            unsaved: false,
        })
    }

    pub fn with_max_markers(mut self, max_markers: usize) -> Self {
        self.max_markers = max_markers;
        self
    }

    pub fn state(&self) -> &CalendarState {
        &self.state
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// True when the last submission could not be written to storage.
    pub fn unsaved(&self) -> bool {
        self.unsaved
    }

    pub fn apply(&mut self, command: Command) -> Outcome {
        match command {
            Command::NavigateMonth(delta) => self.navigate(delta),
            Command::SelectDate(date) => {
                self.state.selected = Some(date);
                Outcome::Changed
            }
            Command::SubmitEvent(fields) => self.submit(fields),
        }
    }

    fn navigate(&mut self, delta: i32) -> Outcome {
        let Some(month) = self.state.current_month.offset(delta) else {
            debug!(delta, "month navigation out of range");
            return Outcome::Unchanged;
        };
        self.state.current_month = month;
        if let Some(selected) = self.state.selected {
            if !month.contains(selected) {
                self.state.selected = Some(month.first_day());
            }
        }
        Outcome::Changed
    }

    fn submit(&mut self, fields: EventFields) -> Outcome {
        let event = match fields.into_event() {
            Ok(event) => event,
            Err(err) => {
                debug!(error = %err, "ignoring event submission");
                return Outcome::Rejected;
            }
        };
        let date = event.date;
        self.unsaved = match self.store.append(event) {
            Ok(()) => false,
            Err(err) => {
                warn!(error = %err, "event kept in memory only");
                true
            }
        };
        if self.state.selected.is_none() {
            self.state.selected = Some(date);
            if let Some(month) = CalendarMonth::containing(date) {
                self.state.current_month = month;
            }
        }
        Outcome::Changed
    }

    pub fn grid(&self) -> MonthGrid {
        let ctx = GridContext {
            today: self.today,
            selected: self.state.selected,
            max_markers: self.max_markers,
        };
        MonthGrid::build(self.state.current_month, &self.store, &ctx)
    }

    pub fn detail(&self) -> DayDetail {
        let Some(selected) = self.state.selected else {
            return DayDetail {
                date: None,
                heading: NO_SELECTION.to_string(),
                events: Vec::new(),
                form_date: date_key::encode(self.state.current_month.first_day()),
            };
        };
        DayDetail {
            date: Some(selected),
            heading: locale::capitalize_first(&locale::long_date(selected)),
            events: self
                .store
                .events_for_date(selected)
                .into_iter()
                .map(EventView::from)
                .collect(),
            form_date: date_key::encode(selected),
        }
    }

    pub fn view(&self) -> CalendarView {
        CalendarView {
            title: self.state.current_month.title(),
            grid: self.grid(),
            detail: self.detail(),
        }
    }
}

impl From<&Event> for EventView {
    fn from(event: &Event) -> Self {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        EventView {
            title: event.title.clone(),
            time: locale::time_label(&event.time),
            location: non_empty(&event.location),
            description: non_empty(&event.description),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn date(key: &str) -> NaiveDate {
        date_key::decode(key).unwrap()
    }

    fn calendar(today: &str, payload: &str) -> Calendar {
        let today = date(today);
        let store = EventStore::load(Box::new(MemoryStorage::with_payload(payload)), today);
        Calendar::new(store, today).unwrap()
    }

    fn fields(title: &str, date: &str, time: &str) -> EventFields {
        EventFields {
            time: time.to_string(),
            ..EventFields::new(title, date)
        }
    }

    #[test]
    fn test_starts_on_todays_month_without_selection() {
        let cal = calendar("2024-05-14", "[]");
        assert_eq!(cal.state().current_month, CalendarMonth::new(2024, 5).unwrap());
        assert_eq!(cal.state().selected, None);
        let detail = cal.detail();
        assert_eq!(detail.heading, NO_SELECTION);
        assert_eq!(detail.form_date, "2024-05-01");
    }

    #[test]
    fn test_submit_without_selection_jumps_to_event() {
        let mut cal = calendar("2024-05-14", "[]");
        let outcome = cal.apply(Command::SubmitEvent(fields("Viaje", "2024-08-20", "07:15")));
        assert_eq!(outcome, Outcome::Changed);
        assert_eq!(cal.state().selected, Some(date("2024-08-20")));
        assert_eq!(cal.state().current_month, CalendarMonth::new(2024, 8).unwrap());
        assert_eq!(cal.store().len(), 1);
        assert!(!cal.unsaved());
    }

    #[test]
    fn test_failed_persist_is_reported() {
        let today = date("2024-05-14");
        let storage = MemoryStorage::read_only(Some("[]".into()));
        let store = EventStore::load(Box::new(storage), today);
        let mut cal = Calendar::new(store, today).unwrap();
        let outcome = cal.apply(Command::SubmitEvent(fields("Cine", "2024-05-25", "")));
        assert_eq!(outcome, Outcome::Changed);
        assert!(cal.unsaved());
        assert_eq!(cal.store().len(), 1);
    }

    #[test]
    fn test_submit_with_selection_keeps_view() {
        let mut cal = calendar("2024-05-14", "[]");
        cal.apply(Command::SelectDate(date("2024-05-02")));
        cal.apply(Command::SubmitEvent(fields("Viaje", "2024-08-20", "")));
        assert_eq!(cal.state().selected, Some(date("2024-05-02")));
        assert_eq!(cal.state().current_month, CalendarMonth::new(2024, 5).unwrap());
    }

    #[test]
    fn test_invalid_submission_is_ignored() {
        let mut cal = calendar("2024-05-14", "[]");
        for bad in [fields("  ", "2024-05-20", ""), fields("Cine", "", "")] {
            assert_eq!(cal.apply(Command::SubmitEvent(bad)), Outcome::Rejected);
        }
        assert_eq!(cal.store().len(), 0);
        assert_eq!(cal.state().selected, None);
    }

    #[test]
    fn test_navigation_rehomes_stale_selection() {
        let mut cal = calendar("2024-01-10", "[]");
        cal.apply(Command::SelectDate(date("2024-01-31")));
        assert_eq!(cal.apply(Command::NavigateMonth(3)), Outcome::Changed);
        // April has 30 days; selection moves to the 1st.
        assert_eq!(cal.state().selected, Some(date("2024-04-01")));

        cal.apply(Command::NavigateMonth(-4));
        assert_eq!(cal.state().current_month, CalendarMonth::new(2023, 12).unwrap());
        assert_eq!(cal.state().selected, Some(date("2023-12-01")));
    }

    #[test]
    fn test_navigation_without_selection_leaves_it_empty() {
        let mut cal = calendar("2024-01-10", "[]");
        cal.apply(Command::NavigateMonth(1));
        assert_eq!(cal.state().selected, None);
        assert_eq!(cal.view().title, "Febrero de 2024");
    }

    #[test]
    fn test_selection_outside_month_survives_until_navigation() {
        let mut cal = calendar("2024-05-14", "[]");
        cal.apply(Command::SelectDate(date("2023-11-05")));
        assert_eq!(cal.state().current_month, CalendarMonth::new(2024, 5).unwrap());
        assert_eq!(cal.state().selected, Some(date("2023-11-05")));
        assert!(cal.grid().cells.iter().all(|c| !c.is_selected));
    }

    #[test]
    fn test_detail_lists_selected_day_in_order() {
        let payload = r#"[
            {"title": "Cena", "date": "2024-05-10", "location": "Casa"},
            {"title": "Desayuno", "date": "2024-05-10", "time": "08:00",
             "description": "Con pan"}
        ]"#;
        let mut cal = calendar("2024-05-14", payload);
        cal.apply(Command::SelectDate(date("2024-05-10")));
        let detail = cal.detail();
        assert_eq!(detail.heading, "Viernes, 10 de mayo de 2024");
        assert_eq!(detail.form_date, "2024-05-10");
        assert_eq!(
            detail.events,
            vec![
                EventView {
                    title: "Desayuno".into(),
                    time: "08:00".into(),
                    location: None,
                    description: Some("Con pan".into()),
                },
                EventView {
                    title: "Cena".into(),
                    time: locale::ALL_DAY.into(),
                    location: Some("Casa".into()),
                    description: None,
                },
            ]
        );

        cal.apply(Command::SelectDate(date("2024-05-11")));
        assert!(cal.detail().events.is_empty());
    }

    #[test]
    fn test_view_marks_selected_and_today() {
        let mut cal = calendar("2024-05-14", "[]");
        cal.apply(Command::SelectDate(date("2024-05-20")));
        let view = cal.view();
        assert_eq!(view.title, "Mayo de 2024");
        let selected: Vec<_> = view.grid.cells.iter().filter(|c| c.is_selected).collect();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].key, "2024-05-20");
        let today: Vec<_> = view.grid.cells.iter().filter(|c| c.is_today).collect();
        assert_eq!(today.len(), 1);
        assert_eq!(today[0].key, "2024-05-14");
    }

    #[test]
    fn test_marker_limit_is_configurable() {
        let payload = r#"[
            {"title": "a", "date": "2024-05-10"},
            {"title": "b", "date": "2024-05-10"},
            {"title": "c", "date": "2024-05-10"}
        ]"#;
        let cal = calendar("2024-05-14", payload).with_max_markers(2);
        let grid = cal.grid();
        let cell = grid.cell_for(date("2024-05-10")).unwrap();
        assert_eq!(cell.markers, 2);
        assert_eq!(cell.event_count, 3);
    }
}
