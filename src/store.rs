use crate::model::{compare_events, sort_events, Event};
use crate::storage::{EventStorage, StorageError};
use chrono::{Datelike, NaiveDate};
use tracing::{debug, info};

/// Ordered in-memory events backed by a durable slot.
pub struct EventStore {
    storage: Box<dyn EventStorage>,
    events: Vec<Event>,
}

impl EventStore {
    /// Reads the slot, falling back to the sample events when it is missing or unreadable.
    pub fn load(storage: Box<dyn EventStorage>, today: NaiveDate) -> Self {
        let mut events = match storage.load() {
            Ok(events) => {
                debug!(count = events.len(), source = %storage.describe(), "loaded events");
                events
            }
            Err(err) => {
                info!(source = %storage.describe(), error = %err, "using sample events");
                fallback_events(today)
            }
        };
        sort_events(&mut events);
        EventStore { storage, events }
    }

    #[cfg(test)]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn storage_label(&self) -> String {
        self.storage.describe()
    }

    /// Adds an event, re-sorts and writes the whole list back.
    ///
    /// The event is kept in memory even when the write fails.
    pub fn append(&mut self, event: Event) -> Result<(), StorageError> {
        self.events.push(event);
        sort_events(&mut self.events);
        self.persist()
    }

    pub fn persist(&self) -> Result<(), StorageError> {
        self.storage.save(&self.events)
    }

    pub fn events_for_date(&self, date: NaiveDate) -> Vec<&Event> {
        let mut matching: Vec<&Event> = self.events.iter().filter(|e| e.date == date).collect();
        matching.sort_by(|a, b| compare_events(a, b));
        matching
    }
}

pub fn fallback_events(today: NaiveDate) -> Vec<Event> {
    let samples = [
        (
            3,
            "Inauguración de la temporada cultural",
            "18:30",
            "Centro cultural municipal",
            "Presentación de la programación anual y actuación musical en vivo.",
        ),
        (
            12,
            "Taller de fotografía urbana",
            "10:00",
            "Plaza Mayor",
            "Recorrido práctico por el casco histórico guiado por profesionales.",
        ),
        (
            18,
            "Mercado de productores locales",
            "09:30",
            "Parque del Río",
            "Alimentos frescos, artesanías y actividades infantiles.",
        ),
        (
            25,
            "Cine al aire libre: Clásicos del cine",
            "21:45",
            "Terraza del Museo",
            "Proyección gratuita. Lleva tu manta y mantén limpia el área.",
        ),
    ];
    samples
        .iter()
        .filter_map(|(day, title, time, location, description)| {
            let date = NaiveDate::from_ymd_opt(today.year(), today.month(), *day)?;
            Some(Event {
                title: title.to_string(),
                date,
                time: time.to_string(),
                location: location.to_string(),
                description: description.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date_key;
    use crate::storage::MemoryStorage;
    use std::rc::Rc;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 14).unwrap()
    }

    fn event(title: &str, date: &str, time: &str) -> Event {
        Event {
            title: title.into(),
            date: date_key::decode(date).unwrap(),
            time: time.into(),
            location: String::new(),
            description: String::new(),
        }
    }

    #[test]
    fn test_missing_slot_yields_fallback() {
        let store = EventStore::load(Box::new(MemoryStorage::default()), today());
        let days: Vec<u32> = store.events().iter().map(|e| e.date.day()).collect();
        assert_eq!(days, vec![3, 12, 18, 25]);
        assert!(store.events().iter().all(|e| e.date.month() == 5));
    }

    #[test]
    fn test_wrong_shape_yields_fallback() {
        let storage = MemoryStorage::with_payload("\"not an array\"");
        let store = EventStore::load(Box::new(storage), today());
        assert_eq!(store.events(), fallback_events(today()).as_slice());

        let corrupt = MemoryStorage::with_payload("[{");
        let store = EventStore::load(Box::new(corrupt), today());
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_load_keeps_only_valid_entries() {
        let payload = r#"[
            {"title": "  Concierto  ", "date": "2024-05-20", "time": "20:00",
             "location": " Auditorio ", "description": " Entrada libre "},
            {"date": "2024-05-21", "time": "10:00"}
        ]"#;
        let store = EventStore::load(Box::new(MemoryStorage::with_payload(payload)), today());
        assert_eq!(store.len(), 1);
        let only = &store.events()[0];
        assert_eq!(only.title, "Concierto");
        assert_eq!(only.location, "Auditorio");
        assert_eq!(only.description, "Entrada libre");
        assert_eq!(only.time, "20:00");
    }

    #[test]
    fn test_empty_array_is_not_replaced_by_fallback() {
        let store = EventStore::load(Box::new(MemoryStorage::with_payload("[]")), today());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_append_sorts_and_persists() {
        let storage = Rc::new(MemoryStorage::with_payload("[]"));
        let mut store = EventStore::load(Box::new(Rc::clone(&storage)), today());
        store.append(event("tarde", "2024-05-10", "")).unwrap();
        store.append(event("mañana", "2024-05-10", "09:00")).unwrap();
        store.append(event("ayer", "2024-05-09", "23:00")).unwrap();

        let titles: Vec<_> = store.events().iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["ayer", "mañana", "tarde"]);

        let reloaded = EventStore::load(Box::new(Rc::clone(&storage)), today());
        assert_eq!(reloaded.events(), store.events());
    }

    #[test]
    fn test_failed_persist_keeps_event_in_memory() {
        let mut store = EventStore::load(Box::new(MemoryStorage::read_only(None)), today());
        let before = store.len();
        let result = store.append(event("Feria", "2024-05-30", "12:00"));
        assert!(matches!(result, Err(StorageError::WriteRejected)));
        assert_eq!(store.len(), before + 1);
        assert_eq!(store.events().last().map(|e| e.title.as_str()), Some("Feria"));
    }

    #[test]
    fn test_events_for_date_filters_and_orders() {
        let storage = MemoryStorage::with_payload("[]");
        let mut store = EventStore::load(Box::new(storage), today());
        store.append(event("b", "2024-05-10", "")).unwrap();
        store.append(event("a", "2024-05-10", "08:15")).unwrap();
        store.append(event("c", "2024-05-11", "07:00")).unwrap();
        let date = date_key::decode("2024-05-10").unwrap();
        let titles: Vec<_> = store
            .events_for_date(date)
            .iter()
            .map(|e| e.title.as_str())
            .collect();
        assert_eq!(titles, vec!["a", "b"]);
    }
}
