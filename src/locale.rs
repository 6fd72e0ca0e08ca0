//! Spanish calendar wording used by the grid labels and the detail panel.

use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};

pub const WEEKDAYS: [(&str, &str); 7] = [
    ("Lun", "Lunes"),
    ("Mar", "Martes"),
    ("Mié", "Miércoles"),
    ("Jue", "Jueves"),
    ("Vie", "Viernes"),
    ("Sáb", "Sábado"),
    ("Dom", "Domingo"),
];

const MONTHS: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

pub const ALL_DAY: &str = "Todo el día";

pub fn month_name(month: u32) -> &'static str {
    MONTHS[(month.clamp(1, 12) - 1) as usize]
}

pub fn weekday_name(weekday: Weekday) -> &'static str {
    WEEKDAYS[weekday.num_days_from_monday() as usize].1
}

/// `Lunes, 3 de junio de 2024`
pub fn long_date(date: NaiveDate) -> String {
    format!(
        "{}, {} de {} de {}",
        weekday_name(date.weekday()),
        date.day(),
        month_name(date.month()),
        date.year()
    )
}

/// `Junio de 2024`
pub fn month_title(year: i32, month: u32) -> String {
    capitalize_first(&format!("{} de {}", month_name(month), year))
}

pub fn event_count_phrase(count: usize) -> String {
    if count == 1 {
        "1 evento".to_string()
    } else {
        format!("{} eventos", count)
    }
}

/// Renders a stored time as `HH:MM`, or the all-day label when empty.
pub fn time_label(time: &str) -> String {
    if time.is_empty() {
        return ALL_DAY.to_string();
    }
    match NaiveTime::parse_from_str(time, "%H:%M") {
        Ok(parsed) => parsed.format("%H:%M").to_string(),
        Err(_) => time.to_string(),
    }
}

pub fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
