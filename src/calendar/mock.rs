// src/calendar/mock.rs
//! Static demonstration dataset served by the HTTP layer when the pipeline has
//! nothing real to return.

use crate::calendar::types::{describe_event, EconomicEvent, Importance};

const SAMPLE: &[(&str, &str, &str, Importance, Option<&str>, Option<&str>)] = &[
    ("08:30", "USD", "Nonfarm Payrolls", Importance::High, Some("180K"), Some("175K")),
    ("08:30", "USD", "Unemployment Rate", Importance::High, Some("3.9%"), Some("3.9%")),
    ("10:00", "USD", "ISM Manufacturing PMI", Importance::Medium, Some("49.5"), Some("49.2")),
    ("14:00", "USD", "FOMC Meeting Minutes", Importance::High, None, None),
    ("04:30", "GBP", "GDP (QoQ)", Importance::Medium, Some("0.2%"), Some("0.1%")),
    ("05:00", "EUR", "Core CPI (YoY)", Importance::High, Some("2.7%"), Some("2.9%")),
    ("08:30", "CAD", "Retail Sales (MoM)", Importance::Medium, Some("0.3%"), Some("-0.2%")),
    ("21:30", "AUD", "Trade Balance", Importance::Low, Some("7.50B"), Some("7.28B")),
];

pub fn sample_events() -> Vec<EconomicEvent> {
    SAMPLE
        .iter()
        .enumerate()
        .map(
            |(i, &(time, currency, event, importance, forecast, previous))| EconomicEvent {
                id: (i + 1) as u32,
                time: time.to_string(),
                currency: currency.to_string(),
                event: event.to_string(),
                description: describe_event(event),
                importance,
                forecast: forecast.map(str::to_string),
                previous: previous.map(str::to_string),
                actual: None,
            },
        )
        .collect()
}
