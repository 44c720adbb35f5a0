// src/calendar/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One economic calendar entry in canonical form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EconomicEvent {
    pub id: u32,
    pub time: String,
    pub currency: String,
    pub event: String,
    pub description: String,
    pub importance: Importance,
    pub forecast: Option<String>,
    pub previous: Option<String>,
    pub actual: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    High,
    Medium,
    Low,
}

impl Importance {
    /// Threshold an impact score: >=3 high, >=2 medium, anything else low.
    pub fn from_score(score: u32) -> Self {
        match score {
            s if s >= 3 => Importance::High,
            2 => Importance::Medium,
            _ => Importance::Low,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Importance::High => "high",
            Importance::Medium => "medium",
            Importance::Low => "low",
        }
    }

    /// Inverse of `as_str`. Unknown labels map to `Low`.
    pub fn parse_label(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Importance::High,
            "medium" => Importance::Medium,
            _ => Importance::Low,
        }
    }
}

/// Provenance of a returned dataset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SourceTag {
    ScrapedForce,
    CsvToday,
    ScrapedDaily,
    CsvFallback,
    None,
    CsvErrorFallback,
    Error,
    /// HTTP layer only: static demo data because no real data was available.
    Mock,
    /// HTTP layer only: static demo data after a total pipeline failure.
    MockFallback,
}

impl SourceTag {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceTag::ScrapedForce => "scraped_force",
            SourceTag::CsvToday => "csv_today",
            SourceTag::ScrapedDaily => "scraped_daily",
            SourceTag::CsvFallback => "csv_fallback",
            SourceTag::None => "none",
            SourceTag::CsvErrorFallback => "csv_error_fallback",
            SourceTag::Error => "error",
            SourceTag::Mock => "mock",
            SourceTag::MockFallback => "mock_fallback",
        }
    }
}

impl std::fmt::Display for SourceTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable dataset plus where it came from and when it was produced.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CalendarSnapshot {
    pub data: Vec<EconomicEvent>,
    pub source: SourceTag,
    pub timestamp: DateTime<Utc>,
}

impl CalendarSnapshot {
    pub fn new(data: Vec<EconomicEvent>, source: SourceTag) -> Self {
        Self {
            data,
            source,
            timestamp: Utc::now(),
        }
    }

    pub fn empty(source: SourceTag) -> Self {
        Self::new(Vec::new(), source)
    }
}

/// Row as pulled off the page, before ids and derived fields are assigned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEventRow {
    pub time: String,
    pub currency: String,
    pub event: String,
    pub impact: u32,
    pub actual: String,
    pub forecast: String,
    pub previous: String,
}

/// Keyword -> description table, matched case-insensitively as a substring of
/// the event title. First hit wins, so longer phrases come before their prefixes.
const DESCRIPTIONS: &[(&str, &str)] = &[
    ("non-farm", "Change in the number of employed people excluding the farming industry; a primary gauge of labour market health."),
    ("nonfarm", "Change in the number of employed people excluding the farming industry; a primary gauge of labour market health."),
    ("unemployment", "Percentage of the labour force that is jobless and actively seeking work."),
    ("jobless claims", "Number of individuals filing for unemployment insurance for the first time."),
    ("core cpi", "Change in consumer prices excluding food and energy; the central bank's preferred view of underlying inflation."),
    ("cpi", "Consumer Price Index: change in the price of goods and services purchased by consumers."),
    ("ppi", "Producer Price Index: change in the price of goods sold by manufacturers; a leading indicator of consumer inflation."),
    ("pce", "Personal Consumption Expenditures price index: inflation measure tracked by the Federal Reserve."),
    ("gdp", "Gross Domestic Product: annualised change in the inflation-adjusted value of all goods and services produced."),
    ("retail sales", "Change in the total value of sales at the retail level; the main gauge of consumer spending."),
    ("interest rate", "Central bank benchmark rate decision; the single largest driver of currency valuation."),
    ("fomc", "Federal Open Market Committee communication on monetary policy and the rate outlook."),
    ("pmi", "Purchasing Managers' Index: survey-based reading of business conditions; above 50 indicates expansion."),
    ("ism", "Institute for Supply Management survey of purchasing managers; above 50 indicates expansion."),
    ("trade balance", "Difference in value between imported and exported goods and services."),
    ("consumer confidence", "Survey of consumer sentiment about current and future economic conditions."),
    ("consumer sentiment", "Survey of consumer sentiment about current and future economic conditions."),
    ("industrial production", "Change in the inflation-adjusted value of output from manufacturers, mines and utilities."),
    ("housing starts", "Annualised number of new residential buildings that began construction."),
    ("building permits", "Annualised number of new residential building permits issued."),
    ("durable goods", "Change in the total value of new purchase orders placed with manufacturers for durable goods."),
    ("crude oil", "Weekly change in the number of barrels of crude oil held in inventory."),
    ("speaks", "Public remarks from a policymaker; markets watch for hints on future monetary policy."),
];

/// Look up a description for an event title, or build a generic one.
pub fn describe_event(event: &str) -> String {
    let lower = event.to_lowercase();
    DESCRIPTIONS
        .iter()
        .find(|(kw, _)| lower.contains(kw))
        .map(|(_, d)| d.to_string())
        .unwrap_or_else(|| format!("{event} - economic indicator that may affect market volatility."))
}

/// Turn extracted rows into canonical events with sequential 1-based ids.
pub fn normalize_rows(rows: Vec<RawEventRow>) -> Vec<EconomicEvent> {
    rows.into_iter()
        .filter(|r| !r.event.trim().is_empty())
        .enumerate()
        .map(|(i, r)| EconomicEvent {
            id: (i + 1) as u32,
            description: describe_event(&r.event),
            importance: Importance::from_score(r.impact),
            time: r.time,
            currency: r.currency,
            event: r.event,
            forecast: non_empty(r.forecast),
            previous: non_empty(r.previous),
            actual: non_empty(r.actual),
        })
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
