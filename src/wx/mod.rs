//! Canonical forecast model shared by every provider.
//!
//! Providers map their wire payloads into [`RawForecast`]; the normalizer
//! ([`normalize`]) turns that into a [`CanonicalForecast`] with derived
//! day highs/lows, display day names, extracted wind values, and bad-weather
//! flags. Everything downstream (query engine, chat replies) works only on
//! the canonical model and never sees provider-specific shapes.

pub mod dayname;
pub mod extract;
pub mod normalize;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// How a provider structures its forecast records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderType {
    /// One record per calendar day.
    #[serde(rename = "DAILY")]
    Daily,
    /// Multiple records within a day (day/night or hourly).
    #[serde(rename = "MULTI_PERIOD")]
    MultiPeriod,
}

/// Granularity of a provider's periods within one day.
///
/// Selected once per forecast; the normalizer and the query engine branch on
/// this tag instead of re-deriving the shape per period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeriodResolution {
    /// One period per day (weatherbit.io).
    #[serde(rename = "DAILY")]
    Daily,
    /// Day/night period pairs (weather.gov).
    #[serde(rename = "TWELVE_HOUR")]
    TwelveHour,
    /// One period per hour.
    #[serde(rename = "HOURLY")]
    Hourly,
}

/// What a provider can supply beyond the baseline fields.
#[derive(Debug, Clone, Copy)]
pub struct ProviderCapabilities {
    /// Prefer the provider-built narrative description when present.
    pub use_enhanced_description: bool,
    /// Condition codes that force the bad-weather flag. `None` when the
    /// provider has no usable code table (never produces false positives).
    pub bad_weather_codes: Option<&'static [u32]>,
    /// Whether precipitation amounts are reported (vs. probability only).
    pub has_precip_amount: bool,
}

/// Static description of a weather data provider.
#[derive(Debug, Clone, Copy)]
pub struct ProviderDescriptor {
    /// Provider name as shown in metadata ("weather.gov", "weatherbit.io").
    pub name: &'static str,
    /// Record structure.
    pub provider_type: ProviderType,
    /// Period granularity.
    pub period_resolution: PeriodResolution,
    /// Optional capabilities.
    pub capabilities: ProviderCapabilities,
    /// Decimal places kept when rounding derived numbers.
    pub precision: u32,
    /// Forecast cache time-to-live in seconds.
    pub cache_ttl_secs: u64,
}

/// Names a day (or a night period of a day) for humans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayInfo {
    /// Plain weekday form: "Wednesday", or "Wednesday night" for a night
    /// period.
    pub raw_name: String,
    /// Context-aware form: "Today", "Tomorrow night", "Next Wednesday",
    /// "Wednesday the 3rd".
    pub display_name: String,
    /// Whole days from the reference date (0 = today).
    pub diff_from_today: i64,
    /// Saturday or Sunday.
    pub is_weekend: bool,
    /// Day of week, for day-selection queries.
    pub weekday: Weekday,
}

/// Derived high/low for one day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DayTemperatures {
    /// Max over daytime period values, when any carried one.
    pub high: Option<f64>,
    /// Min over explicit lows, else nighttime values.
    pub low: Option<f64>,
}

/// Precipitation fields for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Precipitation {
    /// Chance of precipitation, percent.
    pub probability: f64,
    /// Expected amount in inches, when the provider reports one.
    pub amount: Option<f64>,
    /// Kind of precipitation ("rain", "snow"), when known.
    pub kind: Option<String>,
}

/// Wind fields for one period.
///
/// Speed and gust are never absent: when the provider supplies no number the
/// normalizer extracts one from the description, defaulting to 0 only when
/// the text states none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    /// Sustained speed, mph.
    pub speed: f64,
    /// Gust speed, mph.
    pub gust: f64,
    /// Compass direction, when reported.
    pub direction: Option<String>,
}

/// Atmospheric extras some providers report.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Atmospherics {
    /// Visibility, miles.
    pub visibility: Option<f64>,
    /// Relative humidity, percent.
    pub humidity: Option<f64>,
    /// Pressure, millibars.
    pub pressure: Option<f64>,
    /// Dew point, degrees F.
    pub dewpoint: Option<f64>,
    /// UV index.
    pub uv_index: Option<f64>,
}

/// Sun/moon extras some providers report.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Astronomy {
    /// Sunrise timestamp.
    pub sunrise: Option<DateTime<Utc>>,
    /// Sunset timestamp.
    pub sunset: Option<DateTime<Utc>>,
    /// Moon phase as a lunation fraction in [0, 1].
    pub moon_phase: Option<f64>,
}

/// One normalized forecast period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Period {
    /// Calendar date the period belongs to.
    pub date: NaiveDate,
    /// Night-aware naming for this period.
    pub info: DayInfo,
    /// Daytime vs. nighttime period.
    pub is_daytime: bool,
    /// Period start, when the provider reports one.
    pub start_time: Option<DateTime<FixedOffset>>,
    /// Period end, when the provider reports one.
    pub end_time: Option<DateTime<FixedOffset>>,
    /// Headline temperature: daytime value or nighttime low, rounded.
    pub temperature: Option<f64>,
    /// Explicit low, for providers that put high and low on one record.
    pub temperature_low: Option<f64>,
    /// Apparent temperature, when reported.
    pub feels_like: Option<f64>,
    /// Human-readable conditions (enhanced form when the provider supports
    /// it).
    pub description: String,
    /// Precipitation fields.
    pub precipitation: Precipitation,
    /// Wind fields, always populated (see [`Wind`]).
    pub wind: Wind,
    /// Atmospheric extras, when reported.
    pub atmospheric: Option<Atmospherics>,
    /// Sun/moon extras, when reported.
    pub astronomy: Astronomy,
    /// Description mentions a configured bad-weather keyword, or the
    /// provider's condition code is in its bad-weather set.
    pub is_bad_weather: bool,
}

/// One normalized forecast day: derived summary plus ordered periods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Day {
    /// Calendar date.
    pub date: NaiveDate,
    /// Day-level naming (never the " night" form).
    pub info: DayInfo,
    /// Derived high/low.
    pub temperatures: DayTemperatures,
    /// Ordered periods: exactly 1 for DAILY, day-before-night for
    /// TWELVE_HOUR, start-time order for HOURLY.
    pub periods: Vec<Period>,
}

/// Forecast provenance carried alongside the days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastMetadata {
    /// Provider name.
    pub provider_name: String,
    /// Record structure of the source.
    pub provider_type: ProviderType,
    /// Period granularity of the source.
    pub period_resolution: PeriodResolution,
    /// Location timezone label, as reported by the provider.
    pub location_timezone: String,
    /// The request URL this forecast answers (cache key).
    pub source_url: String,
    /// When the provider data was fetched.
    pub generated_at: DateTime<Utc>,
    /// Fetch time plus the provider cache TTL.
    pub valid_until: DateTime<Utc>,
}

/// The provider-independent forecast every query runs against.
///
/// Invariant: `days` is sorted ascending by date, contiguous, and starts no
/// earlier than the provider's own "today" (first raw period's date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalForecast {
    /// Provenance.
    pub metadata: ForecastMetadata,
    /// Ordered days.
    pub days: Vec<Day>,
}

impl CanonicalForecast {
    /// All periods across all days, in forecast order.
    pub fn periods(&self) -> impl Iterator<Item = &Period> {
        self.days.iter().flat_map(|d| d.periods.iter())
    }
}

/// One weather alert, already screened for reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Raw expiry string as the provider sent it.
    pub expires: String,
    /// Short headline.
    pub headline: String,
    /// Full alert text.
    pub description: String,
    /// Expiry is today or later by local date comparison; stale alerts are
    /// never surfaced.
    pub do_report: bool,
    /// Pre-rendered display form ("expires: … - headline\ndescription").
    pub formatted: String,
}

/// Provider-shaped period before normalization.
///
/// Providers fill only what they have; `None` means "not reported", which the
/// normalizer distinguishes from zero.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPeriod {
    /// Provider-local calendar date of the period.
    pub date: NaiveDate,
    /// Daytime vs. nighttime.
    pub is_daytime: bool,
    /// Period start.
    pub start_time: Option<DateTime<FixedOffset>>,
    /// Period end.
    pub end_time: Option<DateTime<FixedOffset>>,
    /// Headline temperature value (daytime high or the day record's high).
    pub temperature_value: Option<f64>,
    /// Explicit low, when the record carries one.
    pub temperature_low: Option<f64>,
    /// Apparent temperature.
    pub feels_like: Option<f64>,
    /// Plain conditions text.
    pub description: String,
    /// Provider-built narrative, used only with the matching capability.
    pub enhanced_description: Option<String>,
    /// Chance of precipitation, percent.
    pub precip_probability: Option<f64>,
    /// Precipitation amount, inches.
    pub precip_amount: Option<f64>,
    /// Precipitation kind.
    pub precip_kind: Option<String>,
    /// Sustained wind, mph.
    pub wind_speed: Option<f64>,
    /// Gusts, mph.
    pub wind_gust: Option<f64>,
    /// Compass direction.
    pub wind_direction: Option<String>,
    /// Atmospheric extras.
    pub atmospheric: Option<Atmospherics>,
    /// Sun/moon extras.
    pub astronomy: Astronomy,
    /// Provider condition code, for bad-weather code sets.
    pub condition_code: Option<u32>,
}

impl RawPeriod {
    /// Minimal period for a given date; tests and providers fill the rest.
    pub fn new(date: NaiveDate, is_daytime: bool) -> Self {
        Self {
            date,
            is_daytime,
            ..Self::default()
        }
    }
}

/// Provider-shaped forecast handed to the normalizer.
#[derive(Debug, Clone)]
pub struct RawForecast {
    /// The provider that produced this payload.
    pub provider: ProviderDescriptor,
    /// Location timezone label.
    pub timezone: String,
    /// Request URL (becomes the cache key).
    pub source_url: String,
    /// Fetch timestamp.
    pub generated_at: DateTime<Utc>,
    /// Fetch timestamp plus cache TTL.
    pub valid_until: DateTime<Utc>,
    /// Periods in provider order (date-ascending).
    pub periods: Vec<RawPeriod>,
}

impl Default for RawPeriod {
    fn default() -> Self {
        Self {
            date: NaiveDate::default(),
            is_daytime: true,
            start_time: None,
            end_time: None,
            temperature_value: None,
            temperature_low: None,
            feels_like: None,
            description: String::new(),
            enhanced_description: None,
            precip_probability: None,
            precip_amount: None,
            precip_kind: None,
            wind_speed: None,
            wind_gust: None,
            wind_direction: None,
            atmospheric: None,
            astronomy: Astronomy::default(),
            condition_code: None,
        }
    }
}
