//! weather.gov (National Weather Service) provider.
//!
//! Free API, no key. Forecasts arrive as day/night period pairs with the
//! numbers buried in narrative text, so wind speeds are pulled out of the
//! `windSpeed` range string and the rest is left to the normalizer's text
//! extraction.

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Timelike, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::chat::users::{LocationKind, UserLocation};
use crate::wx::{
    extract, Alert, PeriodResolution, ProviderCapabilities, ProviderDescriptor, ProviderType,
    RawForecast, RawPeriod,
};

use super::geocode;
use super::http::HttpClient;
use super::{GeoRecord, ProviderError, WxProvider};

/// Static shape of the weather.gov forecast product.
pub const DESCRIPTOR: ProviderDescriptor = ProviderDescriptor {
    name: "weather.gov",
    provider_type: ProviderType::MultiPeriod,
    period_resolution: PeriodResolution::TwelveHour,
    capabilities: ProviderCapabilities {
        use_enhanced_description: false,
        bad_weather_codes: None,
        has_precip_amount: false,
    },
    precision: 0,
    cache_ttl_secs: 3600,
};

const API_PREFIX: &str = "https://api.weather.gov/";
const ALERTS_PREFIX: &str = "https://api.weather.gov/alerts?";

// ---------------------------------------------------------------------------
// Wire payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GovForecast {
    properties: GovForecastProperties,
}

#[derive(Debug, Deserialize)]
struct GovForecastProperties {
    #[serde(default)]
    periods: Vec<GovPeriod>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GovPeriod {
    start_time: String,
    #[serde(default)]
    end_time: Option<String>,
    is_daytime: bool,
    temperature: f64,
    #[serde(default)]
    probability_of_precipitation: Option<GovMeasure>,
    #[serde(default)]
    wind_speed: Option<String>,
    #[serde(default)]
    wind_direction: Option<String>,
    #[serde(default)]
    detailed_forecast: String,
}

#[derive(Debug, Deserialize)]
struct GovMeasure {
    #[serde(default)]
    value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct GovAlerts {
    #[serde(default)]
    features: Vec<GovAlertFeature>,
}

#[derive(Debug, Deserialize)]
struct GovAlertFeature {
    properties: GovAlertProperties,
}

#[derive(Debug, Deserialize)]
struct GovAlertProperties {
    #[serde(default)]
    expires: Option<String>,
    #[serde(default)]
    headline: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

// ---------------------------------------------------------------------------
// Mapping
// ---------------------------------------------------------------------------

fn map_forecast(
    payload: GovForecast,
    source_url: &str,
    now_utc: DateTime<Utc>,
    now_local: NaiveDateTime,
) -> Result<RawForecast, ProviderError> {
    if payload.properties.periods.is_empty() {
        return Err(ProviderError::InvalidPayload(
            "no periods returned from weather.gov".to_owned(),
        ));
    }
    let mut periods = Vec::with_capacity(payload.properties.periods.len());
    for (index, period) in payload.properties.periods.into_iter().enumerate() {
        periods.push(map_period(index, period, now_local)?);
    }
    Ok(RawForecast {
        provider: DESCRIPTOR,
        // The forecast payload carries no timezone field.
        timezone: "MDT".to_owned(),
        source_url: source_url.to_owned(),
        generated_at: now_utc,
        valid_until: super::expiry(now_utc, DESCRIPTOR.cache_ttl_secs),
        periods,
    })
}

fn map_period(
    index: usize,
    period: GovPeriod,
    now_local: NaiveDateTime,
) -> Result<RawPeriod, ProviderError> {
    let date_part = period.start_time.split('T').next().unwrap_or_default();
    let mut date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(|_| {
        ProviderError::InvalidPayload(format!(
            "unparseable period start time '{}' from weather.gov",
            period.start_time
        ))
    })?;
    // An overnight period served shortly after midnight still belongs to the
    // previous day's night slot.
    if index == 0 && now_local.hour() < 6 && !period.is_daytime && date == now_local.date() {
        date = date.pred_opt().unwrap_or(date);
    }

    let mut raw = RawPeriod::new(date, period.is_daytime);
    raw.start_time = DateTime::parse_from_rfc3339(&period.start_time).ok();
    raw.end_time = period
        .end_time
        .as_deref()
        .and_then(|t| DateTime::parse_from_rfc3339(t).ok());
    raw.temperature_value = Some(period.temperature);
    raw.description = period.detailed_forecast;
    raw.precip_probability = period.probability_of_precipitation.and_then(|m| m.value);
    // "8 to 13 mph" reads as 13. Zero or missing leaves the field empty so
    // the normalizer's text extraction decides.
    raw.wind_speed = period
        .wind_speed
        .as_deref()
        .map(extract::max_number_in)
        .filter(|v| *v > 0.0);
    raw.wind_direction = period.wind_direction.filter(|d| !d.is_empty());
    Ok(raw)
}

fn map_alerts(payload: GovAlerts, today: NaiveDate) -> Vec<Alert> {
    payload
        .features
        .into_iter()
        .map(|feature| {
            let props = feature.properties;
            let expires = props.expires.unwrap_or_default();
            let headline = props.headline.unwrap_or_default();
            let description = props.description.unwrap_or_default();
            let formatted = format!(
                "expires: {} - {} \n{}",
                format_alert_time(&expires),
                headline,
                description
            );
            Alert {
                do_report: alert_do_report(&expires, today),
                expires,
                headline,
                description,
                formatted,
            }
        })
        .collect()
}

/// "Monday, May 6, 2024, 06:00 PM"; unparseable stamps pass through as-is.
fn format_alert_time(expires: &str) -> String {
    DateTime::parse_from_rfc3339(expires)
        .map(|dt| dt.format("%A, %B %-d, %Y, %I:%M %p").to_string())
        .unwrap_or_else(|_| expires.to_owned())
}

/// An alert is reportable while its expiry date (UTC) has not passed.
/// Unparseable expiry stamps report rather than silently dropping an alert.
fn alert_do_report(expires: &str, today: NaiveDate) -> bool {
    DateTime::parse_from_rfc3339(expires)
        .map(|dt| dt.naive_utc().date() >= today)
        .unwrap_or(true)
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// weather.gov provider instance.
#[derive(Debug, Clone)]
pub struct WeatherGov {
    http: HttpClient,
}

impl WeatherGov {
    /// Build the provider over a shared HTTP client.
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl WxProvider for WeatherGov {
    fn descriptor(&self) -> ProviderDescriptor {
        DESCRIPTOR
    }

    async fn location_urls(&self, location: &UserLocation) -> Result<GeoRecord, ProviderError> {
        let point = match location.kind {
            LocationKind::Gps => geocode::split_gps(&location.value)?,
            LocationKind::City | LocationKind::PostalCode => {
                geocode::lookup(&self.http, &location.value).await?
            }
        };
        let alerts_url = format!(
            "https://api.weather.gov/alerts?point={}%2C{}&status=actual&message_type=alert",
            point.lat, point.lon
        );
        // The points endpoint maps coordinates to the gridpoint forecast URL.
        let points_url = format!("https://api.weather.gov/points/{},{}", point.lat, point.lon);
        let body = self
            .http
            .fetch_json("weather.gov points", &points_url, true, false)
            .await?;
        let forecast_url = body
            .get("properties")
            .and_then(|p| p.get("forecast"))
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ProviderError::InvalidPayload(
                    "no forecast URL in weather.gov points response".to_owned(),
                )
            })?;
        Ok(GeoRecord {
            forecast_url: forecast_url.to_owned(),
            alerts_url,
        })
    }

    async fn fetch_forecast(&self, url: &str) -> Result<RawForecast, ProviderError> {
        if !url.starts_with(API_PREFIX) {
            return Err(ProviderError::InvalidUrl(
                "Invalid weather.gov URL".to_owned(),
            ));
        }
        let body = self.http.fetch_json("weather.gov", url, true, false).await?;
        let payload: GovForecast =
            serde_json::from_value(body).map_err(|source| ProviderError::Parse {
                info: "weather.gov".to_owned(),
                source,
            })?;
        map_forecast(payload, url, Utc::now(), Local::now().naive_local())
    }

    async fn fetch_alerts(&self, url: &str) -> Result<Vec<Alert>, ProviderError> {
        if !url.starts_with(ALERTS_PREFIX) {
            return Err(ProviderError::InvalidUrl(
                "Invalid or missing alerts URL. Must be a valid weather.gov API URL".to_owned(),
            ));
        }
        let body = self
            .http
            .fetch_json("weather.gov alerts", url, true, false)
            .await?;
        let payload: GovAlerts =
            serde_json::from_value(body).map_err(|source| ProviderError::Parse {
                info: "weather.gov alerts".to_owned(),
                source,
            })?;
        Ok(map_alerts(payload, Utc::now().date_naive()))
    }
}
