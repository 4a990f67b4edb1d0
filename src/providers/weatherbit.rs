//! weatherbit.io provider.
//!
//! Keyed API, one record per calendar day. The wire record is numeric rather
//! than narrative, so this provider builds its own natural-language
//! description from the numbers and flags bad weather through the condition
//! code table.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use url::form_urlencoded;

use crate::chat::users::{LocationKind, UserLocation};
use crate::wx::{
    Alert, Astronomy, Atmospherics, PeriodResolution, ProviderCapabilities, ProviderDescriptor,
    ProviderType, RawForecast, RawPeriod,
};

use super::geocode;
use super::http::HttpClient;
use super::{GeoRecord, ProviderError, WxProvider};

/// Condition codes that force the bad-weather flag: thunderstorms, hail,
/// freezing rain, snow, mixed precipitation, sleet, smoke, sand and
/// freezing fog.
pub const BAD_WEATHER_CODES: [u32; 20] = [
    200, 201, 202, 230, 231, 232, 233, 511, 600, 601, 602, 621, 622, 623, 610, 611, 612, 711,
    731, 751,
];

/// Static shape of the weatherbit.io daily forecast product.
pub const DESCRIPTOR: ProviderDescriptor = ProviderDescriptor {
    name: "weatherbit.io",
    provider_type: ProviderType::Daily,
    period_resolution: PeriodResolution::Daily,
    capabilities: ProviderCapabilities {
        use_enhanced_description: true,
        bad_weather_codes: Some(&BAD_WEATHER_CODES),
        has_precip_amount: true,
    },
    precision: 0,
    cache_ttl_secs: 3600,
};

const API_PREFIX: &str = "https://api.weatherbit.io/";
const ALERTS_PREFIX: &str = "https://api.weatherbit.io/v2.0/alerts";

// ---------------------------------------------------------------------------
// Wire payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct WbForecast {
    #[serde(default)]
    data: Vec<WbDay>,
}

#[derive(Debug, Deserialize)]
struct WbDay {
    valid_date: String,
    #[serde(default)]
    high_temp: f64,
    #[serde(default)]
    low_temp: f64,
    #[serde(default)]
    app_max_temp: Option<f64>,
    #[serde(default)]
    pop: f64,
    #[serde(default)]
    precip: f64,
    #[serde(default)]
    snow: f64,
    #[serde(default)]
    clouds_low: f64,
    #[serde(default)]
    clouds_mid: f64,
    #[serde(default)]
    clouds_hi: f64,
    #[serde(default)]
    wind_spd: f64,
    #[serde(default)]
    wind_gust_spd: f64,
    #[serde(default)]
    wind_cdir_full: String,
    #[serde(default)]
    rh: Option<f64>,
    #[serde(default)]
    vis: Option<f64>,
    #[serde(default)]
    pres: Option<f64>,
    #[serde(default)]
    dewpt: Option<f64>,
    #[serde(default)]
    uv: Option<f64>,
    #[serde(default)]
    sunrise_ts: Option<i64>,
    #[serde(default)]
    sunset_ts: Option<i64>,
    #[serde(default)]
    moon_phase_lunation: Option<f64>,
    #[serde(default)]
    weather: WbWeather,
}

#[derive(Debug, Default, Deserialize)]
struct WbWeather {
    #[serde(default)]
    code: Option<u32>,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct WbAlerts {
    #[serde(default)]
    alerts: Vec<WbAlert>,
}

#[derive(Debug, Deserialize)]
struct WbAlert {
    #[serde(default)]
    expires_local: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
}

// ---------------------------------------------------------------------------
// Enhanced description
// ---------------------------------------------------------------------------

/// Build the narrative description for one day record.
///
/// Phrase order is fixed: temperature, special condition, cloud cover, rain,
/// snow, wind, humidity, visibility, night low, moon phase.
fn enhanced_description(day: &WbDay) -> String {
    let mut phrases: Vec<String> = Vec::new();

    phrases.push(format!("High of {}°F", day.high_temp.round()));

    if let Some(special) = day.weather.code.and_then(condition_phrase) {
        phrases.push(special.to_owned());
    }

    let cloud_avg = (day.clouds_low + day.clouds_mid + day.clouds_hi) / 3.0;
    let cloud_phrase = if cloud_avg < 20.0 {
        "Clear skies"
    } else if cloud_avg < 40.0 {
        "Mostly sunny"
    } else if cloud_avg < 60.0 {
        "Partly cloudy"
    } else if cloud_avg < 80.0 {
        "Mostly cloudy"
    } else {
        "Cloudy"
    };
    phrases.push(cloud_phrase.to_owned());

    if day.pop > 0.0 && day.precip >= 0.1 {
        let intensity = if day.precip < 0.25 {
            "drizzle"
        } else if day.precip <= 0.5 {
            "light"
        } else if day.precip < 0.99 {
            "good"
        } else if day.precip <= 1.5 {
            "moderate"
        } else {
            "heavy"
        };
        let likelihood = if day.pop >= 80.0 {
            format!("{}% chance, expect", day.pop)
        } else if day.pop >= 60.0 {
            format!("{}% chance, likely to see", day.pop)
        } else if day.pop >= 40.0 {
            format!("{}% chance of", day.pop)
        } else {
            format!("{}% slight chance of", day.pop)
        };
        let mut rain_phrase = format!("{likelihood} {intensity} rain");
        if day.precip > 1.0 {
            rain_phrase.push_str(&format!(
                " with accumulation possible of {:.2} inches",
                day.precip
            ));
        }
        phrases.push(rain_phrase);
    }

    if day.snow > 0.0 {
        let snow_phrase = if day.snow < 2.0 {
            format!("{}% chance, light snow", day.snow)
        } else if day.snow < 4.0 {
            format!("{}% chance, moderate snow", day.snow)
        } else if day.snow < 6.0 {
            format!("{}% chance, heavy snow", day.snow)
        } else {
            format!("{}% chance, blizzard conditions", day.snow)
        };
        phrases.push(snow_phrase);
    }

    let ws = day.wind_spd.round();
    let gs = day.wind_gust_spd.round();
    let mut wind_phrase = if ws < 5.0 {
        "Winds under 5 mph".to_owned()
    } else if ws < 10.0 {
        format!(
            "Light winds under 10 mph from the {}",
            day.wind_cdir_full.to_lowercase()
        )
    } else {
        format!(
            "Windy with winds from the {} at {} mph",
            day.wind_cdir_full.to_lowercase(),
            ws
        )
    };
    if gs > ws + 10.0 {
        wind_phrase.push_str(&format!(" with gusts to {gs} mph"));
    }
    phrases.push(wind_phrase);

    match day.rh {
        Some(rh) if rh > 80.0 => phrases.push("Humidity over 80%".to_owned()),
        Some(rh) if rh < 30.0 => phrases.push("Humidity under 30%".to_owned()),
        _ => {}
    }

    if let Some(vis) = day.vis {
        if vis < 5.0 {
            phrases.push(format!("Poor visibility around {vis} miles"));
        }
    }

    phrases.push(format!("Night time low temp of {}°F", day.low_temp.round()));

    if let Some(name) = day.moon_phase_lunation.and_then(moon_phrase) {
        phrases.push(name.to_owned());
    }

    format!("{}.", phrases.join(". "))
}

fn condition_phrase(code: u32) -> Option<&'static str> {
    match code {
        200..=202 | 230..=232 => Some("Thunderstorms"),
        233 => Some("Hail"),
        511 => Some("Freezing rain"),
        600..=602 | 621..=623 => Some("Snow"),
        610 => Some("Mixed snow and rain"),
        611 | 612 => Some("Sleet"),
        711 => Some("Smoke"),
        721 => Some("Haze"),
        731 => Some("Sand/dust"),
        741 => Some("Fog"),
        751 => Some("Freezing fog"),
        _ => None,
    }
}

/// Only the four significant points get a phrase; anything else is silent.
fn moon_phrase(phase: f64) -> Option<&'static str> {
    if (phase - 0.0).abs() < 0.05 || (phase - 1.0).abs() < 0.05 {
        Some("New moon")
    } else if (phase - 0.25).abs() < 0.05 {
        Some("First quarter moon")
    } else if (phase - 0.5).abs() < 0.05 {
        Some("Full moon")
    } else if (phase - 0.75).abs() < 0.05 {
        Some("Last quarter moon")
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Mapping
// ---------------------------------------------------------------------------

fn map_forecast(
    payload: WbForecast,
    source_url: &str,
    now_utc: DateTime<Utc>,
) -> Result<RawForecast, ProviderError> {
    if payload.data.is_empty() {
        return Err(ProviderError::InvalidPayload(
            "no periods returned from weatherbit.io".to_owned(),
        ));
    }
    let mut periods = Vec::with_capacity(payload.data.len());
    for day in payload.data {
        periods.push(map_day(day)?);
    }
    Ok(RawForecast {
        provider: DESCRIPTOR,
        // The daily product does not report the location timezone.
        timezone: "not set".to_owned(),
        source_url: source_url.to_owned(),
        generated_at: now_utc,
        valid_until: super::expiry(now_utc, DESCRIPTOR.cache_ttl_secs),
        periods,
    })
}

fn map_day(day: WbDay) -> Result<RawPeriod, ProviderError> {
    let date = NaiveDate::parse_from_str(&day.valid_date, "%Y-%m-%d").map_err(|_| {
        ProviderError::InvalidPayload(format!(
            "unparseable valid_date '{}' from weatherbit.io",
            day.valid_date
        ))
    })?;
    let enhanced = enhanced_description(&day);

    let mut raw = RawPeriod::new(date, true);
    raw.temperature_value = Some(day.high_temp);
    raw.temperature_low = Some(day.low_temp);
    raw.feels_like = day.app_max_temp;
    raw.enhanced_description = Some(enhanced);
    raw.precip_probability = Some(day.pop);
    raw.precip_amount = Some(day.precip);
    raw.precip_kind = Some("rain".to_owned());
    // Zero wind defers to description text extraction downstream.
    raw.wind_speed = (day.wind_spd > 0.0).then_some(day.wind_spd);
    raw.wind_gust = (day.wind_gust_spd > 0.0).then_some(day.wind_gust_spd);
    raw.atmospheric = Some(Atmospherics {
        visibility: day.vis,
        humidity: day.rh,
        pressure: day.pres,
        dewpoint: day.dewpt,
        uv_index: day.uv,
    });
    raw.astronomy = Astronomy {
        sunrise: timestamp(day.sunrise_ts),
        sunset: timestamp(day.sunset_ts),
        moon_phase: day.moon_phase_lunation,
    };
    raw.condition_code = day.weather.code;
    raw.wind_direction = (!day.wind_cdir_full.is_empty()).then_some(day.wind_cdir_full);
    raw.description = day.weather.description;
    Ok(raw)
}

fn timestamp(ts: Option<i64>) -> Option<DateTime<Utc>> {
    ts.filter(|t| *t > 0)
        .and_then(|t| DateTime::from_timestamp(t, 0))
}

fn map_alert(alert: WbAlert) -> Alert {
    let formatted = format!(
        "expires: {} - {}\n{}",
        format_alert_time(&alert.expires_local),
        alert.title,
        alert.description
    );
    Alert {
        expires: alert.expires_local,
        headline: alert.title,
        description: alert.description,
        // The alerts endpoint only returns active alerts.
        do_report: true,
        formatted,
    }
}

/// "Monday, May 6, 6:00 PM"; unparseable stamps pass through as-is.
///
/// `expires_local` usually has no offset, but some regions include one.
fn format_alert_time(stamp: &str) -> String {
    if let Ok(dt) = NaiveDateTime::parse_from_str(stamp, "%Y-%m-%dT%H:%M:%S") {
        return dt.format("%A, %B %-d, %-I:%M %p").to_string();
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(stamp) {
        return dt.format("%A, %B %-d, %-I:%M %p").to_string();
    }
    stamp.to_owned()
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

fn location_param(location: &UserLocation) -> Result<String, ProviderError> {
    match location.kind {
        LocationKind::Gps => {
            let point = geocode::split_gps(&location.value)?;
            Ok(format!("lat={}&lon={}", point.lat, point.lon))
        }
        LocationKind::City => {
            let encoded: String =
                form_urlencoded::byte_serialize(location.value.as_bytes()).collect();
            Ok(format!("city={encoded}"))
        }
        LocationKind::PostalCode => Ok(format!("postal_code={}&country=US", location.value)),
    }
}

/// weatherbit.io provider instance.
#[derive(Debug, Clone)]
pub struct WeatherBit {
    http: HttpClient,
    api_key: String,
}

impl WeatherBit {
    /// Build the provider over a shared HTTP client and its API key.
    pub fn new(http: HttpClient, api_key: String) -> Self {
        Self { http, api_key }
    }
}

#[async_trait]
impl WxProvider for WeatherBit {
    fn descriptor(&self) -> ProviderDescriptor {
        DESCRIPTOR
    }

    async fn location_urls(&self, location: &UserLocation) -> Result<GeoRecord, ProviderError> {
        // The API takes the location inline, so no geocoding round trip.
        let param = location_param(location)?;
        Ok(GeoRecord {
            forecast_url: format!(
                "https://api.weatherbit.io/v2.0/forecast/daily?{param}&units=I&key={}",
                self.api_key
            ),
            alerts_url: format!(
                "https://api.weatherbit.io/v2.0/alerts?{param}&key={}",
                self.api_key
            ),
        })
    }

    async fn fetch_forecast(&self, url: &str) -> Result<RawForecast, ProviderError> {
        if !url.starts_with(API_PREFIX) {
            return Err(ProviderError::InvalidUrl(
                "Invalid weatherbit.io URL".to_owned(),
            ));
        }
        let body = self
            .http
            .fetch_json("weatherbit.io", url, false, false)
            .await?;
        let payload: WbForecast =
            serde_json::from_value(body).map_err(|source| ProviderError::Parse {
                info: "weatherbit.io".to_owned(),
                source,
            })?;
        map_forecast(payload, url, Utc::now())
    }

    async fn fetch_alerts(&self, url: &str) -> Result<Vec<Alert>, ProviderError> {
        if !url.starts_with(ALERTS_PREFIX) {
            return Err(ProviderError::InvalidUrl(
                "Invalid or missing alerts URL. Must be a valid weatherbit.io API URL".to_owned(),
            ));
        }
        let body = self
            .http
            .fetch_json("weatherbit.io alerts", url, false, false)
            .await?;
        let payload: WbAlerts =
            serde_json::from_value(body).map_err(|source| ProviderError::Parse {
                info: "weatherbit.io alerts".to_owned(),
                source,
            })?;
        Ok(payload.alerts.into_iter().map(map_alert).collect())
    }
}
