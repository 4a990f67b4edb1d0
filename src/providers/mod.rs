//! Weather data provider abstraction layer.
//!
//! Defines the [`WxProvider`] trait and the shared fetch/geocoding types
//! used by all provider implementations.
//!
//! Two providers are implemented:
//! - [`weathergov::WeatherGov`] — NWS api.weather.gov, day/night periods
//! - [`weatherbit::WeatherBit`] — weatherbit.io, one record per day
//!
//! The [`ProviderHandle`] facade resolves the active provider from
//! configuration and owns the forecast cache plus the per-location request
//! URLs, so callers only ever deal in canonical forecasts.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::Mutex;

use crate::chat::users::UserLocation;
use crate::config::WeatherConfig;
use crate::wx::{normalize, Alert, CanonicalForecast, ProviderDescriptor, RawForecast};

pub mod cache;
pub mod geocode;
pub mod http;
pub mod weatherbit;
pub mod weathergov;

use cache::ForecastCache;
use http::HttpClient;

// ---------------------------------------------------------------------------
// Core types
// ---------------------------------------------------------------------------

/// Provider request URLs resolved for one stored location value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoRecord {
    /// Forecast endpoint for this location.
    pub forecast_url: String,
    /// Alerts endpoint for this location.
    pub alerts_url: String,
}

/// Fetch time plus the provider TTL, saturating instead of overflowing.
pub(crate) fn expiry(generated_at: DateTime<Utc>, ttl_secs: u64) -> DateTime<Utc> {
    let ttl = TimeDelta::try_seconds(i64::try_from(ttl_secs).unwrap_or(i64::MAX))
        .unwrap_or(TimeDelta::MAX);
    generated_at.checked_add_signed(ttl).unwrap_or(generated_at)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by weather providers.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// HTTP transport failure.
    #[error("{info} request failed: {source}")]
    Request {
        /// Which API was being called.
        info: String,
        /// Underlying transport error.
        source: reqwest::Error,
    },
    /// Upstream responded with a non-success status.
    #[error("{info} returned status {status}")]
    HttpStatus {
        /// Which API was being called.
        info: String,
        /// HTTP status code.
        status: u16,
    },
    /// The retry loop gave up.
    #[error("{info} request failed after {attempts} attempts")]
    RetriesExhausted {
        /// Which API was being called.
        info: String,
        /// How many attempts were made.
        attempts: u32,
    },
    /// Response body did not parse as the expected JSON shape.
    #[error("could not parse {info} response: {source}")]
    Parse {
        /// Which API was being called.
        info: String,
        /// Underlying decode error.
        source: serde_json::Error,
    },
    /// Response parsed but its content is unusable.
    #[error("{0}")]
    InvalidPayload(String),
    /// A request URL does not belong to this provider.
    #[error("{0}")]
    InvalidUrl(String),
    /// Geocoding could not resolve the location.
    #[error("geocoding failed for '{0}'")]
    Geocode(String),
    /// The configured provider id is not implemented.
    #[error("unknown weather provider '{0}'")]
    UnknownProvider(String),
    /// The selected provider needs an API key and none is configured.
    #[error("provider '{0}' requires an API key")]
    MissingApiKey(String),
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Core weather provider interface.
///
/// Implementations must be `Send + Sync` so the chat engine can call them
/// across task boundaries.
#[async_trait]
pub trait WxProvider: Send + Sync {
    /// Static shape and capability description of this provider.
    fn descriptor(&self) -> ProviderDescriptor;

    /// Resolve a stored location into this provider's request URLs,
    /// geocoding free-text locations where the API needs coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when geocoding or the provider's location
    /// lookup fails.
    async fn location_urls(&self, location: &UserLocation) -> Result<GeoRecord, ProviderError>;

    /// Fetch and map one forecast payload.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on transport, parse, or payload failure.
    async fn fetch_forecast(&self, url: &str) -> Result<RawForecast, ProviderError>;

    /// Fetch active alerts. Alerts are never cached.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on transport or parse failure.
    async fn fetch_alerts(&self, url: &str) -> Result<Vec<Alert>, ProviderError>;
}

// ---------------------------------------------------------------------------
// Facade
// ---------------------------------------------------------------------------

/// The one provider the bot talks to, plus its cache and location book.
pub struct ProviderHandle {
    provider: Arc<dyn WxProvider>,
    cache: ForecastCache,
    locations: Mutex<HashMap<String, GeoRecord>>,
    bad_weather_words: Vec<String>,
}

impl ProviderHandle {
    /// Instantiate the configured provider.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::UnknownProvider`] for an unrecognized id and
    /// [`ProviderError::MissingApiKey`] when the provider needs a key that is
    /// not configured.
    pub fn from_config(config: &WeatherConfig) -> Result<Self, ProviderError> {
        let http = HttpClient::new()?;
        let provider: Arc<dyn WxProvider> = match config.provider.as_str() {
            "weather.gov" => Arc::new(weathergov::WeatherGov::new(http)),
            "weatherbit.io" => {
                if config.api_key.trim().is_empty() {
                    return Err(ProviderError::MissingApiKey(config.provider.clone()));
                }
                Arc::new(weatherbit::WeatherBit::new(http, config.api_key.clone()))
            }
            other => return Err(ProviderError::UnknownProvider(other.to_owned())),
        };
        Ok(Self {
            provider,
            cache: ForecastCache::new(),
            locations: Mutex::new(HashMap::new()),
            bad_weather_words: config.bad_weather_words.clone(),
        })
    }

    /// Wrap a specific provider instance for integration tests.
    #[doc(hidden)]
    pub fn for_testing(provider: Arc<dyn WxProvider>, bad_weather_words: Vec<String>) -> Self {
        Self {
            provider,
            cache: ForecastCache::new(),
            locations: Mutex::new(HashMap::new()),
            bad_weather_words,
        }
    }

    /// Descriptor of the active provider.
    pub fn descriptor(&self) -> ProviderDescriptor {
        self.provider.descriptor()
    }

    /// Request URLs for a location, resolving and remembering them on first
    /// use. Keyed by the location value, not its display label.
    async fn location_record(&self, location: &UserLocation) -> Result<GeoRecord, ProviderError> {
        let mut locations = self.locations.lock().await;
        if let Some(existing) = locations.get(&location.value) {
            return Ok(existing.clone());
        }
        let record = self.provider.location_urls(location).await?;
        tracing::info!(
            location = %location.value,
            forecast_url = %record.forecast_url,
            "resolved provider urls for location"
        );
        locations.insert(location.value.clone(), record.clone());
        Ok(record)
    }

    /// Canonical forecast for a location, served from cache while the cached
    /// entry is fresh and from the same local calendar day.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when the upstream fetch or mapping fails.
    pub async fn forecast(
        &self,
        location: &UserLocation,
        force_refresh: bool,
    ) -> Result<CanonicalForecast, ProviderError> {
        let record = self.location_record(location).await?;
        if !force_refresh {
            if let Some(cached) = self.cache.lookup(&record.forecast_url).await {
                tracing::debug!(url = %record.forecast_url, "serving forecast from cache");
                return Ok(cached);
            }
        }
        let raw = self.provider.fetch_forecast(&record.forecast_url).await?;
        let forecast = normalize::normalize(raw, &self.bad_weather_words);
        self.cache.store(forecast.clone()).await;
        Ok(forecast)
    }

    /// Active alerts for a location. Always fetched fresh.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when the upstream fetch or mapping fails.
    pub async fn alerts(&self, location: &UserLocation) -> Result<Vec<Alert>, ProviderError> {
        let record = self.location_record(location).await?;
        self.provider.fetch_alerts(&record.alerts_url).await
    }

    /// Resolve a freshly set location and prime the forecast cache for it.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when resolution or the priming fetch fails.
    pub async fn prepare_location(&self, location: &UserLocation) -> Result<(), ProviderError> {
        self.forecast(location, false).await?;
        Ok(())
    }
}
