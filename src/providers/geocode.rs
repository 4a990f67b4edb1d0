//! Free-form place lookup through geocode.xyz.
//!
//! Cities and postal codes are resolved to coordinates once per location and
//! the result is reused by whichever weather provider is active.

use serde_json::Value;
use url::Url;

use super::http::HttpClient;
use super::ProviderError;

/// Coordinates as returned by the geocoder, kept as strings so provider URLs
/// reproduce the upstream precision exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoPoint {
    /// Latitude.
    pub lat: String,
    /// Longitude.
    pub lon: String,
}

/// Resolve a city name or postal code to coordinates.
///
/// # Errors
///
/// Returns [`ProviderError::Geocode`] when the query cannot form a URL or the
/// response carries no coordinates, and propagates transport failures.
pub async fn lookup(http: &HttpClient, query: &str) -> Result<GeoPoint, ProviderError> {
    let url = geocoder_url(query)?;
    let body = http.fetch_json("geoCode", url.as_str(), true, true).await?;
    let lat = coordinate(&body, "latt");
    let lon = coordinate(&body, "longt");
    match (lat, lon) {
        (Some(lat), Some(lon)) => Ok(GeoPoint { lat, lon }),
        _ => Err(ProviderError::Geocode(format!(
            "no coordinates found for '{query}'"
        ))),
    }
}

/// Split a raw "lat,lon" pair as the user entered it.
///
/// # Errors
///
/// Returns [`ProviderError::Geocode`] when the value is not two non-empty
/// comma-separated parts.
pub fn split_gps(value: &str) -> Result<GeoPoint, ProviderError> {
    let mut parts = value.splitn(2, ',');
    match (parts.next(), parts.next()) {
        (Some(lat), Some(lon)) if !lat.trim().is_empty() && !lon.trim().is_empty() => {
            Ok(GeoPoint {
                lat: lat.trim().to_owned(),
                lon: lon.trim().to_owned(),
            })
        }
        _ => Err(ProviderError::Geocode(format!(
            "GPS coordinates must be 'latitude,longitude', got '{value}'"
        ))),
    }
}

fn geocoder_url(query: &str) -> Result<Url, ProviderError> {
    // Url::parse percent-encodes spaces and other path characters, so city
    // names pass through unmangled.
    Url::parse(&format!("https://geocode.xyz/{query}?region=us&json=1"))
        .map_err(|_| ProviderError::Geocode(format!("could not build geocoder URL for '{query}'")))
}

/// geocode.xyz returns coordinates as strings or numbers depending on the
/// endpoint variant.
fn coordinate(body: &Value, key: &str) -> Option<String> {
    match body.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn city_names_with_spaces_are_percent_encoded() {
        let url = geocoder_url("colorado springs").unwrap();
        assert_eq!(
            url.as_str(),
            "https://geocode.xyz/colorado%20springs?region=us&json=1"
        );
    }

    #[test]
    fn postal_codes_pass_through_untouched() {
        let url = geocoder_url("80907").unwrap();
        assert_eq!(url.as_str(), "https://geocode.xyz/80907?region=us&json=1");
    }

    #[test]
    fn coordinates_accept_both_strings_and_numbers() {
        let body = json!({ "latt": "38.84032", "longt": -105.04240 });
        assert_eq!(coordinate(&body, "latt"), Some("38.84032".to_owned()));
        assert_eq!(coordinate(&body, "longt"), Some("-105.0424".to_owned()));
    }

    #[test]
    fn blank_or_missing_coordinates_are_rejected() {
        let body = json!({ "latt": "", "error": "no results" });
        assert_eq!(coordinate(&body, "latt"), None);
        assert_eq!(coordinate(&body, "longt"), None);
    }

    #[test]
    fn gps_pairs_split_and_trim() {
        let point = split_gps("38.8403, -105.0424").unwrap();
        assert_eq!(point.lat, "38.8403");
        assert_eq!(point.lon, "-105.0424");
    }

    #[test]
    fn malformed_gps_pairs_are_rejected() {
        assert!(split_gps("38.8403").is_err());
        assert!(split_gps("38.8403,").is_err());
        assert!(split_gps(",-105.0424").is_err());
    }
}
