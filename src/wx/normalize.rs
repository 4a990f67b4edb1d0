//! Provider payload normalization into the canonical model.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::{
    dayname, extract, CanonicalForecast, Day, DayTemperatures, ForecastMetadata, Period,
    PeriodResolution, Precipitation, ProviderDescriptor, RawForecast, RawPeriod, Wind,
};

/// Normalize a provider payload into the canonical day/period model.
///
/// Pure: the same raw input and keyword list always produce the same output.
/// Day naming is anchored to the first period's date, never the wall clock,
/// so a cached forecast renders identically on every read.
pub fn normalize(raw: RawForecast, bad_weather_words: &[String]) -> CanonicalForecast {
    let metadata = ForecastMetadata {
        provider_name: raw.provider.name.to_owned(),
        provider_type: raw.provider.provider_type,
        period_resolution: raw.provider.period_resolution,
        location_timezone: raw.timezone,
        source_url: raw.source_url,
        generated_at: raw.generated_at,
        valid_until: raw.valid_until,
    };

    let Some(reference) = raw.periods.first().map(|p| p.date) else {
        return CanonicalForecast {
            metadata,
            days: Vec::new(),
        };
    };

    let mut by_date: BTreeMap<NaiveDate, Vec<Period>> = BTreeMap::new();
    for raw_period in raw.periods {
        let period = normalize_period(raw_period, reference, &raw.provider, bad_weather_words);
        by_date.entry(period.date).or_default().push(period);
    }

    let days = by_date
        .into_iter()
        .map(|(date, periods)| Day {
            date,
            info: dayname::day_info(date, reference, true),
            temperatures: day_temperatures(raw.provider.period_resolution, &periods),
            periods,
        })
        .collect();

    CanonicalForecast { metadata, days }
}

fn normalize_period(
    p: RawPeriod,
    reference: NaiveDate,
    provider: &ProviderDescriptor,
    bad_weather_words: &[String],
) -> Period {
    let precision = provider.precision;
    let round = |v: f64| extract::round_to(v, precision);

    // Wind numbers fall back to text extraction over the plain description,
    // which is where weather.gov states them.
    let wind_speed = p
        .wind_speed
        .unwrap_or_else(|| extract::wind_speed_from_text(&p.description));
    let wind_gust = p
        .wind_gust
        .unwrap_or_else(|| extract::wind_gust_from_text(&p.description));

    let description = match (provider.capabilities.use_enhanced_description, &p.enhanced_description)
    {
        (true, Some(enhanced)) if !enhanced.is_empty() => enhanced.clone(),
        _ => p.description.clone(),
    };

    let lowered = description.to_lowercase();
    let keyword_hit = bad_weather_words
        .iter()
        .any(|word| lowered.contains(&word.to_lowercase()));
    let code_hit = match (provider.capabilities.bad_weather_codes, p.condition_code) {
        (Some(codes), Some(code)) => codes.contains(&code),
        _ => false,
    };

    Period {
        date: p.date,
        info: dayname::day_info(p.date, reference, p.is_daytime),
        is_daytime: p.is_daytime,
        start_time: p.start_time,
        end_time: p.end_time,
        temperature: p.temperature_value.map(round),
        temperature_low: p.temperature_low.map(round),
        feels_like: p.feels_like.map(round),
        description,
        precipitation: Precipitation {
            probability: round(p.precip_probability.unwrap_or(0.0)),
            // Amounts keep two decimals regardless of provider precision.
            amount: p.precip_amount.map(|v| extract::round_to(v, 2)),
            kind: p.precip_kind,
        },
        wind: Wind {
            speed: round(wind_speed),
            gust: round(wind_gust),
            direction: p.wind_direction,
        },
        atmospheric: p.atmospheric,
        astronomy: p.astronomy,
        is_bad_weather: keyword_hit || code_hit,
    }
}

fn fold_max(values: impl Iterator<Item = f64>) -> Option<f64> {
    values.fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
}

fn fold_min(values: impl Iterator<Item = f64>) -> Option<f64> {
    values.fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.min(v))))
}

/// Derive a day's high and low from its periods.
///
/// A day record (or a day that only has one period, like a forecast that
/// opens on tonight) takes the high from any period value. Day/night pairs
/// take the high from daytime values only. The low prefers an explicit low
/// field and otherwise uses nighttime period values.
fn day_temperatures(resolution: PeriodResolution, periods: &[Period]) -> DayTemperatures {
    let low_candidate = |p: &Period| {
        p.temperature_low
            .or(if p.is_daytime { None } else { p.temperature })
    };

    let high = if matches!(resolution, PeriodResolution::Daily) || periods.len() == 1 {
        fold_max(periods.iter().filter_map(|p| p.temperature))
    } else {
        fold_max(
            periods
                .iter()
                .filter(|p| p.is_daytime)
                .filter_map(|p| p.temperature),
        )
    };
    let low = fold_min(periods.iter().filter_map(low_candidate));

    DayTemperatures { high, low }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::wx::{ProviderCapabilities, ProviderType};

    const CODES: &[u32] = &[600, 601, 602];

    fn daily_provider() -> ProviderDescriptor {
        ProviderDescriptor {
            name: "test-daily",
            provider_type: ProviderType::Daily,
            period_resolution: PeriodResolution::Daily,
            capabilities: ProviderCapabilities {
                use_enhanced_description: true,
                bad_weather_codes: Some(CODES),
                has_precip_amount: true,
            },
            precision: 0,
            cache_ttl_secs: 3600,
        }
    }

    fn multi_provider() -> ProviderDescriptor {
        ProviderDescriptor {
            name: "test-multi",
            provider_type: ProviderType::MultiPeriod,
            period_resolution: PeriodResolution::TwelveHour,
            capabilities: ProviderCapabilities {
                use_enhanced_description: false,
                bad_weather_codes: None,
                has_precip_amount: false,
            },
            precision: 0,
            cache_ttl_secs: 3600,
        }
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn raw(provider: ProviderDescriptor, periods: Vec<RawPeriod>) -> RawForecast {
        RawForecast {
            provider,
            timezone: "America/Denver".to_owned(),
            source_url: "https://example.test/forecast".to_owned(),
            generated_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            valid_until: Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap(),
            periods,
        }
    }

    #[test]
    fn day_night_pair_derives_high_and_low() {
        let mut day = RawPeriod::new(date(1), true);
        day.temperature_value = Some(80.0);
        day.description = "Sunny".to_owned();
        let mut night = RawPeriod::new(date(1), false);
        night.temperature_value = Some(40.0);
        night.description = "Clear".to_owned();

        let forecast = normalize(raw(multi_provider(), vec![day, night]), &[]);
        assert_eq!(forecast.days.len(), 1);
        let temps = forecast.days[0].temperatures;
        assert_eq!(temps.high, Some(80.0));
        assert_eq!(temps.low, Some(40.0));
        assert_eq!(forecast.days[0].periods.len(), 2);
        assert_eq!(forecast.days[0].info.display_name, "Today");
    }

    #[test]
    fn daily_record_uses_explicit_low() {
        let mut p = RawPeriod::new(date(1), true);
        p.temperature_value = Some(75.0);
        p.temperature_low = Some(52.0);
        p.description = "Warm".to_owned();

        let forecast = normalize(raw(daily_provider(), vec![p]), &[]);
        let temps = forecast.days[0].temperatures;
        assert_eq!(temps.high, Some(75.0));
        assert_eq!(temps.low, Some(52.0));
    }

    #[test]
    fn night_only_day_still_gets_a_high() {
        // A forecast opening on tonight has a single night period for day 0.
        let mut night = RawPeriod::new(date(1), false);
        night.temperature_value = Some(48.0);
        let mut next_day = RawPeriod::new(date(2), true);
        next_day.temperature_value = Some(70.0);

        let forecast = normalize(raw(multi_provider(), vec![night, next_day]), &[]);
        assert_eq!(forecast.days[0].temperatures.high, Some(48.0));
        assert_eq!(forecast.days[0].temperatures.low, Some(48.0));
        assert_eq!(forecast.days[0].periods[0].info.display_name, "Tonight");
    }

    #[test]
    fn enhanced_description_only_with_capability() {
        let mut p = RawPeriod::new(date(1), true);
        p.description = "plain".to_owned();
        p.enhanced_description = Some("narrative".to_owned());

        let enhanced = normalize(raw(daily_provider(), vec![p.clone()]), &[]);
        assert_eq!(enhanced.days[0].periods[0].description, "narrative");

        let plain = normalize(raw(multi_provider(), vec![p]), &[]);
        assert_eq!(plain.days[0].periods[0].description, "plain");
    }

    #[test]
    fn wind_extracted_from_text_when_fields_missing() {
        let mut p = RawPeriod::new(date(1), true);
        p.description = "Breezy. Southwest wind at 18 mph, with gusts as high as 30 mph.".to_owned();

        let forecast = normalize(raw(multi_provider(), vec![p]), &[]);
        let wind = &forecast.days[0].periods[0].wind;
        assert_eq!(wind.speed, 18.0);
        assert_eq!(wind.gust, 30.0);
    }

    #[test]
    fn explicit_wind_fields_win_over_text() {
        let mut p = RawPeriod::new(date(1), true);
        p.description = "wind at 5 mph".to_owned();
        p.wind_speed = Some(12.0);
        p.wind_gust = Some(0.0);

        let forecast = normalize(raw(multi_provider(), vec![p]), &[]);
        assert_eq!(forecast.days[0].periods[0].wind.speed, 12.0);
        assert_eq!(forecast.days[0].periods[0].wind.gust, 0.0);
    }

    #[test]
    fn bad_weather_from_keyword_or_code() {
        let words = vec!["thunderstorm".to_owned(), "hail".to_owned()];

        let mut by_text = RawPeriod::new(date(1), true);
        by_text.description = "Scattered Thunderstorms possible".to_owned();
        let forecast = normalize(raw(multi_provider(), vec![by_text]), &words);
        assert!(forecast.days[0].periods[0].is_bad_weather);

        let mut by_code = RawPeriod::new(date(1), true);
        by_code.description = "Cloudy".to_owned();
        by_code.condition_code = Some(601);
        let forecast = normalize(raw(daily_provider(), vec![by_code]), &words);
        assert!(forecast.days[0].periods[0].is_bad_weather);

        let mut neither = RawPeriod::new(date(1), true);
        neither.description = "Cloudy".to_owned();
        neither.condition_code = Some(801);
        let forecast = normalize(raw(daily_provider(), vec![neither]), &words);
        assert!(!forecast.days[0].periods[0].is_bad_weather);
    }

    #[test]
    fn codes_ignored_without_a_code_table() {
        let mut p = RawPeriod::new(date(1), true);
        p.description = "Cloudy".to_owned();
        p.condition_code = Some(601);
        let forecast = normalize(raw(multi_provider(), vec![p]), &[]);
        assert!(!forecast.days[0].periods[0].is_bad_weather);
    }

    #[test]
    fn probability_defaults_to_zero() {
        let p = RawPeriod::new(date(1), true);
        let forecast = normalize(raw(multi_provider(), vec![p]), &[]);
        assert_eq!(forecast.days[0].periods[0].precipitation.probability, 0.0);
    }

    #[test]
    fn days_sorted_ascending() {
        let periods = vec![
            RawPeriod::new(date(1), true),
            RawPeriod::new(date(1), false),
            RawPeriod::new(date(2), true),
            RawPeriod::new(date(3), true),
        ];
        let forecast = normalize(raw(multi_provider(), periods), &[]);
        let dates: Vec<NaiveDate> = forecast.days.iter().map(|d| d.date).collect();
        assert_eq!(dates, vec![date(1), date(2), date(3)]);
    }

    #[test]
    fn normalization_is_deterministic() {
        let mut p = RawPeriod::new(date(1), true);
        p.temperature_value = Some(72.4);
        p.description = "wind at 9 mph".to_owned();
        let words = vec!["snow".to_owned()];

        let once = normalize(raw(multi_provider(), vec![p.clone()]), &words);
        let twice = normalize(raw(multi_provider(), vec![p]), &words);
        assert_eq!(once, twice);
        assert_eq!(once.days[0].periods[0].temperature, Some(72.0));
    }

    #[test]
    fn empty_periods_produce_empty_days() {
        let forecast = normalize(raw(multi_provider(), Vec::new()), &[]);
        assert!(forecast.days.is_empty());
        assert_eq!(forecast.metadata.provider_name, "test-multi");
    }
}
