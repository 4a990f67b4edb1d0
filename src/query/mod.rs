//! Query engine: turns a classified intent plus a canonical forecast into
//! ordered display lines.
//!
//! Every formatter returns at least one line. A query that matches nothing
//! yields a single explanatory line instead of an empty list, because the
//! chat layer treats an empty reply set as an error.

use chrono::Timelike;
use regex::Regex;

use crate::chat::markup;
use crate::lexicon::ForecastSelection;
use crate::wx::{dayname, Alert, CanonicalForecast, Day, Period, PeriodResolution};

const INVALID_TEMP_PARAM: &str = "Invalid temperature parameter format. Please use 'hilo<>X' or 'hi<>X' or 'lo<>X' where X is a temperature.";
const INVALID_RAIN_PARAM: &str =
    "Invalid rain parameter format. Please use 'r>X' or 'r<X' where X is a percentage.";
const INVALID_WIND_PARAM: &str = "Invalid wind parameter format. Please use 'wmin>X', 'wmin<X', 'wmax>X', 'wmax<X', or 'gmin>X' where X is in mph.";
const NO_BAD_WEATHER: &str = "No periods with bad weather found in the forecast.";
const NO_ALERTS: &str = "Good news! No active location alerts found.";
const NO_MATCHING_PERIODS: &str = "No matching forecast periods found.";
const NO_NIGHT_FORECAST: &str = "No nighttime forecast available for tonight.";
const NO_TEMPERATURE_DATA: &str = "No temperature data found in the forecast.";

/// Display thresholds and highlight words consumed while formatting.
///
/// Thresholds only affect highlighting, never filtering.
#[derive(Debug, Clone)]
pub struct DisplayContext {
    /// Day highs above this are emphasized in summaries.
    pub temp_hot: f64,
    /// Day lows below this are emphasized in summaries.
    pub temp_cold: f64,
    /// Keywords bolded inside bad-weather descriptions.
    pub bad_weather_words: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TempKind {
    Hi,
    Lo,
    HiLo,
}

#[derive(Debug, Clone, Copy)]
struct TempFilter {
    kind: TempKind,
    op: char,
    threshold: f64,
}

fn compare(value: f64, op: char, threshold: f64) -> bool {
    if op == '>' {
        value > threshold
    } else {
        value < threshold
    }
}

fn op_word(op: char) -> &'static str {
    if op == '>' {
        "above"
    } else {
        "below"
    }
}

/// Format a number without a trailing ".0".
fn fmt_num(v: f64) -> String {
    if v.fract().abs() < f64::EPSILON {
        format!("{v:.0}")
    } else {
        format!("{v}")
    }
}

/// Collapse runs of spaces and strip leading whitespace.
fn cleanup(line: &str) -> String {
    let collapsed = match Regex::new(r" {2,}") {
        Ok(re) => re.replace_all(line, " ").into_owned(),
        Err(_) => line.to_owned(),
    };
    collapsed.trim_start().to_owned()
}

fn format_period(period: &Period) -> String {
    cleanup(&format!(
        "{}: {}",
        markup::bold(&period.info.display_name),
        markup::escape(&period.description)
    ))
}

fn parse_temp(filter: &str) -> Option<TempFilter> {
    let caps = Regex::new(r"^(hilo|hi|lo)([<>])(\d+)$")
        .ok()?
        .captures(filter.trim())?;
    let kind = match caps.get(1)?.as_str() {
        "hi" => TempKind::Hi,
        "lo" => TempKind::Lo,
        _ => TempKind::HiLo,
    };
    let op = caps.get(2)?.as_str().chars().next()?;
    let threshold = caps.get(3)?.as_str().parse().ok()?;
    Some(TempFilter {
        kind,
        op,
        threshold,
    })
}

/// Temperature query. `None` filter renders the plain day-by-day summary.
pub fn temperature(
    forecast: &CanonicalForecast,
    filter: Option<&str>,
    ctx: &DisplayContext,
) -> Vec<String> {
    let Some(filter) = filter else {
        return temperature_summary(forecast, ctx);
    };
    let Some(parsed) = parse_temp(filter) else {
        return vec![INVALID_TEMP_PARAM.to_owned()];
    };

    let mut lines = Vec::new();
    if matches!(forecast.metadata.period_resolution, PeriodResolution::Daily) {
        for day in &forecast.days {
            let Some((label, value)) = daily_temp_match(day, parsed) else {
                continue;
            };
            let descr = day
                .periods
                .first()
                .map(|p| p.description.as_str())
                .unwrap_or_default();
            lines.push(cleanup(&format!(
                "{}: {}. {}",
                markup::bold(&day.info.display_name),
                markup::bold(&format!("{label}: {}\u{b0}F", fmt_num(value))),
                markup::escape(descr)
            )));
        }
    } else {
        for period in forecast.periods() {
            let Some(value) = period_temp_match(period, parsed) else {
                continue;
            };
            let label = if period.is_daytime { "High" } else { "Low" };
            lines.push(cleanup(&format!(
                "{}: {}. {}",
                markup::bold(&period.info.display_name),
                markup::bold(&format!("{label}: {}\u{b0}F", fmt_num(value))),
                markup::escape(&period.description)
            )));
        }
    }

    if lines.is_empty() {
        let subject = match parsed.kind {
            TempKind::Hi => "high temperatures",
            TempKind::Lo => "low temperatures",
            TempKind::HiLo => "temperatures",
        };
        lines.push(format!(
            "No periods found with {subject} {} {}\u{b0}F.",
            op_word(parsed.op),
            fmt_num(parsed.threshold)
        ));
    }
    lines
}

/// Day-record match: `hi` tests the day high, `lo` the day low, `hilo`
/// passes when either does.
fn daily_temp_match(day: &Day, filter: TempFilter) -> Option<(&'static str, f64)> {
    let high = day.temperatures.high;
    let low = day.temperatures.low;
    let hit_high = high.is_some_and(|v| compare(v, filter.op, filter.threshold));
    let hit_low = low.is_some_and(|v| compare(v, filter.op, filter.threshold));
    match filter.kind {
        TempKind::Hi if hit_high => Some(("High", high?)),
        TempKind::Lo if hit_low => Some(("Low", low?)),
        TempKind::HiLo if hit_high => Some(("High", high?)),
        TempKind::HiLo if hit_low => Some(("Low", low?)),
        _ => None,
    }
}

/// Period match: `hi` looks only at daytime periods, `lo` only at night
/// periods, `hilo` at any period's headline value.
fn period_temp_match(period: &Period, filter: TempFilter) -> Option<f64> {
    let value = period.temperature?;
    let relevant = match filter.kind {
        TempKind::Hi => period.is_daytime,
        TempKind::Lo => !period.is_daytime,
        TempKind::HiLo => true,
    };
    (relevant && compare(value, filter.op, filter.threshold)).then_some(value)
}

fn temperature_summary(forecast: &CanonicalForecast, ctx: &DisplayContext) -> Vec<String> {
    let mut lines = Vec::new();
    for day in &forecast.days {
        let Some(high) = day.temperatures.high else {
            continue;
        };
        let hi_text = format!("{}\u{b0}", fmt_num(high));
        let hi_part = if high > ctx.temp_hot {
            markup::bold(&hi_text)
        } else {
            markup::escape(&hi_text)
        };
        let mut line = format!("{} (hi: {hi_part}", markup::bold(&day.info.display_name));
        if let Some(low) = day.temperatures.low {
            let lo_text = format!("{}\u{b0}", fmt_num(low));
            let lo_part = if low < ctx.temp_cold {
                markup::italic(&lo_text)
            } else {
                markup::escape(&lo_text)
            };
            line.push_str(&format!(", night: {lo_part}"));
        }
        line.push(')');
        lines.push(line);
    }
    if lines.is_empty() {
        lines.push(NO_TEMPERATURE_DATA.to_owned());
    }
    lines
}

/// Rain probability query over an `r>N` / `r<N` filter.
pub fn rain(forecast: &CanonicalForecast, filter: &str) -> Vec<String> {
    let parsed = Regex::new(r"^r([<>])(\d+)$")
        .ok()
        .and_then(|re| re.captures(filter.trim()))
        .and_then(|caps| {
            let op = caps.get(1)?.as_str().chars().next()?;
            let threshold: f64 = caps.get(2)?.as_str().parse().ok()?;
            Some((op, threshold))
        });
    let Some((op, threshold)) = parsed else {
        return vec![INVALID_RAIN_PARAM.to_owned()];
    };

    let mut lines: Vec<String> = forecast
        .periods()
        .filter(|p| compare(p.precipitation.probability, op, threshold))
        .map(|p| {
            cleanup(&format!(
                "{}: {}. {}",
                markup::bold(&p.info.display_name),
                markup::bold(&format!(
                    "{}% chance of rain",
                    fmt_num(p.precipitation.probability)
                )),
                markup::escape(&p.description)
            ))
        })
        .collect();

    if lines.is_empty() {
        lines.push(format!(
            "No periods found with rain probability {} {}%.",
            op_word(op),
            fmt_num(threshold)
        ));
    }
    lines
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WindField {
    Min,
    Max,
    GustMin,
}

/// Wind query over a `wmin`/`wmax`/`gmin` filter.
///
/// `wmin`/`wmax` exceed with OR (either speed or gust over the threshold)
/// but stay under with AND (both must be below). `gmin` only supports `>`
/// against the gust value alone.
pub fn wind(forecast: &CanonicalForecast, filter: &str) -> Vec<String> {
    let parsed = Regex::new(r"^(wmin|wmax|gmin)([<>])(\d+)$")
        .ok()
        .and_then(|re| re.captures(filter.trim()))
        .and_then(|caps| {
            let field = match caps.get(1)?.as_str() {
                "wmin" => WindField::Min,
                "wmax" => WindField::Max,
                _ => WindField::GustMin,
            };
            let op = caps.get(2)?.as_str().chars().next()?;
            let threshold: f64 = caps.get(3)?.as_str().parse().ok()?;
            Some((field, op, threshold))
        });
    let Some((field, op, threshold)) = parsed else {
        return vec![INVALID_WIND_PARAM.to_owned()];
    };
    if field == WindField::GustMin && op != '>' {
        return vec![INVALID_WIND_PARAM.to_owned()];
    }

    let hit = |p: &Period| match field {
        WindField::Min | WindField::Max => {
            if op == '>' {
                p.wind.speed > threshold || p.wind.gust > threshold
            } else {
                p.wind.speed < threshold && p.wind.gust < threshold
            }
        }
        WindField::GustMin => p.wind.gust > threshold,
    };

    let mut lines: Vec<String> = forecast
        .periods()
        .filter(|p| hit(p))
        .map(|p| {
            let mut info = format!("Wind: {} mph", fmt_num(p.wind.speed));
            if p.wind.gust > 0.0 && (p.wind.gust - p.wind.speed).abs() > f64::EPSILON {
                info.push_str(&format!(", gusts up to {} mph", fmt_num(p.wind.gust)));
            }
            cleanup(&format!(
                "{}: {}. {}",
                markup::bold(&p.info.display_name),
                markup::bold(&info),
                markup::escape(&p.description)
            ))
        })
        .collect();

    if lines.is_empty() {
        let subject = if field == WindField::GustMin {
            "gust"
        } else {
            "wind"
        };
        lines.push(format!(
            "No periods found with {subject} speeds {} {} mph.",
            op_word(op),
            fmt_num(threshold)
        ));
    }
    lines
}

/// Bad-weather scan with keyword highlighting in the rendered descriptions.
pub fn bad_weather(forecast: &CanonicalForecast, ctx: &DisplayContext) -> Vec<String> {
    let mut lines: Vec<String> = forecast
        .periods()
        .filter(|p| p.is_bad_weather)
        .map(|p| {
            let descr = highlight_keywords(&p.description, &ctx.bad_weather_words);
            cleanup(&format!(
                "{}: {descr}",
                markup::bold(&p.info.display_name)
            ))
        })
        .collect();
    if lines.is_empty() {
        lines.push(NO_BAD_WEATHER.to_owned());
    }
    lines
}

fn highlight_keywords(descr: &str, words: &[String]) -> String {
    let mut out = markup::escape(descr);
    for word in words {
        let pattern = format!(r"(?i)\b{}\b", regex::escape(word));
        if let Ok(regex) = Regex::new(&pattern) {
            out = regex.replace_all(&out, "<b>$0</b>").into_owned();
        }
    }
    out
}

/// Active alerts, already formatted at ingest. Stale alerts never render.
pub fn alerts(alerts: &[Alert]) -> Vec<String> {
    let lines: Vec<String> = alerts
        .iter()
        .filter(|a| a.do_report)
        .map(|a| markup::escape(&a.formatted))
        .collect();
    if lines.is_empty() {
        vec![NO_ALERTS.to_owned()]
    } else {
        lines
    }
}

/// Forecast period selection.
pub fn forecast_periods(
    forecast: &CanonicalForecast,
    selection: &ForecastSelection,
) -> Vec<String> {
    let days = &forecast.days;
    let selected: Vec<&Period> = match selection {
        ForecastSelection::All => forecast.periods().collect(),
        ForecastSelection::Days(n) => days
            .iter()
            .take(usize::try_from(*n).unwrap_or(usize::MAX))
            .flat_map(|d| d.periods.iter())
            .collect(),
        ForecastSelection::DayName(value) => next_day_matching(days, value)
            .map(|d| d.periods.iter().collect())
            .unwrap_or_default(),
        ForecastSelection::Weekend => days
            .iter()
            .filter(|d| d.info.is_weekend)
            .flat_map(|d| d.periods.iter())
            .collect(),
        ForecastSelection::Today => days
            .first()
            .map(|d| d.periods.iter().collect())
            .unwrap_or_default(),
        ForecastSelection::Tonight => return tonight_lines(forecast),
        ForecastSelection::Tomorrow => days
            .get(1)
            .map(|d| d.periods.iter().collect())
            .unwrap_or_default(),
        ForecastSelection::Search(value) => {
            let needle = value.to_lowercase();
            forecast
                .periods()
                .filter(|p| p.description.to_lowercase().contains(&needle))
                .collect()
        }
    };

    let mut lines: Vec<String> = selected.into_iter().map(format_period).collect();
    if lines.is_empty() {
        lines.push(NO_MATCHING_PERIODS.to_owned());
    }
    lines
}

/// First day whose weekday matches the requested name (prefix match) or
/// weekday number; forecasts long enough to repeat a weekday only return
/// the next occurrence.
fn next_day_matching<'a>(days: &'a [Day], value: &str) -> Option<&'a Day> {
    days.iter().find(|d| {
        let name = dayname::weekday_name(d.info.weekday).to_lowercase();
        name.starts_with(value) || d.info.weekday.num_days_from_sunday().to_string() == value
    })
}

fn tonight_lines(forecast: &CanonicalForecast) -> Vec<String> {
    let days = &forecast.days;
    match forecast.metadata.period_resolution {
        // A day record covers the night too.
        PeriodResolution::Daily => {
            let lines: Vec<String> = days
                .first()
                .map(|d| d.periods.iter().map(format_period).collect())
                .unwrap_or_default();
            if lines.is_empty() {
                vec![NO_NIGHT_FORECAST.to_owned()]
            } else {
                lines
            }
        }
        PeriodResolution::TwelveHour => days
            .first()
            .and_then(|d| d.periods.iter().find(|p| !p.is_daytime))
            .map(|p| vec![format_period(p)])
            .unwrap_or_else(|| vec![NO_NIGHT_FORECAST.to_owned()]),
        // Hours 18-24 tonight plus 0-6 of the next day.
        PeriodResolution::Hourly => {
            let mut periods: Vec<&Period> = Vec::new();
            if let Some(day0) = days.first() {
                periods.extend(
                    day0.periods
                        .iter()
                        .filter(|p| hour_of(p).is_some_and(|h| h >= 18)),
                );
            }
            if let Some(day1) = days.get(1) {
                periods.extend(
                    day1.periods
                        .iter()
                        .filter(|p| hour_of(p).is_some_and(|h| h < 6)),
                );
            }
            if periods.is_empty() {
                vec![NO_NIGHT_FORECAST.to_owned()]
            } else {
                periods.into_iter().map(format_period).collect()
            }
        }
    }
}

fn hour_of(period: &Period) -> Option<u32> {
    period.start_time.map(|t| t.hour())
}
