//! Numeric extraction from forecast description text.
//!
//! weather.gov narratives bury wind numbers in prose ("south wind at 12 mph,
//! with gusts as high as 25 mph"); these helpers pull them out so wind
//! queries always have a number to compare against.

use regex::Regex;

const SPEED_PATTERNS: &[&str] = &[
    r"(?i)wind(?:s|y)? (?:from|at|of) (\d+)",
    r"(?i)(\d+)\s*mph wind",
    r"(?i)wind speeds? (?:up to )?(\d+)",
];

const GUST_PATTERNS: &[&str] = &[
    r"(?i)gusts as high as (\d+)",
    r"(?i)gusting to (\d+)",
    r"(?i)gusts up to (\d+)",
    r"(?i)wind gusts (\d+)",
];

fn first_capture(patterns: &[&str], text: &str) -> Option<f64> {
    for pattern in patterns {
        if let Ok(regex) = Regex::new(pattern) {
            if let Some(value) = regex
                .captures(text)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse::<f64>().ok())
            {
                return Some(value);
            }
        }
    }
    None
}

/// Sustained wind speed stated in free text, mph. 0 when none is mentioned.
pub fn wind_speed_from_text(text: &str) -> f64 {
    first_capture(SPEED_PATTERNS, text).unwrap_or(0.0)
}

/// Gust speed stated in free text, mph. 0 when none is mentioned.
pub fn wind_gust_from_text(text: &str) -> f64 {
    first_capture(GUST_PATTERNS, text).unwrap_or(0.0)
}

/// Largest integer anywhere in a string ("8 to 13 mph" is 13), 0 when none.
pub fn max_number_in(text: &str) -> f64 {
    let Ok(regex) = Regex::new(r"\d+") else {
        return 0.0;
    };
    regex
        .find_iter(text)
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .fold(0.0, f64::max)
}

/// Round to `precision` decimal places, halves away from zero.
pub fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(i32::try_from(precision).unwrap_or(i32::MAX));
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_from_at_phrase() {
        let text = "Sunny, with a high near 80. South wind at 12 mph.";
        assert_eq!(wind_speed_from_text(text), 12.0);
    }

    #[test]
    fn speed_from_mph_wind_phrase() {
        assert_eq!(wind_speed_from_text("Expect a 15 mph wind all day."), 15.0);
    }

    #[test]
    fn speed_from_wind_speeds_phrase() {
        assert_eq!(wind_speed_from_text("Wind speeds up to 22 expected."), 22.0);
        assert_eq!(wind_speed_from_text("wind speed 9 this morning"), 9.0);
    }

    #[test]
    fn speed_defaults_to_zero() {
        assert_eq!(wind_speed_from_text("Clear and calm overnight."), 0.0);
    }

    #[test]
    fn gust_phrases() {
        assert_eq!(wind_gust_from_text("with gusts as high as 25 mph"), 25.0);
        assert_eq!(wind_gust_from_text("gusting to 40 mph at times"), 40.0);
        assert_eq!(wind_gust_from_text("Gusts up to 31 mph."), 31.0);
        assert_eq!(wind_gust_from_text("wind gusts 28 mph possible"), 28.0);
        assert_eq!(wind_gust_from_text("breezy but steady"), 0.0);
    }

    #[test]
    fn max_number_takes_largest() {
        assert_eq!(max_number_in("8 to 13 mph"), 13.0);
        assert_eq!(max_number_in("25 mph dropping to 10"), 25.0);
        assert_eq!(max_number_in("calm"), 0.0);
    }

    #[test]
    fn rounding_half_away_from_zero() {
        assert_eq!(round_to(0.5, 0), 1.0);
        assert_eq!(round_to(2.25, 1), 2.3);
        assert_eq!(round_to(-0.5, 0), -1.0);
        assert_eq!(round_to(72.349, 0), 72.0);
        assert_eq!(round_to(0.125, 2), 0.13);
    }
}
