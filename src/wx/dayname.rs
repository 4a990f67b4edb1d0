//! Human day naming relative to the forecast's own "today".
//!
//! The reference date is always the first period's date, never the wall
//! clock, so a cached forecast keeps naming its days consistently.

use chrono::{Datelike, Days, NaiveDate, Weekday};

use super::DayInfo;

/// Full English weekday name.
pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

fn ordinal_suffix(day: u32) -> &'static str {
    if (11..=13).contains(&(day % 100)) {
        return "th";
    }
    match day % 10 {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    }
}

/// Name `target` relative to `reference`.
///
/// Precedence: Today/Tonight, Tomorrow, bare weekday through the end of the
/// current week (Sunday), "Next <weekday>" for the week after, and
/// "<weekday> the <Nth>" beyond that. Night periods get the " night" form
/// except Tonight, which already implies it.
pub fn day_info(target: NaiveDate, reference: NaiveDate, is_daytime: bool) -> DayInfo {
    let weekday = target.weekday();
    let name = weekday_name(weekday);
    let raw_name = if is_daytime {
        name.to_owned()
    } else {
        format!("{name} night")
    };

    let diff_from_today = target.signed_duration_since(reference).num_days();
    let days_until_sunday =
        7u64.saturating_sub(u64::from(reference.weekday().num_days_from_sunday()));
    let end_of_week = reference
        .checked_add_days(Days::new(days_until_sunday))
        .unwrap_or(reference);
    let one_week_after = end_of_week
        .checked_add_days(Days::new(7))
        .unwrap_or(end_of_week);
    let is_next_occurrence = target <= end_of_week;

    let display_name = if diff_from_today == 0 {
        if is_daytime { "Today" } else { "Tonight" }.to_owned()
    } else if diff_from_today == 1 {
        if is_daytime { "Tomorrow" } else { "Tomorrow night" }.to_owned()
    } else if diff_from_today <= 7 && is_next_occurrence {
        raw_name.clone()
    } else if target <= one_week_after {
        format!("Next {raw_name}")
    } else {
        let dom = target.day();
        let suffix = ordinal_suffix(dom);
        if is_daytime {
            format!("{name} the {dom}{suffix}")
        } else {
            format!("{name} night the {dom}{suffix}")
        }
    };

    DayInfo {
        raw_name,
        display_name,
        diff_from_today,
        is_weekend: matches!(weekday, Weekday::Sat | Weekday::Sun),
        weekday,
    }
}
