//! Topic vocabulary and the structured intents requests resolve to.
//!
//! A topic owns fuzzy trigger words (for picking the subject of a message)
//! and an ordered criteria list (regexes over the lowercased text that
//! extract a concrete parameter). Criteria carry immutable build templates;
//! every match copies the template into a fresh [`Intent`], so resolving one
//! request can never bleed state into the next.

use regex::Regex;

/// Default rain filter when the topic matched but no criterion did.
pub const RAIN_ANY: &str = "r>0";
/// Default wind filter when the topic matched but no criterion did.
pub const WIND_ANY: &str = "wmin>5";

/// The eight request subjects, in tie-break order.
///
/// When two topics score equally in the fuzzy match, the one declared first
/// here wins, so "any rain this week" stays a rain request even though
/// "week" also triggers forecasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicKind {
    /// Days flagged for bad weather.
    BadWeather,
    /// Active weather alerts.
    Alerts,
    /// Temperature thresholds and summaries.
    Temperature,
    /// Precipitation probability.
    Rain,
    /// Wind and gust speeds.
    Wind,
    /// Forecast period selection.
    Forecasts,
    /// Location changes and display.
    Location,
    /// User administration, host/admin only.
    HostFunctions,
}

impl TopicKind {
    /// Stable label for logs.
    pub fn label(self) -> &'static str {
        match self {
            Self::BadWeather => "bad-weather",
            Self::Alerts => "alerts",
            Self::Temperature => "temperature",
            Self::Rain => "rain",
            Self::Wind => "wind",
            Self::Forecasts => "forecasts",
            Self::Location => "location",
            Self::HostFunctions => "host-functions",
        }
    }
}

/// Which help text a help request asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelpKind {
    /// Full welcome text.
    General,
    /// Worked example requests.
    Examples,
    /// Location commands.
    Location,
    /// Temperature shorthand forms.
    Shortcuts,
    /// Host and admin commands.
    AdminHost,
}

/// How a forecast request selects periods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForecastSelection {
    /// Every period.
    All,
    /// First N days, clipped to what the forecast has.
    Days(u32),
    /// Next occurrence of a weekday ("saturday").
    DayName(String),
    /// Saturday and Sunday.
    Weekend,
    /// The current day.
    Today,
    /// The coming night.
    Tonight,
    /// The next day.
    Tomorrow,
    /// Substring search over descriptions.
    Search(String),
}

/// A location request: show the current one or change it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationChange {
    /// Report the stored location.
    Show,
    /// Set by city or town name.
    City(String),
    /// Set by 5-digit postal code.
    PostalCode(String),
    /// Set by coordinates.
    Gps {
        /// Latitude as written by the user.
        lat: String,
        /// Longitude as written by the user.
        lon: String,
    },
    /// Rename the stored location without refetching.
    Label(String),
}

/// A host/admin administration request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostAction {
    /// List every known user.
    ListUsers,
    /// Enable or disable a user.
    SetEnabled {
        /// Target user id as written.
        user_id: String,
        /// New enabled state.
        enabled: bool,
        /// Reason given for a disable, when any.
        reason: Option<String>,
    },
    /// Move a user between groups.
    ChangeGroup {
        /// Target user id as written.
        user_id: String,
        /// Target group name, validated downstream.
        group: String,
    },
    /// Topic matched but no recognized administration phrase.
    Unknown,
}

/// A fully resolved request, ready for the query engine or a handler.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// Temperature query; `None` filter means the plain weekly summary.
    Temperature {
        /// Filter in `hi>N` / `lo<N` / `hilo<N` form.
        filter: Option<String>,
    },
    /// Rain query with an `r>N` / `r<N` filter.
    Rain {
        /// Filter, defaulted to [`RAIN_ANY`].
        filter: String,
    },
    /// Wind query with a `wmin`/`wmax`/`gmin` filter.
    Wind {
        /// Filter, defaulted to [`WIND_ANY`].
        filter: String,
    },
    /// Bad-weather day scan.
    BadWeather,
    /// Active alert listing.
    Alerts,
    /// Forecast period selection.
    Forecast(ForecastSelection),
    /// Location display or change.
    Location(LocationChange),
    /// User administration.
    Host(HostAction),
    /// Help text request.
    Help(HelpKind),
}

impl Intent {
    /// Stable subject label for logs.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Temperature { .. } => "temperature",
            Self::Rain { .. } => "rain",
            Self::Wind { .. } => "wind",
            Self::BadWeather => "bad-weather",
            Self::Alerts => "alerts",
            Self::Forecast(_) => "forecasts",
            Self::Location(_) => "location",
            Self::Host(_) => "host-functions",
            Self::Help(_) => "help",
        }
    }
}

/// Immutable parameter template attached to a criterion.
#[derive(Debug, Clone, Copy)]
enum Build {
    TempPrefix(&'static str),
    TempFixed(&'static str),
    RainPrefix(&'static str),
    WindPrefix(&'static str),
    Days,
    DayName(&'static str),
    Weekend,
    Today,
    Tonight,
    Tomorrow,
    Search,
    LocGps,
    LocZip,
    LocLabel,
    LocCity,
    HostList,
    HostEnable,
    HostDisable,
    HostPromote,
    HostDemote,
}

/// One pattern within a topic. Patterns run over lowercased text.
#[derive(Debug)]
pub struct Criterion {
    pattern: Regex,
    build: Build,
}

impl Criterion {
    fn resolve(&self, lowered: &str) -> Option<Intent> {
        let caps = self.pattern.captures(lowered)?;
        let cap = |i: usize| caps.get(i).map(|m| m.as_str().trim().to_owned());
        Some(match self.build {
            Build::TempPrefix(prefix) => Intent::Temperature {
                filter: Some(format!("{prefix}{}", cap(1)?)),
            },
            Build::TempFixed(filter) => Intent::Temperature {
                filter: Some(filter.to_owned()),
            },
            Build::RainPrefix(prefix) => Intent::Rain {
                filter: format!("{prefix}{}", cap(1)?),
            },
            Build::WindPrefix(prefix) => Intent::Wind {
                filter: format!("{prefix}{}", cap(1)?),
            },
            Build::Days => Intent::Forecast(ForecastSelection::Days(cap(1)?.parse().ok()?)),
            Build::DayName(day) => Intent::Forecast(ForecastSelection::DayName(day.to_owned())),
            Build::Weekend => Intent::Forecast(ForecastSelection::Weekend),
            Build::Today => Intent::Forecast(ForecastSelection::Today),
            Build::Tonight => Intent::Forecast(ForecastSelection::Tonight),
            Build::Tomorrow => Intent::Forecast(ForecastSelection::Tomorrow),
            Build::Search => Intent::Forecast(ForecastSelection::Search(cap(1)?)),
            Build::LocGps => Intent::Location(LocationChange::Gps {
                lat: cap(1)?,
                lon: cap(2)?,
            }),
            Build::LocZip => Intent::Location(LocationChange::PostalCode(cap(1)?)),
            Build::LocLabel => Intent::Location(LocationChange::Label(
                // Labels are often quoted, as the help examples suggest.
                cap(1)?.trim_matches('"').to_owned(),
            )),
            Build::LocCity => Intent::Location(LocationChange::City(cap(1)?)),
            Build::HostList => Intent::Host(HostAction::ListUsers),
            Build::HostEnable => Intent::Host(HostAction::SetEnabled {
                user_id: cap(1)?,
                enabled: true,
                reason: None,
            }),
            Build::HostDisable => Intent::Host(HostAction::SetEnabled {
                user_id: cap(1)?,
                enabled: false,
                reason: cap(2),
            }),
            Build::HostPromote => Intent::Host(HostAction::ChangeGroup {
                user_id: cap(1)?,
                group: "admin".to_owned(),
            }),
            Build::HostDemote => Intent::Host(HostAction::ChangeGroup {
                user_id: cap(1)?,
                group: "user".to_owned(),
            }),
        })
    }
}

/// One subject: trigger words for the fuzzy pass, criteria for the precise
/// pass.
#[derive(Debug)]
pub struct Topic {
    /// Which subject this is.
    pub kind: TopicKind,
    /// Words the fuzzy matcher scores tokens against.
    pub trigger_words: &'static [&'static str],
    /// Only host and admin callers may use this topic.
    pub host_only: bool,
    criteria: Vec<Criterion>,
}

impl Topic {
    /// First criterion that matches the lowercased text, if any.
    pub fn resolve(&self, lowered: &str) -> Option<Intent> {
        self.criteria.iter().find_map(|c| c.resolve(lowered))
    }

    /// The topic's "any mention" intent when no criterion matched.
    pub fn default_intent(&self) -> Intent {
        match self.kind {
            TopicKind::BadWeather => Intent::BadWeather,
            TopicKind::Alerts => Intent::Alerts,
            TopicKind::Temperature => Intent::Temperature { filter: None },
            TopicKind::Rain => Intent::Rain {
                filter: RAIN_ANY.to_owned(),
            },
            TopicKind::Wind => Intent::Wind {
                filter: WIND_ANY.to_owned(),
            },
            TopicKind::Forecasts => Intent::Forecast(ForecastSelection::All),
            TopicKind::Location => Intent::Location(LocationChange::Show),
            TopicKind::HostFunctions => Intent::Host(HostAction::Unknown),
        }
    }

    /// Criteria count, for table sanity checks.
    pub fn criteria_len(&self) -> usize {
        self.criteria.len()
    }
}

/// All topics, built once at startup.
#[derive(Debug)]
pub struct Lexicon {
    topics: Vec<Topic>,
}

impl Lexicon {
    /// Build the full topic table set.
    pub fn new() -> Self {
        Self {
            topics: vec![
                topic(TopicKind::BadWeather, BAD_WEATHER_WORDS, false, &[]),
                topic(TopicKind::Alerts, ALERT_WORDS, false, &[]),
                topic(TopicKind::Temperature, TEMPERATURE_WORDS, false, TEMPERATURE_CRITERIA),
                topic(TopicKind::Rain, RAIN_WORDS, false, RAIN_CRITERIA),
                topic(TopicKind::Wind, WIND_WORDS, false, WIND_CRITERIA),
                topic(TopicKind::Forecasts, FORECAST_WORDS, false, FORECAST_CRITERIA),
                topic(TopicKind::Location, LOCATION_WORDS, false, LOCATION_CRITERIA),
                topic(TopicKind::HostFunctions, HOST_WORDS, true, HOST_CRITERIA),
            ],
        }
    }

    /// Topics in declaration (tie-break) order.
    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::new()
    }
}

fn topic(
    kind: TopicKind,
    trigger_words: &'static [&'static str],
    host_only: bool,
    entries: &[(&'static str, Build)],
) -> Topic {
    let criteria = entries
        .iter()
        .filter_map(|&(pattern, build)| {
            Regex::new(pattern)
                .ok()
                .map(|pattern| Criterion { pattern, build })
        })
        .collect();
    Topic {
        kind,
        trigger_words,
        host_only,
        criteria,
    }
}

const BAD_WEATHER_WORDS: &[&str] = &[
    "bad", "severe", "storm", "storms", "stormy", "hazardous", "nasty", "dangerous", "ugly",
];

const ALERT_WORDS: &[&str] = &[
    "alert",
    "alerts",
    "warning",
    "warnings",
    "advisory",
    "advisories",
    "watch",
    "watches",
];

const TEMPERATURE_WORDS: &[&str] = &[
    "temp",
    "temps",
    "temperature",
    "temperatures",
    "hot",
    "cold",
    "warm",
    "cool",
    "chilly",
    "freeze",
    "freezing",
    "heat",
    "degrees",
];

const RAIN_WORDS: &[&str] = &[
    "rain",
    "rains",
    "rainy",
    "shower",
    "showers",
    "sprinkle",
    "sprinkles",
    "drizzle",
    "precipitation",
    "snow",
    "wet",
    "umbrella",
];

const WIND_WORDS: &[&str] = &[
    "wind", "winds", "windy", "gust", "gusts", "gusty", "breeze", "breezy", "blustery",
];

const FORECAST_WORDS: &[&str] = &[
    "weather",
    "forecast",
    "forecasts",
    "outlook",
    "week",
    "weekend",
    "today",
    "tonight",
    "tomorrow",
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
    "daily",
];

const LOCATION_WORDS: &[&str] = &[
    "location",
    "city",
    "town",
    "zip",
    "zipcode",
    "postal",
    "address",
    "gps",
    "coordinates",
    "move",
    "relocate",
    "place",
];

const HOST_WORDS: &[&str] = &["user", "users", "admin", "enable", "disable", "group", "list"];

const TEMPERATURE_CRITERIA: &[(&str, Build)] = &[
    (r"hotter than\s*(\d+)", Build::TempPrefix("hi>")),
    (r"warmer than\s*(\d+)", Build::TempPrefix("hi>")),
    (r"colder than\s*(\d+)", Build::TempPrefix("lo<")),
    (r"cooler than\s*(\d+)", Build::TempPrefix("lo<")),
    (r"above\s*(\d+)", Build::TempPrefix("hi>")),
    (r"over\s*(\d+)", Build::TempPrefix("hi>")),
    (r"below\s*(\d+)", Build::TempPrefix("lo<")),
    (r"under\s*(\d+)", Build::TempPrefix("lo<")),
    (r"\?\s*>\s*(\d+)", Build::TempPrefix("hi>")),
    (r"\?\s*<\s*(\d+)", Build::TempPrefix("lo<")),
    (r">\s*(\d+)", Build::TempPrefix("hi>")),
    (r"<\s*(\d+)", Build::TempPrefix("lo<")),
    (r"freez", Build::TempFixed("hilo<32")),
    (r"\b(?:cool|chilly)\b", Build::TempFixed("hi<60")),
    (r"\bhot\b", Build::TempFixed("hi>85")),
];

const RAIN_CRITERIA: &[(&str, Build)] = &[
    (r"(?:more|greater) than\s*(\d+)", Build::RainPrefix("r>")),
    (r"(?:less|fewer) than\s*(\d+)", Build::RainPrefix("r<")),
    (r"r\s*>\s*(\d+)", Build::RainPrefix("r>")),
    (r"r\s*<\s*(\d+)", Build::RainPrefix("r<")),
    (r"(?:above|over)\s*(\d+)", Build::RainPrefix("r>")),
    (r"(?:below|under)\s*(\d+)", Build::RainPrefix("r<")),
];

const WIND_CRITERIA: &[(&str, Build)] = &[
    (r"wmin\s*>\s*(\d+)", Build::WindPrefix("wmin>")),
    (r"wmin\s*<\s*(\d+)", Build::WindPrefix("wmin<")),
    (r"wmax\s*>\s*(\d+)", Build::WindPrefix("wmax>")),
    (r"wmax\s*<\s*(\d+)", Build::WindPrefix("wmax<")),
    (r"gmin\s*>\s*(\d+)", Build::WindPrefix("gmin>")),
    (
        r"gust\w*\s+(?:above|over|stronger than)\s+(\d+)",
        Build::WindPrefix("gmin>"),
    ),
    (
        r"(?:stronger|faster|more|greater) than\s*(\d+)",
        Build::WindPrefix("wmin>"),
    ),
    (
        r"(?:weaker|slower|lighter|less) than\s*(\d+)",
        Build::WindPrefix("wmin<"),
    ),
    (r"(?:above|over)\s*(\d+)", Build::WindPrefix("wmin>")),
    (r"(?:below|under)\s*(\d+)", Build::WindPrefix("wmin<")),
];

const FORECAST_CRITERIA: &[(&str, Build)] = &[
    (r"(?:next|coming)\s+(\d+)\s+days?", Build::Days),
    (r"\b(\d+)[- ]day\b", Build::Days),
    (r"\btoday\b", Build::Today),
    (r"\btonight\b|\bovernight\b", Build::Tonight),
    (r"\btomorrow\b", Build::Tomorrow),
    (r"\bweekend\b|\bwknd\b", Build::Weekend),
    (r"\bmon(?:day)?\b", Build::DayName("monday")),
    (r"\btue(?:sday|s)?\b", Build::DayName("tuesday")),
    (r"\bwed(?:nesday)?\b", Build::DayName("wednesday")),
    (r"\bthu(?:rsday|rs|r)?\b", Build::DayName("thursday")),
    (r"\bfri(?:day)?\b", Build::DayName("friday")),
    (r"\bsat(?:urday)?\b", Build::DayName("saturday")),
    (r"\bsun(?:day)?\b", Build::DayName("sunday")),
    (
        r"(?:search|find|look for|mention(?:s|ing)?|with)\s+(.+)",
        Build::Search,
    ),
];

const LOCATION_CRITERIA: &[(&str, Build)] = &[
    (
        r"(-?\d{1,3}(?:\.\d+)?)\s*,\s*(-?\d{1,3}(?:\.\d+)?)",
        Build::LocGps,
    ),
    (r"\b(\d{5})(?:-\d{4})?\b", Build::LocZip),
    (r"label\s+(?:to\s+)?(.+)", Build::LocLabel),
    (r"\b(?:city|town|to|is)\s+([a-z][a-z .,'-]*)", Build::LocCity),
];

const HOST_CRITERIA: &[(&str, Build)] = &[
    (r"(?:show|list)\s+users?\b", Build::HostList),
    (
        r"(?:disable|deactivate)\s+user\s+(\S+)(?:\s+for\s+(.+))?",
        Build::HostDisable,
    ),
    (r"(?:enable|activate)\s+user\s+(\S+)", Build::HostEnable),
    (r"add\s+admin\s+to\s+(\S+)", Build::HostPromote),
    (r"remove\s+admin\s+from\s+(\S+)", Build::HostDemote),
];
