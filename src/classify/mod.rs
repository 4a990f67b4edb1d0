//! Free-text request classification.
//!
//! Two phases: a fuzzy pass scores every message token against every topic's
//! trigger words and the single best-scoring pair picks the subject, then the
//! winning topic's criteria run in order over the lowercased text to extract
//! a concrete parameter. Messages with no scoring token at all get one more
//! chance through the bare temperature shorthand ("?", "?>90", "<35").
//!
//! Classification never fails fatally. Anything unusable comes back as
//! [`Classification::Invalid`] with the reply text to send.

pub mod similarity;

use regex::Regex;

use crate::chat::users::Role;
use crate::lexicon::{HelpKind, Intent, Lexicon, Topic};

/// Reply when no subject could be determined.
pub const UNKNOWN_SUBJECT_MSG: &str = "Couldn't determine weather subject. Please try rephrasing your request, using different key words.  ex. 'rain?' or 'weather saturday?' or 'cool temps?'";

/// Reply for host-only requests from unprivileged callers.
pub const PERMISSION_DENIED_MSG: &str = "You don't have permission to perform this action.";

/// Result of classifying one message.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// Actionable request.
    Valid(Intent),
    /// Not actionable; the reason is sent back as the reply.
    Invalid {
        /// User-facing explanation.
        reason: String,
    },
}

const SHORTHAND_PATTERNS: &[(&str, &str)] = &[
    (r"\?\s*>\s*(\d+)", "hi>"),
    (r"\?\s*<\s*(\d+)", "lo<"),
    (r"^\s*>\s*(\d+)", "hi>"),
    (r"^\s*<\s*(\d+)", "lo<"),
];

/// Classifies free text into intents using the topic tables.
#[derive(Debug)]
pub struct Classifier {
    lexicon: Lexicon,
    shorthand: Vec<(Regex, &'static str)>,
}

impl Classifier {
    /// Build a classifier over the given tables.
    pub fn new(lexicon: Lexicon) -> Self {
        let shorthand = SHORTHAND_PATTERNS
            .iter()
            .filter_map(|&(pattern, prefix)| Regex::new(pattern).ok().map(|r| (r, prefix)))
            .collect();
        Self { lexicon, shorthand }
    }

    /// Classify one message from a caller with the given role.
    pub fn classify(&self, role: Role, text: &str) -> Classification {
        let lowered = text.to_lowercase();

        // "help" anywhere short-circuits everything else.
        if lowered.contains("help") {
            return Classification::Valid(Intent::Help(help_kind(&lowered)));
        }

        if let Some(topic) = self.best_topic(&lowered) {
            // Gated here, not downstream, so unprivileged callers never get
            // host parameter extraction run on their text.
            if topic.host_only && !role.is_privileged() {
                return Classification::Invalid {
                    reason: PERMISSION_DENIED_MSG.to_owned(),
                };
            }
            let intent = topic
                .resolve(&lowered)
                .unwrap_or_else(|| topic.default_intent());
            return Classification::Valid(intent);
        }

        if let Some(intent) = self.temperature_shorthand(&lowered) {
            return Classification::Valid(intent);
        }

        Classification::Invalid {
            reason: UNKNOWN_SUBJECT_MSG.to_owned(),
        }
    }

    /// Highest-scoring (token, trigger word) pair picks the topic. Only a
    /// strictly greater score displaces the current best, so equal scores
    /// keep the earlier topic and table order is the tie-break.
    fn best_topic(&self, lowered: &str) -> Option<&Topic> {
        let tokens: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();
        if tokens.is_empty() {
            return None;
        }

        let mut best: Option<&Topic> = None;
        let mut best_score = 0.0f64;
        for topic in self.lexicon.topics() {
            for word in topic.trigger_words {
                for token in &tokens {
                    let score = similarity::jaro_winkler(token, word);
                    if score > best_score {
                        best_score = score;
                        best = Some(topic);
                    }
                }
            }
        }
        best
    }

    fn temperature_shorthand(&self, lowered: &str) -> Option<Intent> {
        let trimmed = lowered.trim();
        if trimmed == "?" {
            return Some(Intent::Temperature { filter: None });
        }
        for (regex, prefix) in &self.shorthand {
            if let Some(number) = regex
                .captures(trimmed)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str())
            {
                return Some(Intent::Temperature {
                    filter: Some(format!("{prefix}{number}")),
                });
            }
        }
        None
    }
}

fn help_kind(lowered: &str) -> HelpKind {
    if lowered.contains("example") {
        HelpKind::Examples
    } else if lowered.contains("location") {
        HelpKind::Location
    } else if lowered.contains("shortcut") {
        HelpKind::Shortcuts
    } else if ["admin", "host", "user", "system", "function", "command"]
        .iter()
        .any(|k| lowered.contains(k))
    {
        HelpKind::AdminHost
    } else {
        HelpKind::General
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::{ForecastSelection, HostAction};

    fn classifier() -> Classifier {
        Classifier::new(Lexicon::new())
    }

    fn valid(text: &str) -> Intent {
        match classifier().classify(Role::User, text) {
            Classification::Valid(intent) => intent,
            Classification::Invalid { reason } => panic!("expected valid for {text:?}: {reason}"),
        }
    }

    #[test]
    fn rain_mention_falls_back_to_any_rain() {
        assert_eq!(
            valid("any rain this week"),
            Intent::Rain {
                filter: "r>0".to_owned()
            }
        );
    }

    #[test]
    fn rain_beats_forecasts_on_equal_scores() {
        // "week" scores 1.0 for forecasts, but "rain" already scored 1.0
        // for the earlier rain topic.
        assert_eq!(
            valid("rain week"),
            Intent::Rain {
                filter: "r>0".to_owned()
            }
        );
    }

    #[test]
    fn wind_beats_forecasts_on_equal_scores() {
        assert_eq!(
            valid("windy tomorrow?"),
            Intent::Wind {
                filter: "wmin>5".to_owned()
            }
        );
    }

    #[test]
    fn misspelled_subject_still_classifies() {
        assert_eq!(valid("forcast?"), Intent::Forecast(ForecastSelection::All));
        assert_eq!(
            valid("wether saturday?"),
            Intent::Forecast(ForecastSelection::DayName("saturday".to_owned()))
        );
    }

    #[test]
    fn bare_question_mark_is_the_weekly_temperature_summary() {
        assert_eq!(valid("?"), Intent::Temperature { filter: None });
    }

    #[test]
    fn shorthand_battery_parses_thresholds() {
        assert_eq!(
            valid("?<35"),
            Intent::Temperature {
                filter: Some("lo<35".to_owned())
            }
        );
        assert_eq!(
            valid("?>90"),
            Intent::Temperature {
                filter: Some("hi>90".to_owned())
            }
        );
        assert_eq!(
            valid(">80"),
            Intent::Temperature {
                filter: Some("hi>80".to_owned())
            }
        );
        assert_eq!(
            valid("< 35"),
            Intent::Temperature {
                filter: Some("lo<35".to_owned())
            }
        );
    }

    #[test]
    fn unusable_text_is_invalid_with_rephrase_hint() {
        // No token here shares a single letter with any trigger word, so
        // every similarity score is exactly zero.
        let result = classifier().classify(Role::User, "qqq xjx 000");
        assert_eq!(
            result,
            Classification::Invalid {
                reason: UNKNOWN_SUBJECT_MSG.to_owned()
            }
        );
    }

    #[test]
    fn empty_text_is_invalid() {
        let result = classifier().classify(Role::User, "");
        assert!(matches!(result, Classification::Invalid { .. }));
    }

    #[test]
    fn help_short_circuits_other_subjects() {
        assert_eq!(valid("help with rain"), Intent::Help(HelpKind::General));
        assert_eq!(valid("help examples"), Intent::Help(HelpKind::Examples));
        assert_eq!(valid("location help"), Intent::Help(HelpKind::Location));
        assert_eq!(valid("help shortcuts"), Intent::Help(HelpKind::Shortcuts));
        assert_eq!(valid("help commands"), Intent::Help(HelpKind::AdminHost));
        assert_eq!(valid("help"), Intent::Help(HelpKind::General));
    }

    #[test]
    fn host_topic_denied_for_plain_users() {
        let result = classifier().classify(Role::User, "show users");
        assert_eq!(
            result,
            Classification::Invalid {
                reason: PERMISSION_DENIED_MSG.to_owned()
            }
        );
    }

    #[test]
    fn host_topic_allowed_for_host_and_admin() {
        for role in [Role::Host, Role::Admin] {
            let result = classifier().classify(role, "show users");
            assert_eq!(result, Classification::Valid(Intent::Host(HostAction::ListUsers)));
        }
    }

    #[test]
    fn temperature_phrases_resolve_through_topic_criteria() {
        assert_eq!(
            valid("any days hotter than 90?"),
            Intent::Temperature {
                filter: Some("hi>90".to_owned())
            }
        );
        assert_eq!(
            valid("cool temps?"),
            Intent::Temperature {
                filter: Some("hi<60".to_owned())
            }
        );
    }
}
