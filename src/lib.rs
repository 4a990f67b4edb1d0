//! Stratus — a weather chat bot.
//!
//! Single Rust binary. Talks to you via Telegram. Answers free-text weather
//! questions ("any rain this week?", "windy tomorrow?") from normalized
//! multi-provider forecast data.
//!
//! See `DESIGN.md` for full architecture documentation.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod logging;

pub mod chat;
pub mod classify;
pub mod lexicon;
pub mod providers;
pub mod query;
pub mod wx;
