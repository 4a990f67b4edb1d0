//! Telegram HTML markup helpers.
//!
//! Replies are sent with `parse_mode=HTML`, so every user- or
//! provider-supplied fragment must be escaped before tags are added
//! around it.

/// Escape the characters Telegram's HTML parse mode reserves.
pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Bold emphasis, escaping the inner text.
pub fn bold(text: &str) -> String {
    format!("<b>{}</b>", escape(text))
}

/// Italic emphasis, escaping the inner text.
pub fn italic(text: &str) -> String {
    format!("<i>{}</i>", escape(text))
}
