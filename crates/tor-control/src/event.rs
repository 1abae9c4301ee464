//! Asynchronous event notifications (status code `650`).

use crate::message::ControlMessage;

/// A `650` event, loosely parsed: the event name plus the unparsed
/// remainder of its first line, and any further lines/data blocks the
/// message carried.
#[derive(Clone, Debug)]
pub struct Event {
    /// The event's name, e.g. `BW`, `CIRC`, `STATUS_GENERAL`.
    pub name: String,
    /// Everything on the first line after the event name.
    pub body: String,
    /// The raw message this event was extracted from, for callers that want
    /// to do their own positional/keyword parsing.
    pub message: ControlMessage,
}

impl Event {
    /// Extract an [`Event`] from a `650`-coded [`ControlMessage`].
    ///
    /// Returns `None` if `message` isn't actually an event (its first
    /// line's code isn't `650`).
    pub fn from_message(message: ControlMessage) -> Option<Self> {
        let first = message.lines().first()?;
        if first.code != 650 {
            return None;
        }
        let (name, body) = first
            .text
            .split_once(' ')
            .unwrap_or((first.text.as_str(), ""));
        Some(Event {
            name: name.to_owned(),
            body: body.to_owned(),
            message,
        })
    }

    /// Split this event's body into its `KEY=value`/`KEY="quoted value"`
    /// pairs, skipping over any leading (or interspersed) positional
    /// tokens that don't look like `key=`.
    pub fn keyword_pairs(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        let mut rest = self.body.as_str();
        while !rest.is_empty() {
            rest = rest.trim_start();
            if rest.is_empty() {
                break;
            }
            let word_end = rest.find(' ').unwrap_or(rest.len());
            let word = &rest[..word_end];
            match word.split_once('=') {
                Some((key, value)) if is_bare_word(key) => {
                    if value.starts_with('"') {
                        // the quoted value may itself contain spaces, so
                        // re-scan from just past the opening quote
                        let quoted_region = &rest[key.len() + 2..];
                        match find_unescaped_quote(quoted_region) {
                            Some(end) => {
                                out.push((key.to_owned(), unescape(&quoted_region[..end])));
                                rest = quoted_region[end + 1..].trim_start();
                                continue;
                            }
                            None => break,
                        }
                    }
                    out.push((key.to_owned(), value.to_owned()));
                    rest = &rest[word_end..];
                }
                _ => {
                    rest = &rest[word_end..];
                }
            }
        }
        out
    }
}

/// True if `s` looks like an event keyword name: letters, digits, and
/// underscores only.
fn is_bare_word(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Find the index of the first unescaped `"` in `s`.
fn find_unescaped_quote(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return Some(i),
            _ => i += 1,
        }
    }
    None
}

/// Undo backslash-escaping of `"` and `\` inside a quoted event value.
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
                continue;
            }
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    fn event_from(line: &str) -> Event {
        let mut lines = vec![line.to_string()].into_iter();
        let msg = ControlMessage::read(|| {
            lines
                .next()
                .ok_or_else(|| crate::err::Error::Malformed("no more lines".into()))
        })
        .unwrap();
        Event::from_message(msg).unwrap()
    }

    #[test]
    fn splits_name_from_body() {
        let ev = event_from("650 BW 100 200");
        assert_eq!(ev.name, "BW");
        assert_eq!(ev.body, "100 200");
    }

    #[test]
    fn parses_quoted_keyword_pairs() {
        let ev = event_from(r#"650 STATUS_GENERAL NOTICE CIRCUIT_ESTABLISHED REASON="hello world""#);
        let pairs = ev.keyword_pairs();
        assert!(pairs.contains(&("REASON".to_owned(), "hello world".to_owned())));
    }

    #[test]
    fn non_event_message_returns_none() {
        let mut lines = vec!["250 OK".to_string()].into_iter();
        let msg = ControlMessage::read(|| {
            lines
                .next()
                .ok_or_else(|| crate::err::Error::Malformed("no more lines".into()))
        })
        .unwrap();
        assert!(Event::from_message(msg).is_none());
    }
}
