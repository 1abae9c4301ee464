//! Parsing for the control port's line-based reply grammar.
//!
//! A reply is a sequence of CRLF-terminated lines, each beginning with a
//! 3-digit status code and a separator: `-` (more lines follow), `+` (more
//! lines follow, and this one opens a multi-line data block ended by a lone
//! `.` line), or ` ` (this is the reply's last line).

use crate::err::{Error, Result};

/// One line of a control reply, after its terminating CRLF has been
/// stripped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Line {
    /// The 3-digit status code, e.g. `250`.
    pub code: u16,
    /// The separator that followed the code: `'-'`, `'+'`, or `' '`.
    pub divider: char,
    /// Everything after the separator.
    pub text: String,
}

/// A complete control-port reply: one or more [`Line`]s, with any
/// data blocks opened by a `+` divider attached to their owning line's
/// index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControlMessage {
    /// This reply's lines, in arrival order.
    lines: Vec<Line>,
    /// Data blocks, indexed in the same order as the `+`-divided lines that
    /// opened them.
    data_blocks: Vec<Vec<String>>,
}

impl ControlMessage {
    /// The status code of this message's last (terminal) line.
    ///
    /// By the control protocol's grammar every line in a single reply
    /// shares the same code, so this is also the reply's code.
    pub fn code(&self) -> u16 {
        self.lines.last().map(|l| l.code).unwrap_or(0)
    }

    /// True if this message's code indicates success (2xx or 3xx).
    pub fn is_ok(&self) -> bool {
        matches!(self.code(), 200..=399)
    }

    /// This message's lines.
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// The data blocks opened by any `+`-divided lines, in order.
    pub fn data_blocks(&self) -> &[Vec<String>] {
        &self.data_blocks
    }

    /// True if this message is a `650` asynchronous event notification.
    pub fn is_event(&self) -> bool {
        self.lines.first().map(|l| l.code) == Some(650)
    }

    /// Parse every `KEY=value` (or bare `KEY`) reply body of a `250-key=value`
    /// style command (`GETINFO`, `GETCONF`) into a map, folding any data
    /// block attached to a key into its value, joined by newlines.
    pub fn into_info_map(self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        let mut block_iter = self.data_blocks.into_iter();
        for line in &self.lines {
            let body = &line.text;
            if body.eq_ignore_ascii_case("OK") {
                continue;
            }
            let (key, mut value) = match body.split_once('=') {
                Some((k, v)) => (k.to_owned(), v.to_owned()),
                None => (body.clone(), String::new()),
            };
            if line.divider == '+' {
                if let Some(block) = block_iter.next() {
                    value = block.join("\n");
                }
            }
            out.push((key, value));
        }
        out
    }

    /// Read one complete [`ControlMessage`] from `read_line`, a closure that
    /// returns successive CRLF-stripped lines from the control socket.
    pub fn read(mut read_line: impl FnMut() -> Result<String>) -> Result<Self> {
        let mut lines = Vec::new();
        let mut data_blocks = Vec::new();
        loop {
            let raw = read_line()?;
            let line = parse_line(&raw)?;
            let is_terminal = line.divider == ' ';
            let opens_data = line.divider == '+';
            lines.push(line);
            if opens_data {
                let mut block = Vec::new();
                loop {
                    let raw = read_line()?;
                    if raw == "." {
                        break;
                    }
                    block.push(strip_dot_stuffing(raw));
                }
                data_blocks.push(block);
            }
            if is_terminal {
                break;
            }
        }
        Ok(ControlMessage { lines, data_blocks })
    }
}

/// Undo the leading-dot byte-stuffing the control protocol's data-block
/// framing uses for lines that would otherwise be mistaken for the
/// terminator.
fn strip_dot_stuffing(line: String) -> String {
    line.strip_prefix("..").map(|rest| format!(".{rest}")).unwrap_or(line)
}

/// Parse one raw (CRLF-stripped) line into its code, divider, and text.
fn parse_line(raw: &str) -> Result<Line> {
    if raw.len() < 4 {
        return Err(Error::Malformed(format!("line too short: {raw:?}")));
    }
    let (code_str, rest) = raw.split_at(3);
    let code = code_str
        .parse::<u16>()
        .map_err(|_| Error::Malformed(format!("non-numeric status code in {raw:?}")))?;
    let mut chars = rest.chars();
    let divider = chars
        .next()
        .ok_or_else(|| Error::Malformed(format!("missing divider in {raw:?}")))?;
    if !matches!(divider, '-' | '+' | ' ') {
        return Err(Error::Malformed(format!("unknown divider {divider:?} in {raw:?}")));
    }
    Ok(Line {
        code,
        divider,
        text: chars.as_str().to_owned(),
    })
}

#[cfg(test)]
mod test {
    use super::*;

    fn message_from(raw_lines: &[&str]) -> ControlMessage {
        let mut iter = raw_lines.iter();
        ControlMessage::read(|| {
            iter.next()
                .map(|s| s.to_string())
                .ok_or_else(|| Error::Malformed("ran out of lines".into()))
        })
        .unwrap()
    }

    #[test]
    fn parses_single_line_reply() {
        let msg = message_from(&["250 OK"]);
        assert_eq!(msg.code(), 250);
        assert!(msg.is_ok());
        assert_eq!(msg.lines().len(), 1);
    }

    #[test]
    fn parses_multiline_getinfo_reply() {
        let msg = message_from(&["250-version=0.4.7.13", "250 OK"]);
        assert_eq!(msg.code(), 250);
        assert_eq!(msg.lines().len(), 2);
        let map = msg.into_info_map();
        assert_eq!(map, vec![("version".to_owned(), "0.4.7.13".to_owned())]);
    }

    #[test]
    fn parses_data_block() {
        let msg = message_from(&[
            "250+onions/detached=",
            "mochz2xppfziim5olr5f6q27poc4vfob2xxxxxxxxxxxxxxxxxxxxxxx",
            "nhqdqym6j35rk7tdou4cdj4gjjqagimutxxxxxxxxxxxxxxxxxxxxxxx",
            ".",
            "250 OK",
        ]);
        assert_eq!(msg.data_blocks().len(), 1);
        assert_eq!(msg.data_blocks()[0].len(), 2);
    }

    #[test]
    fn recognizes_async_events() {
        let msg = message_from(&["650 BW 100 200"]);
        assert!(msg.is_event());
    }

    #[test]
    fn rejects_bad_divider() {
        let mut lines = vec!["250*broken".to_string()].into_iter();
        let result = ControlMessage::read(|| {
            lines
                .next()
                .ok_or_else(|| Error::Malformed("ran out of lines".into()))
        });
        assert!(result.is_err());
    }
}
