//! A generic line-oriented tokenizer for Tor directory documents.
//!
//! Every document type this crate parses (server descriptors,
//! microdescriptors, consensuses, certificates, onion service descriptors)
//! shares the same low-level grammar: a sequence of lines of the form
//! `keyword SP args` or `keyword`, any of which may be followed by a
//! PEM-style object block (`-----BEGIN TAG-----` ... `-----END TAG-----`,
//! base64 in between). This module turns a document's text into a flat list
//! of [`Item`]s; the per-document-type modules are responsible for walking
//! that list and enforcing their own keyword policies.

use base64ct::{Base64, Encoding};

use crate::err::{Error, Result};

/// A PEM-style object attached to an [`Item`].
#[derive(Clone, Debug)]
pub struct Object<'a> {
    /// The tag named on the `-----BEGIN`/`-----END` lines (e.g. `"RSA PUBLIC KEY"`).
    pub tag: &'a str,
    /// The decoded contents of the object.
    pub data: Vec<u8>,
}

/// One `keyword args` line, with an optional following object.
#[derive(Clone, Debug)]
pub struct Item<'a> {
    /// The keyword that starts the line.
    pub keyword: &'a str,
    /// Everything after the keyword and its following space, unparsed.
    pub args: &'a str,
    /// The object block following this line, if any.
    pub object: Option<Object<'a>>,
}

impl<'a> Item<'a> {
    /// Split this item's arguments on ASCII whitespace.
    pub fn args(&self) -> impl Iterator<Item = &'a str> {
        self.args.split_ascii_whitespace()
    }

    /// Return the `n`th whitespace-separated argument, if present.
    pub fn arg(&self, n: usize) -> Option<&'a str> {
        self.args().nth(n)
    }

    /// Return the `n`th argument, or a [`Error::Malformed`] naming this
    /// item's keyword if there aren't enough arguments.
    pub fn required_arg(&self, n: usize) -> Result<&'a str> {
        self.arg(n).ok_or_else(|| {
            Error::Malformed(format!(
                "`{}` is missing argument {n}",
                self.keyword
            ))
        })
    }

    /// Return the decoded bytes of this item's object, or an error if it
    /// has none.
    pub fn obj_bytes(&self) -> Result<&[u8]> {
        Ok(&self
            .object
            .as_ref()
            .ok_or_else(|| Error::Malformed(format!("`{}` is missing its object", self.keyword)))?
            .data)
    }

    /// Return the decoded bytes of this item's object, requiring that its
    /// PEM tag equal `tag`.
    pub fn obj_bytes_tagged(&self, tag: &str) -> Result<&[u8]> {
        let obj = self
            .object
            .as_ref()
            .ok_or_else(|| Error::Malformed(format!("`{}` is missing its object", self.keyword)))?;
        if obj.tag != tag {
            return Err(Error::Malformed(format!(
                "`{}` object has tag `{}`, expected `{tag}`",
                self.keyword, obj.tag
            )));
        }
        Ok(&obj.data)
    }
}

/// Split `document` into a flat sequence of [`Item`]s.
///
/// Blank lines are skipped. Lines are not otherwise validated against any
/// particular document's grammar; that's the job of each document type's
/// own parser.
pub fn tokenize(document: &str) -> Result<Vec<Item<'_>>> {
    let mut items = Vec::new();
    let mut lines = document.lines().peekable();

    while let Some(line) = lines.next() {
        if line.is_empty() {
            continue;
        }
        let (keyword, args) = match line.split_once(' ') {
            Some((k, a)) => (k, a),
            None => (line, ""),
        };

        let object = match lines.peek().and_then(|l| begin_tag(l)) {
            Some(tag) => {
                lines.next();
                let mut b64 = String::new();
                let end_line = format!("-----END {tag}-----");
                loop {
                    let l = lines.next().ok_or(Error::TruncatedObject)?;
                    if l == end_line {
                        break;
                    }
                    b64.push_str(l);
                }
                let data = Base64::decode_vec(&b64).map_err(|_| Error::TruncatedObject)?;
                Some(Object { tag, data })
            }
            None => None,
        };

        items.push(Item { keyword, args, object });
    }

    Ok(items)
}

/// If `line` is a `-----BEGIN TAG-----` line, return `TAG`.
fn begin_tag(line: &str) -> Option<&str> {
    line.strip_prefix("-----BEGIN ")?.strip_suffix("-----")
}

/// Return the first item with the given keyword.
pub fn find<'a, 'b>(items: &'b [Item<'a>], keyword: &str) -> Option<&'b Item<'a>> {
    items.iter().find(|i| i.keyword == keyword)
}

/// Return the first item with the given keyword, or a [`Error::MissingKeyword`].
pub fn require<'a, 'b>(items: &'b [Item<'a>], keyword: &'static str) -> Result<&'b Item<'a>> {
    find(items, keyword).ok_or(Error::MissingKeyword(keyword))
}

/// Fail if `keyword` appears more than once in `items`.
pub fn require_single(items: &[Item<'_>], keyword: &'static str) -> Result<()> {
    if items.iter().filter(|i| i.keyword == keyword).count() > 1 {
        return Err(Error::DuplicateKeyword(keyword));
    }
    Ok(())
}

/// Return the substring of `document` starting at the beginning of the line
/// that opens with `start_keyword` and running through the end of the line
/// that opens with `end_keyword`, inclusive of both lines and the newline
/// after `end_keyword`'s line (if any).
///
/// Used to recover the exact bytes a signature was computed over, when the
/// signed range includes its own terminating keyword line (as with a server
/// descriptor's `router-signature`).
pub fn signed_range_inclusive<'a>(
    document: &'a str,
    start_keyword: &'static str,
    end_keyword: &'static str,
) -> Result<&'a str> {
    let start = line_start(document, start_keyword).ok_or(Error::MissingKeyword(start_keyword))?;
    let end_line_start =
        line_start(&document[start..], end_keyword).ok_or(Error::MissingKeyword(end_keyword))?
            + start;
    let after_end_line = document[end_line_start..]
        .find('\n')
        .map(|i| end_line_start + i + 1)
        .unwrap_or(document.len());
    Ok(&document[start..after_end_line])
}

/// Return the substring of `document` starting at the beginning of the line
/// that opens with `start_keyword` and running up to (but not including)
/// the start of the line that opens with `end_keyword`.
///
/// Used when the signed range excludes its own terminating keyword line (as
/// with an onion service descriptor's `signature`).
pub fn signed_range_exclusive<'a>(
    document: &'a str,
    start_keyword: &'static str,
    end_keyword: &'static str,
) -> Result<&'a str> {
    let start = line_start(document, start_keyword).ok_or(Error::MissingKeyword(start_keyword))?;
    let end = line_start(&document[start..], end_keyword).ok_or(Error::MissingKeyword(end_keyword))?
        + start;
    Ok(&document[start..end])
}

/// Find the byte offset of the start of the first line in `s` that equals
/// `keyword` or starts with `keyword` followed by a space.
fn line_start(s: &str, keyword: &str) -> Option<usize> {
    let mut offset = 0;
    for line in s.split_inclusive('\n') {
        let bare = line.strip_suffix('\n').unwrap_or(line);
        if bare == keyword || bare.strip_prefix(keyword).is_some_and(|rest| rest.starts_with(' ')) {
            return Some(offset);
        }
        offset += line.len();
    }
    None
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn tokenize_plain_lines() {
        let doc = "router foo 1.2.3.4 9001 0 0\nplatform Tor\n";
        let items = tokenize(doc).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].keyword, "router");
        assert_eq!(items[0].arg(0), Some("foo"));
        assert_eq!(items[1].keyword, "platform");
        assert_eq!(items[1].args, "Tor");
    }

    #[test]
    fn tokenize_reads_objects() {
        let doc = "onion-key\n-----BEGIN RSA PUBLIC KEY-----\nAAAA\n-----END RSA PUBLIC KEY-----\n";
        let items = tokenize(doc).unwrap();
        assert_eq!(items.len(), 1);
        let obj = items[0].object.as_ref().unwrap();
        assert_eq!(obj.tag, "RSA PUBLIC KEY");
        assert_eq!(obj.data, Base64::decode_vec("AAAA").unwrap());
    }

    #[test]
    fn tokenize_rejects_unterminated_object() {
        let doc = "onion-key\n-----BEGIN RSA PUBLIC KEY-----\nAAAA\n";
        assert!(matches!(tokenize(doc), Err(Error::TruncatedObject)));
    }

    #[test]
    fn require_single_rejects_duplicates() {
        let items = tokenize("router a\nrouter b\n").unwrap();
        assert!(matches!(
            require_single(&items, "router"),
            Err(Error::DuplicateKeyword("router"))
        ));
    }

    #[test]
    fn signed_range_inclusive_keeps_terminating_line() {
        let doc = "router foo\nplatform Tor\nrouter-signature\n-----BEGIN SIGNATURE-----\nAA==\n-----END SIGNATURE-----\n";
        let r = signed_range_inclusive(doc, "router", "router-signature").unwrap();
        assert_eq!(r, "router foo\nplatform Tor\nrouter-signature\n");
    }

    #[test]
    fn signed_range_exclusive_stops_before_terminating_line() {
        let doc = "hs-descriptor 3\nsuperencrypted\nXXX\nsignature YYY\n";
        let r = signed_range_exclusive(doc, "hs-descriptor", "signature").unwrap();
        assert_eq!(r, "hs-descriptor 3\nsuperencrypted\nXXX\n");
    }
}
