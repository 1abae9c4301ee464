//! The result of running a [`crate::request::Query`].

use std::str;

use crate::err::Error;
use crate::request::Endpoint;

/// A response to a directory request: a decompressed body, tagged with the
/// HTTP status it arrived with and (if the fetch succeeded) which endpoint
/// served it.
#[derive(Debug, Clone)]
#[must_use = "check whether the response was successful before using its output"]
pub struct DirResponse {
    /// The HTTP status code, e.g. 200.
    status: u16,
    /// The decompressed response body.
    output: Vec<u8>,
    /// Which endpoint served this response, if known.
    source: Option<SourceInfo>,
}

/// Which endpoint a [`DirResponse`] came from.
#[derive(Debug, Clone)]
pub struct SourceInfo {
    /// The endpoint that was queried.
    endpoint: Endpoint,
}

impl SourceInfo {
    /// The endpoint this response came from.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

impl DirResponse {
    /// Construct a response with no known source endpoint.
    pub(crate) fn new(status: u16, output: Vec<u8>) -> Self {
        DirResponse {
            status,
            output,
            source: None,
        }
    }

    /// Attach the endpoint this response was fetched from.
    pub(crate) fn with_source(mut self, endpoint: Endpoint) -> Self {
        self.source = Some(SourceInfo { endpoint });
        self
    }

    /// The HTTP status code this response arrived with.
    pub fn status_code(&self) -> u16 {
        self.status
    }

    /// True if the status code did not indicate success.
    ///
    /// A [`DirResponse`] is only ever constructed from a response whose
    /// status line was already checked to be in the 2xx range, so in
    /// practice this is always `false`; it's exposed for callers that want
    /// to assert it rather than trust the invariant.
    pub fn is_partial(&self) -> bool {
        self.status / 100 != 2
    }

    /// The decompressed response body.
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// The decompressed response body, decoded as UTF-8.
    pub fn output_string(&self) -> Result<&str, Error> {
        str::from_utf8(&self.output)
            .map_err(|e| Error::ProtocolError(format!("response body is not valid UTF-8: {e}")))
    }

    /// Consume this response and return its body.
    pub fn into_output(self) -> Vec<u8> {
        self.output
    }

    /// Consume this response and return its body, decoded as UTF-8.
    pub fn into_output_string(self) -> Result<String, Error> {
        String::from_utf8(self.output)
            .map_err(|e| Error::ProtocolError(format!("response body is not valid UTF-8: {e}")))
    }

    /// The endpoint this response was fetched from, if known.
    pub fn source(&self) -> Option<&SourceInfo> {
        self.source.as_ref()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trips_body() {
        let resp = DirResponse::new(200, b"hello".to_vec());
        assert_eq!(resp.status_code(), 200);
        assert!(!resp.is_partial());
        assert_eq!(resp.output(), b"hello");
        assert_eq!(resp.output_string().unwrap(), "hello");
    }

    #[test]
    fn rejects_non_utf8_as_string() {
        let resp = DirResponse::new(200, vec![0xff, 0xfe]);
        assert!(resp.output_string().is_err());
    }
}
