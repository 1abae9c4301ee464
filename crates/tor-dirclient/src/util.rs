//! Helper functions for encoding requests and decoding compressed bodies.

use std::fmt::Write as _;
use std::io::Read as _;

use crate::err::{Error, Result};
use crate::request::Compression;

/// Encode an HTTP/1.0 request in the quick-and-dirty way a DirPort or
/// directory stream expects: no request body, headers terminated by a
/// blank line.
pub(crate) fn encode_request(req: &http::Request<()>) -> String {
    let mut s = format!("{} {} HTTP/1.0\r\n", req.method(), req.uri());
    for (key, val) in req.headers().iter() {
        let _ = writeln!(
            s,
            "{}: {}\r",
            key,
            val.to_str().expect("added a non-UTF-8 HTTP header")
        );
    }
    s.push_str("\r\n");
    s
}

/// Decompress `body` according to the codec named on a `Content-Encoding`
/// header, as matched by [`Compression::from_header_name`].
pub(crate) fn decompress(body: &[u8], encoding: Option<&str>) -> Result<Vec<u8>> {
    let compression = match encoding {
        None | Some("identity") => return Ok(body.to_vec()),
        Some(name) => Compression::from_header_name(name)
            .ok_or_else(|| Error::ContentEncoding(name.to_owned()))?,
    };

    let mut out = Vec::new();
    match compression {
        // Tor's directory protocol calls this encoding "deflate", but the
        // bytes on the wire are always gzip-framed, never raw zlib/deflate.
        Compression::Gzip | Compression::Deflate => {
            let mut d = flate2::read::GzDecoder::new(body);
            d.read_to_end(&mut out)
                .map_err(|e| Error::ProtocolError(format!("couldn't inflate response body: {e}")))?;
        }
        #[cfg(feature = "zstd")]
        Compression::Zstd => {
            zstd::stream::copy_decode(body, &mut out)
                .map_err(|e| Error::ProtocolError(format!("couldn't un-zstd response body: {e}")))?;
        }
        #[cfg(feature = "xz")]
        Compression::Xz => {
            let mut d = xz2::read::XzDecoder::new(body);
            d.read_to_end(&mut out)
                .map_err(|e| Error::ProtocolError(format!("couldn't un-xz response body: {e}")))?;
        }
        #[allow(unreachable_patterns)]
        other => return Err(Error::ContentEncoding(other.header_name().to_owned())),
    }
    Ok(out)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn formats_request_line_and_headers() {
        let req = http::Request::builder()
            .method("GET")
            .uri("/tor/status-vote/current/consensus.z")
            .header("Accept-Encoding", "gzip")
            .body(())
            .unwrap();
        let encoded = encode_request(&req);
        assert!(encoded.starts_with("GET /tor/status-vote/current/consensus.z HTTP/1.0\r\n"));
        assert!(encoded.contains("accept-encoding: gzip\r\n"));
        assert!(encoded.ends_with("\r\n\r\n"));
    }

    #[test]
    fn identity_encoding_is_passthrough() {
        assert_eq!(decompress(b"hello", None).unwrap(), b"hello");
        assert_eq!(decompress(b"hello", Some("identity")).unwrap(), b"hello");
    }

    #[test]
    fn unrecognized_encoding_is_rejected() {
        assert!(matches!(
            decompress(b"hello", Some("brotli")),
            Err(Error::ContentEncoding(_))
        ));
    }
}
