//! TLS transport setup for ORPort connections.
//!
//! Tor relays do not present certificates that chain to a public root: the
//! peer's real identity is only established afterwards, from the CERTS cell
//! (see [`crate::channel::handshake`]). So unlike an ordinary HTTPS client,
//! we install a certificate verifier that accepts anything, and connect by
//! IP address rather than by name so that no SNI value is sent.

use std::net::IpAddr;
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, Error as TlsError, SignatureScheme};

/// A certificate verifier that accepts any certificate chain the peer
/// presents.
///
/// This is safe here specifically because the Tor link protocol does not
/// rely on TLS for peer authentication: the relay's real identity is
/// authenticated later out-of-band, via its CERTS cell.
#[derive(Debug)]
struct AcceptAnyServerCert {
    /// The schemes we claim to support verifying, drawn from the installed
    /// crypto provider so they match whatever `provider` actually supports.
    schemes: Vec<SignatureScheme>,
}

impl AcceptAnyServerCert {
    /// Build a verifier that reports the verify schemes of `provider`.
    fn new(provider: &CryptoProvider) -> Self {
        AcceptAnyServerCert {
            schemes: provider
                .signature_verification_algorithms
                .supported_schemes(),
        }
    }
}

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, TlsError> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, TlsError> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, TlsError> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.schemes.clone()
    }
}

/// Build a [`ClientConfig`] that performs a TLS handshake without verifying
/// the peer's certificate chain against any root store.
pub(crate) fn client_config() -> Arc<ClientConfig> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let verifier = Arc::new(AcceptAnyServerCert::new(&provider));
    let config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .expect("the ring provider supports its own default protocol versions")
        .dangerous()
        .with_custom_certificate_verifier(verifier)
        .with_no_client_auth();
    Arc::new(config)
}

/// Build the [`ServerName`] used for the handshake: the bare IP address, so
/// that no SNI extension is sent (Tor relays are addressed by IP, and SNI
/// would leak the target to anyone observing the TLS handshake).
pub(crate) fn server_name_for(address: IpAddr) -> ServerName<'static> {
    ServerName::IpAddress(address.into())
}
