//! TLS trust configuration and certificate thumbprint pinning.
//!
//! vCenter deployments commonly run with self-signed certificates, so the
//! client either pins the leaf certificate by its thumbprint or skips
//! verification entirely. The choice is always an explicit [`TlsTrust`]
//! value; [`TlsTrust::from_thumbprint`] logs when it falls back to insecure.

use std::fmt;
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, SignatureScheme};
use sha1::{Digest, Sha1};
use sha2::Sha256;
use tracing::warn;

use crate::error::{Error, Result};

/// Digest of a server's leaf certificate.
#[derive(Clone, PartialEq, Eq)]
pub enum Thumbprint {
    /// SHA-1 digest, the format vCenter displays by default.
    Sha1([u8; 20]),
    /// SHA-256 digest.
    Sha256([u8; 32]),
}

impl Thumbprint {
    /// Parse a hex thumbprint, with or without `:` separators.
    pub fn parse(value: &str) -> Result<Self> {
        let cleaned: String = value
            .trim()
            .chars()
            .filter(|c| *c != ':' && !c.is_whitespace())
            .collect();
        let bytes = hex::decode(&cleaned).map_err(|e| Error::InvalidThumbprint {
            value: value.to_string(),
            reason: e.to_string(),
        })?;

        match bytes.len() {
            20 => {
                let mut digest = [0u8; 20];
                digest.copy_from_slice(&bytes);
                Ok(Self::Sha1(digest))
            }
            32 => {
                let mut digest = [0u8; 32];
                digest.copy_from_slice(&bytes);
                Ok(Self::Sha256(digest))
            }
            n => Err(Error::InvalidThumbprint {
                value: value.to_string(),
                reason: format!("expected 20 (SHA-1) or 32 (SHA-256) bytes, got {n}"),
            }),
        }
    }

    /// Compute the SHA-1 thumbprint of a DER-encoded certificate.
    pub fn sha1_of(der: &[u8]) -> Self {
        let mut digest = [0u8; 20];
        digest.copy_from_slice(Sha1::digest(der).as_slice());
        Self::Sha1(digest)
    }

    /// Compute the SHA-256 thumbprint of a DER-encoded certificate.
    pub fn sha256_of(der: &[u8]) -> Self {
        let mut digest = [0u8; 32];
        digest.copy_from_slice(Sha256::digest(der).as_slice());
        Self::Sha256(digest)
    }

    /// Check whether a DER-encoded certificate has this thumbprint.
    pub fn matches(&self, der: &[u8]) -> bool {
        match self {
            Self::Sha1(_) => *self == Self::sha1_of(der),
            Self::Sha256(_) => *self == Self::sha256_of(der),
        }
    }

    fn bytes(&self) -> &[u8] {
        match self {
            Self::Sha1(d) => d,
            Self::Sha256(d) => d,
        }
    }
}

impl fmt::Display for Thumbprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.bytes().iter().map(|b| format!("{b:02X}")).collect();
        f.write_str(&parts.join(":"))
    }
}

impl fmt::Debug for Thumbprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Thumbprint({self})")
    }
}

/// How the client decides to trust the server certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsTrust {
    /// Accept only a leaf certificate with this thumbprint.
    Pinned(Thumbprint),
    /// Accept any certificate.
    Insecure,
}

impl TlsTrust {
    /// Pin to `thumbprint` if one is given, otherwise disable verification.
    ///
    /// Falling back to [`TlsTrust::Insecure`] is logged at `warn`.
    pub fn from_thumbprint(thumbprint: Option<&str>) -> Result<Self> {
        match thumbprint.map(str::trim).filter(|t| !t.is_empty()) {
            Some(value) => Ok(Self::Pinned(Thumbprint::parse(value)?)),
            None => {
                warn!("no certificate thumbprint supplied; TLS verification is disabled");
                Ok(Self::Insecure)
            }
        }
    }

    /// Whether certificate verification is disabled.
    pub fn is_insecure(&self) -> bool {
        matches!(self, Self::Insecure)
    }

    /// Install this trust mode on a reqwest builder.
    pub(crate) fn apply(&self, builder: reqwest::ClientBuilder) -> Result<reqwest::ClientBuilder> {
        match self {
            Self::Insecure => Ok(builder.danger_accept_invalid_certs(true)),
            Self::Pinned(thumbprint) => {
                let provider = Arc::new(rustls::crypto::ring::default_provider());
                let verifier = ThumbprintVerifier {
                    expected: thumbprint.clone(),
                    provider: Arc::clone(&provider),
                };
                let config = rustls::ClientConfig::builder_with_provider(provider)
                    .with_safe_default_protocol_versions()
                    .map_err(|e| Error::Tls(e.to_string()))?
                    .dangerous()
                    .with_custom_certificate_verifier(Arc::new(verifier))
                    .with_no_client_auth();
                Ok(builder.use_preconfigured_tls(config))
            }
        }
    }
}

/// Accepts the server when its leaf certificate matches the pinned digest.
///
/// Chain and hostname are deliberately ignored; handshake signatures are
/// still checked so the peer must hold the certificate's private key.
#[derive(Debug)]
struct ThumbprintVerifier {
    expected: Thumbprint,
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for ThumbprintVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        if self.expected.matches(end_entity.as_ref()) {
            Ok(ServerCertVerified::assertion())
        } else {
            Err(rustls::Error::General(format!(
                "server certificate does not match pinned thumbprint {}",
                self.expected
            )))
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHA1_COLONS: &str = "AB:CD:EF:01:23:45:67:89:AB:CD:EF:01:23:45:67:89:AB:CD:EF:01";

    #[test]
    fn test_parse_sha1_with_colons() {
        let tp = Thumbprint::parse(SHA1_COLONS).unwrap();
        assert!(matches!(tp, Thumbprint::Sha1(_)));
        assert_eq!(tp.to_string(), SHA1_COLONS);
    }

    #[test]
    fn test_parse_is_case_insensitive_and_accepts_bare_hex() {
        let bare = SHA1_COLONS.replace(':', "").to_lowercase();
        assert_eq!(
            Thumbprint::parse(&bare).unwrap(),
            Thumbprint::parse(SHA1_COLONS).unwrap()
        );
    }

    #[test]
    fn test_parse_sha256() {
        let hex = "00".repeat(32);
        assert!(matches!(
            Thumbprint::parse(&hex).unwrap(),
            Thumbprint::Sha256(_)
        ));
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        let err = Thumbprint::parse("AB:CD").unwrap_err();
        assert!(matches!(err, Error::InvalidThumbprint { .. }));
        assert!(err.to_string().contains("got 2"));
    }

    #[test]
    fn test_parse_rejects_non_hex() {
        assert!(Thumbprint::parse("zz".repeat(20).as_str()).is_err());
    }

    #[test]
    fn test_matches_certificate_digest() {
        let der = b"not really a certificate";
        let sha1 = Thumbprint::sha1_of(der);
        let sha256 = Thumbprint::sha256_of(der);
        assert!(sha1.matches(der));
        assert!(sha256.matches(der));
        assert!(!sha1.matches(b"another certificate"));
        assert_eq!(Thumbprint::parse(&sha1.to_string()).unwrap(), sha1);
    }

    #[test]
    fn test_from_thumbprint_none_is_insecure() {
        assert_eq!(TlsTrust::from_thumbprint(None).unwrap(), TlsTrust::Insecure);
        assert!(TlsTrust::from_thumbprint(Some("  ")).unwrap().is_insecure());
    }

    #[test]
    fn test_from_thumbprint_some_is_pinned() {
        let trust = TlsTrust::from_thumbprint(Some(SHA1_COLONS)).unwrap();
        assert!(!trust.is_insecure());
    }

    #[test]
    fn test_pinned_trust_builds_client() {
        let trust = TlsTrust::from_thumbprint(Some(SHA1_COLONS)).unwrap();
        let builder = trust.apply(reqwest::Client::builder()).unwrap();
        assert!(builder.build().is_ok());
    }
}
