//! Certificate material issued by the security daemon.

use std::io::Cursor;

use rustls::pki_types::CertificateDer;

use crate::security::error::{SecurityError, SecurityResult};

/// A certificate with its private key, as issued by the security daemon.
#[derive(Clone)]
pub struct IssuedCertificate {
    /// Leaf certificate followed by its issuers, PEM encoded.
    pub certificate_pem: String,
    /// PEM encoded private key for the leaf.
    pub private_key_pem: String,
    /// Expiration as reported by the daemon, if any.
    pub expiration: Option<String>,
    leaf: CertificateDer<'static>,
    issuers: Vec<CertificateDer<'static>>,
}

impl IssuedCertificate {
    /// Parse and check PEM material. The first certificate is the leaf.
    pub fn from_pem(
        certificate_pem: impl Into<String>,
        private_key_pem: impl Into<String>,
        expiration: Option<String>,
    ) -> SecurityResult<Self> {
        let certificate_pem = certificate_pem.into();
        let private_key_pem = private_key_pem.into();

        let mut certs = parse_certificates(&certificate_pem)?.into_iter();
        let leaf = certs
            .next()
            .ok_or_else(|| SecurityError::Pem("certificate chain is empty".to_string()))?;

        let key = rustls_pemfile::private_key(&mut Cursor::new(private_key_pem.as_bytes()))
            .map_err(|e| SecurityError::Pem(format!("unreadable private key: {}", e)))?;
        if key.is_none() {
            return Err(SecurityError::Pem("no private key found".to_string()));
        }

        Ok(Self {
            certificate_pem,
            private_key_pem,
            expiration,
            leaf,
            issuers: certs.collect(),
        })
    }

    /// The end-entity certificate.
    pub fn leaf(&self) -> &CertificateDer<'static> {
        &self.leaf
    }

    /// Intermediate CAs that followed the leaf in the issued chain.
    pub fn issuers(&self) -> &[CertificateDer<'static>] {
        &self.issuers
    }

    /// Key and chain in one PEM buffer, the shape client identities are loaded from.
    pub fn identity_pem(&self) -> String {
        format!("{}\n{}", self.private_key_pem.trim_end(), self.certificate_pem)
    }
}

impl std::fmt::Debug for IssuedCertificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedCertificate")
            .field("issuers", &self.issuers.len())
            .field("expiration", &self.expiration)
            .finish_non_exhaustive()
    }
}

/// Parse every `CERTIFICATE` block in a PEM string.
pub fn parse_certificates(pem: &str) -> SecurityResult<Vec<CertificateDer<'static>>> {
    rustls_pemfile::certs(&mut Cursor::new(pem.as_bytes()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| SecurityError::Pem(format!("unreadable certificate: {}", e)))
}
