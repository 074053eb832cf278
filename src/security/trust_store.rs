//! Process-wide store of trusted certificates.
//!
//! Append-only and de-duplicated by DER bytes, so installing the same
//! certificate twice (for example after a retried fetch) is harmless.

use dashmap::DashSet;
use rustls::pki_types::CertificateDer;

#[derive(Debug, Default)]
pub struct TrustStore {
    certificates: DashSet<Vec<u8>>,
}

impl TrustStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install one certificate. Returns `false` if it was already present.
    pub fn install(&self, certificate: &CertificateDer<'_>) -> bool {
        self.certificates.insert(certificate.as_ref().to_vec())
    }

    /// Install several certificates, returning how many were new.
    pub fn install_all<'a, 'b: 'a, I>(&self, certificates: I) -> usize
    where
        I: IntoIterator<Item = &'a CertificateDer<'b>>,
    {
        certificates.into_iter().filter(|c| self.install(c)).count()
    }

    pub fn contains(&self, certificate: &CertificateDer<'_>) -> bool {
        self.certificates.contains(certificate.as_ref())
    }

    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    /// Snapshot of the installed certificates, in no particular order.
    pub fn certificates(&self) -> Vec<CertificateDer<'static>> {
        self.certificates
            .iter()
            .map(|der| CertificateDer::from(der.key().clone()))
            .collect()
    }
}
