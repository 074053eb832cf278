//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! IoT Edge environment (IOTEDGE_WORKLOADURI, IOTEDGE_MODULEID, ...)
//!     → workload.rs (security daemon client, one connection per call)
//!     → certificates.rs (PEM → leaf + issuers + key)
//!     → provisioner.rs (install into trust_store.rs)
//!     → net::tls (server config for the webhook host,
//!                 client identity for Event Grid)
//! ```
//!
//! # Design Decisions
//! - Server identity and trust bundle are provisioned before anything listens
//! - Client identity is fetched lazily, only for subscription registration
//! - The trust store only ever grows

pub mod certificates;
pub mod error;
pub mod provisioner;
pub mod trust_store;
pub mod workload;

pub use certificates::IssuedCertificate;
pub use error::{SecurityError, SecurityResult};
pub use provisioner::{provision_client_identity, provision_server_identity, CertificateSource};
pub use trust_store::TrustStore;
pub use workload::{SecurityDaemon, WorkloadSettings};
