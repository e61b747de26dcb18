//! TLS client configuration from a custom CA bundle.
//!
//! Servers fronted by self-signed or private certificate authorities are
//! verified against the caller-supplied CA bundle instead of the system
//! roots, matching the usual "point the client at ca.crt" deployment.

use std::io;

use camino::Utf8Path;
use rustls::pki_types::pem::PemObject as _;
use rustls::pki_types::CertificateDer;

/// Build a rustls client configuration trusting only the CA certificates in
/// the PEM bundle at `path`.
pub fn client_config_with_ca_bundle(path: &Utf8Path) -> io::Result<rustls::ClientConfig> {
    crate::init();
    let pem = std::fs::read(path)?;

    let mut roots = rustls::RootCertStore::empty();
    for cert in CertificateDer::pem_slice_iter(&pem) {
        let cert = cert.map_err(|err| {
            io::Error::new(io::ErrorKind::InvalidData, format!("{path}: {err:?}"))
        })?;
        roots
            .add(cert)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, format!("{path}: {err}")))?;
    }

    if roots.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{path}: no CA certificates found"),
        ));
    }

    Ok(rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth())
}
