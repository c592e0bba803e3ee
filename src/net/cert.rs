//! Self-signed certificate provisioning for the TLS receiver (§10.7).
//!
//! On first run the configured cert/key pair usually does not exist yet;
//! rather than fail, a self-signed `CN=localhost` certificate is generated
//! in its place and written out so subsequent restarts reuse it.

use std::path::Path;
use std::sync::Arc;

use rcgen::{DistinguishedName, DnType};
use rsa::pkcs8::EncodePrivateKey;
use rsa::RsaPrivateKey;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use time::{Duration as CertDuration, OffsetDateTime};
use tracing::info;

use crate::error::{Error, Result};

/// Key size mandated for the self-signed fallback certificate.
const RSA_KEY_BITS: usize = 4096;
/// Validity window for the self-signed fallback certificate.
const CERT_VALIDITY_DAYS: i64 = 365;

/// Loads the TLS server config for `cert_path`/`key_path`, generating and
/// persisting a self-signed pair first if either file is missing.
pub fn load_or_generate(cert_path: &Path, key_path: &Path) -> Result<Arc<rustls::ServerConfig>> {
    if !cert_path.exists() || !key_path.exists() {
        generate_self_signed(cert_path, key_path)?;
    }

    let certs = load_certs(cert_path)?;
    let key = load_key(key_path)?;

    let config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| Error::Tls(e.to_string()))?;

    Ok(Arc::new(config))
}

/// Generates a self-signed RSA-4096 certificate for `CN=localhost`, valid
/// for 365 days, and writes PEM-encoded cert and key to disk.
///
/// rcgen cannot generate RSA key pairs itself (it only signs with an
/// externally supplied one), so the key is generated with the `rsa` crate
/// and imported via its PKCS#8 DER encoding.
fn generate_self_signed(cert_path: &Path, key_path: &Path) -> Result<()> {
    info!(cert = %cert_path.display(), key = %key_path.display(), "generating self-signed certificate");

    let mut rng = rand::thread_rng();
    let rsa_key = RsaPrivateKey::new(&mut rng, RSA_KEY_BITS)
        .map_err(|e| Error::CertGeneration(e.to_string()))?;
    let pkcs8_der = rsa_key.to_pkcs8_der().map_err(|e| Error::CertGeneration(e.to_string()))?;
    let key_pair =
        rcgen::KeyPair::from_pkcs8_der_and_sign_algo(
            &PrivatePkcs8KeyDer::from(pkcs8_der.as_bytes().to_vec()),
            &rcgen::PKCS_RSA_SHA256,
        )
        .map_err(|e| Error::CertGeneration(e.to_string()))?;

    let mut params = rcgen::CertificateParams::new(vec!["localhost".to_string()])
        .map_err(|e| Error::CertGeneration(e.to_string()))?;

    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, "localhost");
    params.distinguished_name = dn;

    let now = OffsetDateTime::now_utc();
    params.not_before = now;
    params.not_after = now + CertDuration::days(CERT_VALIDITY_DAYS);

    let cert = params.self_signed(&key_pair).map_err(|e| Error::CertGeneration(e.to_string()))?;

    if let Some(parent) = cert_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if let Some(parent) = key_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(cert_path, cert.pem())?;
    std::fs::write(key_path, key_pair.serialize_pem())?;
    Ok(())
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let file = std::fs::File::open(path)?;
    let mut reader = std::io::BufReader::new(file);
    rustls_pemfile::certs(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::Tls(format!("could not parse certificate: {e}")))
}

fn load_key(path: &Path) -> Result<PrivateKeyDer<'static>> {
    let file = std::fs::File::open(path)?;
    let mut reader = std::io::BufReader::new(file);
    rustls_pemfile::private_key(&mut reader)
        .map_err(|e| Error::Tls(format!("could not parse private key: {e}")))?
        .ok_or_else(|| Error::Tls(format!("no private key found in {}", path.display())))
}
