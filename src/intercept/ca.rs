// Certificate authority for TLS interception.
// Loads the persisted CA, or generates one on first start for installation on the client device.

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use hudsucker::certificate_authority::RcgenAuthority;
use hudsucker::rcgen::{
    BasicConstraints, CertificateParams, DnType, IsCa, KeyPair, KeyUsagePurpose,
};
use hudsucker::rustls::crypto::aws_lc_rs;
use tracing::info;

use crate::error::{Error, Result};

pub const CERT_FILE: &str = "ca.pem";
pub const KEY_FILE: &str = "ca.key";

const COMMON_NAME: &str = "stationtap interception CA";
const LEAF_CACHE_SIZE: u64 = 1_000;

/// Default directory for the CA files (platform data dir).
pub fn default_ca_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "stationtap").map(|dirs| dirs.data_dir().to_path_buf())
}

/// Load the CA from `dir`, creating and persisting a new one if absent.
pub fn load_or_create(dir: &Path) -> Result<RcgenAuthority> {
    let cert_path = dir.join(CERT_FILE);
    let key_path = dir.join(KEY_FILE);

    if !cert_path.exists() || !key_path.exists() {
        let (cert_pem, key_pem) = generate()?;
        fs::create_dir_all(dir)?;
        fs::write(&cert_path, cert_pem)?;
        write_private(&key_path, &key_pem)?;
        info!(cert = %cert_path.display(), "generated new interception CA; install it on the client");
    }

    let cert_pem = fs::read_to_string(&cert_path)?;
    let key_pem = fs::read_to_string(&key_path)?;
    authority(&cert_pem, &key_pem)
}

fn authority(cert_pem: &str, key_pem: &str) -> Result<RcgenAuthority> {
    let key_pair = KeyPair::from_pem(key_pem).map_err(certificate_error)?;
    let ca_cert = CertificateParams::from_ca_cert_pem(cert_pem)
        .map_err(certificate_error)?
        .self_signed(&key_pair)
        .map_err(certificate_error)?;

    Ok(RcgenAuthority::new(
        key_pair,
        ca_cert,
        LEAF_CACHE_SIZE,
        aws_lc_rs::default_provider(),
    ))
}

/// Generate a self-signed CA, returning (certificate PEM, key PEM).
fn generate() -> Result<(String, String)> {
    let key_pair = KeyPair::generate().map_err(certificate_error)?;

    let mut params = CertificateParams::default();
    params.distinguished_name.push(DnType::CommonName, COMMON_NAME);
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.key_usages = vec![
        KeyUsagePurpose::KeyCertSign,
        KeyUsagePurpose::CrlSign,
        KeyUsagePurpose::DigitalSignature,
    ];

    let cert = params.self_signed(&key_pair).map_err(certificate_error)?;
    Ok((cert.pem(), key_pair.serialize_pem()))
}

fn write_private(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}

fn certificate_error(e: impl std::fmt::Display) -> Error {
    Error::Certificate(e.to_string())
}
