//! Shared fixtures for integration tests.
//!
//! Certificates are generated per test with rcgen and written to a unique
//! directory under the system temp dir, since the configurator loads
//! material from file paths.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use rcgen::{
    BasicConstraints, Certificate, CertificateParams, DnType, IsCa, KeyPair, KeyUsagePurpose,
};

use cluster_tls::{Configurator, TlsSettings};

static FIXTURE_SEQ: AtomicUsize = AtomicUsize::new(0);

/// A throwaway CA plus one leaf identity, written out as PEM files.
pub struct TestPki {
    pub dir: PathBuf,
    pub ca_file: PathBuf,
    pub cert_file: PathBuf,
    pub key_file: PathBuf,
    ca_cert: Certificate,
    ca_key: KeyPair,
}

impl TestPki {
    /// Generate a CA and a leaf certificate valid for `sans`.
    pub fn new(tag: &str, sans: &[&str]) -> Self {
        let dir = unique_dir(tag);

        let (ca_cert, ca_key) = generate_ca("cluster-tls test CA");
        let ca_file = dir.join("ca.pem");
        fs::write(&ca_file, ca_cert.pem()).unwrap();

        let mut pki = Self {
            dir,
            ca_file,
            cert_file: PathBuf::new(),
            key_file: PathBuf::new(),
            ca_cert,
            ca_key,
        };
        let (cert_file, key_file) = pki.issue_leaf("leaf", sans);
        pki.cert_file = cert_file;
        pki.key_file = key_file;
        pki
    }

    /// Issue an extra leaf signed by this PKI's CA.
    pub fn issue_leaf(&self, name: &str, sans: &[&str]) -> (PathBuf, PathBuf) {
        let key = KeyPair::generate().unwrap();
        let params =
            CertificateParams::new(sans.iter().map(|s| s.to_string()).collect::<Vec<_>>())
                .unwrap();
        let cert = params
            .signed_by(&key, &self.ca_cert, &self.ca_key)
            .unwrap();

        let cert_file = self.dir.join(format!("{name}.pem"));
        let key_file = self.dir.join(format!("{name}.key"));
        fs::write(&cert_file, cert.pem()).unwrap();
        fs::write(&key_file, key.serialize_pem()).unwrap();
        (cert_file, key_file)
    }

    /// Settings presenting this PKI's leaf and trusting its CA.
    pub fn settings(&self) -> TlsSettings {
        TlsSettings {
            ca_file: Some(self.ca_file.clone()),
            cert_file: Some(self.cert_file.clone()),
            key_file: Some(self.key_file.clone()),
            ..TlsSettings::default()
        }
    }

    pub fn configurator(&self) -> Configurator {
        Configurator::new(self.settings()).unwrap()
    }
}

fn generate_ca(common_name: &str) -> (Certificate, KeyPair) {
    let key = KeyPair::generate().unwrap();
    let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.key_usages = vec![
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::KeyCertSign,
        KeyUsagePurpose::CrlSign,
    ];
    params
        .distinguished_name
        .push(DnType::CommonName, common_name);
    let cert = params.self_signed(&key).unwrap();
    (cert, key)
}

/// Write a standalone self-signed CA into `dir` and return its path.
pub fn write_ca_file(dir: &Path, name: &str) -> PathBuf {
    let (cert, _key) = generate_ca(name);
    let path = dir.join(format!("{name}.pem"));
    fs::write(&path, cert.pem()).unwrap();
    path
}

/// Fresh empty directory under the system temp dir.
pub fn unique_dir(tag: &str) -> PathBuf {
    let seq = FIXTURE_SEQ.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!(
        "cluster-tls-test-{}-{}-{}",
        std::process::id(),
        tag,
        seq
    ));
    fs::create_dir_all(&dir).unwrap();
    dir
}
