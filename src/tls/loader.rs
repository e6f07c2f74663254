//! Trust-anchor pool and identity keypair loading.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use rustls::sign::CertifiedKey;
use rustls::RootCertStore;
use rustls_pki_types::{CertificateDer, PrivateKeyDer};

use crate::error::Error;

/// An identity certificate chain bound to its private key.
///
/// Construction goes through [`load_keypair`], which proves the key matches
/// the leaf certificate before the pair is accepted.
#[derive(Debug)]
pub(crate) struct KeyPair {
    chain: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
    certified: Arc<CertifiedKey>,
}

impl KeyPair {
    pub(crate) fn chain(&self) -> Vec<CertificateDer<'static>> {
        self.chain.clone()
    }

    pub(crate) fn private_key(&self) -> PrivateKeyDer<'static> {
        self.key.clone_key()
    }

    pub(crate) fn certified(&self) -> Arc<CertifiedKey> {
        Arc::clone(&self.certified)
    }
}

/// Load the identity keypair named by the settings value.
///
/// Absent paths are not an error: the identity is simply `None`. A one-sided
/// pair, an unreadable file, unparsable PEM, or a key that does not match the
/// certificate all fail the load.
pub(crate) fn load_keypair(
    cert_file: Option<&Path>,
    key_file: Option<&Path>,
) -> Result<Option<KeyPair>, Error> {
    let (cert_path, key_path) = match (cert_file, key_file) {
        (Some(cert), Some(key)) => (cert, key),
        (None, None) => return Ok(None),
        _ => return Err(Error::IncompleteKeyPair),
    };

    let chain = read_certs(cert_path)?;
    let key = read_private_key(key_path)?;

    let provider = rustls::crypto::ring::default_provider();
    let certified = CertifiedKey::from_der(chain.clone(), key.clone_key(), &provider).map_err(
        |source| Error::BadKeyPair {
            path: cert_path.to_path_buf(),
            source,
        },
    )?;

    Ok(Some(KeyPair {
        chain,
        key,
        certified: Arc::new(certified),
    }))
}

/// Assemble the trust-anchor pool from the settings value.
///
/// `ca_file` is a bundle that may hold several certificates. When it is
/// absent, every regular file under `ca_path` is read instead. `ca_file`
/// takes exclusive precedence; the two sources are never merged. A source
/// that yields no certificates at all is an error.
pub(crate) fn load_ca_pool(
    ca_file: Option<&Path>,
    ca_path: Option<&Path>,
) -> Result<Option<RootCertStore>, Error> {
    let mut pool = RootCertStore::empty();

    if let Some(file) = ca_file {
        add_pem_file(&mut pool, file)?;
    } else if let Some(dir) = ca_path {
        let entries = fs::read_dir(dir).map_err(|source| Error::ReadFile {
            path: dir.to_path_buf(),
            source,
        })?;
        for entry in entries {
            let entry = entry.map_err(|source| Error::ReadFile {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if path.is_file() {
                add_pem_file(&mut pool, &path)?;
            }
        }
        if pool.is_empty() {
            return Err(Error::NoCertificates(dir.to_path_buf()));
        }
    } else {
        return Ok(None);
    }

    Ok(Some(pool))
}

fn add_pem_file(pool: &mut RootCertStore, path: &Path) -> Result<(), Error> {
    for cert in read_certs(path)? {
        pool.add(cert).map_err(|source| Error::BadCaCertificate {
            path: path.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

fn read_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, Error> {
    let file = File::open(path).map_err(|source| Error::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let certs = rustls_pemfile::certs(&mut BufReader::new(file))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| Error::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
    if certs.is_empty() {
        return Err(Error::NoCertificates(path.to_path_buf()));
    }
    Ok(certs)
}

fn read_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, Error> {
    let file = File::open(path).map_err(|source| Error::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    rustls_pemfile::private_key(&mut BufReader::new(file))
        .map_err(|source| Error::ReadFile {
            path: path.to_path_buf(),
            source,
        })?
        .ok_or_else(|| Error::MissingPrivateKey(path.to_path_buf()))
}
