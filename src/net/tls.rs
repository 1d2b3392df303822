//! TLS configuration and certificate loading.

use std::path::{Path, PathBuf};

use axum_server::tls_rustls::RustlsConfig;

/// Error type for TLS setup.
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no certificates found in {}", .0.display())]
    NoCertificates(PathBuf),

    #[error("no private key found in {}", .0.display())]
    NoPrivateKey(PathBuf),

    #[error("invalid TLS material: {0}")]
    Config(#[source] std::io::Error),
}

/// Load a PEM certificate chain and private key into a rustls server config.
///
/// Handshake failures later on only affect the connection that failed.
pub async fn load_tls_config(cert_path: &Path, key_path: &Path) -> Result<RustlsConfig, TlsError> {
    let cert_pem = read(cert_path).await?;
    let key_pem = read(key_path).await?;

    let certs = rustls_pemfile::certs(&mut cert_pem.as_slice())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| TlsError::Read {
            path: cert_path.to_path_buf(),
            source,
        })?;
    if certs.is_empty() {
        return Err(TlsError::NoCertificates(cert_path.to_path_buf()));
    }

    let key = rustls_pemfile::private_key(&mut key_pem.as_slice())
        .map_err(|source| TlsError::Read {
            path: key_path.to_path_buf(),
            source,
        })?
        .ok_or_else(|| TlsError::NoPrivateKey(key_path.to_path_buf()))?;

    tracing::debug!(
        cert_path = ?cert_path,
        chain_length = certs.len(),
        "Loaded TLS certificate chain"
    );

    RustlsConfig::from_der(
        certs.iter().map(|cert| cert.as_ref().to_vec()).collect(),
        key.secret_der().to_vec(),
    )
    .await
    .map_err(TlsError::Config)
}

async fn read(path: &Path) -> Result<Vec<u8>, TlsError> {
    tokio::fs::read(path).await.map_err(|source| TlsError::Read {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
    }

    #[tokio::test]
    async fn loads_fixture_pair() {
        load_tls_config(&fixture("cert.pem"), &fixture("key.pem"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn missing_file_reported_with_path() {
        let err = load_tls_config(&fixture("absent.pem"), &fixture("key.pem"))
            .await
            .unwrap_err();
        assert!(matches!(err, TlsError::Read { .. }));
        assert!(err.to_string().contains("absent.pem"));
    }

    #[tokio::test]
    async fn key_file_without_key() {
        // The certificate file holds no private key.
        let err = load_tls_config(&fixture("cert.pem"), &fixture("cert.pem"))
            .await
            .unwrap_err();
        assert!(matches!(err, TlsError::NoPrivateKey(_)));
    }

    #[tokio::test]
    async fn cert_file_without_certificates() {
        let err = load_tls_config(&fixture("key.pem"), &fixture("key.pem"))
            .await
            .unwrap_err();
        assert!(matches!(err, TlsError::NoCertificates(_)));
    }
}
