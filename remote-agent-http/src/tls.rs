//! Self-signed TLS certificate provisioning. The external interface lists "self-signed
//! TLS certificate and key (generated if absent; validated for non-expiry on
//! load)" among the agent's persisted state; `rcgen` generates the pair and
//! `x509-parser` re-parses it on every load to check expiry, since `rcgen`
//! doesn't expose a direct "is this still valid" check on a loaded PEM.

use std::path::Path;

use anyhow::{Context, Result};
use poem::listener::{RustlsCertificate, RustlsConfig};
use tracing::info;

/// Loads `cert.pem`/`key.pem` from `dir`, generating a fresh self-signed pair
/// if either is missing or the existing certificate has expired.
pub async fn ensure_tls_certificate(dir: impl AsRef<Path>) -> Result<RustlsConfig> {
    let dir = dir.as_ref();
    tokio::fs::create_dir_all(dir).await?;
    let cert_path = dir.join("cert.pem");
    let key_path = dir.join("key.pem");

    let existing = match (
        tokio::fs::read(&cert_path).await,
        tokio::fs::read(&key_path).await,
    ) {
        (Ok(cert), Ok(key)) if certificate_is_valid(&cert) => Some((cert, key)),
        _ => None,
    };

    let (cert_pem, key_pem) = match existing {
        Some(pair) => pair,
        None => {
            info!(?cert_path, "generating self-signed TLS certificate");
            let generated = generate_self_signed()?;
            tokio::fs::write(&cert_path, &generated.0).await?;
            tokio::fs::write(&key_path, &generated.1).await?;
            #[cfg(unix)]
            remote_agent_common::helpers::fs::secure_file(&key_path)?;
            generated
        }
    };

    Ok(RustlsConfig::new().fallback(RustlsCertificate::new().cert(cert_pem).key(key_pem)))
}

fn generate_self_signed() -> Result<(Vec<u8>, Vec<u8>)> {
    let subject_alt_names = vec!["localhost".to_string()];
    let cert = rcgen::generate_simple_self_signed(subject_alt_names)
        .context("generating self-signed certificate")?;
    Ok((
        cert.cert.pem().into_bytes(),
        cert.signing_key.serialize_pem().into_bytes(),
    ))
}

fn certificate_is_valid(cert_pem: &[u8]) -> bool {
    let Ok((_, pem)) = x509_parser::pem::parse_x509_pem(cert_pem) else {
        return false;
    };
    let Ok(x509) = pem.parse_x509() else {
        return false;
    };
    let validity = x509.validity();
    let now = x509_parser::time::ASN1Time::now();
    validity.not_before <= now && now <= validity.not_after
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn generates_and_reloads_a_valid_certificate() {
        let mut dir = std::env::temp_dir();
        dir.push(format!("remote-agent-tls-test-{}", uuid::Uuid::new_v4()));
        ensure_tls_certificate(&dir).await.unwrap();
        let cert = tokio::fs::read(dir.join("cert.pem")).await.unwrap();
        assert!(certificate_is_valid(&cert));
    }
}
