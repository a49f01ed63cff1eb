//! TLS/mTLS resolution for the node's own listener.
//!
//! Three tiers, in order: mTLS (client CA configured) > plain TLS (server
//! cert/key configured) > plaintext HTTP.

use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;

use node_config::TlsSettings;

pub enum ListenerTls {
    Plaintext,
    Tls(axum_server::tls_rustls::RustlsConfig),
}

pub async fn resolve(tls: &TlsSettings) -> Result<ListenerTls, String> {
    let (Some(cert_path), Some(key_path)) = (&tls.server_cert, &tls.server_key) else {
        return Ok(ListenerTls::Plaintext);
    };

    // axum-server's "tls-rustls-no-provider" feature requires us to install a
    // crypto provider ourselves; a second install attempt (e.g. a config
    // reload) is harmless and simply returns an error we ignore.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let certs = load_certs(cert_path)?;
    let key = load_key(key_path)?;

    let mut config = rustls::ServerConfig::builder();

    let config = if let Some(ca_path) = &tls.client_ca {
        let roots = load_certs(ca_path)?;
        let mut store = rustls::RootCertStore::empty();
        for cert in roots {
            store
                .add(cert)
                .map_err(|e| format!("add client CA cert: {e}"))?;
        }
        let verifier = rustls::server::WebPkiClientVerifier::builder(Arc::new(store))
            .build()
            .map_err(|e| format!("build client verifier: {e}"))?;
        config
            .with_client_cert_verifier(verifier)
            .with_single_cert(certs, key)
            .map_err(|e| format!("build mTLS server config: {e}"))?
    } else {
        config
            .with_no_client_auth()
            .with_single_cert(certs, key)
            .map_err(|e| format!("build TLS server config: {e}"))?
    };

    let rustls_config = axum_server::tls_rustls::RustlsConfig::from_config(Arc::new(config));
    Ok(ListenerTls::Tls(rustls_config))
}

fn load_certs(path: &str) -> Result<Vec<rustls::pki_types::CertificateDer<'static>>, String> {
    let file = File::open(path).map_err(|e| format!("open {path}: {e}"))?;
    let mut reader = BufReader::new(file);
    rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("parse certs in {path}: {e}"))
}

fn load_key(path: &str) -> Result<rustls::pki_types::PrivateKeyDer<'static>, String> {
    let file = File::open(path).map_err(|e| format!("open {path}: {e}"))?;
    let mut reader = BufReader::new(file);
    rustls_pemfile::private_key(&mut reader)
        .map_err(|e| format!("parse key in {path}: {e}"))?
        .ok_or_else(|| format!("no private key found in {path}"))
}
