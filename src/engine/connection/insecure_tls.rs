//! TLS transport that presents the client certificate but accepts any
//! engine certificate.

use std::path::PathBuf;
use std::sync::Arc;

use bollard::errors::Error as BollardError;
use bollard::{BollardRequest, ClientVersion, Docker};
use camino::Utf8Path;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, SignatureScheme};

use crate::engine::profile::TlsMaterial;
use crate::error::{ConfigError, ContainerError, K2Error};

/// Skips chain and name checks. Handshake signatures are still verified
/// against the presented certificate.
#[derive(Debug)]
struct AcceptAnyEngineCert {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyEngineCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

fn unreadable(path: &Utf8Path, error: &rustls::pki_types::pem::Error) -> K2Error {
    K2Error::from(ConfigError::TlsMaterial {
        path: PathBuf::from(path.as_std_path()),
        message: error.to_string(),
    })
}

fn client_config(material: &TlsMaterial) -> Result<ClientConfig, K2Error> {
    let chain = CertificateDer::pem_file_iter(material.cert().as_std_path())
        .and_then(|certs| certs.collect::<Result<Vec<_>, _>>())
        .map_err(|error| unreadable(material.cert(), &error))?;
    let key = PrivateKeyDer::from_pem_file(material.key().as_std_path())
        .map_err(|error| unreadable(material.key(), &error))?;

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let rejected = |error: rustls::Error| {
        K2Error::from(ContainerError::ConnectionFailed {
            message: format!("invalid TLS client configuration: {error}"),
        })
    };
    ClientConfig::builder_with_provider(Arc::clone(&provider))
        .with_safe_default_protocol_versions()
        .map_err(rejected)?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AcceptAnyEngineCert { provider }))
        .with_client_auth_cert(chain, key)
        .map_err(rejected)
}

/// Build a client for `host` that authenticates with `material` and does
/// not verify the engine.
///
/// # Errors
///
/// Returns `ConfigError::TlsMaterial` when the client certificate or key
/// cannot be parsed, and `ContainerError::ConnectionFailed` when the pair
/// is rejected or the client cannot be built.
pub(super) fn connect(
    host: &str,
    material: &TlsMaterial,
    timeout: u64,
    version: &ClientVersion,
) -> Result<Docker, K2Error> {
    let config = client_config(material)?;

    let mut http_connector = HttpConnector::new();
    http_connector.enforce_http(false);
    let https_connector = HttpsConnector::from((http_connector, config));

    let mut client_builder = Client::builder(TokioExecutor::new());
    client_builder.pool_max_idle_per_host(0);
    let client = Arc::new(client_builder.build(https_connector));

    let address = format!(
        "https://{}",
        host.replacen("tcp://", "", 1).replacen("https://", "", 1)
    );
    Docker::connect_with_custom_transport(
        move |request: BollardRequest| {
            let shared = Arc::clone(&client);
            async move { shared.request(request).await.map_err(BollardError::from) }
        },
        Some(address),
        timeout,
        version,
    )
    .map_err(|error| {
        K2Error::from(ContainerError::ConnectionFailed {
            message: error.to_string(),
        })
    })
}
