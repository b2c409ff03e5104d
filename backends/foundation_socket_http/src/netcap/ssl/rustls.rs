//! rustls client side: configuration and the blocking handshake.

use std::net::TcpStream;
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, ClientConnection, DigitallySignedStruct, RootCertStore, SignatureScheme};

use crate::config::TlsVersion;
use crate::netcap::errors::{ConnectError, ConnectResult};

pub type ClientTlsStream = rustls::StreamOwned<ClientConnection, TcpStream>;

fn protocol_versions(min: TlsVersion) -> &'static [&'static rustls::SupportedProtocolVersion] {
    static FROM_TLS12: &[&rustls::SupportedProtocolVersion] =
        &[&rustls::version::TLS13, &rustls::version::TLS12];
    static FROM_TLS13: &[&rustls::SupportedProtocolVersion] = &[&rustls::version::TLS13];

    match min {
        TlsVersion::Tls12 => FROM_TLS12,
        TlsVersion::Tls13 => FROM_TLS13,
    }
}

/// Builds the client configuration for the given minimum version and
/// verification policy. Verification uses the Mozilla root set.
pub fn client_config(min: TlsVersion, verify_certificate: bool) -> ConnectResult<Arc<ClientConfig>> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());

    let builder = ClientConfig::builder_with_provider(provider.clone())
        .with_protocol_versions(protocol_versions(min))
        .map_err(|err| ConnectError::TlsHandshake(err.to_string()))?;

    let config = if verify_certificate {
        let root_store = RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
        };
        builder
            .with_root_certificates(root_store)
            .with_no_client_auth()
    } else {
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate(provider)))
            .with_no_client_auth()
    };

    Ok(Arc::new(config))
}

/// Runs the TLS handshake to completion over `tcp`.
///
/// The handshake is driven eagerly so failures surface at connect time
/// instead of on the first write.
pub fn handshake(
    config: Arc<ClientConfig>,
    host: &str,
    mut tcp: TcpStream,
) -> ConnectResult<ClientTlsStream> {
    let sni = host.trim_start_matches('[').trim_end_matches(']');
    let server_name = ServerName::try_from(sni)
        .map(|name| name.to_owned())
        .map_err(|_| ConnectError::InvalidServerName(host.to_string()))?;

    let mut connection = ClientConnection::new(config, server_name)
        .map_err(|err| ConnectError::TlsHandshake(err.to_string()))?;

    while connection.is_handshaking() {
        connection
            .complete_io(&mut tcp)
            .map_err(|err| ConnectError::TlsHandshake(err.to_string()))?;
    }

    tracing::debug!(
        "TLS handshake with {} complete ({:?})",
        host,
        connection.protocol_version()
    );
    Ok(rustls::StreamOwned::new(connection, tcp))
}

/// Verifier used when certificate verification is switched off: accepts any
/// chain but still checks handshake signatures.
#[derive(Debug)]
struct AcceptAnyCertificate(Arc<CryptoProvider>);

impl ServerCertVerifier for AcceptAnyCertificate {
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
        verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}
