//! Transport to lnd: pinned TLS over HTTP/2 with macaroon authentication.
//!
//! [`LndDialer`] is the pool's connection factory. Each [`LndConnection`] owns one hyper client
//! and hands out [`LndStub`] call proxies bound to it.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use hyper_rustls::HttpsConnectorBuilder;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client as HyperClient;
use hyper_util::rt::TokioExecutor;
use lnmon_pool::{Dialer, Transport};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::ring::default_provider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, Error as TLSError, SignatureScheme};
use tokio::fs;
use tonic::body::Body;
use tonic::codegen::InterceptedService;
use tonic::metadata::AsciiMetadataValue;
use tonic::service::Interceptor;
use tonic::{Request, Status};

use crate::rpc::{LightningConnection, LndStub};
use crate::{lnrpc, Error};

type HttpsClient = HyperClient<hyper_rustls::HttpsConnector<HttpConnector>, Body>;

/// Authenticated HTTP/2 service every stub of a connection shares
pub type LndService = InterceptedService<HttpsClient, MacaroonInterceptor>;

/// Generated lnrpc client over [`LndService`]
pub type LightningClient = lnrpc::lightning_client::LightningClient<LndService>;

/// Accepts exactly the certificate chain found in lnd's `tls.cert`
#[derive(Debug)]
pub(crate) struct LndCertVerifier {
    pinned: Vec<Vec<u8>>,
    provider: Arc<rustls::crypto::CryptoProvider>,
}

impl LndCertVerifier {
    pub(crate) async fn load(path: &Path) -> Result<Self, Error> {
        let contents = fs::read(path)
            .await
            .map_err(|err| Error::ReadFile(path.to_path_buf(), err))?;
        let mut reader = std::io::Cursor::new(contents);

        let mut pinned: Vec<Vec<u8>> = rustls_pemfile::certs(&mut reader)
            .flatten()
            .map(|cert| cert.to_vec())
            .collect();

        if pinned.is_empty() {
            return Err(Error::InvalidConfig(format!(
                "No certificate found in {}",
                path.display()
            )));
        }
        pinned.sort();

        Ok(Self {
            pinned,
            provider: Arc::new(default_provider()),
        })
    }
}

impl ServerCertVerifier for LndCertVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, TLSError> {
        let mut presented: Vec<Vec<u8>> = intermediates
            .iter()
            .chain(std::iter::once(end_entity))
            .map(|c| c.as_ref().to_vec())
            .collect();
        presented.sort();

        if presented.len() != self.pinned.len() {
            return Err(TLSError::General(format!(
                "Mismatched number of certificates (Expected: {}, Presented: {})",
                self.pinned.len(),
                presented.len()
            )));
        }

        if presented != self.pinned {
            return Err(TLSError::General(
                "Server certificates do not match the pinned lnd certificate".to_string(),
            ));
        }

        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TLSError> {
        rustls::crypto::verify_tls12_signature(
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
    ) -> Result<HandshakeSignatureValid, TLSError> {
        rustls::crypto::verify_tls13_signature(
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

/// Supplies requests with macaroon
#[derive(Clone)]
pub struct MacaroonInterceptor {
    macaroon: AsciiMetadataValue,
}

impl std::fmt::Debug for MacaroonInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MacaroonInterceptor")
            .field("macaroon", &"<redacted>")
            .finish()
    }
}

impl Interceptor for MacaroonInterceptor {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        request
            .metadata_mut()
            .insert("macaroon", self.macaroon.clone());
        Ok(request)
    }
}

async fn load_macaroon(path: &Path) -> Result<AsciiMetadataValue, Error> {
    let macaroon = fs::read(path)
        .await
        .map_err(|err| Error::ReadFile(path.to_path_buf(), err))?;

    AsciiMetadataValue::from_str(&hex::encode(macaroon))
        .map_err(|e| Error::InvalidConfig(format!("Invalid macaroon: {e}")))
}

/// Parse `host:port`, with or without scheme, into the https origin of the node
pub(crate) fn origin(address: &str) -> Result<http::Uri, Error> {
    let address = address
        .trim_start_matches("http://")
        .trim_start_matches("https://");

    http::Uri::from_str(&format!("https://{address}"))
        .map_err(|e| Error::InvalidConfig(format!("Invalid URI: {e}")))
}

/// One authenticated transport to lnd
#[derive(Clone)]
pub struct LndConnection {
    service: LndService,
    origin: http::Uri,
    max_msg_recv_size: Option<usize>,
}

impl std::fmt::Debug for LndConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LndConnection")
            .field("origin", &self.origin)
            .field("max_msg_recv_size", &self.max_msg_recv_size)
            .finish()
    }
}

impl Transport for LndConnection {
    fn target(&self) -> String {
        self.origin
            .authority()
            .map(|authority| authority.to_string())
            .unwrap_or_default()
    }
}

impl LightningConnection for LndConnection {
    type Stub = LndStub;

    fn stub(&self) -> Self::Stub {
        let mut client =
            LightningClient::with_origin(self.service.clone(), self.origin.clone());

        if let Some(limit) = self.max_msg_recv_size {
            client = client.max_decoding_message_size(limit);
        }

        LndStub::new(client)
    }
}

/// Opens [`LndConnection`]s to a single node
#[derive(Debug, Clone)]
pub struct LndDialer {
    address: String,
    cert_file: PathBuf,
    macaroon_file: PathBuf,
    max_msg_recv_size: Option<usize>,
}

impl LndDialer {
    /// Create new [`LndDialer`]
    pub fn new(
        address: impl Into<String>,
        cert_file: impl Into<PathBuf>,
        macaroon_file: impl Into<PathBuf>,
    ) -> Result<Self, Error> {
        let address = address.into();
        // Fail early on a malformed address rather than on first dial
        origin(&address)?;

        Ok(Self {
            address,
            cert_file: cert_file.into(),
            macaroon_file: macaroon_file.into(),
            max_msg_recv_size: None,
        })
    }

    /// Raise the max size of a decoded response, lnd replies can be large on busy nodes
    pub fn with_max_msg_recv_size(mut self, limit: usize) -> Self {
        self.max_msg_recv_size = Some(limit);
        self
    }

    /// Address of the node
    pub fn address(&self) -> &str {
        &self.address
    }
}

#[async_trait]
impl Dialer for LndDialer {
    type Connection = LndConnection;
    type Error = Error;

    async fn dial(&self) -> Result<Self::Connection, Self::Error> {
        if rustls::crypto::CryptoProvider::get_default().is_none() {
            let _ = default_provider().install_default();
        }

        let config = ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(
                LndCertVerifier::load(&self.cert_file).await?,
            ))
            .with_no_client_auth();

        let https = HttpsConnectorBuilder::new()
            .with_tls_config(config)
            .https_only()
            .enable_http2()
            .build();

        let client = HyperClient::builder(TokioExecutor::new())
            .http2_only(true)
            .build(https);

        let macaroon = load_macaroon(&self.macaroon_file).await?;

        Ok(LndConnection {
            service: InterceptedService::new(client, MacaroonInterceptor { macaroon }),
            origin: origin(&self.address)?,
            max_msg_recv_size: self.max_msg_recv_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_forces_https() {
        let uri = origin("127.0.0.1:10009").expect("valid");
        assert_eq!(uri.scheme_str(), Some("https"));
        assert_eq!(uri.authority().map(|a| a.as_str()), Some("127.0.0.1:10009"));

        let uri = origin("http://localhost:10009").expect("valid");
        assert_eq!(uri.scheme_str(), Some("https"));
        assert_eq!(uri.authority().map(|a| a.as_str()), Some("localhost:10009"));
    }

    #[test]
    fn test_dialer_rejects_malformed_address() {
        assert!(matches!(
            LndDialer::new("not a host", "tls.cert", "admin.macaroon"),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_dial_fails_on_missing_cert() {
        let dialer = LndDialer::new(
            "127.0.0.1:10009",
            "/nonexistent/tls.cert",
            "/nonexistent/admin.macaroon",
        )
        .expect("valid address");

        assert!(matches!(dialer.dial().await, Err(Error::ReadFile(_, _))));
    }
}
