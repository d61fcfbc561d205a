// Copyright 2025 The NativeLink Authors. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//    http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::io::BufReader;
use std::sync::Arc;

use lxd_client_error::{Code, Error, ResultExt, make_err, make_input_err};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{CertificateError, ClientConfig, DigitallySignedStruct, SignatureScheme};
use tracing::warn;

/// Reads every certificate of a PEM document.
pub fn certificates_from_pem(pem: &str) -> Result<Vec<CertificateDer<'static>>, Error> {
    let certs = rustls_pemfile::certs(&mut BufReader::new(pem.as_bytes()))
        .collect::<Result<Vec<_>, _>>()
        .err_tip_with_code(|_| (Code::InvalidArgument, "Could not parse PEM certificate"))?;
    if certs.is_empty() {
        return Err(make_input_err!("No certificate found in PEM document"));
    }
    Ok(certs)
}

/// Reads the first private key of a PEM document.
pub fn private_key_from_pem(pem: &str) -> Result<PrivateKeyDer<'static>, Error> {
    let mut reader = BufReader::new(pem.as_bytes());
    rustls_pemfile::private_key(&mut reader)
        .err_tip_with_code(|_| (Code::InvalidArgument, "Could not parse PEM private key"))?
        .ok_or_else(|| make_input_err!("No private key found in PEM document"))
}

/// Accepts the daemon only if it presents exactly the pinned certificate.
/// Neither the system trust store nor the server name take part in the
/// decision; handshake signatures are still checked.
#[derive(Debug)]
pub struct PinnedServerCertVerifier {
    pinned: CertificateDer<'static>,
    provider: Arc<CryptoProvider>,
}

impl PinnedServerCertVerifier {
    pub fn new(pinned: CertificateDer<'static>) -> Self {
        Self::with_provider(pinned, Arc::new(rustls::crypto::ring::default_provider()))
    }

    pub const fn with_provider(
        pinned: CertificateDer<'static>,
        provider: Arc<CryptoProvider>,
    ) -> Self {
        Self { pinned, provider }
    }
}

impl ServerCertVerifier for PinnedServerCertVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        if **end_entity == *self.pinned {
            return Ok(ServerCertVerified::assertion());
        }
        warn!(?server_name, "Daemon presented a certificate that does not match the pin");
        Err(rustls::Error::InvalidCertificate(
            CertificateError::ApplicationVerificationFailure,
        ))
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

/// Builds the TLS configuration for mutual TLS against a daemon whose
/// certificate is pinned.
pub fn load_client_config(
    client_certificate_pem: Option<&str>,
    client_key_pem: Option<&str>,
    server_certificate_pem: Option<&str>,
) -> Result<ClientConfig, Error> {
    let Some(client_certificate_pem) = client_certificate_pem else {
        return Err(make_input_err!(
            "A client certificate is required to reach the daemon over https"
        ));
    };
    let Some(client_key_pem) = client_key_pem else {
        return Err(make_input_err!("Client certificate specified, but no key"));
    };
    let Some(server_certificate_pem) = server_certificate_pem else {
        return Err(make_input_err!(
            "A server certificate is required to reach the daemon over https"
        ));
    };

    let client_chain = certificates_from_pem(client_certificate_pem)
        .err_tip(|| "While reading the client certificate")?;
    let client_key =
        private_key_from_pem(client_key_pem).err_tip(|| "While reading the client key")?;
    let pinned = certificates_from_pem(server_certificate_pem)
        .err_tip(|| "While reading the server certificate")?
        .swap_remove(0);

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let verifier = PinnedServerCertVerifier::with_provider(pinned, provider.clone());

    ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| make_err!(Code::Internal, "Could not select TLS versions: {e}"))?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(verifier))
        .with_client_auth_cert(client_chain, client_key)
        .err_tip_with_code(|_| (Code::InvalidArgument, "Client certificate and key do not match"))
}
