//! Secret payloads referenced by upstream and virtual service TLS settings.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TlsSecret {
    pub cert_chain: String,
    pub private_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_ca: Option<String>,
}

impl TlsSecret {
    /// Hex SHA-256 over the certificate material; never exposes the key itself.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.cert_chain.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.private_key.as_bytes());
        hasher.update([0u8]);
        if let Some(root_ca) = &self.root_ca {
            hasher.update(root_ca.as_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenericSecret {
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SecretSpec {
    Tls(TlsSecret),
    Generic(GenericSecret),
}

impl SecretSpec {
    pub fn tls(&self) -> Option<&TlsSecret> {
        match self {
            SecretSpec::Tls(tls) => Some(tls),
            SecretSpec::Generic(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tls(cert: &str) -> TlsSecret {
        TlsSecret {
            cert_chain: cert.to_string(),
            private_key: "key".to_string(),
            root_ca: None,
        }
    }

    #[test]
    fn test_digest_tracks_certificate_material() {
        assert_eq!(tls("a").digest(), tls("a").digest());
        assert_ne!(tls("a").digest(), tls("b").digest());
        assert_eq!(tls("a").digest().len(), 64);
    }

    #[test]
    fn test_secret_spec_variants() {
        let spec: SecretSpec =
            serde_json::from_str(r#"{"generic":{"data":{"token":"abc"}}}"#).unwrap();
        assert!(spec.tls().is_none());
        let spec: SecretSpec =
            serde_json::from_str(r#"{"tls":{"certChain":"c","privateKey":"k"}}"#).unwrap();
        assert!(spec.tls().is_some());
    }
}
