//! Plugin resources: external auth and rate limit configuration.

use serde::{Deserialize, Serialize};

use super::id::ResourceRef;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicAuth {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realm: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyAuth {
    #[serde(default)]
    pub secret_refs: Vec<ResourceRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuth2 {
    pub issuer_url: String,
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret_ref: Option<ResourceRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthConfigEntry {
    BasicAuth(BasicAuth),
    ApiKeyAuth(ApiKeyAuth),
    Oauth2(OAuth2),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfigSpec {
    #[serde(default)]
    pub configs: Vec<AuthConfigEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RateLimitUnit {
    Second,
    Minute,
    Hour,
    Day,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimit {
    pub unit: RateLimitUnit,
    pub requests_per_unit: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub rate_limit: RateLimit,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitConfigSpec {
    #[serde(default)]
    pub descriptors: Vec<Descriptor>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_config_entries_are_tagged() {
        let spec: AuthConfigSpec = serde_json::from_str(
            r#"{"configs":[
                {"oauth2":{"issuerUrl":"https://idp.example.com","clientId":"gw"}},
                {"basicAuth":{}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(spec.configs.len(), 2);
        assert!(matches!(spec.configs[0], AuthConfigEntry::Oauth2(_)));
    }

    #[test]
    fn test_rate_limit_units() {
        let descriptor: Descriptor = serde_json::from_str(
            r#"{"key":"generic_key","rateLimit":{"unit":"MINUTE","requestsPerUnit":10}}"#,
        )
        .unwrap();
        assert_eq!(descriptor.rate_limit.unit, RateLimitUnit::Minute);
    }
}
