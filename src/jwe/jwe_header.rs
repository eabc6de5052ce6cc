use std::fmt::{Debug, Display};

use serde_json::{Map, Value};

use crate::JweError;

/// The JWE protected header: a small claim set carrying the key-wrap
/// algorithm (alg), the content encryption method (enc) and any optional
/// claims.
///
/// Serialization emits only the claims actually set, in a stable order,
/// so the base64url form is canonical. That base64url form is both the
/// first token segment and, as raw ASCII bytes, the AAD for content
/// encryption.
#[derive(Debug, Eq, PartialEq, Clone)]
pub struct JweHeader {
    claims: Map<String, Value>,
}

impl JweHeader {
    /// Return a new JweHeader instance.
    pub fn new() -> Self {
        Self { claims: Map::new() }
    }

    /// Return a new header instance from json style header.
    ///
    /// # Arguments
    ///
    /// * `value` - The json style header claims
    pub fn from_bytes(value: &[u8]) -> Result<Self, JweError> {
        let claims: Map<String, Value> =
            serde_json::from_slice(value).map_err(|err| JweError::InvalidJson(err.into()))?;
        Ok(Self::from_map(claims))
    }

    /// Return a new header instance from map.
    ///
    /// # Arguments
    ///
    /// * `claims` - The header claims
    pub fn from_map(claims: Map<String, Value>) -> Self {
        Self { claims }
    }

    /// Set a value for algorithm header claim (alg).
    ///
    /// # Arguments
    ///
    /// * `value` - a key-wrap algorithm name
    pub fn set_algorithm(&mut self, value: impl Into<String>) {
        self.claims
            .insert("alg".to_string(), Value::String(value.into()));
    }

    /// Return the value for algorithm header claim (alg).
    pub fn algorithm(&self) -> Option<&str> {
        match self.claims.get("alg") {
            Some(Value::String(val)) => Some(val),
            _ => None,
        }
    }

    /// Set a value for content encryption header claim (enc).
    ///
    /// # Arguments
    ///
    /// * `value` - a content encryption method name
    pub fn set_content_encryption(&mut self, value: impl Into<String>) {
        self.claims
            .insert("enc".to_string(), Value::String(value.into()));
    }

    /// Return the value for content encryption header claim (enc).
    pub fn content_encryption(&self) -> Option<&str> {
        match self.claims.get("enc") {
            Some(Value::String(val)) => Some(val),
            _ => None,
        }
    }

    /// Set a value for key ID header claim (kid).
    ///
    /// # Arguments
    ///
    /// * `value` - a key ID
    pub fn set_key_id(&mut self, value: impl Into<String>) {
        self.claims
            .insert("kid".to_string(), Value::String(value.into()));
    }

    /// Return the value for key ID header claim (kid).
    pub fn key_id(&self) -> Option<&str> {
        match self.claims.get("kid") {
            Some(Value::String(val)) => Some(val),
            _ => None,
        }
    }

    /// Set a value for content type header claim (cty).
    ///
    /// # Arguments
    ///
    /// * `value` - a content type
    pub fn set_content_type(&mut self, value: impl Into<String>) {
        self.claims
            .insert("cty".to_string(), Value::String(value.into()));
    }

    /// Return the value for content type header claim (cty).
    pub fn content_type(&self) -> Option<&str> {
        match self.claims.get("cty") {
            Some(Value::String(val)) => Some(val),
            _ => None,
        }
    }

    /// Return the value for header claim of a specified key.
    ///
    /// # Arguments
    ///
    /// * `key` - a key name of header claim
    pub fn claim(&self, key: &str) -> Option<&Value> {
        self.claims.get(key)
    }

    /// Set a value for header claim of a specified key.
    ///
    /// # Arguments
    ///
    /// * `key` - a key name of header claim
    /// * `value` - a value of header claim
    pub fn set_claim(&mut self, key: &str, value: Option<Value>) {
        match value {
            Some(val) => {
                self.claims.insert(key.to_string(), val);
            }
            None => {
                self.claims.remove(key);
            }
        }
    }

    /// Return values for header claims set.
    pub fn claims_set(&self) -> &Map<String, Value> {
        &self.claims
    }

    /// Serialize the claims actually set as minimal JSON.
    pub fn to_vec(&self) -> Result<Vec<u8>, JweError> {
        serde_json::to_vec(&self.claims).map_err(|err| JweError::InvalidJson(err.into()))
    }
}

impl Default for JweHeader {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for JweHeader {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        let val = serde_json::to_string(&self.claims).map_err(|_| std::fmt::Error {})?;
        fmt.write_str(&val)
    }
}
