//! Correlation identifier propagation.
//!
//! # Responsibilities
//! - Read the request and user correlation ids from their headers
//! - Optionally mint a request correlation id when none was sent
//! - Carry both ids onto every event and outbound call of a request
//!
//! # Design Decisions
//! - Propagation only by default: a missing header stays missing
//! - Minting is opt-in and uses a 10 character alphanumeric token
//! - Header names are configurable per service

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::error::TelemetryError;
use crate::event::Fields;

/// Default request correlation header.
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Default user correlation header.
pub const USER_CORRELATION_ID_HEADER: &str = "x-user-correlation-id";

/// Length of minted correlation tokens.
const MINTED_ID_LEN: usize = 10;

/// Header names used to carry correlation ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationHeaders {
    pub correlation_id: HeaderName,
    pub user_correlation_id: HeaderName,
    /// Synthesize a request correlation id when the header is missing.
    pub mint_missing: bool,
}

impl Default for CorrelationHeaders {
    fn default() -> Self {
        Self {
            correlation_id: HeaderName::from_static(CORRELATION_ID_HEADER),
            user_correlation_id: HeaderName::from_static(USER_CORRELATION_ID_HEADER),
            mint_missing: false,
        }
    }
}

impl CorrelationHeaders {
    /// Build from header name strings, rejecting invalid names.
    pub fn new(correlation_id: &str, user_correlation_id: &str) -> Result<Self, TelemetryError> {
        Ok(Self {
            correlation_id: parse_header_name(correlation_id)?,
            user_correlation_id: parse_header_name(user_correlation_id)?,
            mint_missing: false,
        })
    }

    pub fn with_minting(mut self, mint_missing: bool) -> Self {
        self.mint_missing = mint_missing;
        self
    }

    /// Request correlation id, if the header is set and non-empty.
    pub fn get_correlation_id(&self, headers: &HeaderMap) -> Option<String> {
        header_str(headers, &self.correlation_id)
    }

    /// User correlation id, if the header is set and non-empty.
    pub fn get_user_correlation_id(&self, headers: &HeaderMap) -> Option<String> {
        header_str(headers, &self.user_correlation_id)
    }

    /// Make sure downstream code reads a uniform request correlation id.
    ///
    /// Returns the id present after the call. Without minting enabled a
    /// missing header is left missing and `None` is returned.
    pub fn ensure_correlation_id(&self, headers: &mut HeaderMap) -> Option<String> {
        if let Some(id) = self.get_correlation_id(headers) {
            return Some(id);
        }
        if !self.mint_missing {
            return None;
        }

        let id = mint_token();
        // Alphanumeric tokens are always valid header values.
        if let Ok(value) = HeaderValue::from_str(&id) {
            headers.insert(self.correlation_id.clone(), value);
        }
        Some(id)
    }

    /// Read both ids at once.
    pub fn extract(&self, headers: &HeaderMap) -> CorrelationIds {
        CorrelationIds {
            correlation_id: self.get_correlation_id(headers),
            user_correlation_id: self.get_user_correlation_id(headers),
        }
    }
}

/// The correlation ids of one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrelationIds {
    pub correlation_id: Option<String>,
    pub user_correlation_id: Option<String>,
}

impl CorrelationIds {
    /// Attach the present ids to an event's fields.
    pub fn attach(&self, fields: &mut Fields) {
        if let Some(id) = &self.correlation_id {
            fields.insert("correlation_id".into(), id.clone().into());
        }
        if let Some(id) = &self.user_correlation_id {
            fields.insert("user_correlation_id".into(), id.clone().into());
        }
    }

    /// Copy the ids onto the headers of an outbound request.
    pub fn apply_to(&self, headers: &mut HeaderMap, names: &CorrelationHeaders) {
        let pairs = [
            (&names.correlation_id, &self.correlation_id),
            (&names.user_correlation_id, &self.user_correlation_id),
        ];
        for (name, id) in pairs {
            let Some(id) = id else { continue };
            match HeaderValue::from_str(id) {
                Ok(value) => {
                    headers.insert(name.clone(), value);
                }
                Err(_) => tracing::debug!(header = %name, "Correlation id is not a valid header value"),
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.correlation_id.is_none() && self.user_correlation_id.is_none()
    }
}

fn parse_header_name(name: &str) -> Result<HeaderName, TelemetryError> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| TelemetryError::InvalidHeader(name.to_string()))
}

fn header_str(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Random alphanumeric token for requests arriving without an id.
fn mint_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(MINTED_ID_LEN)
        .map(char::from)
        .collect()
}
