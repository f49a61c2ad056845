//! Axum extractors for per-request telemetry.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;

use crate::correlation::{CorrelationHeaders, CorrelationIds};
use crate::telemetry::{EventContext, Telemetry};

impl<S> FromRequestParts<S> for CorrelationIds
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(ids) = parts.extensions.get::<CorrelationIds>() {
            return Ok(ids.clone());
        }

        // Outside the access-log middleware: read the headers directly.
        let names = parts
            .extensions
            .get::<Telemetry>()
            .map(|t| t.correlation().clone())
            .unwrap_or_else(CorrelationHeaders::default);
        Ok(names.extract(&parts.headers))
    }
}

impl<S> FromRequestParts<S> for EventContext
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let telemetry = parts.extensions.get::<Telemetry>().ok_or((
            StatusCode::INTERNAL_SERVER_ERROR,
            "access log middleware not installed",
        ))?;
        Ok(telemetry.application(&parts.headers))
    }
}
