//! Authorization gate.
//!
//! The only place a [`Principal`] enters request processing. Protected
//! operations without a verified token never reach their handler.

use std::collections::BTreeSet;
use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use infokeeper_auth::{Principal, TokenManager};
use infokeeper_contracts::ErrorCode;

use crate::http::json_error;
use crate::operation::Operation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateRejection {
    MissingToken,
    InvalidToken,
}

impl GateRejection {
    pub fn reason(self) -> &'static str {
        match self {
            GateRejection::MissingToken => "missing_token",
            GateRejection::InvalidToken => "invalid_token",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            GateRejection::MissingToken => "no token found",
            GateRejection::InvalidToken => "authentication by principal failed",
        }
    }
}

#[derive(Clone)]
pub struct Gate {
    tokens: TokenManager,
    protected: Arc<BTreeSet<Operation>>,
}

impl Gate {
    pub fn new(tokens: TokenManager, protected: BTreeSet<Operation>) -> Self {
        Self {
            tokens,
            protected: Arc::new(protected),
        }
    }

    pub fn is_protected(&self, operation: Operation) -> bool {
        self.protected.contains(&operation)
    }

    /// `Ok(None)` passes an unprotected operation through untouched.
    pub fn admit(
        &self,
        operation: Operation,
        headers: &HeaderMap,
    ) -> Result<Option<Principal>, GateRejection> {
        if !self.is_protected(operation) {
            return Ok(None);
        }

        match self.tokens.authenticate(headers) {
            Ok(principal) => Ok(Some(principal)),
            Err(err) if err.code == "ERR_AUTH_REQUIRED" => Err(GateRejection::MissingToken),
            Err(_) => Err(GateRejection::InvalidToken),
        }
    }
}

pub async fn authorize(State(gate): State<Gate>, mut request: Request, next: Next) -> Response {
    let Some(operation) = Operation::from_path(request.uri().path()) else {
        return next.run(request).await;
    };

    match gate.admit(operation, request.headers()) {
        Ok(Some(principal)) => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Ok(None) => next.run(request).await,
        Err(rejection) => {
            tracing::info!(
                operation = operation.name(),
                reason = rejection.reason(),
                "gate.rejected"
            );
            crate::metrics::inc_gate_rejection(operation.name(), rejection.reason());
            json_error(
                StatusCode::UNAUTHORIZED,
                ErrorCode::Unauthenticated,
                rejection.message(),
            )
            .into_response()
        }
    }
}

/// Principal placed in the request by [`authorize`], if any.
///
/// Handlers read identity only through this extractor.
#[derive(Debug, Clone)]
pub struct Caller(pub Option<Principal>);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Caller(parts.extensions.get::<Principal>().cloned()))
    }
}
