//! Staff authentication extractors
//!
//! Handlers take `ElevatedStaff` as an argument; the extractor rejects the
//! request before the body is read when the bearer token is missing, unknown
//! or belongs to a role without import rights.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use ysr_common::auth::{authenticate, parse_bearer, require_elevated, AuthError};
use ysr_common::models::Staff;

use crate::error::ApiError;
use crate::AppState;

/// Any active staff member
#[derive(Debug, Clone)]
pub struct AuthenticatedStaff(pub Staff);

/// Active staff member with the admin or manager role
#[derive(Debug, Clone)]
pub struct ElevatedStaff(pub Staff);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedStaff {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingCredentials)?
            .to_str()
            .map_err(|_| AuthError::MalformedCredentials)?;

        let token = parse_bearer(header)?;
        let staff = authenticate(&state.db, token).await?;
        Ok(AuthenticatedStaff(staff))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for ElevatedStaff {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthenticatedStaff(staff) =
            AuthenticatedStaff::from_request_parts(parts, state).await?;

        if let Err(e) = require_elevated(&staff) {
            tracing::info!(staff_id = %staff.id, role = %staff.role, "Import denied for role");
            return Err(e.into());
        }

        Ok(ElevatedStaff(staff))
    }
}
