//! Actor extraction from request headers.
//!
//! Identity arrives on `X-User-Id`, `X-Role` and (for vendor users)
//! `X-Vendor-Id`; a fronting gateway is expected to have authenticated the
//! caller and set them. Handlers that take an [`AuthActor`] reject requests
//! without a usable identity before any business code runs.

use axum::http::header::HeaderMap;
use axum::http::request::Parts;
use axum::extract::FromRequestParts;
use common::{Role, UserId, VendorId};
use domain::Actor;
use uuid::Uuid;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const ROLE_HEADER: &str = "x-role";
pub const VENDOR_ID_HEADER: &str = "x-vendor-id";

/// The request's authenticated principal, parsed from headers.
#[derive(Debug, Clone, Copy)]
pub struct AuthActor(pub Actor);

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Result<Option<&'a str>, ApiError> {
    match headers.get(name) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .map(Some)
            .map_err(|_| ApiError::BadRequest(format!("header {name} is not valid UTF-8"))),
    }
}

fn parse_uuid(name: &str, value: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(value)
        .map_err(|e| ApiError::BadRequest(format!("invalid {name} header: {e}")))
}

pub fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, ApiError> {
    let user_id = header_str(headers, USER_ID_HEADER)?
        .ok_or_else(|| ApiError::Unauthorized(format!("missing {USER_ID_HEADER} header")))?;
    let user_id = UserId::from_uuid(parse_uuid(USER_ID_HEADER, user_id)?);

    let role = header_str(headers, ROLE_HEADER)?
        .ok_or_else(|| ApiError::Unauthorized(format!("missing {ROLE_HEADER} header")))?;
    let role = Role::parse(role)
        .map_err(|e| ApiError::BadRequest(format!("invalid {ROLE_HEADER} header: {e}")))?;

    let vendor_id = match header_str(headers, VENDOR_ID_HEADER)? {
        Some(value) => Some(VendorId::from_uuid(parse_uuid(VENDOR_ID_HEADER, value)?)),
        None => None,
    };

    Ok(Actor {
        user_id,
        role,
        vendor_id,
    })
}

impl<S> FromRequestParts<S> for AuthActor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        actor_from_headers(&parts.headers).map(AuthActor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                axum::http::header::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn parses_a_vendor_actor() {
        let user_id = Uuid::new_v4();
        let vendor_id = Uuid::new_v4();
        let actor = actor_from_headers(&headers(&[
            (USER_ID_HEADER, &user_id.to_string()),
            (ROLE_HEADER, "vendor"),
            (VENDOR_ID_HEADER, &vendor_id.to_string()),
        ]))
        .unwrap();

        assert_eq!(actor.user_id, UserId::from_uuid(user_id));
        assert_eq!(actor.role, Role::Vendor);
        assert_eq!(actor.vendor_id, Some(VendorId::from_uuid(vendor_id)));
    }

    #[test]
    fn missing_user_id_is_unauthorized() {
        let err = actor_from_headers(&headers(&[(ROLE_HEADER, "customer")])).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[test]
    fn garbage_role_is_a_bad_request() {
        let err = actor_from_headers(&headers(&[
            (USER_ID_HEADER, &Uuid::new_v4().to_string()),
            (ROLE_HEADER, "superuser"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn garbage_user_id_is_a_bad_request() {
        let err = actor_from_headers(&headers(&[
            (USER_ID_HEADER, "not-a-uuid"),
            (ROLE_HEADER, "customer"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
