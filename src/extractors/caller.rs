use axum::{extract::FromRequestParts, http::request::Parts};
use std::str::FromStr;
use std::sync::Arc;

use crate::models::{TenantId, VolunteerId};
use crate::{AppError, AppState};

pub const TENANT_HEADER: &str = "X-Tenant-Id";
pub const MEMBER_HEADER: &str = "X-Member-Id";

/// Tenant and acting member of a request, as asserted by the upstream gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerContext {
    pub tenant_id: TenantId,
    pub member_id: VolunteerId,
}

fn header_id<T: FromStr>(parts: &Parts, name: &str) -> Result<T, AppError>
where
    T::Err: std::fmt::Display,
{
    let raw = parts
        .headers
        .get(name)
        .ok_or_else(|| AppError::Unauthorized(format!("Missing {} header", name)))?
        .to_str()
        .map_err(|_| AppError::Unauthorized(format!("{} header is not valid text", name)))?;

    raw.trim()
        .parse::<T>()
        .map_err(|e| AppError::Unauthorized(format!("Invalid {} header: {}", name, e)))
}

impl FromRequestParts<Arc<AppState>> for CallerContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let tenant_id = header_id::<TenantId>(parts, TENANT_HEADER)?;
        let member_id = header_id::<VolunteerId>(parts, MEMBER_HEADER)?;
        Ok(CallerContext { tenant_id, member_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(headers: &[(&str, String)]) -> Parts {
        let mut builder = Request::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn ids_are_read_from_headers() {
        let tenant = TenantId::new();
        let parts = parts(&[(TENANT_HEADER, tenant.to_string())]);
        assert_eq!(header_id::<TenantId>(&parts, TENANT_HEADER).unwrap(), tenant);
    }

    #[test]
    fn missing_or_malformed_headers_are_unauthorized() {
        let parts = parts(&[(MEMBER_HEADER, "not-a-uuid".to_string())]);
        assert!(matches!(
            header_id::<TenantId>(&parts, TENANT_HEADER),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            header_id::<VolunteerId>(&parts, MEMBER_HEADER),
            Err(AppError::Unauthorized(_))
        ));
    }
}
