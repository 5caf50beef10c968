use moka::future::Cache;
use once_cell::sync::Lazy;
use std::time::Duration;

use super::CallerContext;
use crate::models::{MinistryId, MinistryRole, TenantId, VolunteerId};
use crate::stores::MembershipDirectory;
use crate::{AppError, AppResult};

// Cache resolved ministry roles per member (30-second TTL)
static ROLES_CACHE: Lazy<Cache<(TenantId, MinistryId, VolunteerId), MinistryRole>> = Lazy::new(|| {
    Cache::builder()
        .time_to_live(Duration::from_secs(30))
        .max_capacity(10_000)
        .build()
});

/// Role of the member in the ministry, or `None` when they are not an active member.
pub async fn role_in(
    directory: &dyn MembershipDirectory,
    tenant_id: TenantId,
    ministry_id: MinistryId,
    member_id: VolunteerId,
) -> AppResult<Option<MinistryRole>> {
    let key = (tenant_id, ministry_id, member_id);
    if let Some(cached) = ROLES_CACHE.get(&key).await {
        return Ok(Some(cached));
    }

    let role = directory
        .member(tenant_id, ministry_id, member_id)
        .await?
        .map(|member| member.role);
    if let Some(role) = role {
        ROLES_CACHE.insert(key, role).await;
    }
    Ok(role)
}

/// Requires the caller to be an active member of the ministry.
pub async fn require_member(
    directory: &dyn MembershipDirectory,
    caller: &CallerContext,
    ministry_id: MinistryId,
) -> AppResult<MinistryRole> {
    role_in(directory, caller.tenant_id, ministry_id, caller.member_id)
        .await?
        .ok_or_else(|| {
            tracing::warn!(member_id = %caller.member_id, ministry_id = %ministry_id, "Caller is not a ministry member");
            AppError::Forbidden(format!("You are not a member of ministry {}", ministry_id))
        })
}

/// Requires a role passing `check`; `action` names the attempt in the error.
pub async fn require_capability(
    directory: &dyn MembershipDirectory,
    caller: &CallerContext,
    ministry_id: MinistryId,
    check: fn(&MinistryRole) -> bool,
    action: &str,
) -> AppResult<MinistryRole> {
    let role = require_member(directory, caller, ministry_id).await?;
    if !check(&role) {
        tracing::warn!(
            member_id = %caller.member_id,
            ministry_id = %ministry_id,
            role = %role,
            action,
            "Caller lacks capability"
        );
        return Err(AppError::Forbidden(format!("Role '{}' cannot {}", role, action)));
    }
    Ok(role)
}

/// Acting on your own data needs membership; acting on someone else's needs `check`.
pub async fn require_self_or(
    directory: &dyn MembershipDirectory,
    caller: &CallerContext,
    ministry_id: MinistryId,
    volunteer_id: VolunteerId,
    check: fn(&MinistryRole) -> bool,
    action: &str,
) -> AppResult<MinistryRole> {
    if volunteer_id == caller.member_id {
        require_member(directory, caller, ministry_id).await
    } else {
        require_capability(directory, caller, ministry_id, check, action).await
    }
}
