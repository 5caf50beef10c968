pub mod caller;
pub mod permissions;

pub use caller::{CallerContext, MEMBER_HEADER, TENANT_HEADER};
