use courseboard_core::AppError;
use uuid::Uuid;

use crate::claims::Claims;
use crate::roles::UserRole;

/// The authenticated principal handed to every service call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl Caller {
    pub fn new(user_id: Uuid, role: UserRole) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// 403 unless the caller holds one of `roles`.
    pub fn require_any(&self, roles: &[UserRole]) -> Result<(), AppError> {
        if roles.contains(&self.role) {
            return Ok(());
        }

        let allowed = roles
            .iter()
            .map(UserRole::as_str)
            .collect::<Vec<_>>()
            .join(", ");

        Err(AppError::forbidden(format!(
            "Access denied. Required roles: {}, but user has role: {}",
            allowed, self.role
        )))
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        self.require_any(&[UserRole::Admin])
    }
}

impl From<&Claims> for Caller {
    fn from(claims: &Claims) -> Self {
        Self::new(claims.sub, claims.role)
    }
}
