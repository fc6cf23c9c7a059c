use super::domain::{UserId, UserRecord};

/// Signed-in user for one request, passed explicitly to every service call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    user: UserRecord,
}

impl SessionContext {
    pub fn new(user: UserRecord) -> Self {
        Self { user }
    }

    pub fn user(&self) -> &UserRecord {
        &self.user
    }

    pub fn user_id(&self) -> &UserId {
        &self.user.id
    }

    pub fn is_admin(&self) -> bool {
        self.user.is_admin()
    }

    pub fn require_admin(&self) -> Result<(), AccessError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AccessError::Forbidden {
                user: self.user.id.clone(),
            })
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AccessError {
    #[error("no signed-in user")]
    Unauthenticated,
    #[error("user '{user}' is not an administrator")]
    Forbidden { user: UserId },
}
