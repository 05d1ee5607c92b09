//! Access control: one place that decides what a caller may do.
//!
//! Handlers never branch on the role string themselves; they name the
//! operation they are about to perform and ask [`authorize`].

use crate::api::error::ApiError;
use crate::db::User;

/// Operations with an access rule attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    // Admin-only
    ManageUsers,
    ManageSites,
    ManageMembers,
    ManageAlerts,
    ValidateEntries,
    EditEntries,
    DeleteEntries,
    DecideLeaves,
    ViewStats,
    ExportEntries,
    RunBackup,
    UploadPlan,
    // Self-or-admin: the operation carries the user the record is
    // attributed to.
    RecordEntryFor(i64),
    RequestLeaveFor(i64),
    ViewLeavesOf(i64),
}

/// Decide whether `user` may perform `operation`.
pub fn authorize(user: &User, operation: Operation) -> Result<(), ApiError> {
    use Operation::*;

    let allowed = match operation {
        ManageUsers | ManageSites | ManageMembers | ManageAlerts | ValidateEntries
        | EditEntries | DeleteEntries | DecideLeaves | ViewStats | ExportEntries | RunBackup
        | UploadPlan => user.is_admin(),
        // Workers act only on their own records; admins on anyone's.
        RecordEntryFor(user_id) | RequestLeaveFor(user_id) | ViewLeavesOf(user_id) => {
            user.is_admin() || user.id == user_id
        }
    };

    if allowed {
        Ok(())
    } else {
        Err(ApiError::forbidden("Operation requires admin privileges"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::error::ErrorCode;

    fn user(id: i64, role: &str) -> User {
        User {
            id,
            username: format!("u{id}"),
            pin: "123456".to_string(),
            role: role.to_string(),
            vacation_balance: 0.0,
        }
    }

    #[test]
    fn admin_operations_forbidden_for_workers() {
        let worker = user(1, "worker");
        let admin = user(2, "admin");

        for op in [
            Operation::ManageUsers,
            Operation::ValidateEntries,
            Operation::ViewStats,
            Operation::ExportEntries,
            Operation::RunBackup,
        ] {
            let err = authorize(&worker, op).unwrap_err();
            assert_eq!(err.code(), ErrorCode::Forbidden);
            assert!(authorize(&admin, op).is_ok());
        }
    }

    #[test]
    fn workers_act_only_on_themselves() {
        let worker = user(1, "worker");
        let admin = user(2, "admin");

        assert!(authorize(&worker, Operation::RecordEntryFor(1)).is_ok());
        assert!(authorize(&worker, Operation::RecordEntryFor(3)).is_err());
        assert!(authorize(&worker, Operation::RequestLeaveFor(3)).is_err());
        assert!(authorize(&admin, Operation::RecordEntryFor(3)).is_ok());
        assert!(authorize(&admin, Operation::RequestLeaveFor(1)).is_ok());
    }
}
