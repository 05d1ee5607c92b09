//! Leave requests and the vacation balance ledger.
//!
//! Approving a VACATION leave debits the owner's balance by `days_count`.
//! The trigger is the status *change*, not the target value, so repeating
//! a PUT with the same status never double-debits. Moving a VACATION leave
//! back out of APPROVED credits the balance back (the original system did
//! not; see DESIGN.md).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use tracing::warn;

use super::entry::UNKNOWN_LABEL;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeaveType {
    #[serde(rename = "VACATION")]
    Vacation,
    #[serde(rename = "SICKNESS")]
    Sickness,
}

impl LeaveType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveType::Vacation => "VACATION",
            LeaveType::Sickness => "SICKNESS",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "VACATION" => Some(LeaveType::Vacation),
            "SICKNESS" => Some(LeaveType::Sickness),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeaveStatus {
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "APPROVED")]
    Approved,
    #[serde(rename = "REJECTED")]
    Rejected,
}

impl LeaveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveStatus::Pending => "PENDING",
            LeaveStatus::Approved => "APPROVED",
            LeaveStatus::Rejected => "REJECTED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(LeaveStatus::Pending),
            "APPROVED" => Some(LeaveStatus::Approved),
            "REJECTED" => Some(LeaveStatus::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Leave {
    pub id: i64,
    pub user_id: i64,
    pub leave_type: String,
    pub date_start: String,
    pub date_end: String,
    pub days_count: f64,
    pub status: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct LeaveRow {
    pub id: i64,
    pub user_id: i64,
    pub leave_type: String,
    pub date_start: String,
    pub date_end: String,
    pub days_count: f64,
    pub status: String,
    pub user_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaveResponse {
    pub id: i64,
    pub user_id: i64,
    pub user_name: String,
    #[serde(rename = "type")]
    pub leave_type: String,
    pub date_start: String,
    pub date_end: String,
    pub days_count: f64,
    pub status: String,
}

impl From<LeaveRow> for LeaveResponse {
    fn from(row: LeaveRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            user_name: row.user_name.unwrap_or_else(|| UNKNOWN_LABEL.to_string()),
            leave_type: row.leave_type,
            date_start: row.date_start,
            date_end: row.date_end,
            days_count: row.days_count,
            status: row.status,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateLeaveRequest {
    pub user_id: i64,
    #[serde(rename = "type")]
    pub leave_type: String,
    pub date_start: String,
    pub date_end: String,
    /// When absent or non-positive, derived from the date span.
    #[serde(default)]
    pub days_count: f64,
}

#[derive(Debug, Deserialize)]
pub struct LeaveStatusRequest {
    pub status: String,
}

/// Inclusive day span between two ISO dates. Falls back to 0 when either
/// date does not parse, matching the ledger's tolerance for bad input.
pub fn derive_days(date_start: &str, date_end: &str) -> f64 {
    let start = NaiveDate::parse_from_str(date_start, "%Y-%m-%d");
    let end = NaiveDate::parse_from_str(date_end, "%Y-%m-%d");
    match (start, end) {
        (Ok(start), Ok(end)) if end >= start => (end - start).num_days() as f64 + 1.0,
        _ => 0.0,
    }
}

const SELECT_ROWS: &str = r#"
    SELECT l.id, l.user_id, l.leave_type, l.date_start, l.date_end,
           l.days_count, l.status, u.username AS user_name
    FROM leaves l
    LEFT JOIN users u ON u.id = l.user_id
"#;

impl Leave {
    pub async fn get(db: &SqlitePool, id: i64) -> Result<Option<Leave>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM leaves WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn get_row(db: &SqlitePool, id: i64) -> Result<Option<LeaveRow>, sqlx::Error> {
        sqlx::query_as(&format!("{SELECT_ROWS} WHERE l.id = ?"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn list(
        db: &SqlitePool,
        user_id: Option<i64>,
    ) -> Result<Vec<LeaveRow>, sqlx::Error> {
        match user_id {
            Some(user_id) => {
                sqlx::query_as(&format!(
                    "{SELECT_ROWS} WHERE l.user_id = ? ORDER BY l.date_start"
                ))
                .bind(user_id)
                .fetch_all(db)
                .await
            }
            None => {
                sqlx::query_as(&format!("{SELECT_ROWS} ORDER BY l.date_start"))
                    .fetch_all(db)
                    .await
            }
        }
    }

    pub async fn create(
        db: &SqlitePool,
        req: &CreateLeaveRequest,
        leave_type: LeaveType,
    ) -> Result<Leave, sqlx::Error> {
        let days_count = if req.days_count > 0.0 {
            req.days_count
        } else {
            derive_days(&req.date_start, &req.date_end)
        };

        sqlx::query_as(
            r#"
            INSERT INTO leaves (user_id, leave_type, date_start, date_end, days_count, status)
            VALUES (?, ?, ?, ?, ?, 'PENDING')
            RETURNING *
            "#,
        )
        .bind(req.user_id)
        .bind(leave_type.as_str())
        .bind(&req.date_start)
        .bind(&req.date_end)
        .bind(days_count)
        .fetch_one(db)
        .await
    }

    /// Change the status of a leave, applying the ledger effect inside a
    /// single transaction. Returns None for an unknown leave id.
    ///
    /// Ledger rules, keyed on the transition (old, new):
    /// - VACATION, old != APPROVED, new == APPROVED: debit days_count
    /// - VACATION, old == APPROVED, new != APPROVED: credit days_count back
    /// - everything else: no balance effect
    ///
    /// An unknown owner at debit time is tolerated: the status still
    /// changes, the balance update simply has nothing to touch.
    pub async fn set_status(
        db: &SqlitePool,
        id: i64,
        new_status: LeaveStatus,
    ) -> Result<Option<Leave>, sqlx::Error> {
        let mut tx = db.begin().await?;

        let leave: Option<Leave> = sqlx::query_as("SELECT * FROM leaves WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(leave) = leave else {
            tx.rollback().await?;
            return Ok(None);
        };

        let old_approved = leave.status == LeaveStatus::Approved.as_str();
        let new_approved = new_status == LeaveStatus::Approved;
        let is_vacation = leave.leave_type == LeaveType::Vacation.as_str();

        let updated: Leave =
            sqlx::query_as("UPDATE leaves SET status = ? WHERE id = ? RETURNING *")
                .bind(new_status.as_str())
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;

        let delta = if is_vacation && !old_approved && new_approved {
            -leave.days_count
        } else if is_vacation && old_approved && !new_approved {
            leave.days_count
        } else {
            0.0
        };

        if delta != 0.0 {
            let touched =
                sqlx::query("UPDATE users SET vacation_balance = vacation_balance + ? WHERE id = ?")
                    .bind(delta)
                    .bind(leave.user_id)
                    .execute(&mut *tx)
                    .await?
                    .rows_affected();
            if touched == 0 {
                warn!(
                    leave_id = id,
                    user_id = leave.user_id,
                    "Leave owner no longer exists, skipping balance update"
                );
            }
        }

        tx.commit().await?;
        Ok(Some(updated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{Role, User};
    use crate::db::test_pool;

    async fn seed_leave(
        db: &SqlitePool,
        leave_type: LeaveType,
        days: f64,
        balance: f64,
    ) -> (User, Leave) {
        let user = User::create(db, "marc", "123456", Role::Worker, balance)
            .await
            .unwrap();
        let leave = Leave::create(
            db,
            &CreateLeaveRequest {
                user_id: user.id,
                leave_type: leave_type.as_str().to_string(),
                date_start: "2024-07-01".into(),
                date_end: "2024-07-05".into(),
                days_count: days,
            },
            leave_type,
        )
        .await
        .unwrap();
        (user, leave)
    }

    async fn balance(db: &SqlitePool, user_id: i64) -> f64 {
        User::get(db, user_id).await.unwrap().unwrap().vacation_balance
    }

    #[tokio::test]
    async fn approval_debits_exactly_once() {
        let db = test_pool().await;
        let (user, leave) = seed_leave(&db, LeaveType::Vacation, 5.0, 20.0).await;

        Leave::set_status(&db, leave.id, LeaveStatus::Approved)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(balance(&db, user.id).await, 15.0);

        // Repeating the same PUT must not debit again.
        Leave::set_status(&db, leave.id, LeaveStatus::Approved)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(balance(&db, user.id).await, 15.0);
    }

    #[tokio::test]
    async fn reversal_credits_balance_back() {
        let db = test_pool().await;
        let (user, leave) = seed_leave(&db, LeaveType::Vacation, 5.0, 20.0).await;

        Leave::set_status(&db, leave.id, LeaveStatus::Approved)
            .await
            .unwrap();
        Leave::set_status(&db, leave.id, LeaveStatus::Rejected)
            .await
            .unwrap();
        assert_eq!(balance(&db, user.id).await, 20.0);

        // Approve again after a correction: exactly one net debit.
        Leave::set_status(&db, leave.id, LeaveStatus::Approved)
            .await
            .unwrap();
        assert_eq!(balance(&db, user.id).await, 15.0);
    }

    #[tokio::test]
    async fn sickness_never_touches_balance() {
        let db = test_pool().await;
        let (user, leave) = seed_leave(&db, LeaveType::Sickness, 3.0, 10.0).await;

        Leave::set_status(&db, leave.id, LeaveStatus::Approved)
            .await
            .unwrap();
        Leave::set_status(&db, leave.id, LeaveStatus::Rejected)
            .await
            .unwrap();
        assert_eq!(balance(&db, user.id).await, 10.0);
    }

    #[tokio::test]
    async fn balance_may_go_negative() {
        let db = test_pool().await;
        let (user, leave) = seed_leave(&db, LeaveType::Vacation, 5.0, 2.0).await;

        Leave::set_status(&db, leave.id, LeaveStatus::Approved)
            .await
            .unwrap();
        assert_eq!(balance(&db, user.id).await, -3.0);
    }

    #[tokio::test]
    async fn deleted_owner_is_tolerated_at_debit_time() {
        let db = test_pool().await;
        let (user, leave) = seed_leave(&db, LeaveType::Vacation, 5.0, 20.0).await;
        User::delete(&db, user.id).await.unwrap();

        let updated = Leave::set_status(&db, leave.id, LeaveStatus::Approved)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, "APPROVED");
    }

    #[tokio::test]
    async fn unknown_leave_id_is_none() {
        let db = test_pool().await;
        assert!(Leave::set_status(&db, 42, LeaveStatus::Approved)
            .await
            .unwrap()
            .is_none());
    }

    #[test]
    fn derive_days_inclusive_span() {
        assert_eq!(derive_days("2024-07-01", "2024-07-05"), 5.0);
        assert_eq!(derive_days("2024-07-01", "2024-07-01"), 1.0);
        assert_eq!(derive_days("2024-07-05", "2024-07-01"), 0.0);
        assert_eq!(derive_days("garbage", "2024-07-01"), 0.0);
    }

    #[tokio::test]
    async fn missing_days_count_is_derived_from_dates() {
        let db = test_pool().await;
        let user = User::create(&db, "marc", "123456", Role::Worker, 0.0)
            .await
            .unwrap();
        let leave = Leave::create(
            &db,
            &CreateLeaveRequest {
                user_id: user.id,
                leave_type: "VACATION".into(),
                date_start: "2024-07-01".into(),
                date_end: "2024-07-03".into(),
                days_count: 0.0,
            },
            LeaveType::Vacation,
        )
        .await
        .unwrap();
        assert_eq!(leave.days_count, 3.0);
    }
}
