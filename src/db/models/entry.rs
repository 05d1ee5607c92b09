//! Time/material entry model and its PENDING -> VALIDATED workflow.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

/// Label shown when an entry references a deleted site or user.
pub const UNKNOWN_LABEL: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryStatus {
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "VALIDATED")]
    Validated,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Pending => "PENDING",
            EntryStatus::Validated => "VALIDATED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(EntryStatus::Pending),
            "VALIDATED" => Some(EntryStatus::Validated),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Entry {
    pub id: i64,
    pub user_id: i64,
    pub site_id: i64,
    pub date: String,
    pub hours: f64,
    pub material_cost: f64,
    pub status: String,
    pub created_by_id: Option<i64>,
}

/// Entry joined with its (possibly deleted) user and site names.
#[derive(Debug, Clone, FromRow)]
pub struct EntryRow {
    pub id: i64,
    pub user_id: i64,
    pub site_id: i64,
    pub date: String,
    pub hours: f64,
    pub material_cost: f64,
    pub status: String,
    pub created_by_id: Option<i64>,
    pub user_name: Option<String>,
    pub site_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntryResponse {
    pub id: i64,
    pub user_id: i64,
    pub user_name: String,
    pub site_id: i64,
    pub site_name: String,
    pub date: String,
    pub hours: f64,
    pub material_cost: f64,
    pub status: String,
    pub created_by_id: Option<i64>,
}

impl From<EntryRow> for EntryResponse {
    fn from(row: EntryRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            user_name: row.user_name.unwrap_or_else(|| UNKNOWN_LABEL.to_string()),
            site_id: row.site_id,
            site_name: row.site_name.unwrap_or_else(|| UNKNOWN_LABEL.to_string()),
            date: row.date,
            hours: row.hours,
            material_cost: row.material_cost,
            status: row.status,
            created_by_id: row.created_by_id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateEntryRequest {
    pub user_id: i64,
    pub site_id: i64,
    pub date: String,
    #[serde(default)]
    pub hours: f64,
    #[serde(default)]
    pub material_cost: f64,
    /// Ignored: new entries always start PENDING.
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateEntryRequest {
    pub date: Option<String>,
    pub hours: Option<f64>,
    pub material_cost: Option<f64>,
    /// Explicit status override. Absent means the stored status is kept,
    /// even for entries edited after validation.
    pub status: Option<String>,
}

const SELECT_ROWS: &str = r#"
    SELECT e.id, e.user_id, e.site_id, e.date, e.hours, e.material_cost,
           e.status, e.created_by_id,
           u.username AS user_name, s.name AS site_name
    FROM entries e
    LEFT JOIN users u ON u.id = e.user_id
    LEFT JOIN sites s ON s.id = e.site_id
"#;

impl Entry {
    pub async fn get(db: &SqlitePool, id: i64) -> Result<Option<Entry>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM entries WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn get_row(db: &SqlitePool, id: i64) -> Result<Option<EntryRow>, sqlx::Error> {
        sqlx::query_as(&format!("{SELECT_ROWS} WHERE e.id = ?"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// New entries always start PENDING regardless of any caller-supplied
    /// status.
    pub async fn create(
        db: &SqlitePool,
        req: &CreateEntryRequest,
        created_by_id: i64,
    ) -> Result<Entry, sqlx::Error> {
        sqlx::query_as(
            r#"
            INSERT INTO entries (user_id, site_id, date, hours, material_cost, status, created_by_id)
            VALUES (?, ?, ?, ?, ?, 'PENDING', ?)
            RETURNING *
            "#,
        )
        .bind(req.user_id)
        .bind(req.site_id)
        .bind(&req.date)
        .bind(req.hours)
        .bind(req.material_cost)
        .bind(created_by_id)
        .fetch_one(db)
        .await
    }

    pub async fn list_for_site(
        db: &SqlitePool,
        site_id: i64,
        user_id: Option<i64>,
    ) -> Result<Vec<EntryRow>, sqlx::Error> {
        match user_id {
            Some(user_id) => {
                sqlx::query_as(&format!(
                    "{SELECT_ROWS} WHERE e.site_id = ? AND e.user_id = ? ORDER BY e.date"
                ))
                .bind(site_id)
                .bind(user_id)
                .fetch_all(db)
                .await
            }
            None => {
                sqlx::query_as(&format!("{SELECT_ROWS} WHERE e.site_id = ? ORDER BY e.date"))
                    .bind(site_id)
                    .fetch_all(db)
                    .await
            }
        }
    }

    pub async fn list_pending(db: &SqlitePool) -> Result<Vec<EntryRow>, sqlx::Error> {
        sqlx::query_as(&format!(
            "{SELECT_ROWS} WHERE e.status = 'PENDING' ORDER BY e.date"
        ))
        .fetch_all(db)
        .await
    }

    pub async fn list_all_rows(db: &SqlitePool) -> Result<Vec<EntryRow>, sqlx::Error> {
        sqlx::query_as(&format!("{SELECT_ROWS} ORDER BY e.date, e.id"))
            .fetch_all(db)
            .await
    }

    pub async fn list_all(db: &SqlitePool) -> Result<Vec<Entry>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM entries ORDER BY date, id")
            .fetch_all(db)
            .await
    }

    /// The one-way validation action.
    pub async fn validate(db: &SqlitePool, id: i64) -> Result<Option<Entry>, sqlx::Error> {
        sqlx::query_as("UPDATE entries SET status = 'VALIDATED' WHERE id = ? RETURNING *")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn update(db: &SqlitePool, entry: &Entry) -> Result<Entry, sqlx::Error> {
        sqlx::query_as(
            r#"
            UPDATE entries
            SET date = ?, hours = ?, material_cost = ?, status = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(&entry.date)
        .bind(entry.hours)
        .bind(entry.material_cost)
        .bind(&entry.status)
        .bind(entry.id)
        .fetch_one(db)
        .await
    }

    pub async fn delete(db: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM entries WHERE id = ?")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{CreateSiteRequest, Role, Site, User};
    use crate::db::test_pool;

    async fn seed(db: &SqlitePool) -> (User, Site) {
        let user = User::create(db, "marc", "123456", Role::Worker, 0.0)
            .await
            .unwrap();
        let site = Site::create(
            db,
            &CreateSiteRequest {
                name: "Villa A".into(),
                year: 2024,
                address_work: None,
                address_billing: None,
                date_start: None,
                date_end: None,
                notes: None,
                status: Some("ACTIVE".into()),
                members: vec![],
            },
        )
        .await
        .unwrap();
        (user, site)
    }

    #[tokio::test]
    async fn creation_forces_pending_status() {
        let db = test_pool().await;
        let (user, site) = seed(&db).await;

        let entry = Entry::create(
            &db,
            &CreateEntryRequest {
                user_id: user.id,
                site_id: site.id,
                date: "2024-03-01".into(),
                hours: 8.0,
                material_cost: 0.0,
                // A caller trying to smuggle in a validated entry.
                status: Some("VALIDATED".into()),
            },
            user.id,
        )
        .await
        .unwrap();

        assert_eq!(entry.status, "PENDING");
    }

    #[tokio::test]
    async fn validate_is_one_way() {
        let db = test_pool().await;
        let (user, site) = seed(&db).await;
        let entry = Entry::create(
            &db,
            &CreateEntryRequest {
                user_id: user.id,
                site_id: site.id,
                date: "2024-03-01".into(),
                hours: 8.0,
                material_cost: 0.0,
                status: None,
            },
            user.id,
        )
        .await
        .unwrap();

        let validated = Entry::validate(&db, entry.id).await.unwrap().unwrap();
        assert_eq!(validated.status, "VALIDATED");

        assert!(Entry::validate(&db, 999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn listing_survives_deleted_user_and_site() {
        let db = test_pool().await;
        let (user, site) = seed(&db).await;
        Entry::create(
            &db,
            &CreateEntryRequest {
                user_id: user.id,
                site_id: site.id,
                date: "2024-03-01".into(),
                hours: 8.0,
                material_cost: 12.5,
                status: None,
            },
            user.id,
        )
        .await
        .unwrap();

        User::delete(&db, user.id).await.unwrap();

        let rows = Entry::list_all_rows(&db).await.unwrap();
        assert_eq!(rows.len(), 1);
        let response = EntryResponse::from(rows[0].clone());
        assert_eq!(response.user_name, UNKNOWN_LABEL);
        assert_eq!(response.site_name, "Villa A");
    }
}
