//! Site ("chantier") model and the advisory membership relation.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

/// Lifecycle status of a site. Set directly by the admin; there is no
/// automatic transition derived from the start/end dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SiteStatus {
    #[serde(rename = "FUTURE")]
    Future,
    #[serde(rename = "ACTIVE")]
    Active,
    #[serde(rename = "DONE")]
    Done,
}

impl SiteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiteStatus::Future => "FUTURE",
            SiteStatus::Active => "ACTIVE",
            SiteStatus::Done => "DONE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "FUTURE" => Some(SiteStatus::Future),
            "ACTIVE" => Some(SiteStatus::Active),
            "DONE" => Some(SiteStatus::Done),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Site {
    pub id: i64,
    pub name: String,
    pub year: i64,
    pub address_work: Option<String>,
    pub address_billing: Option<String>,
    pub date_start: Option<String>,
    pub date_end: Option<String>,
    pub notes: Option<String>,
    pub status: String,
    pub plan_path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SiteResponse {
    #[serde(flatten)]
    pub site: Site,
    pub members: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSiteRequest {
    pub name: String,
    pub year: i64,
    pub address_work: Option<String>,
    pub address_billing: Option<String>,
    pub date_start: Option<String>,
    pub date_end: Option<String>,
    pub notes: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub members: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSiteRequest {
    pub name: Option<String>,
    pub year: Option<i64>,
    pub address_work: Option<String>,
    pub address_billing: Option<String>,
    pub date_start: Option<String>,
    pub date_end: Option<String>,
    pub notes: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MemberRequest {
    pub user_id: i64,
}

impl Site {
    pub async fn get(db: &SqlitePool, id: i64) -> Result<Option<Site>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM sites WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// List sites, optionally filtered by status and, when read scoping
    /// is enabled, restricted to the sites a user is a member of.
    pub async fn list(
        db: &SqlitePool,
        status: Option<&str>,
        member_of: Option<i64>,
    ) -> Result<Vec<Site>, sqlx::Error> {
        match (status, member_of) {
            (Some(status), Some(user_id)) => {
                sqlx::query_as(
                    r#"
                    SELECT s.* FROM sites s
                    JOIN site_members m ON m.site_id = s.id
                    WHERE s.status = ? AND m.user_id = ?
                    ORDER BY s.id
                    "#,
                )
                .bind(status)
                .bind(user_id)
                .fetch_all(db)
                .await
            }
            (Some(status), None) => {
                sqlx::query_as("SELECT * FROM sites WHERE status = ? ORDER BY id")
                    .bind(status)
                    .fetch_all(db)
                    .await
            }
            (None, Some(user_id)) => {
                sqlx::query_as(
                    r#"
                    SELECT s.* FROM sites s
                    JOIN site_members m ON m.site_id = s.id
                    WHERE m.user_id = ?
                    ORDER BY s.id
                    "#,
                )
                .bind(user_id)
                .fetch_all(db)
                .await
            }
            (None, None) => {
                sqlx::query_as("SELECT * FROM sites ORDER BY id")
                    .fetch_all(db)
                    .await
            }
        }
    }

    pub async fn create(db: &SqlitePool, req: &CreateSiteRequest) -> Result<Site, sqlx::Error> {
        sqlx::query_as(
            r#"
            INSERT INTO sites (name, year, address_work, address_billing,
                               date_start, date_end, notes, status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&req.name)
        .bind(req.year)
        .bind(&req.address_work)
        .bind(&req.address_billing)
        .bind(&req.date_start)
        .bind(&req.date_end)
        .bind(&req.notes)
        .bind(req.status.as_deref().unwrap_or("FUTURE"))
        .fetch_one(db)
        .await
    }

    pub async fn update(db: &SqlitePool, site: &Site) -> Result<Site, sqlx::Error> {
        sqlx::query_as(
            r#"
            UPDATE sites
            SET name = ?, year = ?, address_work = ?, address_billing = ?,
                date_start = ?, date_end = ?, notes = ?, status = ?, plan_path = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(&site.name)
        .bind(site.year)
        .bind(&site.address_work)
        .bind(&site.address_billing)
        .bind(&site.date_start)
        .bind(&site.date_end)
        .bind(&site.notes)
        .bind(&site.status)
        .bind(&site.plan_path)
        .bind(site.id)
        .fetch_one(db)
        .await
    }

    pub async fn set_plan_path(
        db: &SqlitePool,
        id: i64,
        plan_path: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE sites SET plan_path = ? WHERE id = ?")
            .bind(plan_path)
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn member_ids(db: &SqlitePool, id: i64) -> Result<Vec<i64>, sqlx::Error> {
        sqlx::query_scalar("SELECT user_id FROM site_members WHERE site_id = ? ORDER BY user_id")
            .bind(id)
            .fetch_all(db)
            .await
    }

    /// Add a member. The user-exists check and the insert run in one
    /// transaction so a concurrent user deletion cannot slip between them.
    pub async fn add_member(db: &SqlitePool, id: i64, user_id: i64) -> Result<bool, sqlx::Error> {
        let mut tx = db.begin().await?;
        let user_exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;
        if user_exists == 0 {
            tx.rollback().await?;
            return Ok(false);
        }
        sqlx::query("INSERT OR IGNORE INTO site_members (site_id, user_id) VALUES (?, ?)")
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(true)
    }

    pub async fn remove_member(
        db: &SqlitePool,
        id: i64,
        user_id: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM site_members WHERE site_id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn active_count(db: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM sites WHERE status = 'ACTIVE'")
            .fetch_one(db)
            .await
    }

    pub async fn into_response(self, db: &SqlitePool) -> Result<SiteResponse, sqlx::Error> {
        let members = Site::member_ids(db, self.id).await?;
        Ok(SiteResponse {
            site: self,
            members,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{Role, User};
    use crate::db::test_pool;

    fn site_request(name: &str) -> CreateSiteRequest {
        CreateSiteRequest {
            name: name.to_string(),
            year: 2024,
            address_work: None,
            address_billing: None,
            date_start: None,
            date_end: None,
            notes: None,
            status: None,
            members: vec![],
        }
    }

    #[tokio::test]
    async fn membership_scoped_listing() {
        let db = test_pool().await;
        let worker = User::create(&db, "marc", "123456", Role::Worker, 0.0)
            .await
            .unwrap();
        let s1 = Site::create(&db, &site_request("Villa A")).await.unwrap();
        let _s2 = Site::create(&db, &site_request("Gare")).await.unwrap();
        assert!(Site::add_member(&db, s1.id, worker.id).await.unwrap());

        let all = Site::list(&db, None, None).await.unwrap();
        assert_eq!(all.len(), 2);

        let scoped = Site::list(&db, None, Some(worker.id)).await.unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].name, "Villa A");
    }

    #[tokio::test]
    async fn add_member_rejects_unknown_user() {
        let db = test_pool().await;
        let site = Site::create(&db, &site_request("Villa A")).await.unwrap();
        assert!(!Site::add_member(&db, site.id, 999).await.unwrap());
        assert!(Site::member_ids(&db, site.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn add_member_is_idempotent() {
        let db = test_pool().await;
        let worker = User::create(&db, "marc", "123456", Role::Worker, 0.0)
            .await
            .unwrap();
        let site = Site::create(&db, &site_request("Villa A")).await.unwrap();
        assert!(Site::add_member(&db, site.id, worker.id).await.unwrap());
        assert!(Site::add_member(&db, site.id, worker.id).await.unwrap());
        assert_eq!(Site::member_ids(&db, site.id).await.unwrap(), vec![worker.id]);
    }
}
