//! Dashboard service - monthly issued documents statistics

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use sqlx::SqlitePool;

use super::store;
use crate::error::EdmsResult;
use crate::models::parse_opt_date;

/// Working days per month used for the daily average
const WORKING_DAYS_PER_MONTH: f64 = 20.0;

/// Statistics of the revisions received during one month
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyStats {
    /// First day of the month
    pub month: NaiveDate,
    pub total: u32,
    pub average_per_day: f64,
    pub distributed: u32,
    pub distributed_late: u32,
    pub distributed_late_pct: String,
    pub reviewed_by_leader: u32,
    pub reviewed_late_by_leader: u32,
    pub reviewed_late_by_leader_pct: String,
}

impl MonthlyStats {
    fn empty(month: NaiveDate) -> Self {
        Self {
            month,
            total: 0,
            average_per_day: 0.0,
            distributed: 0,
            distributed_late: 0,
            distributed_late_pct: String::new(),
            reviewed_by_leader: 0,
            reviewed_late_by_leader: 0,
            reviewed_late_by_leader_pct: String::new(),
        }
    }

    fn finish(mut self) -> Self {
        self.average_per_day = self.total as f64 / WORKING_DAYS_PER_MONTH;
        self.distributed_late_pct = percentage(self.distributed_late, self.distributed);
        self.reviewed_late_by_leader_pct = percentage(self.reviewed_late_by_leader, self.distributed);
        self
    }
}

/// `"12.50%"`, or `"ND"` when there is nothing to compare against
pub fn percentage(part: u32, whole: u32) -> String {
    if whole == 0 {
        "ND".to_string()
    } else {
        format!("{:.2}%", 100.0 * part as f64 / whole as f64)
    }
}

fn month_of(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn next_month(month: NaiveDate) -> Option<NaiveDate> {
    let (year, m) = if month.month() == 12 {
        (month.year() + 1, 1)
    } else {
        (month.year(), month.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, m, 1)
}

/// Dashboard service
pub struct DashboardService;

impl DashboardService {
    pub fn new() -> Self {
        Self
    }

    /// Documents of a category bucketed by the month their latest revision
    /// was received
    ///
    /// Months without any received revision between the first and last
    /// bucket are reported with zero counts.
    pub async fn issued_documents(
        &self,
        pool: &SqlitePool,
        user_id: i64,
        category_id: i64,
    ) -> EdmsResult<Vec<MonthlyStats>> {
        {
            let mut conn = pool.acquire().await?;
            store::fetch_member_category(&mut conn, user_id, category_id).await?;
        }

        let rows = sqlx::query_as::<_, (String, Option<String>, Option<String>, Option<String>)>(
            r#"
            SELECT r.received_date, r.review_start_date, r.leader_step_closed, r.review_due_date
            FROM documents d
            JOIN revisions r ON r.id = d.latest_revision_id
            WHERE d.category_id = ? AND r.received_date IS NOT NULL
            "#,
        )
        .bind(category_id)
        .fetch_all(pool)
        .await?;

        let mut buckets: BTreeMap<NaiveDate, MonthlyStats> = BTreeMap::new();
        for (received, started, leader_closed, due) in rows {
            let Some(received) = parse_opt_date(Some(received)) else {
                continue;
            };
            let month = month_of(received);
            let stats = buckets
                .entry(month)
                .or_insert_with(|| MonthlyStats::empty(month));
            stats.total += 1;

            if let Some(started) = parse_opt_date(started) {
                stats.distributed += 1;
                if started != received {
                    stats.distributed_late += 1;
                }
            }
            if let Some(closed) = parse_opt_date(leader_closed) {
                stats.reviewed_by_leader += 1;
                if parse_opt_date(due).is_some_and(|due| closed > due) {
                    stats.reviewed_late_by_leader += 1;
                }
            }
        }

        let (Some(first), Some(last)) = (
            buckets.keys().next().copied(),
            buckets.keys().next_back().copied(),
        ) else {
            return Ok(Vec::new());
        };

        let mut months = Vec::new();
        let mut cursor = Some(first);
        while let Some(month) = cursor.filter(|m| *m <= last) {
            let stats = buckets
                .remove(&month)
                .unwrap_or_else(|| MonthlyStats::empty(month));
            months.push(stats.finish());
            cursor = next_month(month);
        }
        Ok(months)
    }
}

impl Default for DashboardService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::test_support::{add_to_category, create_category, create_user, test_pool};

    async fn revision(
        pool: &SqlitePool,
        document_id: i64,
        number: i64,
        received: &str,
        started: Option<&str>,
        leader_closed: Option<&str>,
        due: Option<&str>,
    ) {
        sqlx::query(
            r#"
            INSERT INTO revisions (document_id, revision, revision_date, received_date,
                                   review_start_date, leader_step_closed, review_due_date)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(document_id)
        .bind(number)
        .bind(received)
        .bind(received)
        .bind(started)
        .bind(leader_closed)
        .bind(due)
        .execute(pool)
        .await
        .unwrap();
    }

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(1, 8), "12.50%");
        assert_eq!(percentage(0, 3), "0.00%");
        assert_eq!(percentage(0, 0), "ND");
    }

    async fn document(pool: &SqlitePool, category: i64, seq: &str) -> i64 {
        sqlx::query(
            r#"
            INSERT INTO documents (category_id, document_key, contract_number, originator, unit,
                                   discipline, document_type, sequential_number, title)
            VALUES (?, ?, 'FAC09001', 'FWF', '000', 'HSE', 'REP', ?, 'Report')
            "#,
        )
        .bind(category)
        .bind(format!("FAC09001-FWF-000-HSE-REP-{}", seq))
        .bind(seq)
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid()
    }

    #[tokio::test]
    async fn test_monthly_buckets() {
        let pool = test_pool().await;
        let user = create_user(&pool, "user@phase.fr").await;
        let category = create_category(&pool, "FWF", "Deliverables").await;
        add_to_category(&pool, category, user).await;
        let first = document(&pool, category, "0001").await;
        let second = document(&pool, category, "0002").await;
        let third = document(&pool, category, "0003").await;

        // Superseded revision, not counted
        revision(&pool, first, 1, "2013-12-02", Some("2013-12-02"), None, None).await;
        // January: one on time, one distributed late and reviewed late
        revision(&pool, first, 2, "2014-01-06", Some("2014-01-06"), Some("2014-01-10"), Some("2014-01-19")).await;
        revision(&pool, second, 1, "2014-01-08", Some("2014-01-09"), Some("2014-01-30"), Some("2014-01-22")).await;
        // March: received, never distributed
        revision(&pool, third, 1, "2014-03-03", None, None, None).await;
        sqlx::query(
            r#"
            UPDATE documents SET latest_revision_id = (
                SELECT id FROM revisions WHERE document_id = documents.id
                ORDER BY revision DESC LIMIT 1
            )
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();

        let months = DashboardService::new()
            .issued_documents(&pool, user, category)
            .await
            .unwrap();

        assert_eq!(months.len(), 3);
        let january = &months[0];
        assert_eq!(january.month, NaiveDate::from_ymd_opt(2014, 1, 1).unwrap());
        assert_eq!(january.total, 2);
        assert_eq!(january.average_per_day, 0.1);
        assert_eq!(january.distributed, 2);
        assert_eq!(january.distributed_late, 1);
        assert_eq!(january.distributed_late_pct, "50.00%");
        assert_eq!(january.reviewed_by_leader, 2);
        assert_eq!(january.reviewed_late_by_leader, 1);
        assert_eq!(january.reviewed_late_by_leader_pct, "50.00%");

        let february = &months[1];
        assert_eq!(february.total, 0);
        assert_eq!(february.distributed_late_pct, "ND");

        let march = &months[2];
        assert_eq!(march.total, 1);
        assert_eq!(march.distributed, 0);
        assert_eq!(march.reviewed_late_by_leader_pct, "ND");
    }

    #[tokio::test]
    async fn test_foreign_category_is_not_found() {
        let pool = test_pool().await;
        let user = create_user(&pool, "user@phase.fr").await;
        let category = create_category(&pool, "FWF", "Deliverables").await;
        assert!(DashboardService::new()
            .issued_documents(&pool, user, category)
            .await
            .is_err());
    }
}
