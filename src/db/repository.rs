//! Database repository for locations, categories and QR records.
//!
//! Uses prepared statements; every statement is a single-table write so the
//! QR orchestrator decides how writes compose.

use chrono::Utc;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use crate::errors::AppError;
use crate::models::{
    fold_name, Category, CreateCategoryRequest, CreateLocationRequest, Location, Qr,
};

const QR_COLUMNS: &str = "id, name, qr_url, active, created_at, modified_at, location_id, category_id, qr_image_reference";

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pub(super) pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    #[cfg(test)]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ==================== LOCATION OPERATIONS ====================

    /// List all locations.
    pub async fn list_locations(&self) -> Result<Vec<Location>, AppError> {
        let rows = sqlx::query(
            "SELECT id, location_number, name, active, created_at, modified_at FROM locations ORDER BY location_number",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(location_from_row).collect())
    }

    /// Get a location by ID.
    pub async fn get_location(&self, id: &str) -> Result<Option<Location>, AppError> {
        let row = sqlx::query(
            "SELECT id, location_number, name, active, created_at, modified_at FROM locations WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(location_from_row))
    }

    /// Find a location by ID, location number or name.
    pub async fn find_location(&self, term: &str) -> Result<Option<Location>, AppError> {
        if let Ok(number) = term.trim().parse::<i64>() {
            let row = sqlx::query(
                "SELECT id, location_number, name, active, created_at, modified_at FROM locations WHERE location_number = ?",
            )
            .bind(number)
            .fetch_optional(&self.pool)
            .await?;
            if let Some(row) = row {
                return Ok(Some(location_from_row(&row)));
            }
        }

        let row = sqlx::query(
            "SELECT id, location_number, name, active, created_at, modified_at FROM locations WHERE id = ? OR name = ?",
        )
        .bind(term)
        .bind(fold_name(term))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(location_from_row))
    }

    /// Create a new location.
    pub async fn create_location(
        &self,
        request: &CreateLocationRequest,
    ) -> Result<Location, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let name = fold_name(&request.name);

        sqlx::query(
            "INSERT INTO locations (id, location_number, name, active, created_at, modified_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(request.location_number)
        .bind(&name)
        .bind(request.active as i32)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Location {
            id,
            location_number: request.location_number,
            name,
            active: request.active,
            created_at: now.clone(),
            modified_at: now,
        })
    }

    /// IDs of locations whose name contains `fragment`, case-insensitively.
    pub async fn location_ids_matching(&self, fragment: &str) -> Result<Vec<String>, AppError> {
        let ids = sqlx::query_scalar("SELECT id FROM locations WHERE name LIKE ? ESCAPE '\\'")
            .bind(like_pattern(fragment))
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    // ==================== CATEGORY OPERATIONS ====================

    /// List all categories.
    pub async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        let rows = sqlx::query(
            "SELECT id, category_type, name, active, created_at, modified_at FROM categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(category_from_row).collect())
    }

    /// Get a category by ID.
    pub async fn get_category(&self, id: &str) -> Result<Option<Category>, AppError> {
        let row = sqlx::query(
            "SELECT id, category_type, name, active, created_at, modified_at FROM categories WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(category_from_row))
    }

    /// Create a new category. The type is fixed from here on.
    pub async fn create_category(
        &self,
        request: &CreateCategoryRequest,
    ) -> Result<Category, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let name = fold_name(&request.name);
        let category_type = request.normalized_type().to_string();

        sqlx::query(
            "INSERT INTO categories (id, category_type, name, active, created_at, modified_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&category_type)
        .bind(&name)
        .bind(request.active as i32)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Category {
            id,
            category_type,
            name,
            active: request.active,
            created_at: now.clone(),
            modified_at: now,
        })
    }

    /// IDs of categories whose name contains `fragment`, case-insensitively.
    pub async fn category_ids_matching(&self, fragment: &str) -> Result<Vec<String>, AppError> {
        let ids = sqlx::query_scalar("SELECT id FROM categories WHERE name LIKE ? ESCAPE '\\'")
            .bind(like_pattern(fragment))
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    // ==================== QR OPERATIONS ====================

    /// Whether a QR with this (already folded) name exists, optionally ignoring one id.
    pub async fn qr_name_taken(&self, name: &str, except_id: Option<&str>) -> Result<bool, AppError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM qrs WHERE name = ? AND id != ?")
                .bind(name)
                .bind(except_id.unwrap_or(""))
                .fetch_one(&self.pool)
                .await?;
        Ok(count > 0)
    }

    /// Whether a QR row exists.
    pub async fn qr_exists(&self, id: &str) -> Result<bool, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM qrs WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    /// Number of QR rows.
    pub async fn count_qrs(&self) -> Result<i64, AppError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM qrs")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Insert a QR row as given.
    pub async fn insert_qr(&self, qr: &Qr) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO qrs (id, name, qr_url, active, created_at, modified_at, location_id, category_id, qr_image_reference) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&qr.id)
        .bind(&qr.name)
        .bind(&qr.qr_url)
        .bind(qr.active as i32)
        .bind(&qr.created_at)
        .bind(&qr.modified_at)
        .bind(&qr.location_id)
        .bind(&qr.category_id)
        .bind(&qr.qr_image_reference)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Overwrite every mutable column of an existing QR row.
    pub async fn write_qr(&self, qr: &Qr) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE qrs SET name = ?, qr_url = ?, active = ?, modified_at = ?, location_id = ?, category_id = ?, qr_image_reference = ? WHERE id = ?",
        )
        .bind(&qr.name)
        .bind(&qr.qr_url)
        .bind(qr.active as i32)
        .bind(&qr.modified_at)
        .bind(&qr.location_id)
        .bind(&qr.category_id)
        .bind(&qr.qr_image_reference)
        .bind(&qr.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("QR {} not found", qr.id)));
        }
        Ok(())
    }

    /// Record the object-store key of a QR's rendered image.
    pub async fn set_qr_image_reference(&self, id: &str, key: &str) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE qrs SET qr_image_reference = ? WHERE id = ?")
            .bind(key)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("QR {} not found", id)));
        }
        Ok(())
    }

    /// Get a QR by ID.
    pub async fn get_qr(&self, id: &str) -> Result<Option<Qr>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM qrs WHERE id = ?", QR_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(qr_from_row))
    }

    /// Find a QR by ID, then by name, then by URL slug.
    pub async fn find_qr(&self, term: &str) -> Result<Option<Qr>, AppError> {
        let term = term.trim();
        if let Some(qr) = self.get_qr(term).await? {
            return Ok(Some(qr));
        }

        let row = sqlx::query(&format!(
            "SELECT {} FROM qrs WHERE name = ? OR qr_url = ? ORDER BY CASE WHEN name = ? THEN 0 ELSE 1 END LIMIT 1",
            QR_COLUMNS
        ))
        .bind(fold_name(term))
        .bind(term)
        .bind(fold_name(term))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(qr_from_row))
    }

    /// QRs whose name contains `fragment`, case-insensitively.
    pub async fn search_qrs(&self, fragment: &str, limit: i64) -> Result<Vec<Qr>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM qrs WHERE name LIKE ? ESCAPE '\\' ORDER BY name LIMIT ?",
            QR_COLUMNS
        ))
        .bind(like_pattern(fragment))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(qr_from_row).collect())
    }

    /// QRs whose foreign keys fall inside the given candidate sets.
    ///
    /// `None` means "no constraint"; callers short-circuit empty sets themselves.
    pub async fn list_qrs_in(
        &self,
        location_ids: Option<&[String]>,
        category_ids: Option<&[String]>,
    ) -> Result<Vec<Qr>, AppError> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM qrs WHERE 1 = 1", QR_COLUMNS));

        for (column, ids) in [("location_id", location_ids), ("category_id", category_ids)] {
            if let Some(ids) = ids {
                builder.push(format!(" AND {} IN (", column));
                let mut separated = builder.separated(", ");
                for id in ids {
                    separated.push_bind(id.clone());
                }
                separated.push_unseparated(")");
            }
        }
        builder.push(" ORDER BY name");

        let rows = builder.build().fetch_all(&self.pool).await?;
        Ok(rows.iter().map(qr_from_row).collect())
    }

    /// Delete a QR and every child row pointing at it, atomically.
    pub async fn purge_qr(&self, id: &str) -> Result<u64, AppError> {
        let mut tx = self.pool.begin().await?;

        for table in ["links", "images", "documents"] {
            sqlx::query(&format!("DELETE FROM {} WHERE qr_id = ?", table))
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        let result = sqlx::query("DELETE FROM qrs WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected())
    }
}

/// Build a LIKE pattern matching `fragment` anywhere, with wildcards escaped.
pub(super) fn like_pattern(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len() + 2);
    escaped.push('%');
    for c in fragment.trim().to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn location_from_row(row: &sqlx::sqlite::SqliteRow) -> Location {
    let active: i32 = row.get("active");
    Location {
        id: row.get("id"),
        location_number: row.get("location_number"),
        name: row.get("name"),
        active: active != 0,
        created_at: row.get("created_at"),
        modified_at: row.get("modified_at"),
    }
}

fn category_from_row(row: &sqlx::sqlite::SqliteRow) -> Category {
    let active: i32 = row.get("active");
    Category {
        id: row.get("id"),
        category_type: row.get("category_type"),
        name: row.get("name"),
        active: active != 0,
        created_at: row.get("created_at"),
        modified_at: row.get("modified_at"),
    }
}

fn qr_from_row(row: &sqlx::sqlite::SqliteRow) -> Qr {
    let active: i32 = row.get("active");
    Qr {
        id: row.get("id"),
        name: row.get("name"),
        qr_url: row.get("qr_url"),
        active: active != 0,
        created_at: row.get("created_at"),
        modified_at: row.get("modified_at"),
        location_id: row.get("location_id"),
        category_id: row.get("category_id"),
        qr_image_reference: row.get("qr_image_reference"),
    }
}
