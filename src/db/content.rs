//! Row access for QR child content: links, images and documents.

use sqlx::Row;

use super::Repository;
use crate::errors::AppError;
use crate::models::{Document, Image, Link};

impl Repository {
    // ==================== LINK OPERATIONS ====================

    /// Insert a link row.
    pub async fn insert_link(&self, link: &Link) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO links (id, name, url, active, created_at, modified_at, qr_id) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&link.id)
        .bind(&link.name)
        .bind(&link.url)
        .bind(link.active as i32)
        .bind(&link.created_at)
        .bind(&link.modified_at)
        .bind(&link.qr_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Links of a QR in creation order.
    pub async fn list_links(&self, qr_id: &str) -> Result<Vec<Link>, AppError> {
        let rows = sqlx::query(
            "SELECT id, name, url, active, created_at, modified_at, qr_id FROM links WHERE qr_id = ? ORDER BY rowid",
        )
        .bind(qr_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(link_from_row).collect())
    }

    /// Rewrite a QR's link after the QR was renamed or repointed.
    pub async fn update_link(
        &self,
        qr_id: &str,
        name: &str,
        url: &str,
        modified_at: &str,
    ) -> Result<u64, AppError> {
        let result =
            sqlx::query("UPDATE links SET name = ?, url = ?, modified_at = ? WHERE qr_id = ?")
                .bind(name)
                .bind(url)
                .bind(modified_at)
                .bind(qr_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_link(&self, id: &str) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM links WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    // ==================== IMAGE OPERATIONS ====================

    /// Insert an image row.
    pub async fn insert_image(&self, image: &Image) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO images (id, name, image_reference, sort_order, active, created_at, modified_at, qr_id) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&image.id)
        .bind(&image.name)
        .bind(&image.image_reference)
        .bind(image.order)
        .bind(image.active as i32)
        .bind(&image.created_at)
        .bind(&image.modified_at)
        .bind(&image.qr_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Images of a QR, ascending by order.
    pub async fn list_images(&self, qr_id: &str) -> Result<Vec<Image>, AppError> {
        let rows = sqlx::query(
            "SELECT id, name, image_reference, sort_order, active, created_at, modified_at, qr_id FROM images WHERE qr_id = ? ORDER BY sort_order",
        )
        .bind(qr_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(image_from_row).collect())
    }

    /// Highest image order for a QR, 0 when it has none.
    pub async fn max_image_order(&self, qr_id: &str) -> Result<i64, AppError> {
        let max: Option<i64> = sqlx::query_scalar("SELECT MAX(sort_order) FROM images WHERE qr_id = ?")
            .bind(qr_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(max.unwrap_or(0))
    }

    pub async fn delete_image(&self, id: &str) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM images WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    // ==================== DOCUMENT OPERATIONS ====================

    /// Insert a document row.
    pub async fn insert_document(&self, document: &Document) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO documents (id, name, document_reference, active, created_at, modified_at, qr_id) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&document.id)
        .bind(&document.name)
        .bind(&document.document_reference)
        .bind(document.active as i32)
        .bind(&document.created_at)
        .bind(&document.modified_at)
        .bind(&document.qr_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Documents of a QR in creation order.
    pub async fn list_documents(&self, qr_id: &str) -> Result<Vec<Document>, AppError> {
        let rows = sqlx::query(
            "SELECT id, name, document_reference, active, created_at, modified_at, qr_id FROM documents WHERE qr_id = ? ORDER BY rowid",
        )
        .bind(qr_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(document_from_row).collect())
    }

    pub async fn delete_document(&self, id: &str) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Row counts of (links, images, documents) owned by a QR.
    pub async fn child_counts(&self, qr_id: &str) -> Result<(i64, i64, i64), AppError> {
        let row = sqlx::query(
            r#"SELECT
                (SELECT COUNT(*) FROM links WHERE qr_id = ?1) AS links,
                (SELECT COUNT(*) FROM images WHERE qr_id = ?1) AS images,
                (SELECT COUNT(*) FROM documents WHERE qr_id = ?1) AS documents"#,
        )
        .bind(qr_id)
        .fetch_one(&self.pool)
        .await?;

        Ok((row.get("links"), row.get("images"), row.get("documents")))
    }
}

fn link_from_row(row: &sqlx::sqlite::SqliteRow) -> Link {
    let active: i32 = row.get("active");
    Link {
        id: row.get("id"),
        name: row.get("name"),
        url: row.get("url"),
        active: active != 0,
        created_at: row.get("created_at"),
        modified_at: row.get("modified_at"),
        qr_id: row.get("qr_id"),
    }
}

fn image_from_row(row: &sqlx::sqlite::SqliteRow) -> Image {
    let active: i32 = row.get("active");
    Image {
        id: row.get("id"),
        name: row.get("name"),
        image_reference: row.get("image_reference"),
        order: row.get("sort_order"),
        active: active != 0,
        created_at: row.get("created_at"),
        modified_at: row.get("modified_at"),
        qr_id: row.get("qr_id"),
    }
}

fn document_from_row(row: &sqlx::sqlite::SqliteRow) -> Document {
    let active: i32 = row.get("active");
    Document {
        id: row.get("id"),
        name: row.get("name"),
        document_reference: row.get("document_reference"),
        active: active != 0,
        created_at: row.get("created_at"),
        modified_at: row.get("modified_at"),
        qr_id: row.get("qr_id"),
    }
}
