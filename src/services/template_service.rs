use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::Template;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub price: Option<Decimal>,
    pub file_url: Option<String>,
    pub file_size: Option<i64>,
    pub file_type: Option<String>,
    pub preview_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub variables: Option<Value>,
    pub active: Option<bool>,
}

impl TemplateInput {
    /// Creation needs a name; a price, when given, must not be negative
    pub fn validate_new(&self) -> Result<(), String> {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => {}
            _ => return Err("Template name is required".to_string()),
        }
        self.validate_update()
    }

    pub fn validate_update(&self) -> Result<(), String> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err("Template name cannot be empty".to_string());
            }
        }
        if let Some(price) = self.price {
            if price < Decimal::ZERO {
                return Err("Price must be zero or greater".to_string());
            }
        }
        if let Some(size) = self.file_size {
            if size < 0 {
                return Err("File size must be zero or greater".to_string());
            }
        }
        Ok(())
    }
}

pub struct TemplateService {
    pool: PgPool,
}

impl TemplateService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, input: &TemplateInput) -> Result<Template, DatabaseError> {
        let template = sqlx::query_as::<_, Template>(
            "INSERT INTO templates (name, description, category_id, price, file_url, file_size, file_type, \
                preview_url, thumbnail_url, variables, active) \
             VALUES ($1, $2, $3, COALESCE($4, 0), $5, $6, $7, $8, $9, $10, COALESCE($11, TRUE)) RETURNING *",
        )
        .bind(input.name.as_deref().map(str::trim))
        .bind(input.description.as_deref())
        .bind(input.category_id)
        .bind(input.price)
        .bind(input.file_url.as_deref())
        .bind(input.file_size)
        .bind(input.file_type.as_deref())
        .bind(input.preview_url.as_deref())
        .bind(input.thumbnail_url.as_deref())
        .bind(input.variables.clone())
        .bind(input.active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_write(e, "Template"))?;

        tracing::info!("Created template {} ({})", template.id, template.name);
        Ok(template)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Template>, DatabaseError> {
        let template = sqlx::query_as::<_, Template>("SELECT * FROM templates WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(template)
    }

    pub async fn update(&self, id: Uuid, input: &TemplateInput) -> Result<Template, DatabaseError> {
        sqlx::query_as::<_, Template>(
            "UPDATE templates SET \
                name = COALESCE($2, name), \
                description = COALESCE($3, description), \
                category_id = COALESCE($4, category_id), \
                price = COALESCE($5, price), \
                file_url = COALESCE($6, file_url), \
                file_size = COALESCE($7, file_size), \
                file_type = COALESCE($8, file_type), \
                preview_url = COALESCE($9, preview_url), \
                thumbnail_url = COALESCE($10, thumbnail_url), \
                variables = COALESCE($11, variables), \
                active = COALESCE($12, active), \
                updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL RETURNING *",
        )
        .bind(id)
        .bind(input.name.as_deref().map(str::trim))
        .bind(input.description.as_deref())
        .bind(input.category_id)
        .bind(input.price)
        .bind(input.file_url.as_deref())
        .bind(input.file_size)
        .bind(input.file_type.as_deref())
        .bind(input.preview_url.as_deref())
        .bind(input.thumbnail_url.as_deref())
        .bind(input.variables.clone())
        .bind(input.active)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_write(e, "Template"))?
        .ok_or_else(|| DatabaseError::NotFound("Template not found".to_string()))
    }

    pub async fn soft_delete(&self, id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE templates SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("Template not found".to_string()));
        }
        tracing::info!("Soft-deleted template {}", id);
        Ok(())
    }

    /// Storefront listing: active templates only, newest first
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Template>, DatabaseError> {
        let templates = sqlx::query_as::<_, Template>(
            "SELECT * FROM templates WHERE active = TRUE AND deleted_at IS NULL \
             ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(templates)
    }

    pub async fn list_by_category(&self, category_id: Uuid, limit: i64, offset: i64) -> Result<Vec<Template>, DatabaseError> {
        let templates = sqlx::query_as::<_, Template>(
            "SELECT * FROM templates WHERE category_id = $1 AND active = TRUE AND deleted_at IS NULL \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(category_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(templates)
    }

    pub async fn increment_downloads(&self, id: Uuid) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE templates SET downloads = downloads + 1 WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
