use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::Category;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryInput {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl CategoryInput {
    pub fn trimmed_name(&self) -> Option<&str> {
        self.name.as_deref().map(str::trim)
    }

    pub fn validate_new(&self) -> Result<(), String> {
        match self.trimmed_name() {
            Some(name) if !name.is_empty() => Ok(()),
            _ => Err("Category name is required".to_string()),
        }
    }

    pub fn validate_update(&self) -> Result<(), String> {
        match self.trimmed_name() {
            Some("") => Err("Category name cannot be empty".to_string()),
            _ => Ok(()),
        }
    }
}

pub struct CategoryService {
    pool: PgPool,
}

impl CategoryService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, input: &CategoryInput) -> Result<Category, DatabaseError> {
        let category = sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name, description) VALUES ($1, $2) RETURNING *",
        )
        .bind(input.trimmed_name())
        .bind(input.description.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_write(e, "Category"))?;

        tracing::info!("Created category {} ({})", category.id, category.name);
        Ok(category)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Category>, DatabaseError> {
        let category = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(category)
    }

    pub async fn update(&self, id: Uuid, input: &CategoryInput) -> Result<Category, DatabaseError> {
        sqlx::query_as::<_, Category>(
            "UPDATE categories SET \
                name = COALESCE($2, name), \
                description = COALESCE($3, description), \
                updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL RETURNING *",
        )
        .bind(id)
        .bind(input.trimmed_name())
        .bind(input.description.as_deref())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_write(e, "Category"))?
        .ok_or_else(|| DatabaseError::NotFound("Category not found".to_string()))
    }

    pub async fn soft_delete(&self, id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE categories SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("Category not found".to_string()));
        }
        tracing::info!("Soft-deleted category {}", id);
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<Category>, DatabaseError> {
        let categories = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE deleted_at IS NULL ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(categories)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_rules() {
        let blank = CategoryInput {
            name: Some("  ".to_string()),
            description: None,
        };
        assert!(blank.validate_new().is_err());
        assert!(blank.validate_update().is_err());

        let description_only = CategoryInput {
            name: None,
            description: Some("Only the description".to_string()),
        };
        assert!(description_only.validate_new().is_err());
        assert!(description_only.validate_update().is_ok());
    }
}
