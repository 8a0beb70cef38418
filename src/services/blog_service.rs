use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::blog_post::{slugify, BlogPost};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPostInput {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category_id: Option<Uuid>,
    pub excerpt: Option<String>,
    pub featured_image: Option<String>,
    pub tags: Option<Vec<String>>,
    pub published: Option<bool>,
    pub slug: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
}

impl BlogPostInput {
    /// A caller-chosen slug; blank counts as not given
    pub fn explicit_slug(&self) -> Option<&str> {
        self.slug.as_deref().filter(|slug| !slug.trim().is_empty())
    }

    pub fn validate_new(&self) -> Result<(), String> {
        let title = self.title.as_deref().map(str::trim).unwrap_or_default();
        let content = self.content.as_deref().map(str::trim).unwrap_or_default();
        if title.is_empty() || content.is_empty() {
            return Err("Title and content are required".to_string());
        }
        self.validate_update()
    }

    pub fn validate_update(&self) -> Result<(), String> {
        if matches!(self.title.as_deref().map(str::trim), Some("")) {
            return Err("Title cannot be empty".to_string());
        }
        if matches!(self.content.as_deref().map(str::trim), Some("")) {
            return Err("Content cannot be empty".to_string());
        }
        if let Some(slug) = self.explicit_slug() {
            if slugify(slug) != slug {
                return Err("Slug may only contain lowercase letters, digits and single hyphens".to_string());
            }
        }
        Ok(())
    }
}

/// Which posts a listing may include
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    PublishedOnly,
    IncludeDrafts,
}

impl Visibility {
    fn include_drafts(self) -> bool {
        self == Visibility::IncludeDrafts
    }
}

pub struct BlogService {
    pool: PgPool,
}

impl BlogService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn slug_taken(&self, slug: &str, except: Option<Uuid>) -> Result<bool, DatabaseError> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM blog_posts WHERE slug = $1 AND deleted_at IS NULL AND ($2::uuid IS NULL OR id <> $2)",
        )
        .bind(slug)
        .bind(except)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    /// Explicit slugs must be free; derived ones get a suffix when taken
    async fn resolve_slug(&self, input: &BlogPostInput) -> Result<Option<String>, DatabaseError> {
        if let Some(slug) = input.explicit_slug() {
            if self.slug_taken(slug, None).await? {
                return Err(DatabaseError::Conflict("Blog post slug already exists".to_string()));
            }
            return Ok(Some(slug.to_string()));
        }
        let base = slugify(input.title.as_deref().unwrap_or_default());
        if base.is_empty() {
            return Ok(None);
        }
        if !self.slug_taken(&base, None).await? {
            return Ok(Some(base));
        }
        let suffix = Uuid::new_v4().simple().to_string();
        Ok(Some(format!("{}-{}", base, &suffix[..8])))
    }

    pub async fn create(&self, author_id: Uuid, input: &BlogPostInput) -> Result<BlogPost, DatabaseError> {
        let slug = self.resolve_slug(input).await?;

        let post = sqlx::query_as::<_, BlogPost>(
            "INSERT INTO blog_posts (title, content, author_id, category_id, excerpt, featured_image, tags, \
                published, published_at, slug, meta_title, meta_description) \
             VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, '{}'::text[]), COALESCE($8, FALSE), \
                CASE WHEN COALESCE($8, FALSE) THEN NOW() ELSE NULL END, $9, $10, $11) \
             RETURNING *",
        )
        .bind(input.title.as_deref().map(str::trim))
        .bind(input.content.as_deref())
        .bind(author_id)
        .bind(input.category_id)
        .bind(input.excerpt.as_deref())
        .bind(input.featured_image.as_deref())
        .bind(input.tags.clone())
        .bind(input.published)
        .bind(slug)
        .bind(input.meta_title.as_deref())
        .bind(input.meta_description.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_write(e, "Blog post"))?;

        tracing::info!("Created blog post {} by {}", post.id, author_id);
        Ok(post)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<BlogPost>, DatabaseError> {
        let post = sqlx::query_as::<_, BlogPost>("SELECT * FROM blog_posts WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(post)
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<BlogPost>, DatabaseError> {
        let post = sqlx::query_as::<_, BlogPost>("SELECT * FROM blog_posts WHERE slug = $1 AND deleted_at IS NULL")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(post)
    }

    /// Partial update. The first switch to published stamps `published_at`.
    pub async fn update(&self, id: Uuid, input: &BlogPostInput) -> Result<BlogPost, DatabaseError> {
        if let Some(slug) = input.explicit_slug() {
            if self.slug_taken(slug, Some(id)).await? {
                return Err(DatabaseError::Conflict("Blog post slug already exists".to_string()));
            }
        }

        sqlx::query_as::<_, BlogPost>(
            "UPDATE blog_posts SET \
                title = COALESCE($2, title), \
                content = COALESCE($3, content), \
                category_id = COALESCE($4, category_id), \
                excerpt = COALESCE($5, excerpt), \
                featured_image = COALESCE($6, featured_image), \
                tags = COALESCE($7, tags), \
                published = COALESCE($8, published), \
                published_at = CASE \
                    WHEN COALESCE($8, published) AND published_at IS NULL THEN NOW() \
                    ELSE published_at END, \
                slug = COALESCE($9, slug), \
                meta_title = COALESCE($10, meta_title), \
                meta_description = COALESCE($11, meta_description), \
                updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL RETURNING *",
        )
        .bind(id)
        .bind(input.title.as_deref().map(str::trim))
        .bind(input.content.as_deref())
        .bind(input.category_id)
        .bind(input.excerpt.as_deref())
        .bind(input.featured_image.as_deref())
        .bind(input.tags.clone())
        .bind(input.published)
        .bind(input.explicit_slug())
        .bind(input.meta_title.as_deref())
        .bind(input.meta_description.as_deref())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_write(e, "Blog post"))?
        .ok_or_else(|| DatabaseError::NotFound("Blog post not found".to_string()))
    }

    pub async fn soft_delete(&self, id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE blog_posts SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("Blog post not found".to_string()));
        }
        tracing::info!("Soft-deleted blog post {}", id);
        Ok(())
    }

    pub async fn list(&self, limit: i64, offset: i64, visibility: Visibility) -> Result<Vec<BlogPost>, DatabaseError> {
        let posts = sqlx::query_as::<_, BlogPost>(
            "SELECT * FROM blog_posts WHERE deleted_at IS NULL AND ($3 OR published = TRUE) \
             ORDER BY COALESCE(published_at, created_at) DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .bind(visibility.include_drafts())
        .fetch_all(&self.pool)
        .await?;
        Ok(posts)
    }

    pub async fn list_by_category(&self, category_id: Uuid, limit: i64, offset: i64) -> Result<Vec<BlogPost>, DatabaseError> {
        let posts = sqlx::query_as::<_, BlogPost>(
            "SELECT * FROM blog_posts WHERE category_id = $1 AND published = TRUE AND deleted_at IS NULL \
             ORDER BY published_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(category_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(posts)
    }

    pub async fn list_by_author(
        &self,
        author_id: Uuid,
        limit: i64,
        offset: i64,
        visibility: Visibility,
    ) -> Result<Vec<BlogPost>, DatabaseError> {
        let posts = sqlx::query_as::<_, BlogPost>(
            "SELECT * FROM blog_posts WHERE author_id = $1 AND deleted_at IS NULL AND ($4 OR published = TRUE) \
             ORDER BY COALESCE(published_at, created_at) DESC LIMIT $2 OFFSET $3",
        )
        .bind(author_id)
        .bind(limit)
        .bind(offset)
        .bind(visibility.include_drafts())
        .fetch_all(&self.pool)
        .await?;
        Ok(posts)
    }

    pub async fn count_by_author(&self, author_id: Uuid) -> Result<i64, DatabaseError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM blog_posts WHERE author_id = $1 AND deleted_at IS NULL")
                .bind(author_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    pub async fn increment_view_count(&self, id: Uuid) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE blog_posts SET view_count = view_count + 1 WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_and_content_required() {
        let input = BlogPostInput {
            title: Some("Hello".to_string()),
            ..Default::default()
        };
        assert_eq!(input.validate_new().unwrap_err(), "Title and content are required");

        let input = BlogPostInput {
            content: Some("Body".to_string()),
            ..input
        };
        assert!(input.validate_new().is_ok());
    }

    #[test]
    fn explicit_slug_must_be_canonical() {
        let input = BlogPostInput {
            slug: Some("Not A Slug".to_string()),
            ..Default::default()
        };
        assert!(input.validate_update().is_err());

        let input = BlogPostInput {
            slug: Some("launch-notes-2024".to_string()),
            ..Default::default()
        };
        assert!(input.validate_update().is_ok());
    }

    #[test]
    fn blank_slug_is_not_explicit() {
        for blank in ["", "   "] {
            let input = BlogPostInput {
                title: Some("Launch Notes".to_string()),
                content: Some("Body".to_string()),
                slug: Some(blank.to_string()),
                ..Default::default()
            };
            assert_eq!(input.explicit_slug(), None);
            assert!(input.validate_new().is_ok());
        }

        let input = BlogPostInput {
            slug: Some("launch".to_string()),
            ..Default::default()
        };
        assert_eq!(input.explicit_slug(), Some("launch"));
    }

    #[test]
    fn tags_deserialize_from_camel_case_body() {
        let input: BlogPostInput = serde_json::from_str(
            r#"{"title":"T","content":"C","tags":["rust","web"],"featuredImage":"img.png","metaTitle":"M"}"#,
        )
        .unwrap();
        assert_eq!(input.tags.as_deref(), Some(&["rust".to_string(), "web".to_string()][..]));
        assert_eq!(input.featured_image.as_deref(), Some("img.png"));
        assert_eq!(input.meta_title.as_deref(), Some("M"));
    }
}
