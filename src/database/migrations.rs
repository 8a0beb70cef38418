//! Schema bootstrap. Every statement is idempotent so this runs on each start.
//! Needs PostgreSQL 13 or later for the built-in `gen_random_uuid()`.

use sqlx::PgPool;

use super::manager::DatabaseError;

const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        email TEXT NOT NULL UNIQUE,
        identity_subject TEXT UNIQUE,
        password_hash TEXT,
        name TEXT NOT NULL,
        role TEXT NOT NULL DEFAULT 'user',
        status TEXT NOT NULL DEFAULT 'active',
        avatar_url TEXT,
        phone_number TEXT,
        address TEXT,
        city TEXT,
        state TEXT,
        postal_code TEXT,
        country TEXT,
        email_verified BOOLEAN NOT NULL DEFAULT FALSE,
        last_login TIMESTAMPTZ,
        suspended_at TIMESTAMPTZ,
        suspension_reason TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        deleted_at TIMESTAMPTZ,
        CONSTRAINT users_role_check CHECK (role IN ('user', 'author', 'admin')),
        CONSTRAINT users_status_check CHECK (status IN ('active', 'suspended', 'deactivated'))
    )
    "#,
    r#"CREATE INDEX IF NOT EXISTS idx_users_role ON users (role)"#,
    r#"CREATE INDEX IF NOT EXISTS idx_users_status ON users (status)"#,
    r#"
    CREATE TABLE IF NOT EXISTS user_preferences (
        user_id UUID PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
        marketing_emails BOOLEAN NOT NULL DEFAULT TRUE,
        order_notifications BOOLEAN NOT NULL DEFAULT TRUE,
        blog_notifications BOOLEAN NOT NULL DEFAULT TRUE,
        language TEXT NOT NULL DEFAULT 'en',
        timezone TEXT NOT NULL DEFAULT 'UTC',
        theme TEXT NOT NULL DEFAULT 'light',
        profile_visibility TEXT NOT NULL DEFAULT 'public',
        show_email BOOLEAN NOT NULL DEFAULT FALSE,
        show_purchase_history BOOLEAN NOT NULL DEFAULT FALSE,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS categories (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        name TEXT NOT NULL,
        description TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        deleted_at TIMESTAMPTZ
    )
    "#,
    r#"CREATE UNIQUE INDEX IF NOT EXISTS idx_categories_live_name ON categories (name) WHERE deleted_at IS NULL"#,
    r#"
    CREATE TABLE IF NOT EXISTS templates (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        name TEXT NOT NULL,
        description TEXT,
        category_id UUID REFERENCES categories(id),
        price NUMERIC(10, 2) NOT NULL DEFAULT 0 CHECK (price >= 0),
        file_url TEXT,
        file_size BIGINT,
        file_type TEXT,
        preview_url TEXT,
        thumbnail_url TEXT,
        variables JSONB,
        downloads INTEGER NOT NULL DEFAULT 0,
        active BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        deleted_at TIMESTAMPTZ
    )
    "#,
    r#"CREATE INDEX IF NOT EXISTS idx_templates_category ON templates (category_id)"#,
    r#"
    CREATE TABLE IF NOT EXISTS blog_posts (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        title TEXT NOT NULL,
        content TEXT NOT NULL,
        author_id UUID NOT NULL REFERENCES users(id),
        category_id UUID REFERENCES categories(id),
        excerpt TEXT,
        featured_image TEXT,
        tags TEXT[] NOT NULL DEFAULT '{}',
        published BOOLEAN NOT NULL DEFAULT FALSE,
        published_at TIMESTAMPTZ,
        slug TEXT,
        meta_title TEXT,
        meta_description TEXT,
        view_count INTEGER NOT NULL DEFAULT 0,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        deleted_at TIMESTAMPTZ
    )
    "#,
    r#"CREATE UNIQUE INDEX IF NOT EXISTS idx_blog_posts_live_slug ON blog_posts (slug) WHERE deleted_at IS NULL AND slug IS NOT NULL"#,
    r#"CREATE INDEX IF NOT EXISTS idx_blog_posts_author ON blog_posts (author_id)"#,
    r#"CREATE INDEX IF NOT EXISTS idx_blog_posts_category ON blog_posts (category_id)"#,
    r#"
    CREATE TABLE IF NOT EXISTS orders (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        user_id UUID NOT NULL REFERENCES users(id),
        template_id UUID NOT NULL REFERENCES templates(id),
        amount NUMERIC(10, 2) NOT NULL,
        status TEXT NOT NULL DEFAULT 'pending',
        delivery_status TEXT NOT NULL DEFAULT 'pending',
        payment_intent_id TEXT,
        checkout_session_id TEXT UNIQUE,
        download_url TEXT,
        download_expires_at TIMESTAMPTZ,
        metadata JSONB,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        deleted_at TIMESTAMPTZ,
        CONSTRAINT orders_status_check CHECK (status IN ('pending', 'completed', 'failed', 'refunded')),
        CONSTRAINT orders_delivery_check CHECK (delivery_status IN ('pending', 'delivered', 'failed'))
    )
    "#,
    r#"CREATE INDEX IF NOT EXISTS idx_orders_user ON orders (user_id, created_at DESC)"#,
    r#"CREATE INDEX IF NOT EXISTS idx_orders_payment_intent ON orders (payment_intent_id)"#,
    r#"
    CREATE TABLE IF NOT EXISTS login_history (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        user_id UUID NOT NULL REFERENCES users(id),
        ip_address TEXT,
        user_agent TEXT,
        login_method TEXT,
        successful BOOLEAN NOT NULL DEFAULT TRUE,
        failure_reason TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"CREATE INDEX IF NOT EXISTS idx_login_history_user ON login_history (user_id, created_at DESC)"#,
    r#"
    CREATE TABLE IF NOT EXISTS activity_logs (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        user_id UUID NOT NULL REFERENCES users(id),
        action TEXT NOT NULL,
        resource_type TEXT,
        resource_id TEXT,
        details JSONB,
        ip_address TEXT,
        user_agent TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"CREATE INDEX IF NOT EXISTS idx_activity_logs_user ON activity_logs (user_id, created_at DESC)"#,
    r#"CREATE INDEX IF NOT EXISTS idx_activity_logs_action ON activity_logs (action)"#,
];

/// Run all schema migrations
pub async fn run(pool: &PgPool) -> Result<(), DatabaseError> {
    tracing::info!("Running schema migrations...");

    for (index, statement) in STATEMENTS.iter().enumerate() {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| DatabaseError::MigrationError(format!("statement {}: {}", index, e)))?;
    }

    tracing::info!("Schema migrations complete ({} statements)", STATEMENTS.len());
    Ok(())
}
