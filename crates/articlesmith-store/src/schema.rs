//! Schema for the three persisted tables: `documents`,
//! `style_profiles`, `generated_articles`. `apply` is idempotent
//! (`CREATE ... IF NOT EXISTS`) so it is safe to call at process startup
//! against a fresh or already-migrated database.

use articlesmith_core::{Error, Result};
use sqlx::PgPool;

/// Enables `pgvector` and `pg_trgm`, the two extensions the indexes below
/// depend on.
const EXTENSIONS: &str = r"
CREATE EXTENSION IF NOT EXISTS vector;
CREATE EXTENSION IF NOT EXISTS pg_trgm;
";

/// `documents` table: vector + trigram + category scans, plus a
/// `rrf_score` SQL helper mirroring the fusion formula in
/// `articlesmith-search::rrf` so the two stay byte-for-byte consistent.
const DOCUMENTS: &str = r"
CREATE TABLE IF NOT EXISTS documents (
    id BIGSERIAL PRIMARY KEY,
    body TEXT NOT NULL,
    attrs JSONB NOT NULL DEFAULT '{}'::jsonb,
    embedding VECTOR(768),
    category TEXT NOT NULL CHECK (category IN ('ANNOUNCEMENT', 'EVENT_REPORT', 'INTERVIEW', 'CULTURE')),
    source TEXT NOT NULL,
    chunk_index INT NOT NULL,
    total_chunks INT NOT NULL,
    created_at TIMESTAMP NOT NULL DEFAULT now(),
    updated_at TIMESTAMP NOT NULL DEFAULT now()
);

CREATE INDEX IF NOT EXISTS documents_embedding_ann_idx
    ON documents USING ivfflat (embedding vector_cosine_ops) WITH (lists = 100);
CREATE INDEX IF NOT EXISTS documents_body_trgm_idx
    ON documents USING gin (body gin_trgm_ops);
CREATE INDEX IF NOT EXISTS documents_category_idx ON documents (category);
CREATE INDEX IF NOT EXISTS documents_source_idx ON documents (source);
CREATE INDEX IF NOT EXISTS documents_attrs_idx ON documents USING gin (attrs);

CREATE OR REPLACE FUNCTION rrf_score(rank INT, k DOUBLE PRECISION)
RETURNS DOUBLE PRECISION AS $$
    SELECT 1.0 / (rank + k);
$$ LANGUAGE SQL IMMUTABLE;
";

/// `style_profiles` table: at most one `profile` row per
/// category, enforced by the partial unique index below.
const STYLE_PROFILES: &str = r"
CREATE TABLE IF NOT EXISTS style_profiles (
    id BIGSERIAL PRIMARY KEY,
    category TEXT NOT NULL CHECK (category IN ('ANNOUNCEMENT', 'EVENT_REPORT', 'INTERVIEW', 'CULTURE')),
    kind TEXT NOT NULL CHECK (kind IN ('profile', 'excerpt')),
    body TEXT NOT NULL,
    embedding VECTOR(768),
    created_at TIMESTAMP NOT NULL DEFAULT now(),
    updated_at TIMESTAMP NOT NULL DEFAULT now()
);

CREATE UNIQUE INDEX IF NOT EXISTS style_profiles_one_profile_per_category
    ON style_profiles (category) WHERE kind = 'profile';
CREATE INDEX IF NOT EXISTS style_profiles_embedding_ann_idx
    ON style_profiles USING ivfflat (embedding vector_cosine_ops) WITH (lists = 100);
CREATE INDEX IF NOT EXISTS style_profiles_category_kind_idx
    ON style_profiles (category, kind);
";

/// `generated_articles` table: append-only history.
const GENERATED_ARTICLES: &str = r"
CREATE TABLE IF NOT EXISTS generated_articles (
    id UUID PRIMARY KEY,
    input_material TEXT NOT NULL,
    category TEXT NOT NULL CHECK (category IN ('ANNOUNCEMENT', 'EVENT_REPORT', 'INTERVIEW', 'CULTURE')),
    content JSONB NOT NULL,
    markdown TEXT NOT NULL,
    created_at TIMESTAMP NOT NULL DEFAULT now()
);

CREATE INDEX IF NOT EXISTS generated_articles_created_at_idx
    ON generated_articles (created_at DESC);
CREATE INDEX IF NOT EXISTS generated_articles_category_idx
    ON generated_articles (category);
";

/// Apply every `CREATE ... IF NOT EXISTS` statement. Called once at process
/// startup; safe to call repeatedly.
///
/// # Errors
/// Returns [`Error::Retrieval`] if any DDL statement fails.
pub async fn apply(pool: &PgPool) -> Result<()> {
    for statement in [EXTENSIONS, DOCUMENTS, STYLE_PROFILES, GENERATED_ARTICLES] {
        sqlx::raw_sql(statement)
            .execute(pool)
            .await
            .map_err(|e| Error::Retrieval(format!("schema migration failed: {e}")))?;
    }
    Ok(())
}
