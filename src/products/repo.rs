use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::StoreResult;
use crate::products::repo_types::{Product, ProductFields, ProductFilter};

const PRODUCT_COLUMNS: &str =
    "id, name, description, price_cents, category, image_url, stock, created_at, updated_at";

#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Newest first.
    async fn list(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>>;
    async fn get(&self, id: Uuid) -> StoreResult<Option<Product>>;
    async fn create(&self, fields: ProductFields) -> StoreResult<Product>;
    /// `None` if no product has this id.
    async fn update(&self, id: Uuid, fields: ProductFields) -> StoreResult<Option<Product>>;
    /// `false` if no product has this id.
    async fn delete(&self, id: Uuid) -> StoreResult<bool>;
}

#[derive(Clone)]
pub struct PgProductStore {
    db: PgPool,
}

impl PgProductStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn list(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, Product>(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE ($1::text IS NULL OR category = $1)
            ORDER BY created_at DESC, id
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(&filter.category)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Product>> {
        let row = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn create(&self, fields: ProductFields) -> StoreResult<Product> {
        let row = sqlx::query_as::<_, Product>(&format!(
            r#"
            INSERT INTO products (id, name, description, price_cents, category, image_url, stock)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(fields.name)
        .bind(fields.description)
        .bind(fields.price_cents)
        .bind(fields.category)
        .bind(fields.image_url)
        .bind(fields.stock)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn update(&self, id: Uuid, fields: ProductFields) -> StoreResult<Option<Product>> {
        let row = sqlx::query_as::<_, Product>(&format!(
            r#"
            UPDATE products
               SET name = $2, description = $3, price_cents = $4,
                   category = $5, image_url = $6, stock = $7,
                   updated_at = now()
             WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(fields.name)
        .bind(fields.description)
        .bind(fields.price_cents)
        .bind(fields.category)
        .bind(fields.image_url)
        .bind(fields.stock)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let res = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
