use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;

/// The book and amount a gateway order was created for.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct OrderIntent {
    pub order_id: String,
    pub book_id: i64,
    pub amount_cents: i64,
    pub created_at: time::PrimitiveDateTime,
}

impl OrderIntent {
    pub fn new_now(order_id: String, book_id: i64, amount_cents: i64) -> Self {
        let now = time::OffsetDateTime::now_utc();
        Self {
            order_id,
            book_id,
            amount_cents,
            created_at: time::PrimitiveDateTime::new(now.date(), now.time()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GetOrderIntentById {
    pub order_id: String,
}

impl Processor<GetOrderIntentById> for DatabaseProcessor {
    type Output = Option<OrderIntent>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetOrderIntentById")]
    async fn process(&self, query: GetOrderIntentById) -> Result<Option<OrderIntent>, sqlx::Error> {
        sqlx::query_as::<_, OrderIntent>(
            r#"
            SELECT order_id, book_id, amount_cents, created_at
            FROM order_intents
            WHERE order_id = $1
            "#,
        )
        .bind(query.order_id)
        .fetch_optional(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
/// Bind a gateway order to its book and amount. An existing binding is
/// kept; returns `None` in that case.
pub struct InsertOrderIntent {
    pub order_id: String,
    pub book_id: i64,
    pub amount_cents: i64,
}

impl Processor<InsertOrderIntent> for DatabaseProcessor {
    type Output = Option<OrderIntent>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertOrderIntent")]
    async fn process(&self, insert: InsertOrderIntent) -> Result<Option<OrderIntent>, sqlx::Error> {
        sqlx::query_as::<_, OrderIntent>(
            r#"
            INSERT INTO order_intents (order_id, book_id, amount_cents)
            VALUES ($1, $2, $3)
            ON CONFLICT (order_id) DO NOTHING
            RETURNING order_id, book_id, amount_cents, created_at
            "#,
        )
        .bind(insert.order_id)
        .bind(insert.book_id)
        .bind(insert.amount_cents)
        .fetch_optional(&self.pool)
        .await
    }
}
