use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;

/// One row of the order ledger.
///
/// `access_key` is `Some` exactly when `paid` is true; the table enforces
/// this with a check constraint.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct OrderRecord {
    pub order_id: String,
    pub book_id: i64,
    pub paid: bool,
    pub access_key: Option<String>,
    pub created_at: time::PrimitiveDateTime,
}

impl OrderRecord {
    /// Build a paid record stamped with the current UTC time.
    pub fn paid_now(order_id: String, book_id: i64, access_key: String) -> Self {
        let now = time::OffsetDateTime::now_utc();
        Self {
            order_id,
            book_id,
            paid: true,
            access_key: Some(access_key),
            created_at: time::PrimitiveDateTime::new(now.date(), now.time()),
        }
    }

    /// The access key, if the record is paid.
    pub fn paid_access_key(&self) -> Option<&str> {
        if self.paid {
            self.access_key.as_deref()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct GetOrderRecordById {
    pub order_id: String,
}

impl Processor<GetOrderRecordById> for DatabaseProcessor {
    type Output = Option<OrderRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetOrderRecordById")]
    async fn process(&self, query: GetOrderRecordById) -> Result<Option<OrderRecord>, sqlx::Error> {
        sqlx::query_as::<_, OrderRecord>(
            r#"
            SELECT order_id, book_id, paid, access_key, created_at
            FROM book_orders
            WHERE order_id = $1
            "#,
        )
        .bind(query.order_id)
        .fetch_optional(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
/// Insert a paid order unless a row for the order id already exists.
///
/// Uses ON CONFLICT DO NOTHING, so concurrent duplicate confirmations
/// serialize on the primary key. Returns `None` when the row already existed.
pub struct InsertPaidOrderRecord {
    pub order_id: String,
    pub book_id: i64,
    pub access_key: String,
}

impl Processor<InsertPaidOrderRecord> for DatabaseProcessor {
    type Output = Option<OrderRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertPaidOrderRecord")]
    async fn process(
        &self,
        insert: InsertPaidOrderRecord,
    ) -> Result<Option<OrderRecord>, sqlx::Error> {
        sqlx::query_as::<_, OrderRecord>(
            r#"
            INSERT INTO book_orders (order_id, book_id, paid, access_key)
            VALUES ($1, $2, TRUE, $3)
            ON CONFLICT (order_id) DO NOTHING
            RETURNING order_id, book_id, paid, access_key, created_at
            "#,
        )
        .bind(insert.order_id)
        .bind(insert.book_id)
        .bind(insert.access_key)
        .fetch_optional(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
pub struct ListOrderRecordsByBook {
    pub book_id: i64,
}

impl Processor<ListOrderRecordsByBook> for DatabaseProcessor {
    type Output = Vec<OrderRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListOrderRecordsByBook")]
    async fn process(&self, query: ListOrderRecordsByBook) -> Result<Vec<OrderRecord>, sqlx::Error> {
        sqlx::query_as::<_, OrderRecord>(
            r#"
            SELECT order_id, book_id, paid, access_key, created_at
            FROM book_orders
            WHERE book_id = $1
            ORDER BY created_at, order_id
            "#,
        )
        .bind(query.book_id)
        .fetch_all(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
/// Find the paid order that unlocks `book_id` with `access_key`.
pub struct GetPaidOrderRecordByAccessKey {
    pub book_id: i64,
    pub access_key: String,
}

impl Processor<GetPaidOrderRecordByAccessKey> for DatabaseProcessor {
    type Output = Option<OrderRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetPaidOrderRecordByAccessKey")]
    async fn process(
        &self,
        query: GetPaidOrderRecordByAccessKey,
    ) -> Result<Option<OrderRecord>, sqlx::Error> {
        sqlx::query_as::<_, OrderRecord>(
            r#"
            SELECT order_id, book_id, paid, access_key, created_at
            FROM book_orders
            WHERE book_id = $1 AND access_key = $2 AND paid
            "#,
        )
        .bind(query.book_id)
        .bind(query.access_key)
        .fetch_optional(&self.pool)
        .await
    }
}
