use sqlx::PgPool;

/// Executes queries directly against the pool.
///
/// Every query type implements `kanau::processor::Processor` for this.
#[derive(Clone)]
pub struct DatabaseProcessor {
    pub pool: PgPool,
}
