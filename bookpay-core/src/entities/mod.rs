pub mod order_intents;
pub mod order_records;
