//! Small in-memory tables shared by the unit tests.

use crate::dataset::DataFusionProvider;
use arrow::array::{Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

/// Five customers; `email` has two NULLs, `score` has one NULL and one NaN.
pub fn customers_batch() -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("email", DataType::Utf8, true),
        Field::new("score", DataType::Float64, true),
        Field::new("age", DataType::Int64, true),
    ]));

    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from(vec![1, 2, 3, 4, 5])),
            Arc::new(StringArray::from(vec![
                Some("ada@example.com"),
                None,
                Some("grace@example.org"),
                None,
                Some("ada@example.com"),
            ])),
            Arc::new(Float64Array::from(vec![
                Some(1.5),
                None,
                Some(f64::NAN),
                Some(3.0),
                Some(4.0),
            ])),
            Arc::new(Int64Array::from(vec![
                Some(34),
                Some(27),
                None,
                Some(61),
                Some(45),
            ])),
        ],
    )
    .unwrap()
}

/// Six orders; customer 9 does not exist and one order has no customer.
pub fn orders_batch() -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("order_id", DataType::Int64, false),
        Field::new("customer_id", DataType::Int64, true),
    ]));

    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from(vec![1, 2, 3, 4, 5, 6])),
            Arc::new(Int64Array::from(vec![
                Some(1),
                Some(2),
                Some(9),
                Some(9),
                None,
                Some(3),
            ])),
        ],
    )
    .unwrap()
}

/// A table with the customers schema and no rows.
pub fn empty_customers_batch() -> RecordBatch {
    RecordBatch::new_empty(customers_batch().schema())
}

/// Registers each `(database, table, batch)` with a fresh provider.
pub fn provider_with(tables: Vec<(&str, &str, RecordBatch)>) -> DataFusionProvider {
    let provider = DataFusionProvider::default();
    for (database, table, batch) in tables {
        provider
            .register_batches(database, table, batch.schema(), vec![batch])
            .unwrap();
    }
    provider
}
