//! The tutorial's example tables
//!
//! `customers`, `orders` and `persons` are what the tutorial scripts query.

use super::catalog::{Catalog, TableBuilder};
use super::types::DataType;
use crate::error::Result;
use crate::storage::Value;

impl Catalog {
    /// Create a catalog holding the example tables
    pub fn with_examples() -> Result<Self> {
        let mut catalog = Catalog::new();
        seed_examples(&mut catalog)?;
        Ok(catalog)
    }
}

/// Create the example tables in a catalog
pub fn seed_examples(catalog: &mut Catalog) -> Result<()> {
    let customers = [
        (1, "Maria", "Germany", 350),
        (2, "John", "USA", 900),
        (3, "Georg", "UK", 750),
        (4, "Martin", "Germany", 500),
        (5, "Peter", "USA", 0),
    ];
    customers
        .into_iter()
        .fold(
            TableBuilder::new("customers")
                .primary_key("id")
                .column_not_null("first_name", DataType::Varchar(50))
                .column("country", DataType::Varchar(50))
                .column("score", DataType::Integer),
            |builder, (id, name, country, score)| {
                builder.row([
                    Value::Integer(id),
                    Value::from(name),
                    Value::from(country),
                    Value::Integer(score),
                ])
            },
        )
        .build(catalog)?;

    let orders = [
        (1001, 1, "2021-01-11", 35),
        (1002, 2, "2021-04-05", 15),
        (1003, 3, "2021-06-18", 20),
        (1004, 6, "2021-08-31", 10),
    ];
    orders
        .into_iter()
        .fold(
            TableBuilder::new("orders")
                .primary_key("order_id")
                .column_not_null("customer_id", DataType::Integer)
                .column("order_date", DataType::Date)
                .column("sales", DataType::Integer),
            |builder, (order_id, customer_id, date, sales)| {
                builder.row([
                    Value::Integer(order_id),
                    Value::Integer(customer_id),
                    Value::from(date),
                    Value::Integer(sales),
                ])
            },
        )
        .build(catalog)?;

    TableBuilder::new("persons")
        .primary_key("id")
        .column_not_null("person_name", DataType::Varchar(50))
        .column("birth_date", DataType::Date)
        .column_not_null("phone", DataType::Varchar(15))
        .build(catalog)?;

    Ok(())
}
