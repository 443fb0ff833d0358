#![allow(dead_code)]

use crate::{TEST_PG_URL, pg_adapter};
use chrono::{NaiveDate, NaiveDateTime};
use connectors::{memory::MemoryStore, sql::postgres::adapter::PgAdapter};
use engine_config::settings::JobSettings;
use engine_processing::runner::{ChunkedJobRunner, JobExecution};
use model::{
    entities::store::{Employee, Product, Store},
    job::parameters::JobParameters,
};
use std::sync::Arc;

/// A written history row without its generated id.
pub type HistoryRow = (String, String, String);

pub fn hired() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2021, 3, 1)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
}

/// Three stores, two of them in Seoul, each with two products and one
/// employee.
pub fn example_stores() -> Vec<Store> {
    vec![
        Store::new(1, "s1", "Seoul a1")
            .with_product(Product::new(1, "p1", 1000))
            .with_product(Product::new(2, "p2", 2000))
            .with_employee(Employee::new(1, "e1", hired())),
        Store::new(2, "s2", "Newyork a2")
            .with_product(Product::new(3, "p3", 3000))
            .with_product(Product::new(4, "p4", 4000))
            .with_employee(Employee::new(2, "e2", hired())),
        Store::new(3, "s3", "Seoul a3")
            .with_product(Product::new(5, "p5", 1000))
            .with_product(Product::new(6, "p6", 2000))
            .with_employee(Employee::new(3, "e3", hired())),
    ]
}

pub fn example_history() -> Vec<HistoryRow> {
    vec![
        row("s1", "p1, p2", "e1"),
        row("s3", "p5, p6", "e3"),
    ]
}

/// `n` stores where every third one is outside Seoul. Store `i` carries
/// `i % 4` products and `i % 3` employees, so some have none at all.
pub fn mixed_stores(n: i64) -> Vec<Store> {
    let mut next_child = 1;
    (1..=n)
        .map(|id| {
            let city = if id % 3 == 0 { "Newyork" } else { "Seoul" };
            let mut store = Store::new(id, &format!("s{id}"), &format!("{city} a{id}"));
            for _ in 0..id % 4 {
                store.add_product(Product::new(next_child, &format!("p{next_child}"), 1000));
                next_child += 1;
            }
            for _ in 0..id % 3 {
                store.add_employee(Employee::new(next_child, &format!("e{next_child}"), hired()));
                next_child += 1;
            }
            store
        })
        .collect()
}

/// One store with `children` products and as many employees.
pub fn crowded_store(id: i64, address: &str, children: i64) -> Store {
    let mut store = Store::new(id, &format!("s{id}"), address);
    for child in 1..=children {
        let child_id = id * 10_000 + child;
        store.add_product(Product::new(child_id, &format!("p{child_id}"), 500));
        store.add_employee(Employee::new(child_id, &format!("e{child_id}"), hired()));
    }
    store
}

/// What a backup of `stores` filtered on `prefix` is expected to write, in
/// store id order.
pub fn expected_history(stores: &[Store], prefix: &str) -> Vec<HistoryRow> {
    let mut matching = stores
        .iter()
        .filter(|s| s.address.starts_with(prefix))
        .collect::<Vec<_>>();
    matching.sort_by_key(|s| s.id);
    matching
        .into_iter()
        .map(|s| {
            let products = s.products.iter().map(|p| p.name.as_str()).collect::<Vec<_>>();
            let employees = s.employees.iter().map(|e| e.name.as_str()).collect::<Vec<_>>();
            row(&s.name, &products.join(", "), &employees.join(", "))
        })
        .collect()
}

pub fn row(store: &str, products: &str, employees: &str) -> HistoryRow {
    (store.to_string(), products.to_string(), employees.to_string())
}

pub fn params(address: &str) -> JobParameters {
    JobParameters::builder()
        .add_string("address", address)
        .add_string("requestDate", "2024-01-01T00:00:00")
        .to_job_parameters()
}

pub fn settings(chunk_size: i64) -> JobSettings {
    JobSettings::default().with_chunk_size(chunk_size)
}

pub fn runner(store: &MemoryStore, params: JobParameters, settings: JobSettings) -> ChunkedJobRunner {
    ChunkedJobRunner::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        params,
        settings,
    )
}

pub async fn run_backup(store: &MemoryStore, address: &str, chunk_size: i64) -> JobExecution {
    runner(store, params(address), settings(chunk_size)).run().await
}

/// Rows written to the in-memory `store_history`, in insertion order.
pub async fn written(store: &MemoryStore) -> Vec<HistoryRow> {
    store
        .history()
        .await
        .into_iter()
        .map(|h| (h.store_name, h.product_names, h.employee_names))
        .collect()
}

/// Inserts `stores` with their children, keeping the given ids.
pub async fn seed_postgres(adapter: &PgAdapter, stores: &[Store]) {
    let mut sql = String::new();
    for store in stores {
        sql.push_str(&format!(
            "INSERT INTO store (id, name, address) VALUES ({}, '{}', '{}');\n",
            store.id,
            quote(&store.name),
            quote(&store.address)
        ));
        for p in &store.products {
            sql.push_str(&format!(
                "INSERT INTO product (id, name, price, store_id) VALUES ({}, '{}', {}, {});\n",
                p.id,
                quote(&p.name),
                p.price,
                store.id
            ));
        }
        for e in &store.employees {
            sql.push_str(&format!(
                "INSERT INTO employee (id, name, hire_date, store_id) VALUES ({}, '{}', '{}', {});\n",
                e.id,
                quote(&e.name),
                e.hire_date.format("%Y-%m-%d %H:%M:%S"),
                store.id
            ));
        }
    }
    adapter.exec(&sql).await.expect("seed stores");
}

pub async fn postgres_history() -> Vec<HistoryRow> {
    let adapter = pg_adapter().await;
    let client = adapter.read_client().await;
    client
        .query(
            "SELECT store_name, product_names, employee_names FROM store_history ORDER BY id",
            &[],
        )
        .await
        .expect("read store_history")
        .iter()
        .map(|r| (r.get(0), r.get(1), r.get(2)))
        .collect()
}

pub fn postgres_url() -> &'static str {
    TEST_PG_URL
}

fn quote(value: &str) -> String {
    value.replace('\'', "''")
}
