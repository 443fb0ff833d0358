use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A store aggregate as read from the source, with both child collections
/// already attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Store {
    pub id: i64,
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub employees: Vec<Employee>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: i64,
    /// Id of the owning store.
    pub store_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: i64,
    pub name: String,
    pub hire_date: NaiveDateTime,
    /// Id of the owning store.
    pub store_id: i64,
}

impl Store {
    pub fn new(id: i64, name: &str, address: &str) -> Self {
        Store {
            id,
            name: name.to_string(),
            address: address.to_string(),
            products: Vec::new(),
            employees: Vec::new(),
        }
    }

    /// Attaches a product to this store, rewriting its back-reference.
    pub fn add_product(&mut self, mut product: Product) {
        product.store_id = self.id;
        self.products.push(product);
    }

    /// Attaches an employee to this store, rewriting its back-reference.
    pub fn add_employee(&mut self, mut employee: Employee) {
        employee.store_id = self.id;
        self.employees.push(employee);
    }

    pub fn with_product(mut self, product: Product) -> Self {
        self.add_product(product);
        self
    }

    pub fn with_employee(mut self, employee: Employee) -> Self {
        self.add_employee(employee);
        self
    }
}

impl Product {
    /// A product not yet attached to a store.
    pub fn new(id: i64, name: &str, price: i64) -> Self {
        Product {
            id,
            name: name.to_string(),
            price,
            store_id: 0,
        }
    }
}

impl Employee {
    /// An employee not yet attached to a store.
    pub fn new(id: i64, name: &str, hire_date: NaiveDateTime) -> Self {
        Employee {
            id,
            name: name.to_string(),
            hire_date,
            store_id: 0,
        }
    }
}
