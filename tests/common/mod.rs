#![allow(dead_code)]

use std::path::Path;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use kiradb::{Config, Field, Record, RecordDescriptor, StoreMode};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub account: String,
    pub name: String,
}

impl Person {
    pub fn new(account: &str, name: &str) -> Self {
        Person {
            account: account.to_string(),
            name: name.to_string(),
        }
    }

    pub fn prototype() -> Self {
        Person::new("", "")
    }
}

impl Record for Person {
    fn descriptor(&self) -> RecordDescriptor {
        RecordDescriptor::new("person")
            .with_primary_key(Field::string("acct", Some(self.account.clone())))
            .with_field(Field::string("name", Some(self.name.clone())))
            .with_store_mode(StoreMode::INDEX)
    }

    fn record_name(&self) -> &str {
        "person"
    }

    fn primary_key_name(&self) -> &str {
        "acct"
    }
}

/// NONE mode: only the indexed fields survive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub tx_id: String,
    pub date: DateTime<Utc>,
    pub category: String,
    pub payee: String,
    pub memo: Option<String>,
}

impl Expense {
    pub fn new(tx_id: &str, date: DateTime<Utc>, category: &str, payee: &str, memo: Option<&str>) -> Self {
        Expense {
            tx_id: tx_id.to_string(),
            date,
            category: category.to_string(),
            payee: payee.to_string(),
            memo: memo.map(str::to_string),
        }
    }

    pub fn prototype() -> Self {
        Expense::new("", day(2000, 1, 1), "", "", None)
    }
}

impl Record for Expense {
    fn descriptor(&self) -> RecordDescriptor {
        RecordDescriptor::new("ex")
            .with_primary_key(Field::string("txId", Some(self.tx_id.clone())))
            .with_field(Field::date("date", Some(self.date)))
            .with_field(Field::string("cat", Some(self.category.clone())))
            .with_field(Field::fulltext("payee", Some(self.payee.clone())))
            .with_field(Field::fulltext("memo", self.memo.clone()))
            .with_store_mode(StoreMode::NONE)
    }

    fn record_name(&self) -> &str {
        "ex"
    }

    fn primary_key_name(&self) -> &str {
        "txId"
    }
}

/// INDEX mode document with a full-text body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextDocument {
    pub doc_id: String,
    pub title: String,
    pub body: String,
}

impl TextDocument {
    pub fn new(doc_id: &str, title: &str, body: &str) -> Self {
        TextDocument {
            doc_id: doc_id.to_string(),
            title: title.to_string(),
            body: body.to_string(),
        }
    }

    pub fn prototype() -> Self {
        TextDocument::new("", "", "")
    }
}

impl Record for TextDocument {
    fn descriptor(&self) -> RecordDescriptor {
        RecordDescriptor::new("cacm")
            .with_primary_key(Field::string("docId", Some(self.doc_id.clone())))
            .with_field(Field::string("title", Some(self.title.clone())))
            .with_field(Field::fulltext("body", Some(self.body.clone())))
            .with_store_mode(StoreMode::INDEX)
    }

    fn record_name(&self) -> &str {
        "cacm"
    }

    fn primary_key_name(&self) -> &str {
        "docId"
    }
}

/// BACKING mode: the index holds keys, the backing store holds payloads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub since: DateTime<Utc>,
}

impl Customer {
    pub fn new(id: i64, name: &str, since: DateTime<Utc>) -> Self {
        Customer {
            id,
            name: name.to_string(),
            since,
        }
    }

    pub fn prototype() -> Self {
        Customer::new(0, "", day(2000, 1, 1))
    }
}

impl Record for Customer {
    fn descriptor(&self) -> RecordDescriptor {
        RecordDescriptor::new("customer")
            .with_primary_key(Field::number("id", Some(self.id)))
            .with_field(Field::string("name", Some(self.name.clone())))
            .with_field(Field::date("date", Some(self.since)))
            .with_store_mode(StoreMode::BACKING)
    }

    fn record_name(&self) -> &str {
        "customer"
    }

    fn primary_key_name(&self) -> &str {
        "id"
    }
}

pub fn day(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
}

/// Defaults with fast retries so contention tests stay quick
pub fn config(index: &Path) -> Config {
    let mut config = Config::new(index);
    config.writer_max_attempts = 200;
    config.writer_retry_interval_ms = 5;
    config.lock_poll_interval_ms = 5;
    config
}
