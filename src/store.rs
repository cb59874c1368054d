// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Key -> JSON stores backing the worksheet.
//!
//! The session tier holds in-flight workflow artifacts and lives in an
//! in-memory SQLite database, so it disappears with the process. The durable
//! tier is a table in the on-disk database and only receives committed
//! snapshots. Neither tier enforces a schema; consumers deserialize into
//! their own types.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::db;
use crate::error::{WorksheetError, WorksheetResult};

pub trait Store {
    fn put(&self, key: &str, value: &Value) -> WorksheetResult<()>;
    fn get(&self, key: &str) -> WorksheetResult<Option<Value>>;
    fn remove(&self, key: &str) -> WorksheetResult<()>;
    fn clear(&self) -> WorksheetResult<()>;

    /// Write several keys as one unit. Backends with transactions override
    /// this so a reader never sees half of the batch.
    fn put_all(&self, entries: &[(&str, Value)]) -> WorksheetResult<()> {
        for (key, value) in entries {
            self.put(key, value)?;
        }
        Ok(())
    }
}

/// Typed access on top of any [`Store`].
pub trait StoreExt: Store {
    fn put_record<T: Serialize>(&self, key: &str, record: &T) -> WorksheetResult<()> {
        let v = serde_json::to_value(record)?;
        self.put(key, &v)
    }

    fn get_record<T: DeserializeOwned>(&self, key: &str) -> WorksheetResult<Option<T>> {
        match self.get(key)? {
            Some(v) => Ok(Some(serde_json::from_value(v)?)),
            None => Ok(None),
        }
    }
}

impl<S: Store + ?Sized> StoreExt for S {}

struct KvTable {
    conn: Connection,
}

impl KvTable {
    fn put(&self, key: &str, value: &Value) -> WorksheetResult<()> {
        let text = serde_json::to_string(value)?;
        self.conn.execute(
            "INSERT INTO kv(key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value=excluded.value, updated_at=excluded.updated_at",
            params![key, text, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn put_all(&self, entries: &[(&str, Value)]) -> WorksheetResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        for (key, value) in entries {
            self.put(key, value)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn get(&self, key: &str) -> WorksheetResult<Option<Value>> {
        let text: Option<String> = self
            .conn
            .query_row("SELECT value FROM kv WHERE key=?1", params![key], |r| r.get(0))
            .optional()?;
        match text {
            Some(s) => Ok(Some(serde_json::from_str(&s)?)),
            None => Ok(None),
        }
    }

    fn updated_at(&self, key: &str) -> WorksheetResult<Option<DateTime<Utc>>> {
        let text: Option<String> = self
            .conn
            .query_row(
                "SELECT updated_at FROM kv WHERE key=?1",
                params![key],
                |r| r.get(0),
            )
            .optional()?;
        match text {
            Some(s) => DateTime::parse_from_rfc3339(&s)
                .map(|d| Some(d.with_timezone(&Utc)))
                .map_err(|e| WorksheetError::Persistence(format!("Bad timestamp '{}': {}", s, e))),
            None => Ok(None),
        }
    }

    fn remove(&self, key: &str) -> WorksheetResult<()> {
        self.conn.execute("DELETE FROM kv WHERE key=?1", params![key])?;
        Ok(())
    }

    fn clear(&self) -> WorksheetResult<()> {
        self.conn.execute("DELETE FROM kv", [])?;
        Ok(())
    }
}

pub struct SessionStore {
    kv: KvTable,
}

impl SessionStore {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            kv: KvTable {
                conn: db::open_in_memory()?,
            },
        })
    }
}

impl Store for SessionStore {
    fn put(&self, key: &str, value: &Value) -> WorksheetResult<()> {
        self.kv.put(key, value)
    }
    fn put_all(&self, entries: &[(&str, Value)]) -> WorksheetResult<()> {
        self.kv.put_all(entries)
    }
    fn get(&self, key: &str) -> WorksheetResult<Option<Value>> {
        self.kv.get(key)
    }
    fn remove(&self, key: &str) -> WorksheetResult<()> {
        self.kv.remove(key)
    }
    fn clear(&self) -> WorksheetResult<()> {
        self.kv.clear()
    }
}

pub struct DurableStore {
    kv: KvTable,
}

impl DurableStore {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        Ok(Self {
            kv: KvTable {
                conn: db::open_or_init(path)?,
            },
        })
    }

    /// Wrap an existing connection (tests use an in-memory one).
    pub fn from_connection(conn: Connection) -> anyhow::Result<Self> {
        db::init_schema(&conn)?;
        Ok(Self {
            kv: KvTable { conn },
        })
    }

    pub fn updated_at(&self, key: &str) -> WorksheetResult<Option<DateTime<Utc>>> {
        self.kv.updated_at(key)
    }
}

impl Store for DurableStore {
    fn put(&self, key: &str, value: &Value) -> WorksheetResult<()> {
        self.kv.put(key, value)
    }
    fn put_all(&self, entries: &[(&str, Value)]) -> WorksheetResult<()> {
        self.kv.put_all(entries)
    }
    fn get(&self, key: &str) -> WorksheetResult<Option<Value>> {
        self.kv.get(key)
    }
    fn remove(&self, key: &str) -> WorksheetResult<()> {
        self.kv.remove(key)
    }
    fn clear(&self) -> WorksheetResult<()> {
        self.kv.clear()
    }
}
