use parking_lot::Mutex;
use redis::{Client, Connection};

use super::KeyValueStore;
use crate::error::HierarchyError;

/// Keys requested per SCAN round trip.
const SCAN_BATCH: usize = 500;

/// A [`KeyValueStore`] backed by a redis (or valkey) server. All commands share one connection.
pub struct RedisStore {
    conn: Mutex<Connection>,
    /// Seconds a key is kept; `None` means keys never expire.
    expire_secs: Option<u64>,
}

impl RedisStore {
    pub fn connect(url: &str, expire_secs: Option<u64>) -> Result<Self, HierarchyError> {
        let client = Client::open(url)
            .map_err(|e| HierarchyError::Config(format!("invalid redis url '{url}': {e}")))?;
        let conn = client.get_connection()?;
        tracing::info!("Created an instance of redis key-value store \"{}\"", url);
        Ok(RedisStore {
            conn: Mutex::new(conn),
            expire_secs: expire_secs.filter(|secs| *secs > 0),
        })
    }
}

/// Escape glob metacharacters so that `prefix` is matched literally by `SCAN MATCH`.
fn glob_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for ch in prefix.chars() {
        if matches!(ch, '*' | '?' | '[' | ']' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('*');
    pattern
}

impl KeyValueStore for RedisStore {
    fn get(&self, key: &str) -> Result<Option<String>, HierarchyError> {
        let mut conn = self.conn.lock();
        Ok(redis::cmd("GET")
            .arg(key)
            .query::<Option<String>>(&mut *conn)?)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), HierarchyError> {
        let mut conn = self.conn.lock();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(secs) = self.expire_secs {
            cmd.arg("EX").arg(secs);
        }
        cmd.query::<()>(&mut *conn)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), HierarchyError> {
        let mut conn = self.conn.lock();
        redis::cmd("DEL").arg(key).query::<i64>(&mut *conn)?;
        Ok(())
    }

    fn scan(&self, prefix: &str) -> Result<Vec<String>, HierarchyError> {
        let pattern = glob_pattern(prefix);
        let mut conn = self.conn.lock();
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, mut batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query(&mut *conn)?;
            keys.append(&mut batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        // SCAN may report a key more than once
        keys.sort_unstable();
        keys.dedup();
        Ok(keys)
    }
}
