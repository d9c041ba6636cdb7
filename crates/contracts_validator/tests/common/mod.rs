//! Shared fixtures: the users dataset as an in-memory table, an NDJSON file
//! and a SQLite database.

#![allow(dead_code)]

use contracts_validator::{DataValue, InMemorySource, Table};
use rusqlite::Connection;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const ROWS: usize = 150;

/// One row of the users dataset.
pub struct User {
    pub user_id: i64,
    pub email: Option<String>,
    pub age: i64,
    pub status: Option<String>,
    pub score: Option<f64>,
    pub verified: Option<bool>,
    /// Midnight UTC of a day in January or February 2024
    pub signed_up: (u32, u32),
}

impl User {
    /// `signed_up` as RFC 3339.
    pub fn signed_up_rfc3339(&self) -> String {
        format!("2024-{:02}-{:02}T00:00:00+00:00", self.signed_up.0, self.signed_up.1)
    }

    /// `signed_up` the way SQLite applications usually store it.
    pub fn signed_up_sqlite(&self) -> String {
        format!("2024-{:02}-{:02} 00:00:00", self.signed_up.0, self.signed_up.1)
    }
}

/// Row `i` of the users dataset.
///
/// 150 rows; emails are null at rows 10, 20 and 30; user ids 1 and 2 occur
/// twice (rows 148 and 149); one email lacks an `@`.
pub fn user(i: usize) -> User {
    let day = (i % 50) as u32;
    User {
        user_id: match i {
            148 => 1,
            149 => 2,
            _ => i as i64 + 1,
        },
        email: match i {
            10 | 20 | 30 => None,
            42 => Some("no-at-sign".to_string()),
            _ => Some(format!("user{}@example.com", i)),
        },
        age: 18 + (i as i64 % 60),
        status: match i % 4 {
            0 => Some("active".to_string()),
            1 => Some("inactive".to_string()),
            2 => None,
            _ => Some("pending".to_string()),
        },
        score: if i % 7 == 0 { None } else { Some(i as f64 / 2.0) },
        verified: match i % 5 {
            0 => None,
            1 | 2 => Some(false),
            _ => Some(true),
        },
        signed_up: if day < 31 { (1, day + 1) } else { (2, day - 30) },
    }
}

pub fn users_table() -> Table {
    let rows: Vec<User> = (0..ROWS).map(user).collect();
    Table::from_columns(vec![
        ("user_id", rows.iter().map(|r| DataValue::Int(r.user_id)).collect()),
        ("email", rows.iter().map(|r| DataValue::from(r.email.clone())).collect()),
        ("age", rows.iter().map(|r| DataValue::Int(r.age)).collect()),
        ("status", rows.iter().map(|r| DataValue::from(r.status.clone())).collect()),
        ("score", rows.iter().map(|r| DataValue::from(r.score)).collect::<Vec<_>>()),
        ("verified", rows.iter().map(|r| DataValue::from(r.verified)).collect::<Vec<_>>()),
        (
            "signed_up",
            rows.iter()
                .map(|r| DataValue::Timestamp(r.signed_up_rfc3339()))
                .collect(),
        ),
    ])
    .unwrap()
}

pub fn users_memory() -> InMemorySource {
    InMemorySource::new(users_table()).unwrap()
}

/// Writes the dataset as newline-delimited JSON.
pub fn write_users_ndjson(dir: &Path) -> PathBuf {
    let path = dir.join("users.json");
    let mut file = std::fs::File::create(&path).unwrap();
    for i in 0..ROWS {
        let user = user(i);
        let line = serde_json::json!({
            "user_id": user.user_id,
            "email": user.email,
            "age": user.age,
            "status": user.status,
            "score": user.score,
            "verified": user.verified,
            "signed_up": user.signed_up_rfc3339(),
        });
        writeln!(file, "{}", line).unwrap();
    }
    path
}

/// Writes the dataset as a SQLite table named `users`.
///
/// `verified` is declared BOOLEAN and stored as 0/1; `signed_up` is TEXT.
pub fn write_users_sqlite(dir: &Path) -> PathBuf {
    let path = dir.join("users.db");
    let mut conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE users (user_id INTEGER, email TEXT, age INTEGER, status TEXT, score REAL,
                             verified BOOLEAN, signed_up TEXT);",
    )
    .unwrap();
    let tx = conn.transaction().unwrap();
    for i in 0..ROWS {
        let user = user(i);
        tx.execute(
            "INSERT INTO users VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                user.user_id,
                user.email,
                user.age,
                user.status,
                user.score,
                user.verified,
                user.signed_up_sqlite()
            ],
        )
        .unwrap();
    }
    tx.commit().unwrap();
    path
}
