//! Table definitions for the relational store.
//!
//! `match` is an SQL keyword in SQLite and is always quoted.

/// Statements creating the schema, safe to run repeatedly.
pub const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS player (
        id      INTEGER PRIMARY KEY AUTOINCREMENT,
        name    TEXT    NOT NULL,
        wins    INTEGER NOT NULL DEFAULT 0 CHECK (wins >= 0),
        matches INTEGER NOT NULL DEFAULT 0 CHECK (matches >= 0),
        CHECK (wins <= matches)
    )",
    r#"CREATE TABLE IF NOT EXISTS "match" (
        id     INTEGER PRIMARY KEY AUTOINCREMENT,
        winner INTEGER NOT NULL REFERENCES player (id),
        loser  INTEGER NOT NULL REFERENCES player (id),
        CHECK (winner <> loser)
    )"#,
];
