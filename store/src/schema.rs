//! Schema bootstrap.
//!
//! The table layout is shared with the admin surface; the pipeline only
//! creates it so it can run standalone on a fresh database.

use crate::error::Result;
use sqlx::SqlitePool;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS sections (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        base_id TEXT NOT NULL,
        table_id TEXT NOT NULL,
        notify_url TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    )",
    "CREATE TABLE IF NOT EXISTS client_tags (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        tag TEXT NOT NULL UNIQUE,
        section_id INTEGER NOT NULL,
        FOREIGN KEY (section_id) REFERENCES sections(id) ON DELETE CASCADE
    )",
    "CREATE TABLE IF NOT EXISTS untracked_config (
        id INTEGER PRIMARY KEY,
        base_id TEXT NOT NULL,
        table_id TEXT NOT NULL,
        notify_url TEXT
    )",
    "CREATE TABLE IF NOT EXISTS company_codes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        code TEXT NOT NULL,
        pattern TEXT NOT NULL,
        priority INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS bounce_filters (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        field TEXT NOT NULL,
        value TEXT NOT NULL,
        match_type TEXT NOT NULL DEFAULT 'notContains'
    )",
    "CREATE TABLE IF NOT EXISTS client_config (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        client_tag TEXT NOT NULL UNIQUE,
        cc_name_1 TEXT, cc_email_1 TEXT,
        cc_name_2 TEXT, cc_email_2 TEXT,
        cc_name_3 TEXT, cc_email_3 TEXT,
        cc_name_4 TEXT, cc_email_4 TEXT,
        bcc_name_1 TEXT, bcc_email_1 TEXT,
        bcc_name_2 TEXT, bcc_email_2 TEXT,
        reply_template TEXT,
        updated_at TEXT NOT NULL DEFAULT (datetime('now'))
    )",
    "CREATE TABLE IF NOT EXISTS error_log (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp TEXT NOT NULL,
        workflow TEXT NOT NULL,
        stage TEXT NOT NULL,
        message TEXT NOT NULL,
        payload TEXT
    )",
    "CREATE TABLE IF NOT EXISTS activity_log (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp TEXT NOT NULL,
        workflow TEXT NOT NULL,
        client_tag TEXT,
        section_name TEXT,
        lead_email TEXT,
        action TEXT NOT NULL,
        details TEXT
    )",
    "CREATE INDEX IF NOT EXISTS idx_client_tags_tag ON client_tags(tag)",
    "CREATE INDEX IF NOT EXISTS idx_client_config_tag ON client_config(client_tag)",
    "CREATE INDEX IF NOT EXISTS idx_company_codes_priority ON company_codes(priority DESC)",
    "CREATE INDEX IF NOT EXISTS idx_error_log_timestamp ON error_log(timestamp DESC)",
    "CREATE INDEX IF NOT EXISTS idx_activity_log_timestamp ON activity_log(timestamp DESC)",
];

pub async fn init(pool: &SqlitePool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
