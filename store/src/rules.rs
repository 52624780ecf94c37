//! Rule snapshots consumed by the pure resolution logic in the ingest crate.
//!
//! Rules are loaded fresh per event so admin edits take effect immediately.

use crate::error::{Result, StoreError};
use crate::types::{BounceField, BounceFilterRule, CompanyCodeRule, MatchType};
use crate::Store;
use sqlx::Row;

impl Store {
    /// All company-code rules, ordered by priority descending. Ties break by
    /// insertion order so the evaluation order is total.
    pub async fn company_code_rules(&self) -> Result<Vec<CompanyCodeRule>> {
        let rows = sqlx::query(
            "SELECT id, code, pattern, priority FROM company_codes
             ORDER BY priority DESC, id ASC",
        )
        .fetch_all(self.pool())
        .await?;

        rows.iter()
            .map(|row| {
                Ok(CompanyCodeRule {
                    id: row.try_get("id")?,
                    code: row.try_get("code")?,
                    pattern: row.try_get("pattern")?,
                    priority: row.try_get("priority")?,
                })
            })
            .collect()
    }

    /// All bounce-filter rules. Evaluation order is irrelevant (any firing
    /// rule drops the reply), so no ordering is imposed.
    pub async fn bounce_filter_rules(&self) -> Result<Vec<BounceFilterRule>> {
        let rows = sqlx::query("SELECT id, field, value, match_type FROM bounce_filters")
            .fetch_all(self.pool())
            .await?;

        rows.iter()
            .map(|row| {
                let field: String = row.try_get("field")?;
                let match_type: String = row.try_get("match_type")?;
                Ok(BounceFilterRule {
                    id: row.try_get("id")?,
                    field: BounceField::parse(&field).ok_or_else(|| {
                        StoreError::InvalidValue(format!("unknown bounce field: {field}"))
                    })?,
                    value: row.try_get("value")?,
                    match_type: MatchType::parse(&match_type).ok_or_else(|| {
                        StoreError::InvalidValue(format!("unknown match type: {match_type}"))
                    })?,
                })
            })
            .collect()
    }

    pub async fn add_company_code_rule(
        &self,
        code: &str,
        pattern: &str,
        priority: i64,
    ) -> Result<i64> {
        let result =
            sqlx::query("INSERT INTO company_codes (code, pattern, priority) VALUES (?, ?, ?)")
                .bind(code)
                .bind(pattern)
                .bind(priority)
                .execute(self.pool())
                .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn add_bounce_filter(
        &self,
        field: BounceField,
        value: &str,
        match_type: MatchType,
    ) -> Result<i64> {
        let result =
            sqlx::query("INSERT INTO bounce_filters (field, value, match_type) VALUES (?, ?, ?)")
                .bind(field.as_str())
                .bind(value)
                .bind(match_type.as_str())
                .execute(self.pool())
                .await?;
        Ok(result.last_insert_rowid())
    }
}
