//! Destination lookups: tag -> section, the untracked fallback, and per-tag
//! client config.

use crate::error::{Result, StoreError};
use crate::types::{ClientConfig, Section, UntrackedConfig};
use crate::Store;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

fn section_from_row(row: &SqliteRow) -> Result<Section> {
    Ok(Section {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        base_id: row.try_get("base_id")?,
        table_id: row.try_get("table_id")?,
        notify_url: row.try_get("notify_url")?,
    })
}

impl Store {
    /// Resolves a client tag to its section, or `None` if the tag is not
    /// mapped (the reply is unroutable).
    pub async fn section_for_tag(&self, tag: &str) -> Result<Option<Section>> {
        let row = sqlx::query(
            "SELECT s.id, s.name, s.base_id, s.table_id, s.notify_url
             FROM client_tags ct JOIN sections s ON ct.section_id = s.id
             WHERE ct.tag = ?",
        )
        .bind(tag)
        .fetch_optional(self.pool())
        .await?;

        row.as_ref().map(section_from_row).transpose()
    }

    /// The singleton fallback destination for untracked replies.
    pub async fn untracked_config(&self) -> Result<UntrackedConfig> {
        let row = sqlx::query(
            "SELECT base_id, table_id, notify_url FROM untracked_config WHERE id = 1",
        )
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| StoreError::InvalidValue("untracked_config row missing".into()))?;

        Ok(UntrackedConfig {
            base_id: row.try_get("base_id")?,
            table_id: row.try_get("table_id")?,
            notify_url: row.try_get("notify_url")?,
        })
    }

    /// Per-tag enrichment, or `None` when the tag has no config. A tag with
    /// no config is treated as all-empty by the field builders.
    pub async fn client_config(&self, tag: &str) -> Result<Option<ClientConfig>> {
        let row = sqlx::query("SELECT * FROM client_config WHERE client_tag = ?")
            .bind(tag)
            .fetch_optional(self.pool())
            .await?;

        let Some(row) = row else { return Ok(None) };
        Ok(Some(ClientConfig {
            client_tag: row.try_get("client_tag")?,
            cc_name_1: row.try_get("cc_name_1")?,
            cc_email_1: row.try_get("cc_email_1")?,
            cc_name_2: row.try_get("cc_name_2")?,
            cc_email_2: row.try_get("cc_email_2")?,
            cc_name_3: row.try_get("cc_name_3")?,
            cc_email_3: row.try_get("cc_email_3")?,
            cc_name_4: row.try_get("cc_name_4")?,
            cc_email_4: row.try_get("cc_email_4")?,
            bcc_name_1: row.try_get("bcc_name_1")?,
            bcc_email_1: row.try_get("bcc_email_1")?,
            bcc_name_2: row.try_get("bcc_name_2")?,
            bcc_email_2: row.try_get("bcc_email_2")?,
            reply_template: row.try_get("reply_template")?,
        }))
    }

    // Seeding helpers, used by tests and deployment scripts. Day-to-day rule
    // editing belongs to the admin surface, which shares this schema.

    pub async fn add_section(
        &self,
        name: &str,
        base_id: &str,
        table_id: &str,
        notify_url: Option<&str>,
    ) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO sections (name, base_id, table_id, notify_url) VALUES (?, ?, ?, ?)",
        )
        .bind(name)
        .bind(base_id)
        .bind(table_id)
        .bind(notify_url)
        .execute(self.pool())
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn add_client_tag(&self, tag: &str, section_id: i64) -> Result<i64> {
        let result = sqlx::query("INSERT INTO client_tags (tag, section_id) VALUES (?, ?)")
            .bind(tag)
            .bind(section_id)
            .execute(self.pool())
            .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn set_untracked_config(
        &self,
        base_id: &str,
        table_id: &str,
        notify_url: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO untracked_config (id, base_id, table_id, notify_url)
             VALUES (1, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 base_id = excluded.base_id,
                 table_id = excluded.table_id,
                 notify_url = excluded.notify_url",
        )
        .bind(base_id)
        .bind(table_id)
        .bind(notify_url)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn set_client_config(&self, config: &ClientConfig) -> Result<()> {
        sqlx::query(
            "INSERT INTO client_config (client_tag,
                 cc_name_1, cc_email_1, cc_name_2, cc_email_2,
                 cc_name_3, cc_email_3, cc_name_4, cc_email_4,
                 bcc_name_1, bcc_email_1, bcc_name_2, bcc_email_2,
                 reply_template)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(client_tag) DO UPDATE SET
                 cc_name_1 = excluded.cc_name_1, cc_email_1 = excluded.cc_email_1,
                 cc_name_2 = excluded.cc_name_2, cc_email_2 = excluded.cc_email_2,
                 cc_name_3 = excluded.cc_name_3, cc_email_3 = excluded.cc_email_3,
                 cc_name_4 = excluded.cc_name_4, cc_email_4 = excluded.cc_email_4,
                 bcc_name_1 = excluded.bcc_name_1, bcc_email_1 = excluded.bcc_email_1,
                 bcc_name_2 = excluded.bcc_name_2, bcc_email_2 = excluded.bcc_email_2,
                 reply_template = excluded.reply_template,
                 updated_at = datetime('now')",
        )
        .bind(&config.client_tag)
        .bind(&config.cc_name_1)
        .bind(&config.cc_email_1)
        .bind(&config.cc_name_2)
        .bind(&config.cc_email_2)
        .bind(&config.cc_name_3)
        .bind(&config.cc_email_3)
        .bind(&config.cc_name_4)
        .bind(&config.cc_email_4)
        .bind(&config.bcc_name_1)
        .bind(&config.bcc_email_1)
        .bind(&config.bcc_name_2)
        .bind(&config.bcc_email_2)
        .bind(&config.reply_template)
        .execute(self.pool())
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::testutils::memory_store;
    use crate::types::ClientConfig;

    #[tokio::test]
    async fn tag_resolves_to_its_section() {
        let store = memory_store().await;
        let section_id = store
            .add_section("Acme", "appBASE", "tblTABLE", Some("https://hooks.example/acme"))
            .await
            .unwrap();
        store.add_client_tag("ACME", section_id).await.unwrap();

        let section = store.section_for_tag("ACME").await.unwrap().unwrap();
        assert_eq!(section.name, "Acme");
        assert_eq!(section.base_id, "appBASE");
        assert_eq!(
            section.notify_url.as_deref(),
            Some("https://hooks.example/acme")
        );

        assert!(store.section_for_tag("NOPE").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn untracked_config_roundtrip() {
        let store = memory_store().await;
        store
            .set_untracked_config("appU", "tblU", None)
            .await
            .unwrap();
        let config = store.untracked_config().await.unwrap();
        assert_eq!(config.base_id, "appU");
        assert!(config.notify_url.is_none());

        // Singleton: a second set overwrites, it does not duplicate.
        store
            .set_untracked_config("appV", "tblV", Some("https://hooks.example/u"))
            .await
            .unwrap();
        let config = store.untracked_config().await.unwrap();
        assert_eq!(config.base_id, "appV");
    }

    #[tokio::test]
    async fn missing_client_config_is_none() {
        let store = memory_store().await;
        assert!(store.client_config("ACME").await.unwrap().is_none());

        let config = ClientConfig {
            client_tag: "ACME".into(),
            cc_name_1: Some("Jo Ops".into()),
            cc_email_1: Some("jo@acme.test".into()),
            ..Default::default()
        };
        store.set_client_config(&config).await.unwrap();
        let loaded = store.client_config("ACME").await.unwrap().unwrap();
        assert_eq!(loaded.cc_name_1.as_deref(), Some("Jo Ops"));
        assert!(loaded.reply_template.is_none());
    }
}
