use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use courseforge_core::{AttachmentId, ProjectId};

use crate::error::StorageError;
use crate::traits::{AssetKind, AssetRecord, AssetStore, BlobStore};

pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        crate::schema::init_schema(&conn)?;
        debug!(path = %path.display(), "opened sqlite storage");
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    fn delete_kind(&mut self, project_id: &ProjectId, kind: AssetKind) -> Result<usize, StorageError> {
        let removed = self.conn.execute(
            "DELETE FROM assets WHERE project_id = ?1 AND kind = ?2",
            params![project_id.as_str(), kind.as_str()],
        )?;
        Ok(removed)
    }
}

impl BlobStore for SqliteStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        let body = self
            .conn
            .query_row("SELECT body FROM documents WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(body)
    }

    fn store(&mut self, key: &str, body: &str) -> Result<(), StorageError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO documents (key, body) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET
                 body = excluded.body,
                 updated_at = CAST(unixepoch('now','subsec') * 1000 AS INTEGER)",
            params![key, body],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.conn
            .execute("DELETE FROM documents WHERE key = ?1", params![key])?;
        Ok(())
    }
}

impl AssetStore for SqliteStorage {
    fn put_asset(&mut self, record: AssetRecord) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO assets (project_id, attachment_id, kind, bytes) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(project_id, attachment_id) DO UPDATE SET
                 kind = excluded.kind,
                 bytes = excluded.bytes",
            params![
                record.project_id.as_str(),
                record.attachment_id.as_str(),
                record.kind.as_str(),
                record.bytes,
            ],
        )?;
        Ok(())
    }

    fn get_asset(
        &self,
        project_id: &ProjectId,
        attachment_id: &AttachmentId,
    ) -> Result<Option<AssetRecord>, StorageError> {
        let row = self
            .conn
            .query_row(
                "SELECT kind, bytes FROM assets WHERE project_id = ?1 AND attachment_id = ?2",
                params![project_id.as_str(), attachment_id.as_str()],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?)),
            )
            .optional()?;

        let Some((kind, bytes)) = row else {
            return Ok(None);
        };
        let kind = AssetKind::parse(&kind)
            .ok_or_else(|| StorageError::InvalidData(format!("unknown asset kind: {kind}")))?;
        Ok(Some(AssetRecord {
            project_id: project_id.clone(),
            attachment_id: attachment_id.clone(),
            kind,
            bytes,
        }))
    }

    fn delete_source_document(&mut self, project_id: &ProjectId) -> Result<bool, StorageError> {
        Ok(self.delete_kind(project_id, AssetKind::SourceDocument)? > 0)
    }

    fn delete_attachments(&mut self, project_id: &ProjectId) -> Result<usize, StorageError> {
        self.delete_kind(project_id, AssetKind::TableImage)
    }
}

impl std::fmt::Debug for SqliteStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStorage").finish_non_exhaustive()
    }
}
