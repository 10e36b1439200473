//! Conversation persistence.
//!
//! [`ConversationStore`] is the explicit store interface injected into
//! request handlers: `get`, `put`, `delete`, `list`.  Two implementations
//! are provided — an in-memory store for tests and ephemeral runs, and a
//! SQLite-backed store that persists turns as JSON payloads.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, instrument};

use toolgate_agent::{Conversation, Turn};

use crate::db::Database;
use crate::error::{StoreError, StoreResult};

// ═══════════════════════════════════════════════════════════════════════
//  Store interface
// ═══════════════════════════════════════════════════════════════════════

/// Lightweight listing row for a stored conversation.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    /// Conversation id.
    pub id: String,
    /// Number of turns.
    pub turn_count: i64,
    /// Unix timestamp of the last write.
    pub updated_at: i64,
}

/// Keyed storage for conversations.
///
/// Implementations are internally synchronized; each conversation is an
/// isolated unit and handlers load, mutate, and write back their own copy.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Fetch a conversation by id.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if no conversation has this id.
    async fn get(&self, id: &str) -> StoreResult<Conversation>;

    /// Insert or replace a conversation under its own id.
    async fn put(&self, conversation: &Conversation) -> StoreResult<()>;

    /// Delete a conversation.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if no conversation has this id.
    async fn delete(&self, id: &str) -> StoreResult<()>;

    /// List stored conversations, most recently updated first.
    async fn list(&self) -> StoreResult<Vec<ConversationSummary>>;
}

// ═══════════════════════════════════════════════════════════════════════
//  In-memory store
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
struct StoredConversation {
    conversation: Conversation,
    created_at: i64,
    updated_at: i64,
}

/// DashMap-backed store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryConversationStore {
    entries: DashMap<String, StoredConversation>,
}

impl MemoryConversationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored conversations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl ConversationStore for MemoryConversationStore {
    async fn get(&self, id: &str) -> StoreResult<Conversation> {
        self.entries
            .get(id)
            .map(|entry| entry.conversation.clone())
            .ok_or_else(|| StoreError::NotFound {
                entity: "conversation",
                id: id.to_owned(),
            })
    }

    async fn put(&self, conversation: &Conversation) -> StoreResult<()> {
        let now = Utc::now().timestamp();
        let created_at = self
            .entries
            .get(&conversation.id)
            .map(|entry| entry.created_at)
            .unwrap_or(now);

        debug!(conversation_id = %conversation.id, "storing conversation");
        self.entries.insert(
            conversation.id.clone(),
            StoredConversation {
                conversation: conversation.clone(),
                created_at,
                updated_at: now,
            },
        );
        Ok(())
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        self.entries
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound {
                entity: "conversation",
                id: id.to_owned(),
            })
    }

    async fn list(&self) -> StoreResult<Vec<ConversationSummary>> {
        let mut summaries: Vec<ConversationSummary> = self
            .entries
            .iter()
            .map(|entry| ConversationSummary {
                id: entry.key().clone(),
                turn_count: entry.conversation.turns.len() as i64,
                updated_at: entry.updated_at,
            })
            .collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.id.cmp(&b.id)));
        Ok(summaries)
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  SQLite store
// ═══════════════════════════════════════════════════════════════════════

/// SQLite-backed store; turns are persisted as a JSON payload per row.
#[derive(Clone)]
pub struct SqliteConversationStore {
    db: Database,
}

impl SqliteConversationStore {
    /// Create a store backed by `db` (migrations must have run).
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ConversationStore for SqliteConversationStore {
    #[instrument(skip(self))]
    async fn get(&self, id: &str) -> StoreResult<Conversation> {
        let id = id.to_string();
        self.db
            .execute(move |conn| {
                let turns_json: String = conn
                    .query_row(
                        "SELECT turns FROM conversations WHERE id = ?1",
                        rusqlite::params![id],
                        |row| row.get(0),
                    )
                    .map_err(|e| match e {
                        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound {
                            entity: "conversation",
                            id: id.clone(),
                        },
                        other => StoreError::Sqlite(other),
                    })?;

                let turns: Vec<Turn> = serde_json::from_str(&turns_json)?;
                let mut conversation = Conversation::with_id(id.clone());
                conversation.turns = turns;
                Ok(conversation)
            })
            .await
    }

    #[instrument(skip(self, conversation), fields(conversation_id = %conversation.id))]
    async fn put(&self, conversation: &Conversation) -> StoreResult<()> {
        let id = conversation.id.clone();
        let turns_json = serde_json::to_string(&conversation.turns)?;
        let turn_count = conversation.turns.len() as i64;
        let now = Utc::now().timestamp();

        self.db
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO conversations (id, turns, turn_count, created_at, updated_at) \
                     VALUES (?1, ?2, ?3, ?4, ?4) \
                     ON CONFLICT(id) DO UPDATE SET \
                         turns = excluded.turns, \
                         turn_count = excluded.turn_count, \
                         updated_at = excluded.updated_at",
                    rusqlite::params![id, turns_json, turn_count, now],
                )?;
                Ok(())
            })
            .await
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str) -> StoreResult<()> {
        let id = id.to_string();
        self.db
            .execute(move |conn| {
                let deleted = conn.execute(
                    "DELETE FROM conversations WHERE id = ?1",
                    rusqlite::params![id],
                )?;
                if deleted == 0 {
                    return Err(StoreError::NotFound {
                        entity: "conversation",
                        id,
                    });
                }
                Ok(())
            })
            .await
    }

    #[instrument(skip(self))]
    async fn list(&self) -> StoreResult<Vec<ConversationSummary>> {
        self.db
            .execute(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, turn_count, updated_at FROM conversations \
                     ORDER BY updated_at DESC, id ASC",
                )?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok(ConversationSummary {
                            id: row.get(0)?,
                            turn_count: row.get(1)?,
                            updated_at: row.get(2)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
    }
}

// ── tests ────────────────────────────────────────────────────────────
