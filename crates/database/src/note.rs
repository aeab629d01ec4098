//! Internal conversation notes.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::ConversationNote;

/// Add an internal note to a conversation.
pub async fn add_note(
    pool: &SqlitePool,
    tenant_id: i64,
    conversation_id: i64,
    author_id: i64,
    body: &str,
) -> Result<ConversationNote> {
    crate::conversation::get_conversation(pool, tenant_id, conversation_id).await?;

    let result = sqlx::query(
        r#"
        INSERT INTO conversation_notes (tenant_id, conversation_id, author_id, body)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(tenant_id)
    .bind(conversation_id)
    .bind(author_id)
    .bind(body)
    .execute(pool)
    .await?;

    get_note(pool, tenant_id, result.last_insert_rowid()).await
}

/// Get a note by id, scoped to the tenant.
pub async fn get_note(pool: &SqlitePool, tenant_id: i64, id: i64) -> Result<ConversationNote> {
    sqlx::query_as::<_, ConversationNote>(
        r#"
        SELECT id, tenant_id, conversation_id, author_id, body, created_at
        FROM conversation_notes
        WHERE id = ? AND tenant_id = ?
        "#,
    )
    .bind(id)
    .bind(tenant_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Note",
        id: id.to_string(),
    })
}

/// List a conversation's notes, oldest first.
pub async fn list_notes(
    pool: &SqlitePool,
    tenant_id: i64,
    conversation_id: i64,
) -> Result<Vec<ConversationNote>> {
    let notes = sqlx::query_as::<_, ConversationNote>(
        r#"
        SELECT id, tenant_id, conversation_id, author_id, body, created_at
        FROM conversation_notes
        WHERE conversation_id = ? AND tenant_id = ?
        ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(conversation_id)
    .bind(tenant_id)
    .fetch_all(pool)
    .await?;

    Ok(notes)
}

/// Delete a note.
pub async fn delete_note(pool: &SqlitePool, tenant_id: i64, id: i64) -> Result<()> {
    let result = sqlx::query(
        r#"
        DELETE FROM conversation_notes
        WHERE id = ? AND tenant_id = ?
        "#,
    )
    .bind(id)
    .bind(tenant_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Note",
            id: id.to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_db;

    #[tokio::test]
    async fn test_note_crud() {
        let db = test_db().await;
        let pool = db.pool();

        let conversation = crate::conversation::create_conversation(pool, 1, "whatsapp", None, 0)
            .await
            .unwrap();

        let note = add_note(pool, 1, conversation.id, 7, "call back tomorrow").await.unwrap();
        assert_eq!(note.author_id, 7);

        let notes = list_notes(pool, 1, conversation.id).await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].body, "call back tomorrow");

        delete_note(pool, 1, note.id).await.unwrap();
        assert!(list_notes(pool, 1, conversation.id).await.unwrap().is_empty());

        // Notes cannot be attached to another tenant's conversation.
        let foreign = add_note(pool, 2, conversation.id, 7, "nope").await;
        assert!(matches!(foreign, Err(DatabaseError::NotFound { .. })));
    }
}
