//! Rich-text notes

use chrono::Utc;
use va_contracts::visitors::{CreateNoteContract, NoteInput};
use va_contracts::Contract;
use va_core::{Id, Owned, VaError, VaResult};
use va_models::Note;

use crate::context::ServiceContext;

pub struct NoteService {
    ctx: ServiceContext,
}

impl NoteService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn create(&self, owner: Id, input: NoteInput) -> VaResult<Note> {
        CreateNoteContract.validate(&input)?;
        let now = Utc::now();
        let note = Note {
            id: uuid::Uuid::new_v4(),
            title: input.title.unwrap_or_default().trim().to_string(),
            content_html: input.content_html.unwrap_or_default(),
            content_text: input.content_text.unwrap_or_default(),
            user_id: owner,
            created_at: now,
            updated_at: now,
        };
        Ok(self.ctx.stores.notes.insert(note).await?)
    }

    pub async fn list(&self, owner: Id) -> VaResult<Vec<Note>> {
        Ok(self.ctx.stores.notes.list_owned(owner).await?)
    }

    pub async fn get(&self, owner: Id, id: Id) -> VaResult<Note> {
        self.ctx
            .stores
            .notes
            .find_by_id(id)
            .await?
            .filter(|n| n.is_owned_by(owner))
            .ok_or_else(|| VaError::not_found("Note not found or not authorized"))
    }

    /// Blank fields in the input leave the stored value alone
    pub async fn edit(&self, owner: Id, id: Id, input: NoteInput) -> VaResult<Note> {
        let mut note = self.get(owner, id).await?;
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        if let Some(title) = present(input.title) {
            note.title = title.trim().to_string();
        }
        if let Some(html) = present(input.content_html) {
            note.content_html = html;
        }
        if let Some(text) = present(input.content_text) {
            note.content_text = text;
        }
        note.updated_at = Utc::now();
        Ok(self.ctx.stores.notes.update(&note).await?)
    }

    pub async fn delete(&self, owner: Id, id: Id) -> VaResult<()> {
        self.get(owner, id).await?;
        self.ctx.stores.notes.delete(id).await?;
        Ok(())
    }

    pub async fn find_by_title(&self, owner: Id, title: &str) -> VaResult<Vec<Note>> {
        Ok(self.ctx.stores.notes.search_title(owner, title.trim()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestContext;

    fn note(title: &str) -> NoteInput {
        NoteInput {
            title: Some(title.into()),
            content_html: Some(format!("<p>{title}</p>")),
            content_text: Some(title.into()),
        }
    }

    #[tokio::test]
    async fn test_note_lifecycle() {
        let t = TestContext::new();
        let owner = t.user("owner", "Olive Owner").await;
        let service = NoteService::new(t.ctx.clone());

        let err = service
            .create(owner.id, NoteInput { title: Some("x".into()), ..Default::default() })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Title, contentHtml, and contentText are required");

        let first = service.create(owner.id, note("Board minutes")).await.unwrap();
        service.create(owner.id, note("Travel plan")).await.unwrap();
        assert_eq!(service.list(owner.id).await.unwrap().len(), 2);
        assert_eq!(service.find_by_title(owner.id, "MINUTES").await.unwrap().len(), 1);
        assert!(service.find_by_title(owner.id, "budget").await.unwrap().is_empty());

        let edited = service
            .edit(owner.id, first.id, NoteInput { content_text: Some("Updated".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(edited.title, "Board minutes");
        assert_eq!(edited.content_text, "Updated");

        let stranger = t.user("stranger", "Sam Stranger").await;
        let err = service.get(stranger.id, first.id).await.unwrap_err();
        assert_eq!(err.to_string(), "Note not found or not authorized");

        service.delete(owner.id, first.id).await.unwrap();
        assert_eq!(service.list(owner.id).await.unwrap().len(), 1);
    }
}
