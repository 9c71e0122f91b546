use crate::comment::Comment;
use crate::session::{SessionId, SessionStore};

/// Comments kept in one visitor's session, as an ordered list per page key.
pub struct CommentsInSession<'a> {
    store: &'a SessionStore,
    session: &'a SessionId,
}

impl<'a> CommentsInSession<'a> {
    pub fn new(store: &'a SessionStore, session: &'a SessionId) -> Self {
        Self { store, session }
    }

    pub fn find_all(&self, page_key: &str) -> Vec<Comment> {
        self.store
            .existing(self.session, |data| data.comments.get(page_key).cloned())
            .flatten()
            .unwrap_or_default()
    }

    pub fn find_by_id(&self, page_key: &str, id: u32) -> Option<Comment> {
        self.store
            .existing(self.session, |data| {
                data.comments
                    .get(page_key)
                    .and_then(|list| list.iter().find(|c| c.id == id).cloned())
            })
            .flatten()
    }

    /// Appends the comment under its page key and returns the id it was given.
    pub fn add(&self, mut comment: Comment) -> u32 {
        self.store.with(self.session, |data| {
            let list = data.comments.entry(comment.page_key.clone()).or_default();
            let id = list.iter().map(|c| c.id).max().unwrap_or(0) + 1;
            comment.id = id;
            list.push(comment);
            id
        })
    }

    /// Replaces the stored comment with the same page key and id, keeping its
    /// position. Returns false when no such comment exists.
    pub fn edit(&self, comment: Comment) -> bool {
        self.store
            .existing(self.session, |data| {
                let Some(list) = data.comments.get_mut(&comment.page_key) else {
                    return false;
                };
                match list.iter_mut().find(|c| c.id == comment.id) {
                    Some(slot) => {
                        *slot = comment;
                        true
                    }
                    None => false,
                }
            })
            .unwrap_or(false)
    }

    pub fn delete(&self, page_key: &str, id: u32) -> bool {
        self.store
            .existing(self.session, |data| {
                let Some(list) = data.comments.get_mut(page_key) else {
                    return false;
                };
                let before = list.len();
                list.retain(|c| c.id != id);
                before != list.len()
            })
            .unwrap_or(false)
    }

    pub fn delete_all(&self, page_key: &str) -> usize {
        self.store
            .existing(self.session, |data| {
                data.comments.remove(page_key).map_or(0, |list| list.len())
            })
            .unwrap_or(0)
    }
}
