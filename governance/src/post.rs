//! Append-only per-DAO post log.

use caves_types::{AccountId, DaoId};
use serde::{Deserialize, Serialize};

use crate::error::GovernanceError;

/// A published post. Never mutated after creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub dao_id: DaoId,
    /// Position in the DAO's log, starting at 0.
    pub index: u64,
    pub title: String,
    pub body: String,
    /// Opaque references (content hashes, URLs), kept in the given order.
    pub attachments: Vec<String>,
    pub author: AccountId,
}

/// Body of a post before the log assigns it an index.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NewPost {
    pub title: String,
    pub body: String,
    pub attachments: Vec<String>,
}

impl NewPost {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            attachments: Vec::new(),
        }
    }

    pub fn with_attachments(mut self, attachments: Vec<String>) -> Self {
        self.attachments = attachments;
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct PostLog {
    posts: Vec<Post>,
}

impl PostLog {
    /// The post that appending `post` would produce, without appending it.
    pub fn draft(&self, dao_id: DaoId, post: NewPost, author: AccountId) -> Post {
        Post {
            dao_id,
            index: self.len(),
            title: post.title,
            body: post.body,
            attachments: post.attachments,
            author,
        }
    }

    /// Append a drafted post. Its index must be the current length.
    pub(crate) fn push(&mut self, post: Post) {
        debug_assert_eq!(post.index, self.len());
        self.posts.push(post);
    }

    /// Append a post and return its index (the previous length).
    pub fn append(&mut self, dao_id: DaoId, post: NewPost, author: AccountId) -> u64 {
        let post = self.draft(dao_id, post, author);
        let index = post.index;
        self.push(post);
        index
    }

    pub fn get(&self, dao_id: DaoId, index: u64) -> Result<&Post, GovernanceError> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.posts.get(i))
            .ok_or(GovernanceError::PostNotFound { dao_id, index })
    }

    pub fn len(&self) -> u64 {
        self.posts.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Post> {
        self.posts.iter()
    }
}
