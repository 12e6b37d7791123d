use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, Result};

/// A post and its vote counters.
///
/// The counters are only changed through the `add_*`/`delete_*` methods,
/// which the vote reconciler drives.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Post {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub content: String,
    pub likes: i32,
    pub dislikes: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn new(creator_id: Uuid, content: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            creator_id,
            content,
            likes: 0,
            dislikes: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn set_content(&mut self, content: String) {
        self.content = content;
        self.updated_at = Utc::now();
    }

    pub fn add_like(&mut self) {
        self.likes += 1;
    }

    pub fn delete_like(&mut self) -> Result<()> {
        if self.likes <= 0 {
            return Err(AppError::InvariantViolation(format!(
                "post {} has no like to remove",
                self.id
            )));
        }
        self.likes -= 1;
        Ok(())
    }

    pub fn add_dislike(&mut self) {
        self.dislikes += 1;
    }

    pub fn delete_dislike(&mut self) -> Result<()> {
        if self.dislikes <= 0 {
            return Err(AppError::InvariantViolation(format!(
                "post {} has no dislike to remove",
                self.id
            )));
        }
        self.dislikes -= 1;
        Ok(())
    }
}

/// Row shape of the posts/users join used for listings.
#[derive(Debug, Clone, FromRow)]
pub struct PostWithCreator {
    #[sqlx(flatten)]
    pub post: Post,
    pub creator_name: String,
}

// Create post request
#[derive(Debug, Validate, Deserialize)]
pub struct CreatePostRequest {
    #[validate(length(min = 1, max = 280))]
    pub content: String,
}

// Edit post request
#[derive(Debug, Validate, Deserialize)]
pub struct EditPostRequest {
    #[validate(length(min = 1, max = 280))]
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PostCreator {
    pub id: Uuid,
    pub name: String,
}

// Post response with creator info
#[derive(Debug, Serialize, Deserialize)]
pub struct PostResponse {
    pub id: Uuid,
    pub content: String,
    pub likes: i32,
    pub dislikes: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub creator: PostCreator,
}

impl From<PostWithCreator> for PostResponse {
    fn from(row: PostWithCreator) -> Self {
        let PostWithCreator { post, creator_name } = row;
        Self {
            id: post.id,
            content: post.content,
            likes: post.likes,
            dislikes: post.dislikes,
            created_at: post.created_at,
            updated_at: post.updated_at,
            creator: PostCreator {
                id: post.creator_id,
                name: creator_name,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post_with(likes: i32, dislikes: i32) -> Post {
        let mut post = Post::new(Uuid::new_v4(), "hello".to_string());
        post.likes = likes;
        post.dislikes = dislikes;
        post
    }

    #[test]
    fn new_post_starts_with_zero_counters() {
        let post = Post::new(Uuid::new_v4(), "first".to_string());
        assert_eq!((post.likes, post.dislikes), (0, 0));
        assert_eq!(post.created_at, post.updated_at);
    }

    #[test]
    fn counters_move_independently() {
        let mut post = post_with(2, 2);
        post.add_like();
        post.delete_dislike().unwrap();
        assert_eq!((post.likes, post.dislikes), (3, 1));

        post.delete_like().unwrap();
        post.add_dislike();
        assert_eq!((post.likes, post.dislikes), (2, 2));
    }

    #[test]
    fn removing_from_empty_counter_is_an_invariant_violation() {
        let mut post = post_with(0, 0);

        let err = post.delete_like().unwrap_err();
        assert!(matches!(err, AppError::InvariantViolation(_)));
        let err = post.delete_dislike().unwrap_err();
        assert!(matches!(err, AppError::InvariantViolation(_)));

        assert_eq!((post.likes, post.dislikes), (0, 0));
    }

    #[test]
    fn set_content_bumps_updated_at() {
        let mut post = post_with(0, 0);
        let created = post.created_at;
        post.set_content("edited".to_string());
        assert_eq!(post.content, "edited");
        assert!(post.updated_at >= created);
        assert_eq!(post.created_at, created);
    }

    #[test]
    fn response_nests_creator() {
        let post = post_with(1, 0);
        let creator_id = post.creator_id;
        let response = PostResponse::from(PostWithCreator {
            post,
            creator_name: "Ana".to_string(),
        });
        assert_eq!(response.creator.id, creator_id);
        assert_eq!(response.creator.name, "Ana");
        assert_eq!(response.likes, 1);
    }
}
