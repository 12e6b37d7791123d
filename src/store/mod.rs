//! Persistence ports and their adapters.
//!
//! Handlers and services only see the traits below; `AppState` holds one
//! handle per port, all backed by the store chosen at startup.
use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::Result,
    models::{Post, PostWithCreator, User, Vote},
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn insert_user(&self, user: &User) -> Result<()>;
}

#[async_trait]
pub trait PostStore: Send + Sync {
    /// Every post joined with its creator's name, newest first.
    async fn get_posts_with_creator_name(&self) -> Result<Vec<PostWithCreator>>;

    async fn find_post_by_id(&self, post_id: Uuid) -> Result<Option<Post>>;

    async fn insert_post(&self, post: &Post) -> Result<()>;

    async fn update_post(&self, post: &Post) -> Result<()>;

    /// Removes the post together with its vote records.
    async fn delete_post_by_id(&self, post_id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait VoteStore: Send + Sync {
    /// Opens a unit of work for one cast vote. Writes become visible only on
    /// [`VoteTransaction::commit`]; dropping the transaction discards them.
    async fn begin(&self) -> Result<Box<dyn VoteTransaction>>;
}

/// Reads and writes of a single cast vote.
///
/// `find_post_for_update` locks the post until the transaction ends, so two
/// votes on the same post never compute counters from the same snapshot.
#[async_trait]
pub trait VoteTransaction: Send {
    async fn find_post_for_update(&mut self, post_id: Uuid) -> Result<Option<Post>>;

    async fn find_vote(&mut self, user_id: Uuid, post_id: Uuid) -> Result<Option<Vote>>;

    async fn insert_vote(&mut self, user_id: Uuid, post_id: Uuid, vote: Vote) -> Result<()>;

    async fn update_vote(&mut self, user_id: Uuid, post_id: Uuid, vote: Vote) -> Result<()>;

    async fn delete_vote(&mut self, user_id: Uuid, post_id: Uuid) -> Result<()>;

    /// Writes the post's counters.
    async fn save_post(&mut self, post: &Post) -> Result<()>;

    async fn commit(self: Box<Self>) -> Result<()>;
}
