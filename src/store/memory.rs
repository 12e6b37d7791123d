use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{PostStore, UserStore, VoteStore, VoteTransaction};
use crate::{
    error::{AppError, Result},
    models::{Post, PostWithCreator, User, Vote},
};

#[derive(Debug, Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    posts: HashMap<Uuid, Post>,
    votes: HashMap<(Uuid, Uuid), Vote>,
}

/// Process-local store. Every operation takes the same lock, so a vote
/// transaction serializes against everything else for as long as it lives.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Vote records held on a post, keyed by user.
    pub async fn votes_for_post(&self, post_id: Uuid) -> HashMap<Uuid, Vote> {
        let state = self.state.lock().await;
        state
            .votes
            .iter()
            .filter(|((_, voted_post), _)| *voted_post == post_id)
            .map(|((user_id, _), vote)| (*user_id, *vote))
            .collect()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let state = self.state.lock().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.users.values().any(|u| u.email == user.email) {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn get_posts_with_creator_name(&self) -> Result<Vec<PostWithCreator>> {
        let state = self.state.lock().await;
        let mut posts: Vec<PostWithCreator> = state
            .posts
            .values()
            .filter_map(|post| {
                state.users.get(&post.creator_id).map(|user| PostWithCreator {
                    post: post.clone(),
                    creator_name: user.name.clone(),
                })
            })
            .collect();
        posts.sort_by(|a, b| b.post.created_at.cmp(&a.post.created_at));
        Ok(posts)
    }

    async fn find_post_by_id(&self, post_id: Uuid) -> Result<Option<Post>> {
        let state = self.state.lock().await;
        Ok(state.posts.get(&post_id).cloned())
    }

    async fn insert_post(&self, post: &Post) -> Result<()> {
        let mut state = self.state.lock().await;
        state.posts.insert(post.id, post.clone());
        Ok(())
    }

    async fn update_post(&self, post: &Post) -> Result<()> {
        let mut state = self.state.lock().await;
        let stored = state
            .posts
            .get_mut(&post.id)
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;
        stored.content = post.content.clone();
        stored.updated_at = post.updated_at;
        Ok(())
    }

    async fn delete_post_by_id(&self, post_id: Uuid) -> Result<()> {
        let mut state = self.state.lock().await;
        state.posts.remove(&post_id);
        state.votes.retain(|(_, voted_post), _| *voted_post != post_id);
        Ok(())
    }
}

#[async_trait]
impl VoteStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn VoteTransaction>> {
        let guard = self.state.clone().lock_owned().await;
        Ok(Box::new(MemoryVoteTransaction {
            guard,
            staged_counters: HashMap::new(),
            staged_votes: HashMap::new(),
        }))
    }
}

/// Holds the store lock and stages writes next to it; reads see the staged
/// rows first. `commit` applies them, dropping the transaction discards them.
pub struct MemoryVoteTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    staged_counters: HashMap<Uuid, (i32, i32)>,
    // `None` stages a removal.
    staged_votes: HashMap<(Uuid, Uuid), Option<Vote>>,
}

impl MemoryVoteTransaction {
    fn current_vote(&self, key: (Uuid, Uuid)) -> Option<Vote> {
        match self.staged_votes.get(&key) {
            Some(staged) => *staged,
            None => self.guard.votes.get(&key).copied(),
        }
    }
}

#[async_trait]
impl VoteTransaction for MemoryVoteTransaction {
    async fn find_post_for_update(&mut self, post_id: Uuid) -> Result<Option<Post>> {
        let post = self.guard.posts.get(&post_id).cloned().map(|mut post| {
            if let Some(&(likes, dislikes)) = self.staged_counters.get(&post_id) {
                post.likes = likes;
                post.dislikes = dislikes;
            }
            post
        });
        Ok(post)
    }

    async fn find_vote(&mut self, user_id: Uuid, post_id: Uuid) -> Result<Option<Vote>> {
        Ok(self.current_vote((user_id, post_id)))
    }

    async fn insert_vote(&mut self, user_id: Uuid, post_id: Uuid, vote: Vote) -> Result<()> {
        if self.current_vote((user_id, post_id)).is_some() {
            return Err(AppError::InvariantViolation(format!(
                "user {user_id} already has a vote on post {post_id}"
            )));
        }
        self.staged_votes.insert((user_id, post_id), Some(vote));
        Ok(())
    }

    async fn update_vote(&mut self, user_id: Uuid, post_id: Uuid, vote: Vote) -> Result<()> {
        if self.current_vote((user_id, post_id)).is_none() {
            return Err(AppError::InvariantViolation(format!(
                "no vote to update for user {user_id} on post {post_id}"
            )));
        }
        self.staged_votes.insert((user_id, post_id), Some(vote));
        Ok(())
    }

    async fn delete_vote(&mut self, user_id: Uuid, post_id: Uuid) -> Result<()> {
        if self.current_vote((user_id, post_id)).is_none() {
            return Err(AppError::InvariantViolation(format!(
                "no vote to delete for user {user_id} on post {post_id}"
            )));
        }
        self.staged_votes.insert((user_id, post_id), None);
        Ok(())
    }

    async fn save_post(&mut self, post: &Post) -> Result<()> {
        if self.guard.posts.contains_key(&post.id) {
            self.staged_counters.insert(post.id, (post.likes, post.dislikes));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryVoteTransaction {
            mut guard,
            staged_counters,
            staged_votes,
        } = *self;

        for (post_id, (likes, dislikes)) in staged_counters {
            if let Some(stored) = guard.posts.get_mut(&post_id) {
                stored.likes = likes;
                stored.dislikes = dislikes;
            }
        }
        for (key, vote) in staged_votes {
            match vote {
                Some(vote) => {
                    guard.votes.insert(key, vote);
                }
                None => {
                    guard.votes.remove(&key);
                }
            }
        }
        Ok(())
    }
}
