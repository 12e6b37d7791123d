use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{Post, Vote, VoteMutation},
    store::VoteStore,
};

/// Applies `requested` to `post`'s counters given the caller's `existing`
/// vote, and returns what has to happen to the caller's vote record.
///
/// Casting the vote already held retracts it; casting the other one
/// switches. Counters only fail to move when they already disagree with the
/// vote records, which surfaces as [`AppError::InvariantViolation`].
pub fn reconcile(requested: Vote, existing: Option<Vote>, post: &mut Post) -> Result<VoteMutation> {
    let mutation = match (existing, requested) {
        (None, Vote::Like) => {
            post.add_like();
            VoteMutation::Insert(Vote::Like)
        }
        (None, Vote::Dislike) => {
            post.add_dislike();
            VoteMutation::Insert(Vote::Dislike)
        }
        (Some(Vote::Like), Vote::Like) => {
            post.delete_like()?;
            VoteMutation::Delete
        }
        (Some(Vote::Like), Vote::Dislike) => {
            post.delete_like()?;
            post.add_dislike();
            VoteMutation::Update(Vote::Dislike)
        }
        (Some(Vote::Dislike), Vote::Dislike) => {
            post.delete_dislike()?;
            VoteMutation::Delete
        }
        (Some(Vote::Dislike), Vote::Like) => {
            post.delete_dislike()?;
            post.add_like();
            VoteMutation::Update(Vote::Like)
        }
    };

    Ok(mutation)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteOutcome {
    pub user_vote: Option<Vote>,
    pub post: Post,
}

/// Load, reconcile and persist one vote inside a single vote transaction.
/// Nothing is written unless every step succeeds.
pub async fn cast_vote(
    store: &dyn VoteStore,
    user_id: Uuid,
    post_id: Uuid,
    requested: Vote,
) -> Result<VoteOutcome> {
    let mut tx = store.begin().await?;

    let mut post = tx
        .find_post_for_update(post_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    let existing = tx.find_vote(user_id, post_id).await?;
    let mutation = reconcile(requested, existing, &mut post)?;

    tracing::debug!(
        %user_id,
        %post_id,
        ?existing,
        ?requested,
        ?mutation,
        "Reconciled vote"
    );

    match mutation {
        VoteMutation::Insert(vote) => tx.insert_vote(user_id, post_id, vote).await?,
        VoteMutation::Update(vote) => tx.update_vote(user_id, post_id, vote).await?,
        VoteMutation::Delete => tx.delete_vote(user_id, post_id).await?,
    }
    tx.save_post(&post).await?;
    tx.commit().await?;

    Ok(VoteOutcome {
        user_vote: mutation.resulting_vote(),
        post,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use super::*;
    use crate::models::User;
    use crate::store::{MemoryStore, PostStore, UserStore};

    fn post_with(likes: i32, dislikes: i32) -> Post {
        let mut post = Post::new(Uuid::new_v4(), "post".to_string());
        post.likes = likes;
        post.dislikes = dislikes;
        post
    }

    fn counters(post: &Post) -> (i32, i32) {
        (post.likes, post.dislikes)
    }

    #[test]
    fn first_like_inserts_and_counts() {
        let mut post = post_with(3, 1);
        let mutation = reconcile(Vote::Like, None, &mut post).unwrap();
        assert_eq!(counters(&post), (4, 1));
        assert_eq!(mutation, VoteMutation::Insert(Vote::Like));
    }

    #[test]
    fn first_dislike_inserts_and_counts() {
        let mut post = post_with(3, 1);
        let mutation = reconcile(Vote::Dislike, None, &mut post).unwrap();
        assert_eq!(counters(&post), (3, 2));
        assert_eq!(mutation, VoteMutation::Insert(Vote::Dislike));
    }

    #[test]
    fn repeated_dislike_retracts() {
        let mut post = post_with(4, 2);
        let mutation = reconcile(Vote::Dislike, Some(Vote::Dislike), &mut post).unwrap();
        assert_eq!(counters(&post), (4, 1));
        assert_eq!(mutation, VoteMutation::Delete);
    }

    #[test]
    fn like_to_dislike_switches() {
        let mut post = post_with(5, 0);
        let mutation = reconcile(Vote::Dislike, Some(Vote::Like), &mut post).unwrap();
        assert_eq!(counters(&post), (4, 1));
        assert_eq!(mutation, VoteMutation::Update(Vote::Dislike));
    }

    #[test]
    fn every_transition_matches_the_table() {
        use Vote::*;
        let rows = [
            (None, Like, (11, 10), VoteMutation::Insert(Like)),
            (None, Dislike, (10, 11), VoteMutation::Insert(Dislike)),
            (Some(Like), Like, (9, 10), VoteMutation::Delete),
            (Some(Like), Dislike, (9, 11), VoteMutation::Update(Dislike)),
            (Some(Dislike), Dislike, (10, 9), VoteMutation::Delete),
            (Some(Dislike), Like, (11, 9), VoteMutation::Update(Like)),
        ];

        // forwards and backwards over fresh snapshots
        for (existing, requested, expected, expected_mutation) in
            rows.iter().chain(rows.iter().rev())
        {
            let mut post = post_with(10, 10);
            let mutation = reconcile(*requested, *existing, &mut post).unwrap();
            assert_eq!(counters(&post), *expected, "{existing:?} -> {requested:?}");
            assert_eq!(mutation, *expected_mutation, "{existing:?} -> {requested:?}");
        }
    }

    #[test]
    fn repeat_returns_to_baseline() {
        for vote in [Vote::Like, Vote::Dislike] {
            let mut post = post_with(2, 7);
            let first = reconcile(vote, None, &mut post).unwrap();
            let second = reconcile(vote, first.resulting_vote(), &mut post).unwrap();
            assert_eq!(counters(&post), (2, 7));
            assert_eq!(second, VoteMutation::Delete);
        }
    }

    #[test]
    fn like_then_dislike_nets_one_dislike() {
        let mut post = post_with(0, 0);
        let first = reconcile(Vote::Like, None, &mut post).unwrap();
        let second = reconcile(Vote::Dislike, first.resulting_vote(), &mut post).unwrap();
        assert_eq!(counters(&post), (0, 1));
        assert_eq!(second, VoteMutation::Update(Vote::Dislike));
    }

    #[test]
    fn stale_vote_record_is_an_invariant_violation() {
        let mut post = post_with(0, 3);
        let err = reconcile(Vote::Like, Some(Vote::Like), &mut post).unwrap_err();
        assert!(matches!(err, AppError::InvariantViolation(_)));
        assert_eq!(counters(&post), (0, 3));
    }

    /// Replays every sequence of four votes cast by up to three users and
    /// checks the counters against the surviving records after each step.
    #[test]
    fn counters_track_records_for_all_short_sequences() {
        const USERS: usize = 3;
        const STEPS: u32 = 4;
        let choices = USERS * 2;

        for seq in 0..choices.pow(STEPS) {
            let mut post = post_with(0, 0);
            let mut records: HashMap<usize, Vote> = HashMap::new();
            let mut code = seq;

            for _ in 0..STEPS {
                let pick = code % choices;
                code /= choices;
                let user = pick / 2;
                let vote = if pick % 2 == 0 { Vote::Like } else { Vote::Dislike };

                let existing = records.get(&user).copied();
                match reconcile(vote, existing, &mut post).unwrap() {
                    VoteMutation::Insert(v) | VoteMutation::Update(v) => {
                        records.insert(user, v);
                    }
                    VoteMutation::Delete => {
                        records.remove(&user);
                    }
                }

                let likes = records.values().filter(|v| **v == Vote::Like).count() as i32;
                let dislikes = records.values().filter(|v| **v == Vote::Dislike).count() as i32;
                assert_eq!(counters(&post), (likes, dislikes), "sequence {seq}");
                assert!(post.likes >= 0 && post.dislikes >= 0);
            }
        }
    }

    async fn seeded_store() -> (MemoryStore, Post) {
        let store = MemoryStore::new();
        let author = User::new(
            "Author".to_string(),
            "author@example.com".to_string(),
            "hash".to_string(),
        );
        store.insert_user(&author).await.unwrap();
        let post = Post::new(author.id, "vote on me".to_string());
        store.insert_post(&post).await.unwrap();
        (store, post)
    }

    #[tokio::test]
    async fn cast_vote_persists_counters_and_record() {
        let (store, post) = seeded_store().await;
        let voter = Uuid::new_v4();

        let outcome = cast_vote(&store, voter, post.id, Vote::Like).await.unwrap();
        assert_eq!(outcome.user_vote, Some(Vote::Like));
        assert_eq!(counters(&outcome.post), (1, 0));

        let stored = store.find_post_by_id(post.id).await.unwrap().unwrap();
        assert_eq!(counters(&stored), (1, 0));
        assert_eq!(store.votes_for_post(post.id).await.get(&voter), Some(&Vote::Like));

        let outcome = cast_vote(&store, voter, post.id, Vote::Like).await.unwrap();
        assert_eq!(outcome.user_vote, None);
        let stored = store.find_post_by_id(post.id).await.unwrap().unwrap();
        assert_eq!(counters(&stored), (0, 0));
        assert!(store.votes_for_post(post.id).await.is_empty());
    }

    #[tokio::test]
    async fn cast_vote_on_missing_post_is_not_found() {
        let (store, post) = seeded_store().await;

        let err = cast_vote(&store, Uuid::new_v4(), Uuid::new_v4(), Vote::Dislike)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let stored = store.find_post_by_id(post.id).await.unwrap().unwrap();
        assert_eq!(counters(&stored), (0, 0));
    }

    #[tokio::test]
    async fn failed_cast_vote_leaves_no_partial_write() {
        let (store, post) = seeded_store().await;
        let voter = Uuid::new_v4();

        // A record whose counter was never bumped.
        let mut tx = store.begin().await.unwrap();
        tx.insert_vote(voter, post.id, Vote::Like).await.unwrap();
        tx.commit().await.unwrap();

        let err = cast_vote(&store, voter, post.id, Vote::Dislike)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvariantViolation(_)));

        let stored = store.find_post_by_id(post.id).await.unwrap().unwrap();
        assert_eq!(counters(&stored), (0, 0));
        assert_eq!(store.votes_for_post(post.id).await.get(&voter), Some(&Vote::Like));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_votes_keep_counters_consistent() {
        let (store, post) = seeded_store().await;
        let store = Arc::new(store);
        let voters: Vec<Uuid> = (0..16).map(|_| Uuid::new_v4()).collect();

        let mut handles = Vec::new();
        for (i, voter) in voters.iter().copied().enumerate() {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let first = if i % 2 == 0 { Vote::Like } else { Vote::Dislike };
                cast_vote(store.as_ref(), voter, post.id, first).await?;
                if i % 3 == 0 {
                    cast_vote(store.as_ref(), voter, post.id, Vote::Dislike).await?;
                }
                Ok::<_, AppError>(())
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let records = store.votes_for_post(post.id).await;
        let likes = records.values().filter(|v| **v == Vote::Like).count() as i32;
        let dislikes = records.values().filter(|v| **v == Vote::Dislike).count() as i32;
        let stored = store.find_post_by_id(post.id).await.unwrap().unwrap();
        assert_eq!(counters(&stored), (likes, dislikes));
        assert_eq!(likes + dislikes, records.len() as i32);
    }
}
