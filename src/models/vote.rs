use serde::{Deserialize, Serialize};

/// A user's choice on a post. "No vote" is the absence of a record, never a
/// third variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vote {
    Like,
    Dislike,
}

impl Vote {
    pub fn from_like(like: bool) -> Self {
        if like { Vote::Like } else { Vote::Dislike }
    }

    // Storage encoding: 1 = like, 0 = dislike
    pub fn as_flag(self) -> i16 {
        match self {
            Vote::Like => 1,
            Vote::Dislike => 0,
        }
    }

    pub fn from_flag(flag: i16) -> Option<Self> {
        match flag {
            1 => Some(Vote::Like),
            0 => Some(Vote::Dislike),
            _ => None,
        }
    }
}

/// What the vote store has to do with the (user, post) record after a vote
/// has been reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteMutation {
    Insert(Vote),
    Update(Vote),
    Delete,
}

impl VoteMutation {
    /// The vote the user holds once the mutation is applied.
    pub fn resulting_vote(self) -> Option<Vote> {
        match self {
            VoteMutation::Insert(vote) | VoteMutation::Update(vote) => Some(vote),
            VoteMutation::Delete => None,
        }
    }
}

// Like or dislike request
#[derive(Debug, Deserialize)]
pub struct LikeOrDislikeRequest {
    pub like: bool,
}

// Vote response
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoteResponse {
    pub user_vote: Option<Vote>,
    pub likes: i32,
    pub dislikes: i32,
}
