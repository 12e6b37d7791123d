use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde_json::{Value, json};
use uuid::Uuid;
use validator::Validate;

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, Result},
    models::{
        CreatePostRequest, EditPostRequest, LikeOrDislikeRequest, PostResponse, Vote,
        VoteResponse,
    },
    services::{post_service, vote_service},
};

fn non_blank(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Post content must not be blank".to_string(),
        ));
    }
    Ok(())
}

pub async fn get_posts(
    State(state): State<AppState>,
    _auth_user: AuthUser,
) -> Result<Json<Vec<PostResponse>>> {
    let posts = post_service::get_posts(state.posts.as_ref()).await?;
    Ok(Json(posts))
}

pub async fn create_post(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    payload.validate()?;
    non_blank(&payload.content)?;

    let post = post_service::create_post(state.posts.as_ref(), &auth_user, payload.content).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Post created successfully",
            "post_id": post.id
        })),
    ))
}

pub async fn edit_post(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<EditPostRequest>,
) -> Result<Json<Value>> {
    payload.validate()?;
    non_blank(&payload.content)?;

    post_service::edit_post(state.posts.as_ref(), &auth_user, post_id, payload.content).await?;

    Ok(Json(json!({
        "message": "Post updated successfully"
    })))
}

pub async fn delete_post(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(post_id): Path<Uuid>,
) -> Result<Json<Value>> {
    post_service::delete_post(state.posts.as_ref(), &auth_user, post_id).await?;

    Ok(Json(json!({
        "message": "Post deleted successfully"
    })))
}

pub async fn like_or_dislike_post(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<LikeOrDislikeRequest>,
) -> Result<Json<VoteResponse>> {
    let outcome = vote_service::cast_vote(
        state.votes.as_ref(),
        auth_user.user_id,
        post_id,
        Vote::from_like(payload.like),
    )
    .await?;

    Ok(Json(VoteResponse {
        user_vote: outcome.user_vote,
        likes: outcome.post.likes,
        dislikes: outcome.post.dislikes,
    }))
}
