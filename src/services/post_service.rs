use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::{AppError, Result},
    models::{Post, PostResponse},
    store::PostStore,
};

pub async fn get_posts(store: &dyn PostStore) -> Result<Vec<PostResponse>> {
    let posts = store.get_posts_with_creator_name().await?;
    Ok(posts.into_iter().map(PostResponse::from).collect())
}

pub async fn create_post(
    store: &dyn PostStore,
    author: &AuthUser,
    content: String,
) -> Result<Post> {
    let post = Post::new(author.user_id, content);
    store.insert_post(&post).await?;

    tracing::info!(post_id = %post.id, creator_id = %author.user_id, "Post created");

    Ok(post)
}

pub async fn edit_post(
    store: &dyn PostStore,
    editor: &AuthUser,
    post_id: Uuid,
    content: String,
) -> Result<Post> {
    let mut post = store
        .find_post_by_id(post_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    if post.creator_id != editor.user_id {
        return Err(AppError::Authorization(
            "Only the creator can edit this post".to_string(),
        ));
    }

    post.set_content(content);
    store.update_post(&post).await?;

    Ok(post)
}

pub async fn delete_post(store: &dyn PostStore, caller: &AuthUser, post_id: Uuid) -> Result<()> {
    let post = store
        .find_post_by_id(post_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    if !caller.is_admin() && post.creator_id != caller.user_id {
        return Err(AppError::Authorization(
            "Only an admin or the creator can delete this post".to_string(),
        ));
    }

    store.delete_post_by_id(post_id).await?;

    tracing::info!(%post_id, deleted_by = %caller.user_id, "Post deleted");

    Ok(())
}
