//! Community feed endpoints.
//!
//! - `POST /api/posts` - publish (multipart: `text`, `post_type`, optional `image`)
//! - `POST /api/posts/:id/comments` - comment
//! - `POST /api/posts/:id/like` / `DELETE /api/posts/:id/like` - like, unlike
//! - `GET /api/communities/:id/posts` - feed with comments
//! - `GET /api/me/likes` - IDs of the posts the caller liked

use crate::WebResult;
use crate::error::AppError;
use crate::extractors::Actor;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use roomly_core::repository::{DataStore, ObjectStorage};
use roomly_core::types::{Comment, CommunityId, ParseTagError, Post, PostId, PostType};
use roomly_engine::feed::{FeedItem, NewPost};
use roomly_engine::{Rewarded, Upload};
use serde::{Deserialize, Serialize};

/// Request to comment on a post.
#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    /// Body
    pub text: String,
}

/// Like count after an unlike.
#[derive(Debug, Serialize)]
pub struct LikesResponse {
    /// Remaining likes on the post
    pub likes_count: i64,
}

/// Publish a post from a multipart form.
///
/// Fields: `text`, `post_type` (`GENERAL`, `AREA_PHOTO`, `BUG_REPORT`;
/// defaults to `GENERAL`) and an optional `image` file.
///
/// # Errors
///
/// 400 for a malformed form, 422 for an unknown post type or a post with
/// neither text nor image.
pub async fn create_post<S: DataStore, O: ObjectStorage>(
    Actor(actor): Actor,
    State(state): State<AppState<S, O>>,
    mut form: Multipart,
) -> WebResult<(StatusCode, Json<Rewarded<Post>>)> {
    let malformed = |e: axum::extract::multipart::MultipartError| {
        AppError::bad_request(format!("Malformed form: {e}"))
    };

    let mut post = NewPost {
        text: String::new(),
        post_type: PostType::General,
    };
    let mut image = None;

    while let Some(field) = form.next_field().await.map_err(malformed)? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("text") => post.text = field.text().await.map_err(malformed)?,
            Some("post_type") => {
                let tag = field.text().await.map_err(malformed)?;
                post.post_type = tag
                    .trim()
                    .parse()
                    .map_err(|e: ParseTagError| AppError::validation(e.to_string()))?;
            }
            Some("image") => {
                let file_name = field.file_name().unwrap_or("image").to_string();
                let bytes = field.bytes().await.map_err(malformed)?;
                if !bytes.is_empty() {
                    image = Some(Upload {
                        file_name,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            _ => {}
        }
    }

    let published = state.roomly.feed.create_post(actor, post, image).await?;
    Ok((StatusCode::CREATED, Json(published)))
}

/// Comment on a post.
///
/// # Errors
///
/// 422 for an empty comment, 404 for an unknown post.
pub async fn add_comment<S: DataStore, O: ObjectStorage>(
    Actor(actor): Actor,
    State(state): State<AppState<S, O>>,
    Path(post_id): Path<PostId>,
    Json(request): Json<CommentRequest>,
) -> WebResult<(StatusCode, Json<Rewarded<Comment>>)> {
    let comment = state
        .roomly
        .feed
        .add_comment(actor, post_id, &request.text)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// Like a post. The response carries the new like count.
///
/// # Errors
///
/// 404 for an unknown post, 409 if already liked.
pub async fn like_post<S: DataStore, O: ObjectStorage>(
    Actor(actor): Actor,
    State(state): State<AppState<S, O>>,
    Path(post_id): Path<PostId>,
) -> WebResult<Json<Rewarded<i64>>> {
    Ok(Json(state.roomly.feed.like_post(actor, post_id).await?))
}

/// Remove the caller's like.
///
/// # Errors
///
/// 409 `INVALID_STATE` if the caller had not liked the post.
pub async fn unlike_post<S: DataStore, O: ObjectStorage>(
    Actor(actor): Actor,
    State(state): State<AppState<S, O>>,
    Path(post_id): Path<PostId>,
) -> WebResult<Json<LikesResponse>> {
    let likes_count = state.roomly.feed.unlike_post(actor, post_id).await?;
    Ok(Json(LikesResponse { likes_count }))
}

/// A community's feed, newest first, each post with its comments.
///
/// # Errors
///
/// 500 on store failure.
pub async fn community_posts<S: DataStore, O: ObjectStorage>(
    State(state): State<AppState<S, O>>,
    Path(community_id): Path<CommunityId>,
) -> WebResult<Json<Vec<FeedItem>>> {
    Ok(Json(state.roomly.feed.community_posts(community_id).await?))
}

/// IDs of the posts the caller liked.
///
/// # Errors
///
/// 500 on store failure.
pub async fn liked_posts<S: DataStore, O: ObjectStorage>(
    Actor(actor): Actor,
    State(state): State<AppState<S, O>>,
) -> WebResult<Json<Vec<PostId>>> {
    Ok(Json(state.roomly.feed.liked_post_ids(actor).await?))
}
