use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};

use crate::{
    routes::models::{
        BlogPostResponse, BlogPostsResponse, BlogQuery, CreateBlogPostRequest, MessageResponse,
        SingleBlogPostResponse, UpdateBlogPostRequest,
    },
    services::blog,
    util::{require_admin, require_bearer},
    ApiError, AppState,
};

pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<BlogQuery>,
) -> Result<Json<BlogPostsResponse>, ApiError> {
    let posts = blog::list_posts(state.db_pool(), query.category.as_deref())
        .await
        .map_err(ApiError::from)?;

    Ok(Json(BlogPostsResponse {
        posts: posts.into_iter().map(BlogPostResponse::from).collect(),
    }))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<Json<SingleBlogPostResponse>, ApiError> {
    let post = blog::get_post(state.db_pool(), &post_id)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(SingleBlogPostResponse { post: post.into() }))
}

pub async fn create_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateBlogPostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let token = require_bearer(&headers)?;
    let (account, _) = state.authenticate(&token).await?;
    require_admin(&account)?;

    let post = blog::create_post(state.db_pool(), req)
        .await
        .map_err(ApiError::from)?;

    Ok((
        StatusCode::CREATED,
        Json(SingleBlogPostResponse { post: post.into() }),
    ))
}

pub async fn update_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<UpdateBlogPostRequest>,
) -> Result<Json<SingleBlogPostResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (account, _) = state.authenticate(&token).await?;
    require_admin(&account)?;

    let post = blog::update_post(state.db_pool(), &post_id, req)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(SingleBlogPostResponse { post: post.into() }))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (account, _) = state.authenticate(&token).await?;
    require_admin(&account)?;

    blog::delete_post(state.db_pool(), &post_id)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(MessageResponse {
        message: "Blog post deleted".to_string(),
    }))
}
