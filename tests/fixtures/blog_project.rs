use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A blog post.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Unique id
    #[serde(skip_deserializing)]
    pub id: u64,
    pub title: String,
    pub body: Option<String>,
    pub author: Author,
    pub tags: Vec<String>,
    #[api_field(since_version = "2.0")]
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize)]
pub struct Author {
    pub name: String,
}

#[derive(Deserialize, Validate)]
pub struct PostForm {
    #[validate(length(min = 3, max = 120))]
    pub title: String,
    pub body: Option<String>,
}

/// List posts, newest first.
#[api_doc(
    resource,
    section = "Blog",
    resource_description = "Operations on posts",
    output = "array<Post> as posts",
    filter(name = "page", data_type = "integer", description = "Page number"),
)]
#[get("/api/posts")]
pub async fn list_posts() {}

/// Show a post.
///
/// # Arguments
///
/// * `id` - Post identifier
#[api_doc(
    section = "Blog",
    output = "Post",
    status(code = 200, description = "Returned when found"),
    status(code = 404, description = "Post not found"),
)]
#[get("/api/posts/{id}")]
pub async fn show_post() {}

#[api_doc(
    section = "Blog",
    description = "Create a post",
    input(class = "PostForm", param_type = "body"),
    output = "Post",
    status(code = 400, model(class = "PostForm", form_errors)),
)]
#[post("/api/posts")]
pub async fn create_post() {}

#[api_doc(description = "Health check")]
pub async fn health() {}

pub async fn undocumented() {}
