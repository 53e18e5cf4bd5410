pub mod blog_api;
pub mod blog_page;
