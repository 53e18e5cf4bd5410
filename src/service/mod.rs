pub mod author_service;
pub mod category_service;
pub mod post_service;
pub mod render_service;
pub mod tag_service;
