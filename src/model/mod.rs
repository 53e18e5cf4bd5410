pub mod author;
pub mod category;
pub mod post;
pub mod tag;
pub mod validator;
