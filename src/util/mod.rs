pub mod env;
pub mod extractor;
pub mod fp;
pub mod html;
pub mod maybe;
pub mod time;
