pub mod blog_article;
pub mod client;
pub mod delivery_attempt;
pub mod mailing;
pub mod mailing_client;
pub mod message;
pub mod user;
