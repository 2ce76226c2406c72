pub mod reddit;
pub mod redgifs;

pub use reddit::{RedditCredentials, RedditSource};
pub use redgifs::RedgifsClient;
