//! Delegated catalog credentials and the identity session that mints them

pub mod providers;
pub mod storage;
pub mod token;
pub mod token_cache;

pub use providers::{CallbackTokens, IdentityClient, SessionRefresher};
pub use storage::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use token::TokenPair;
pub use token_cache::TokenCache;
