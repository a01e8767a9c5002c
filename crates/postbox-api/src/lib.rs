pub mod auth;
pub mod error;
pub mod guard;
pub mod identity;
pub mod messages;
pub mod middleware;
pub mod token;
pub mod users;

mod convert;

use std::sync::Arc;

use postbox_db::Database;

use crate::token::TokenAuthority;

pub struct AppStateInner {
    pub db: Database,
    pub tokens: TokenAuthority,
}

pub type AppState = Arc<AppStateInner>;
