pub mod comments1;
pub mod comments2;
pub mod user;
