pub mod account;
pub mod pull;
pub mod resources;
pub mod saves;
pub mod sync;
