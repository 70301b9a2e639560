pub mod admins;
pub mod events;
pub mod handlers;
pub mod session;
