pub mod forbidden;
pub mod health;
pub mod logout;
