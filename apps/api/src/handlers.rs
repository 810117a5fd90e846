pub mod health;
pub mod wipeout;
