pub mod checkpoints;
pub mod users;
