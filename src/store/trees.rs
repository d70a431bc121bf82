pub const USERS: &str = "users";
pub const CHECKPOINTS: &str = "checkpoints";
pub const META: &str = "meta";
