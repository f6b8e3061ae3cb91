mod serve;
mod sweep;
mod user;

pub use serve::cmd_serve;
pub use sweep::cmd_sweep;
pub use user::{cmd_user_add, cmd_user_list, cmd_user_rotate_key};
