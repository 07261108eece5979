mod init;
mod list;
mod rename;

pub use init::cmd_init_config;
pub use list::cmd_list;
pub use rename::cmd_rename;
