pub mod apply;
pub mod init;
pub mod inspect;

pub use apply::apply_command;
pub use init::init_command;
pub use inspect::inspect_command;
