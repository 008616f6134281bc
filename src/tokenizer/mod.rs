pub mod client;
pub mod process;

pub use self::client::{SpacyEntity, SpacyResolution, TcpTokenizerClient, TokenizerClient};
pub use self::process::{kill_process_tree, TokenizerProcess};
