pub mod args;
pub mod handle;
pub mod install;
pub mod mayhemfile;
pub mod process;

pub use args::{ArgumentAssembler, Phase};
pub use handle::RunHandle;
pub use process::{CliProcess, CliRunner, CommandOutput};
