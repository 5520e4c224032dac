pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{CliArgs, ClassifyArgs, Commands, ImageArgs, OutputFormatArg, RecipeArgs};
pub use output::{OutputFormat, OutputFormatter};
