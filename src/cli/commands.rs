use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Compiles staging and run requests into scheduler recipes
#[derive(Parser, Debug)]
#[command(
    name = "recipe-compiler",
    about = "Compiles staging and run requests into scheduler recipes",
    version,
    author,
    long_about = "recipe-compiler turns a resolved staging or run context into the recipe \
                  the container scheduler executes. It also classifies scheduler failure \
                  messages and normalizes container image references."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Build a staging recipe",
        long_about = "Reads a staging context (JSON) and prints the staging recipe.\n\n\
                      Examples:\n  \
                      recipe-compiler stage --input staging.json\n  \
                      recipe-compiler stage --config recipe.yaml --input staging.json --format yaml"
    )]
    Stage(RecipeArgs),

    #[command(
        about = "Build a task or process recipe",
        long_about = "Reads a run context (JSON) and prints the task or long-running process recipe.\n\n\
                      Examples:\n  \
                      recipe-compiler run --input task.json\n  \
                      recipe-compiler run --config recipe.yaml --input web.json -o recipe.json"
    )]
    Run(RecipeArgs),

    #[command(about = "Classify a scheduler failure message")]
    Classify(ClassifyArgs),

    #[command(about = "Normalize a container image reference")]
    Image(ImageArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct RecipeArgs {
    #[arg(
        short = 'c',
        long,
        value_name = "FILE",
        help = "YAML configuration file (defaults apply when omitted)"
    )]
    pub config: Option<PathBuf>,

    #[arg(short = 'i', long, value_name = "FILE", help = "JSON context file")]
    pub input: PathBuf,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "json",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Write output to file instead of stdout"
    )]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct ClassifyArgs {
    #[arg(value_name = "MESSAGE", help = "Failure message reported by the scheduler")]
    pub message: String,

    #[arg(short = 'f', long, value_enum, default_value = "json")]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct ImageArgs {
    #[arg(value_name = "REFERENCE", help = "Image reference, e.g. registry:5000/team/app:v2")]
    pub reference: String,

    #[arg(short = 'f', long, value_enum, default_value = "json")]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
        }
    }
}
