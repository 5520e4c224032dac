use recipe_compiler::cli::commands::{CliArgs, Commands};
use recipe_compiler::cli::handlers::{handle_classify, handle_image, handle_run, handle_stage};
use recipe_compiler::util::logging::{config_from_env, init_logging, parse_level};
use recipe_compiler::VERSION;

use clap::Parser;
use tracing::{debug, Level};

fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("recipe-compiler v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Stage(stage_args) => handle_stage(stage_args),
        Commands::Run(run_args) => handle_run(run_args),
        Commands::Classify(classify_args) => handle_classify(classify_args),
        Commands::Image(image_args) => handle_image(image_args),
    };

    std::process::exit(exit_code);
}

/// Flags win over `RECIPE_LOG_LEVEL`; `RECIPE_LOG_JSON` is always honored
fn init_logging_from_args(args: &CliArgs) {
    let mut config = config_from_env();

    if let Some(level_str) = &args.log_level {
        config.level = parse_level(level_str);
    } else if args.verbose {
        config.level = Level::DEBUG;
    } else if args.quiet {
        config.level = Level::ERROR;
    }

    init_logging(config);
}
