//! Subcommand handlers
//!
//! Each handler returns the process exit code. File and parse failures carry
//! `anyhow` context naming the path; recipe errors are logged with their kind.

use super::commands::{ClassifyArgs, ImageArgs, RecipeArgs};
use super::output::OutputFormatter;
use crate::config::RecipeConfig;
use crate::error::RecipeError;
use crate::failure::FailureClassifier;
use crate::image::ImageReferenceParser;
use crate::model::{RunContext, StagingContext};
use crate::recipe::RecipeBuilder;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::fs;
use std::path::Path;
use tracing::{debug, error, info};

pub fn handle_stage(args: &RecipeArgs) -> i32 {
    exit_code(stage(args))
}

pub fn handle_run(args: &RecipeArgs) -> i32 {
    exit_code(run(args))
}

pub fn handle_classify(args: &ClassifyArgs) -> i32 {
    let reason = FailureClassifier.classify(&args.message);
    exit_code(OutputFormatter::new(args.format.into()).write(&reason, None))
}

pub fn handle_image(args: &ImageArgs) -> i32 {
    exit_code(image(args))
}

fn stage(args: &RecipeArgs) -> Result<()> {
    let builder = RecipeBuilder::new(load_config(args.config.as_deref())?);
    let context: StagingContext = read_input(&args.input)?;

    let recipe = builder.build_staging_recipe(&context)?;
    info!(guid = %recipe.guid, "staging recipe built");

    OutputFormatter::new(args.format.into()).write(&recipe, args.output.as_deref())
}

fn run(args: &RecipeArgs) -> Result<()> {
    let builder = RecipeBuilder::new(load_config(args.config.as_deref())?);
    let context: RunContext = read_input(&args.input)?;

    let recipe = builder.build_run_recipe(&context)?;
    info!(guid = %recipe.guid, log_source = %recipe.log_source, "run recipe built");

    OutputFormatter::new(args.format.into()).write(&recipe, args.output.as_deref())
}

fn image(args: &ImageArgs) -> Result<()> {
    let reference = ImageReferenceParser::new().parse(&args.reference)?;
    let output = json!({
        "reference": reference.to_string(),
        "host": reference.host,
        "path": reference.path,
        "tag": reference.tag,
    });
    OutputFormatter::new(args.format.into()).write(&output, None)
}

/// Loads the YAML config (or defaults), then applies `RECIPE_*` overrides and validates
pub fn load_config(path: Option<&Path>) -> Result<RecipeConfig> {
    let mut config = match path {
        Some(path) => RecipeConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => RecipeConfig::default(),
    };
    config.apply_env_overrides();
    config.validate().context("Invalid configuration")?;
    debug!("Configuration: {}", config);
    Ok(config)
}

fn read_input<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse input file {}", path.display()))
}

fn exit_code(result: Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            if let Some(recipe_error) = e.downcast_ref::<RecipeError>() {
                error!(
                    kind = ?recipe_error.kind(),
                    retryable = recipe_error.is_retryable(),
                    "recipe compilation failed"
                );
            }
            eprintln!("Error: {:#}", e);
            1
        }
    }
}
