//! recipe-compiler - scheduler recipes for staging and running workloads
//!
//! Given an already-resolved staging or run context, this crate produces the
//! recipe a container scheduler executes: the lifecycle's action tree, resource
//! limits, network egress policy, placement, identity metadata and service
//! binding files. It also normalizes container image references and classifies
//! the failure messages the scheduler reports back.
//!
//! Every operation is a synchronous pure function over its inputs. Nothing here
//! performs I/O; download URLs, security groups and droplets are resolved by the
//! caller.
//!
//! # Example
//!
//! ```ignore
//! use recipe_compiler::{RecipeBuilder, RecipeConfig};
//!
//! let builder = RecipeBuilder::new(RecipeConfig::from_file("recipe.yaml")?);
//! let recipe = builder.build_staging_recipe(&staging_context)?;
//! println!("{}", serde_json::to_string_pretty(&recipe)?);
//! ```
//!
//! # Project Structure
//!
//! - [`lifecycle`]: buildpack, docker and cloud native buildpack strategies
//! - [`recipe`]: recipe types, the action tree and [`RecipeBuilder`]
//! - [`bindings`]: service binding files mounted into the container
//! - [`image`]: image reference normalization
//! - [`failure`]: scheduler failure classification

pub mod bindings;
pub mod cli;
pub mod config;
pub mod error;
pub mod failure;
pub mod image;
pub mod lifecycle;
pub mod model;
pub mod recipe;
pub mod util;

pub use bindings::{ServiceBindingFilesBuilder, ServiceBindingFileset};
pub use config::{ConfigError, RecipeConfig};
pub use error::{ErrorKind, RecipeError, SchemaError};
pub use failure::{FailureClassifier, FailureId, FailureReason};
pub use image::{ImageReference, ImageReferenceParser};
pub use lifecycle::{LifecycleProtocol, LifecycleStrategy, LifecycleType};
pub use model::{RunContext, StagingContext};
pub use recipe::{RecipeBuilder, SchedulerRecipe};
pub use util::{init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
