//! AppBridge operator CLI
//!
//! Loads a component through the bridge and exercises it the way an
//! orchestrator would:
//!   appbridge inspect todo.wasm
//!   appbridge poll todo.wasm new-todos --store 0
//!   appbridge run todo.wasm http-post --input '{"url": "https://example.com"}'
//!   appbridge schema todo.wasm --trigger new-todos --output --identity me.json
//!
//! Results are printed to stdout as JSON; logs go to stderr.

use anyhow::{Context, Result, bail};
use appbridge_cli::{
    load_config, load_identity, read_input, render_action_response, render_capabilities,
    render_schema, render_trigger_response,
};
use appbridge_host::{ActionContext, App, TriggerContext};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "appbridge")]
#[command(about = "Inspect and exercise AppBridge components", version)]
struct Cli {
    /// Bridge configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the component's trigger and action ids
    Inspect {
        component: PathBuf,
    },
    /// Print a capability's input or output schema
    Schema(SchemaArgs),
    /// Poll a trigger once and print the response
    Poll {
        component: PathBuf,
        trigger: String,
        /// Cursor returned by the previous poll
        #[arg(short, long, default_value = "")]
        store: String,
        /// JSON input, or @path to read it from a file
        #[arg(short, long)]
        input: Option<String>,
        /// Identity JSON file ({"id", "name", "serialized_profile"})
        #[arg(long)]
        identity: Option<PathBuf>,
    },
    /// Execute an action once and print the response
    Run {
        component: PathBuf,
        action: String,
        /// JSON input, or @path to read it from a file
        #[arg(short, long)]
        input: Option<String>,
        /// Identity JSON file ({"id", "name", "serialized_profile"})
        #[arg(long)]
        identity: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct SchemaArgs {
    component: PathBuf,
    /// Trigger id to describe
    #[arg(long, conflicts_with = "action", required_unless_present = "action")]
    trigger: Option<String>,
    /// Action id to describe
    #[arg(long)]
    action: Option<String>,
    /// Describe the output instead of the input
    #[arg(long)]
    output: bool,
    /// Re-indent JSON schemas instead of printing them verbatim
    #[arg(long)]
    pretty: bool,
    /// Identity JSON file ({"id", "name", "serialized_profile"})
    #[arg(long)]
    identity: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let log_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let config = load_config(args.config.as_deref())?;
    debug!(timeout_secs = config.limits.timeout.as_secs_f64(), "Configuration loaded");

    match args.command {
        Command::Inspect { component } => {
            let app = App::load(&component, config)
                .with_context(|| format!("loading {}", component.display()))?;
            println!("{}", render_capabilities(app.name(), app.trigger_ids(), app.action_ids())?);
        }
        Command::Schema(schema) => {
            let app = App::load(&schema.component, config)
                .with_context(|| format!("loading {}", schema.component.display()))?;
            let identity = load_identity(schema.identity.as_deref())?;
            let text = match (schema.trigger, schema.action) {
                (Some(id), None) => {
                    let ctx = TriggerContext::new(id.clone(), identity, "")?;
                    if schema.output {
                        app.trigger_output_schema(&id, &ctx).await?
                    } else {
                        app.trigger_input_schema(&id, &ctx).await?
                    }
                }
                (None, Some(id)) => {
                    let ctx = ActionContext::new(id.clone(), identity, "")?;
                    if schema.output {
                        app.action_output_schema(&id, &ctx).await?
                    } else {
                        app.action_input_schema(&id, &ctx).await?
                    }
                }
                _ => bail!("exactly one of --trigger or --action is required"),
            };
            println!("{}", render_schema(&text, schema.pretty));
        }
        Command::Poll {
            component,
            trigger,
            store,
            input,
            identity,
        } => {
            let app = App::load(&component, config)
                .with_context(|| format!("loading {}", component.display()))?;
            let ctx = TriggerContext::new(trigger, load_identity(identity.as_deref())?, store)?
                .with_serialized_input(read_input(input.as_deref())?);
            let response = app.fetch_events(&ctx).await?;
            info!(events = response.events.len(), store = %response.store, "Poll complete");
            println!("{}", render_trigger_response(&response)?);
        }
        Command::Run {
            component,
            action,
            input,
            identity,
        } => {
            let app = App::load(&component, config)
                .with_context(|| format!("loading {}", component.display()))?;
            let ctx = ActionContext::new(action, load_identity(identity.as_deref())?, read_input(input.as_deref())?)?;
            let response = app.execute_action(&ctx).await?;
            info!(output_bytes = response.serialized_output.len(), "Action complete");
            println!("{}", render_action_response(&response)?);
        }
    }

    Ok(())
}
