mod config;
mod layout;
mod logging;
mod process;
mod template;
mod terminal;
mod watch;
mod workflow;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::WorktabsConfig;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use terminal::{RecordingControl, TmuxControl};
use workflow::{RunSummary, StepStatus, WorkflowRunner};

#[derive(Parser)]
#[command(name = "worktabs")]
#[command(about = "Open your work tabs - scripted terminal pane layouts and dev workflows")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project directory (defaults to current)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Region to use (overrides the configured default)
    #[arg(long, global = true)]
    region: Option<String>,

    /// tmux session to create panes in (overrides config)
    #[arg(long, global = true)]
    session: Option<String>,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Suppress normal output
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a workflow
    Run {
        /// Workflow name
        workflow: String,

        /// Workflow arguments as key=value pairs
        #[arg(trailing_var_arg = true)]
        args: Vec<String>,

        /// Record actions without touching a terminal
        #[arg(long)]
        dry_run: bool,

        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a workflow without running
    Validate {
        /// Workflow name
        workflow: String,
    },

    /// List available workflows
    Workflows,

    /// List configured regions
    Regions,

    /// Check that the terminal backend is available
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Run gets a per-run log file alongside stderr output
    let log_file = match &cli.command {
        Commands::Run { workflow, .. } => logging::default_log_path(workflow).ok(),
        _ => None,
    };
    logging::init_logging(cli.debug, cli.quiet, log_file)?;

    let project_dir = cli.dir.as_deref();
    let mut config = WorktabsConfig::load(project_dir)?;
    if let Some(session) = cli.session {
        config.defaults.session = session;
    }

    match cli.command {
        Commands::Doctor => {
            print!("Checking terminal backend... ");
            match TmuxControl::version().await {
                Ok(version) => println!("✓ {}", version),
                Err(e) => {
                    println!("✗ {}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Regions => {
            let mut names: Vec<_> = config.regions.keys().collect();
            names.sort();
            for name in names {
                let region = &config.regions[name];
                let marker = if *name == config.defaults.region {
                    "*"
                } else {
                    " "
                };
                println!("{} {}", marker, name);
                if !region.description.is_empty() {
                    println!("    {}", region.description);
                }
                println!("    ssh: {}  sync: {}", region.ssh, region.sync);
            }
        }

        Commands::Workflows => {
            for (name, source) in
                config::list_workflows(project_dir, config.defaults.workflows_dir.as_deref())
            {
                println!("{} ({})", name, source);
            }
        }

        Commands::Validate { workflow } => {
            match config::load_workflow(
                &workflow,
                project_dir,
                config.defaults.workflows_dir.as_deref(),
            ) {
                Ok(wf) => {
                    println!("✓ Workflow '{}' is valid", wf.name);
                    println!(
                        "  {} panes, {} steps",
                        wf.layout.pane_names().len(),
                        wf.steps.len()
                    );
                }
                Err(e) => {
                    eprintln!("✗ Workflow validation failed:\n{}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Run {
            workflow,
            args,
            dry_run,
            json,
        } => {
            let wf = config::load_workflow(
                &workflow,
                project_dir,
                config.defaults.workflows_dir.as_deref(),
            )?;
            let step_args = parse_step_args(&args)?;

            let session = config.defaults.session.clone();
            let runner = WorkflowRunner::new(Arc::new(config));

            let summary = if dry_run {
                let ctrl = RecordingControl::new();
                let summary = runner
                    .run(&wf, cli.region.as_deref(), step_args, &ctrl, true)
                    .await?;
                if !json && !cli.quiet {
                    for action in ctrl.actions() {
                        println!("would {}", action);
                    }
                }
                summary
            } else {
                let ctrl = TmuxControl::new(session);
                runner
                    .run(&wf, cli.region.as_deref(), step_args, &ctrl, false)
                    .await?
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else if !cli.quiet {
                print_summary(&summary);
            }

            if !summary.success {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

/// Parse trailing `key=value` workflow arguments.
fn parse_step_args(args: &[String]) -> Result<HashMap<String, String>> {
    let mut parsed = HashMap::new();
    for arg in args {
        let Some((key, value)) = arg.split_once('=') else {
            anyhow::bail!("invalid argument '{}', expected key=value", arg);
        };
        parsed.insert(key.to_string(), value.to_string());
    }
    Ok(parsed)
}

fn print_summary(summary: &RunSummary) {
    for step in &summary.steps {
        let symbol = match step.status {
            StepStatus::Ok => "✓",
            StepStatus::Failed => "✗",
            StepStatus::Skipped => "-",
        };
        match &step.detail {
            Some(detail) => println!("{} {} - {}", symbol, step.name, detail),
            None => println!("{} {}", symbol, step.name),
        }
    }

    if summary.success {
        println!(
            "\n✓ {} ({}) finished in {}ms",
            summary.workflow, summary.region, summary.duration_ms
        );
    } else {
        println!(
            "\n✗ {} ({}) failed: {:?}",
            summary.workflow,
            summary.region,
            summary.failed_steps()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_step_args_accepts_pairs() {
        let args = vec!["branch=main".to_string(), "ticket=AB-12".to_string()];
        let parsed = parse_step_args(&args).unwrap();
        assert_eq!(parsed["branch"], "main");
        assert_eq!(parsed["ticket"], "AB-12");
    }

    #[test]
    fn parse_step_args_keeps_extra_equals() {
        let args = vec!["url=https://example.com/?a=b".to_string()];
        let parsed = parse_step_args(&args).unwrap();
        assert_eq!(parsed["url"], "https://example.com/?a=b");
    }

    #[test]
    fn parse_step_args_rejects_bare_words() {
        let args = vec!["oops".to_string()];
        assert!(parse_step_args(&args).is_err());
    }
}
