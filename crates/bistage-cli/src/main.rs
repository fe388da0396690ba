use std::path::PathBuf;
use std::sync::Arc;

use atty::Stream;
use bistage_core::{
    run_build_phase, run_clean, run_install_phase, run_versions, CommandContext, CommandStatus,
    ExecutionOutcome, SharedEffects, StageRequest, SystemEffects,
};
use clap::{ArgAction, Args, Parser, Subcommand};
use color_eyre::Result;
use serde_json::json;

mod style;

use style::Style;

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = BistageCli::parse();
    init_tracing(cli.trace, cli.verbose);

    let outcome = match dispatch(&cli) {
        Ok(outcome) => outcome,
        Err(err) => ExecutionOutcome::failure(
            format!("{err:#}"),
            json!({ "error": format!("{err:#}") }),
        ),
    };
    let code = emit_output(&cli, &outcome)?;

    if code == 0 {
        Ok(())
    } else {
        std::process::exit(code);
    }
}

fn init_tracing(trace: bool, verbose: u8) {
    let level = if trace {
        "trace"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = format!("bistage={level},bistage_core={level}");
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn dispatch(cli: &BistageCli) -> anyhow::Result<ExecutionOutcome> {
    // Verbose runs stream collaborator output straight through.
    let stream = cli.verbose > 0 || cli.trace;
    let effects: SharedEffects = Arc::new(SystemEffects::with_streaming(stream));
    let ctx = CommandContext::new(effects);

    match &cli.command {
        BistageCommand::Build(args) => run_build_phase(&ctx, &args.to_request()),
        BistageCommand::Install(args) => run_install_phase(&ctx, &args.to_request()),
        BistageCommand::Clean(args) => run_clean(&args.to_request()),
        BistageCommand::Versions => run_versions(&ctx),
    }
}

fn emit_output(cli: &BistageCli, outcome: &ExecutionOutcome) -> Result<i32> {
    let code = match outcome.status {
        CommandStatus::Ok => 0,
        CommandStatus::UserError => 1,
        CommandStatus::Failure => 2,
    };

    let style = Style::new(cli.no_color, atty::is(Stream::Stdout));

    if cli.json {
        let payload = bistage_core::to_json_response(outcome);
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else if !cli.quiet {
        println!("{}", style.status(&outcome.status, &outcome.message));
    }

    Ok(code)
}

#[derive(Parser, Debug)]
#[command(
    name = "bistage",
    author,
    version,
    about = "Stage one Python source package for python2 and python3 hosts",
    long_about = "Builds a shared per-family tree once per discovered interpreter version, then installs the staged trees into family-specific destination roots.",
    after_help = "Examples:\n  bistage build --artifact pkg/__init__.py\n  bistage --json versions\n  bistage install --legacy-root debian/python-pkg --modern-root debian/python3-pkg"
)]
struct BistageCli {
    #[arg(
        short,
        long,
        help = "Suppress human output (errors still print to stderr)"
    )]
    quiet: bool,
    #[arg(short, long, action = ArgAction::Count, help = "Increase logging (-vv reaches trace)")]
    verbose: u8,
    #[arg(long, help = "Force trace logging regardless of -v/-q")]
    trace: bool,
    #[arg(long, help = "Emit {status,message,details} JSON envelopes")]
    json: bool,
    #[arg(long, help = "Disable colored human output")]
    no_color: bool,
    #[command(subcommand)]
    command: BistageCommand,
}

#[derive(Subcommand, Debug)]
enum BistageCommand {
    #[command(
        about = "Build the package once per discovered interpreter version.",
        after_help = "Examples:\n  bistage build\n  BISTAGE_PY3_VERSIONS=\"3.8 3.9\" bistage build --artifact pkg/__init__.py\n"
    )]
    Build(LayoutArgs),
    #[command(
        about = "Install the staged trees into the per-family destination roots.",
        after_help = "Examples:\n  bistage install\n  bistage install --legacy-root debian/python-pkg --modern-root debian/python3-pkg\n"
    )]
    Install(LayoutArgs),
    #[command(
        about = "Remove the staged build trees and version manifests.",
        after_help = "Example:\n  bistage clean\n"
    )]
    Clean(LayoutArgs),
    #[command(
        about = "List the interpreter versions each family would stage.",
        after_help = "Examples:\n  bistage versions\n  bistage --json versions\n"
    )]
    Versions,
}

#[derive(Args, Debug)]
struct LayoutArgs {
    #[arg(
        long,
        value_name = "DIR",
        default_value = ".",
        help = "Python source tree containing setup.py"
    )]
    source_tree: PathBuf,
    #[arg(
        long,
        value_name = "DIR",
        default_value = "build",
        help = "Scratch base holding the per-family build trees"
    )]
    build_base: PathBuf,
    #[arg(
        long,
        value_name = "DIR",
        default_value = "dist/py2",
        help = "Destination root receiving python2 installs"
    )]
    legacy_root: PathBuf,
    #[arg(
        long,
        value_name = "DIR",
        default_value = "dist/py3",
        help = "Destination root receiving python3 installs"
    )]
    modern_root: PathBuf,
    #[arg(
        long,
        value_name = "PATH",
        help = "Generated module to strip from each build tree (relative to the tree)"
    )]
    artifact: Option<PathBuf>,
}

impl LayoutArgs {
    fn to_request(&self) -> StageRequest {
        StageRequest {
            source_tree: self.source_tree.clone(),
            build_base: self.build_base.clone(),
            legacy_root: self.legacy_root.clone(),
            modern_root: self.modern_root.clone(),
            artifact: self.artifact.clone(),
        }
    }
}
