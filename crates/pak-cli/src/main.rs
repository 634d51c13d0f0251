#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]

mod commands;
mod logging;

use clap::Parser;
use commands::Context;
use miette::{IntoDiagnostic, Result};
use pak_core::pkg::{
    DependencyType, InstallOptions, PackOptions, PackageManagerKind, UninstallOptions,
    UpdateOptions,
};
use pak_core::{Config, Environment, LogLevel};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "pak")]
#[command(author, version, about = "One interface for npm, yarn classic and yarn berry", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (one object on stdout)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    /// Use this package manager instead of detecting one
    #[arg(long, global = true, value_name = "npm|yarn-classic|yarn-berry")]
    pm: Option<PackageManagerKind>,

    /// Accept a project without a lockfile during detection
    #[arg(long, global = true)]
    no_lockfile: bool,

    /// Log level passed on to the package manager
    #[arg(long, global = true, env = "PAK_LOGLEVEL")]
    loglevel: Option<LogLevel>,

    /// production adds --production to bare installs
    #[arg(long, global = true, env = "PAK_ENVIRONMENT", default_value = "production")]
    environment: Environment,

    /// npm registry used to resolve overrides
    #[arg(long, global = true, env = "PAK_NPM_REGISTRY", value_name = "URL")]
    registry: Option<String>,

    /// Kill the package manager after this many seconds
    #[arg(long, global = true, value_name = "SECS")]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Detect the package manager in charge of the project
    Detect,

    /// Print the package root
    Root {
        /// Require this lockfile next to package.json
        #[arg(long)]
        lockfile: Option<String>,
    },

    /// List workspace package directories
    Workspaces,

    /// Install packages, or all dependencies when none are given
    Install {
        packages: Vec<String>,

        /// Save as a devDependency
        #[arg(short = 'D', long)]
        dev: bool,

        /// Save the exact version
        #[arg(short = 'E', long)]
        exact: bool,

        /// Install globally
        #[arg(short, long)]
        global: bool,

        #[arg(long)]
        force: bool,

        /// Skip lifecycle scripts (bare installs only)
        #[arg(long)]
        ignore_scripts: bool,

        /// Extra arguments for the package manager (after --)
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Remove packages
    Uninstall {
        #[arg(required = true)]
        packages: Vec<String>,

        #[arg(short = 'D', long)]
        dev: bool,

        #[arg(short, long)]
        global: bool,

        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Update packages, or everything when none are given
    Update {
        packages: Vec<String>,

        #[arg(short = 'D', long)]
        dev: bool,

        #[arg(short, long)]
        global: bool,

        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Rebuild native modules
    Rebuild { packages: Vec<String> },

    /// Pack a workspace into a tarball
    Pack {
        /// Workspace to pack, relative to the working directory
        #[arg(long, default_value = ".")]
        workspace: PathBuf,

        /// Where to put the tarball
        #[arg(long)]
        target_dir: Option<PathBuf>,
    },

    /// Force dependencies to exact versions throughout the tree
    Override {
        /// NAME@VERSION pairs
        #[arg(required = true, value_name = "NAME@VERSION")]
        specs: Vec<String>,
    },

    /// Print the package manager's version
    PmVersion,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Determine working directory
    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));
    let cwd = dunce::canonicalize(&cwd).unwrap_or(cwd);

    let config = Config::new(cwd)
        .with_verbosity(cli.verbose)
        .with_json_logs(cli.json)
        .with_loglevel(cli.loglevel)
        .with_environment(cli.environment)
        .with_registry(cli.registry);

    // Version needs no runtime or logging
    let Some(command) = cli.command else {
        return commands::version::run(cli.json);
    };
    if matches!(command, Commands::Version) {
        return commands::version::run(cli.json);
    }

    logging::init(config.verbosity, config.json_logs);

    let ctx = Context {
        config,
        json: cli.json,
        pm: cli.pm,
        require_lockfile: !cli.no_lockfile,
        timeout: cli.timeout_secs.map(Duration::from_secs),
    };

    let span = tracing::info_span!("cmd", cwd = %ctx.config.cwd.display());
    let _guard = span.enter();

    let rt = tokio::runtime::Runtime::new().into_diagnostic()?;
    rt.block_on(dispatch(&ctx, command))
}

async fn dispatch(ctx: &Context, command: Commands) -> Result<()> {
    match command {
        Commands::Version => commands::version::run(ctx.json),
        Commands::Detect => commands::detect::run(ctx).await,
        Commands::Root { lockfile } => commands::root::run(ctx, lockfile.as_deref()),
        Commands::Workspaces => commands::workspaces::run(ctx),
        Commands::Install {
            packages,
            dev,
            exact,
            global,
            force,
            ignore_scripts,
            args,
        } => {
            let options = InstallOptions::new()
                .with_dependency_type(dependency_type(dev))
                .with_exact(exact)
                .with_global(global)
                .with_force(force)
                .with_ignore_scripts(ignore_scripts)
                .with_additional_args(args);
            commands::deps::install(ctx, &packages, &options).await
        }
        Commands::Uninstall {
            packages,
            dev,
            global,
            args,
        } => {
            let options = UninstallOptions::new()
                .with_dependency_type(dependency_type(dev))
                .with_global(global)
                .with_additional_args(args);
            commands::deps::uninstall(ctx, &packages, &options).await
        }
        Commands::Update {
            packages,
            dev,
            global,
            args,
        } => {
            let options = UpdateOptions::new()
                .with_dependency_type(dependency_type(dev))
                .with_global(global)
                .with_additional_args(args);
            commands::deps::update(ctx, &packages, &options).await
        }
        Commands::Rebuild { packages } => commands::deps::rebuild(ctx, &packages).await,
        Commands::Pack {
            workspace,
            target_dir,
        } => {
            let mut options = PackOptions::new().with_workspace(workspace);
            if let Some(dir) = target_dir {
                options = options.with_target_dir(dir);
            }
            commands::pack::run(ctx, &options).await
        }
        Commands::Override { specs } => commands::overrides::run(ctx, &specs).await,
        Commands::PmVersion => commands::pm_version::run(ctx).await,
    }
}

fn dependency_type(dev: bool) -> DependencyType {
    if dev {
        DependencyType::Dev
    } else {
        DependencyType::Prod
    }
}
