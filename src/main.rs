use clap::Parser;
use edilgest::cli::{Cli, Commands, GlobalOpts};
use edilgest::cli::commands;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Diagnostics go to stderr; `EDILGEST_LOG` overrides the level
fn init_tracing(global: &GlobalOpts) {
    let default = if global.verbose {
        "edilgest=debug"
    } else {
        "edilgest=warn"
    };
    let filter = EnvFilter::try_from_env("EDILGEST_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    // Without this, piping to `head`, `grep -q`, etc. causes a panic on broken pipe.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;
    init_tracing(&global);

    match cli.command {
        Commands::Init(args) => commands::init::run(args, &global),
        Commands::Login(args) => commands::session::run_login(args, &global),
        Commands::Logout => commands::session::run_logout(&global),
        Commands::Whoami => commands::session::run_whoami(&global),
        Commands::Building(cmd) => commands::building::run(cmd, &global),
        Commands::Plesso(cmd) => commands::plesso::run(cmd, &global),
        Commands::Pertinenza(cmd) => commands::pertinenza::run(cmd, &global),
        Commands::Road(cmd) => commands::road::run(cmd, &global),
        Commands::Int(cmd) => commands::intervention::run(cmd, &global),
        Commands::User(cmd) => commands::user::run(cmd, &global),
        Commands::Import(args) => commands::import::run(args, &global),
        Commands::Export(args) => commands::export::run(args, &global),
        Commands::Report(cmd) => commands::report::run(cmd, &global),
        Commands::Log(args) => commands::log::run(args, &global),
        Commands::Settings(cmd) => commands::settings::run(cmd, &global),
        Commands::Manual(cmd) => commands::manual::run(cmd, &global),
        Commands::Registry(args) => commands::registry::run(args, &global),
        Commands::Search(args) => commands::search::run(args, &global),
        Commands::Completions(args) => commands::completions::run(args),
    }
}
