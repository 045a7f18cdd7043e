use clap::Parser;
use tissue::cli::{commands, Cli, Commands};
use tissue::config::CliOverrides;
use tissue::logging::init_logging;
use tissue::TissueError;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.quiet) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let overrides = CliOverrides {
        store: cli.store.clone(),
        json: cli.json,
    };

    let result = match cli.command {
        Commands::Init(args) => commands::init::execute(&args, &overrides),
        Commands::Create(args) => commands::create::execute(&args, &overrides),
        Commands::Update(args) => commands::update::execute(&args, &overrides),
        Commands::Status(args) => commands::update::execute_status(&args, &overrides),
        Commands::Show(args) => commands::show::execute(&args, &overrides),
        Commands::Comment(args) => commands::comment::add(&args, &overrides),
        Commands::Comments(args) => commands::comment::list(&args, &overrides),
        Commands::Dep { command } => commands::dep::execute(&command, &overrides),
        Commands::Deps(args) => commands::dep::list(&args, &overrides),
        Commands::List(args) => commands::list::execute(&args, &overrides),
        Commands::Search(args) => commands::list::execute_search(&args, &overrides),
        Commands::Ready(args) => commands::ready::execute(&args, &overrides),
        Commands::Clean(args) => commands::clean::execute(&args, &overrides),
        Commands::Migrate(args) => commands::migrate::execute(&args, &overrides),
        Commands::Reimport => commands::reimport::execute(&overrides),
        Commands::Completions(args) => commands::completions::execute(&args),
        Commands::Version => commands::version::execute(&overrides),
    };

    if let Err(e) = result {
        handle_error(&e);
    }
}

/// One-line diagnostic on stderr, exit 1.
fn handle_error(err: &TissueError) -> ! {
    eprintln!("error: {err}");
    std::process::exit(err.exit_code());
}
