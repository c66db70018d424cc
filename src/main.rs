use clap::Parser;
use rulesort::engine::Organizer;
use rulesort::output::ConsoleSink;
use std::path::PathBuf;
use std::process::ExitCode;

/// Organize the files of a directory into subfolders according to
/// configurable classification and filter rules.
#[derive(Parser)]
#[command(name = "rulesort", version, about)]
struct Cli {
    /// Directory whose files will be organized.
    directory: PathBuf,

    /// Rule document (JSON, or TOML with a .toml extension). Defaults to
    /// rules.json inside the target directory; without one the built-in
    /// default rules apply.
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Report what would happen without creating folders or moving files.
    #[arg(long)]
    dry_run: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let rules = cli.rules.or_else(|| {
        let candidate = cli.directory.join("rules.json");
        candidate.is_file().then_some(candidate)
    });

    let mut organizer = Organizer::new(&cli.directory).dry_run(cli.dry_run);
    if let Some(path) = rules {
        organizer = organizer.with_rule_source(path);
    }

    let token = organizer.cancel_token();
    ctrlc::set_handler(move || {
        eprintln!("\nStopping after the current file...");
        token.cancel();
    })
    .expect("failed to install Ctrl-C handler");

    let summary = organizer.run(&ConsoleSink::new());

    if summary.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
