mod app;
mod cli;

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

fn main() {
    let cli = cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();

    app::run(cli);
}
