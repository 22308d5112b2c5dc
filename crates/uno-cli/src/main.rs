use clap::Parser;
use tracing_subscriber::EnvFilter;

mod watch;

#[derive(Parser)]
#[command(name = "uno")]
#[command(about = "Watch an Uno Pow Zero room from the terminal", long_about = None)]
struct Cli {
    /// Document relay URL
    #[arg(short, long, default_value = "ws://127.0.0.1:8080")]
    server: String,

    /// Room key to watch
    #[arg(short, long)]
    room: Option<String>,

    /// Username, needed with --join or --create
    #[arg(short, long)]
    name: Option<String>,

    /// Profile animal, e.g. `tiger`
    #[arg(short, long)]
    pfp: Option<String>,

    /// Create a new room (and take a seat in it)
    #[arg(short, long)]
    create: bool,

    /// Take a seat in the room before watching
    #[arg(short, long)]
    join: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let options = watch::WatchOptions {
        server: cli.server,
        room: cli.room,
        name: cli.name,
        pfp: cli.pfp,
        create: cli.create,
        join: cli.join,
    };

    if let Err(e) = watch::run(options).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
