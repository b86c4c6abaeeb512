use clap::{Parser, Subcommand, ValueEnum};
use std::process;
use tracing_subscriber::EnvFilter;
use tsunagi::prelude::*;

/// Define a CLI-specific enum for clap to parse.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum SideCli {
    Input,
    Output,
}

impl From<SideCli> for SocketType {
    fn from(side: SideCli) -> Self {
        match side {
            SideCli::Input => SocketType::Input,
            SideCli::Output => SocketType::Output,
        }
    }
}

/// Inspect and repair saved node-editor canvases
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Optional path to a canvas configuration JSON file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Audit a saved canvas for dangling connections and malformed socket arrays
    Check {
        /// Path to the canvas JSON file
        canvas_path: String,
    },
    /// Remove a socket from a card, reconciling every connection that touches it
    RemoveSocket {
        /// Path to the canvas JSON file
        canvas_path: String,
        /// The card owning the socket
        #[arg(long)]
        card: String,
        /// The socket to remove
        #[arg(long)]
        socket: String,
        /// Which side of the card the socket is on
        #[arg(long, value_enum, default_value = "input")]
        side: SideCli,
        /// Where to write the updated canvas. Defaults to printing it.
        #[arg(short, long)]
        output: Option<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match CanvasConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config from '{}': {}", path, e);
                process::exit(1);
            }
        },
        None => CanvasConfig::default(),
    };

    let result = match cli.command {
        Command::Check { canvas_path } => run_check(&canvas_path, config),
        Command::RemoveSocket {
            canvas_path,
            card,
            socket,
            side,
            output,
        } => run_remove_socket(&canvas_path, config, card, socket, side.into(), output),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn load_canvas(path: &str, config: CanvasConfig) -> Result<Canvas> {
    println!("Loading canvas from: {}", path);
    let document = CanvasDocument::from_file(path)?;
    Ok(Canvas::from_document(document, config)?)
}

fn run_check(path: &str, config: CanvasConfig) -> Result<()> {
    let canvas = load_canvas(path, config)?;

    let mut problems = 0;
    for card in canvas.cards() {
        let sockets = card.sockets();
        println!(
            "  -> Card '{}': {} inputs, {} outputs",
            card.id(),
            sockets.inputs.len(),
            sockets.outputs.len()
        );
        if let Err(e) = sockets.check_dense() {
            println!("     ! {}", e);
            problems += 1;
        }
    }

    let dangling = canvas.find_dangling_connections();
    for id in &dangling {
        if let Some(connection) = canvas.connections().get(id) {
            println!(
                "  ! Dangling connection '{}': {}/{} -> {}/{}",
                id,
                connection.source_card_id,
                connection.source_socket_id,
                connection.target_card_id,
                connection.target_socket_id
            );
        }
    }
    problems += dangling.len();

    println!(
        "\nChecked {} cards and {} connections: {} problem(s) found.",
        canvas.cards().count(),
        canvas.connections().len(),
        problems
    );
    if problems > 0 {
        process::exit(2);
    }
    Ok(())
}

fn run_remove_socket(
    path: &str,
    config: CanvasConfig,
    card: String,
    socket: String,
    side: SocketType,
    output: Option<String>,
) -> Result<()> {
    let mut canvas = load_canvas(path, config)?;
    let card_id = CardId::new(card);
    let socket_id = SocketId::new(socket);

    let before = canvas.connections().len();
    canvas.edit_card(&card_id, SocketEdit::remove(side, socket_id.clone()))?;
    canvas.tick();
    let after = canvas.connections().len();

    println!("Removed {} socket '{}' from card '{}'", side, socket_id, card_id);
    println!("  -> {} connection(s) removed", before - after);
    for update in canvas.take_socket_updates() {
        println!("  -> Reindex map: {}", update.reindex_map);
    }
    if let Some(card) = canvas.card(&card_id) {
        for socket in card.sockets().of(side) {
            println!("     [{}] {} ({})", socket.index, socket.name, socket.id);
        }
    }

    let document = canvas.to_document();
    match output {
        Some(out) => {
            document.save(&out)?;
            println!("  -> Wrote updated canvas to '{}'", out);
        }
        None => println!("{}", document.to_json()?),
    }
    Ok(())
}
