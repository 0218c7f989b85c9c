use clap::Parser;
use counsel_ai_context::text::{DocumentChunker, DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP};
use std::io::Read;
use std::path::PathBuf;
use std::process;

/// Chunk a document the way the counsel-ai pipeline would, and print the
/// resulting windows. Reads from a file or stdin.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// File to chunk; reads stdin when omitted
    file: Option<PathBuf>,

    /// Window size in words
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Overlap between consecutive windows in words
    #[arg(long, default_value_t = DEFAULT_OVERLAP)]
    overlap: usize,

    /// Emit full chunks as JSON instead of a summary line per chunk
    #[arg(long)]
    json: bool,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let text = match &args.file {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let chunker = DocumentChunker::new(args.chunk_size, args.overlap)?;
    let chunks = chunker.chunk(&text);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&chunks)?);
    } else {
        println!("{} chunks:", chunks.len());
        for chunk in &chunks {
            println!(
                "  #{} words {}..{} ({} words) id={}",
                chunk.chunk_index,
                chunk.start_word,
                chunk.end_word,
                chunk.word_count,
                &chunk.id[..16]
            );
        }
    }

    Ok(())
}
