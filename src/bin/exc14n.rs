use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process;

use clap::Parser;

use exc14n::{Canonicalizer, CanonicalizerOptions, XmlTokens};

#[derive(Parser)]
#[command(
	name = "exc14n",
	about = "Write the exclusive canonical form of an XML document's root element",
	version
)]
struct Cli {
	/// Input XML file (default: stdin)
	input: Option<PathBuf>,

	/// Output file (default: stdout)
	#[arg(short, long)]
	output: Option<PathBuf>,

	/// Maximum element nesting depth
	#[arg(long = "max-depth")]
	max_depth: Option<usize>,

	/// Terminate the output with a newline
	#[arg(long)]
	newline: bool,
}

fn run(cli: Cli) -> exc14n::Result<()> {
	let input: Box<dyn BufRead> = match &cli.input {
		Some(path) => Box::new(BufReader::new(File::open(path)?)),
		None => Box::new(BufReader::new(io::stdin())),
	};
	let opts = CanonicalizerOptions::default().max_depth(cli.max_depth);
	let canonical = Canonicalizer::with_options(opts).canonicalize(&mut XmlTokens::new(input))?;

	let mut output: Box<dyn Write> = match &cli.output {
		Some(path) => Box::new(File::create(path)?),
		None => Box::new(io::stdout()),
	};
	output.write_all(&canonical)?;
	if cli.newline {
		output.write_all(b"\n")?;
	}
	output.flush()?;
	Ok(())
}

fn main() {
	if let Err(e) = run(Cli::parse()) {
		eprintln!("exc14n: {}", e);
		process::exit(1);
	}
}
