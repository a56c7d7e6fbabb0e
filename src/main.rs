use std::path::PathBuf;
use std::process;

use clap::{ArgAction, ArgGroup, Parser};
use log::info;
use mini_binary_xml::{
    compress_file, decompress_file, DecodeOptions, RootPolicy, VersionPolicy, XmlOptions,
};

/// Convert between XML and the MBXM binary tree format.
#[derive(Debug, Parser)]
#[command(name = "mbxml", version, about)]
#[command(group(ArgGroup::new("mode").required(true).args(["compress", "decompress"])))]
struct Cli {
    /// Encode the XML file FROM into the MBXM file TO
    #[arg(short = 'c', long)]
    compress: bool,

    /// Decode the MBXM file FROM into the XML file TO
    #[arg(short = 'd', long)]
    decompress: bool,

    /// Input file
    from: PathBuf,

    /// Output file, overwritten if it exists
    to: PathBuf,

    /// Reject payloads whose version byte is not the one this build writes
    #[arg(long)]
    strict_version: bool,

    /// Accept several parentless records and use the first one
    #[arg(long)]
    first_root: bool,

    /// Indent written XML by this many spaces
    #[arg(long, value_name = "SPACES")]
    indent: Option<usize>,

    /// Keep whitespace-only text when loading XML
    #[arg(long)]
    preserve_whitespace: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let decode_options = DecodeOptions {
        version_policy: if cli.strict_version {
            VersionPolicy::Strict
        } else {
            VersionPolicy::Lenient
        },
        root_policy: if cli.first_root {
            RootPolicy::First
        } else {
            RootPolicy::Unique
        },
    };
    let xml_options = XmlOptions {
        preserve_whitespace: cli.preserve_whitespace,
        indent: cli.indent,
    };

    let result = if cli.compress {
        info!("Compressing {} -> {}", cli.from.display(), cli.to.display());
        compress_file(&cli.from, &cli.to, &xml_options)
    } else {
        info!("Decompressing {} -> {}", cli.from.display(), cli.to.display());
        decompress_file(&cli.from, &cli.to, &decode_options, &xml_options)
    };

    if let Err(e) = result {
        eprintln!("ERROR: {}", e);
        process::exit(1);
    }
}
