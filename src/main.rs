use clap::Parser;
use log::{info, warn, LevelFilter};
use snafu::ErrorCompat;

mod args;
mod maps;

use crate::args::Args;
use crate::maps::{run_map, Overrides};

fn main() {
    let args = Args::parse();

    let mut builder = env_logger::Builder::from_default_env();
    if args.verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();
    info!("args: {:?}", args);

    let overrides = Overrides {
        input: args.input.clone(),
        boundaries: args.boundaries.clone(),
        out: args.out.clone(),
        no_legend: args.no_legend,
    };

    match run_map(args.config.clone(), &overrides) {
        Ok(path) => {
            println!("{}", path.display());
        }
        Err(e) => {
            warn!("Error occured {:?}", e);
            eprintln!("An error occured ({:?}): {}", e.kind(), e);
            let mut source = std::error::Error::source(&e);
            while let Some(s) = source {
                eprintln!("  caused by: {}", s);
                source = s.source();
            }
            if let Some(bt) = ErrorCompat::backtrace(&e) {
                eprintln!("trace: {}", bt);
            }
            std::process::exit(1);
        }
    }
}
