use std::path::PathBuf;

use anyhow::Result;
use clap::{App, Arg};

use sstt_toolbox::parsers::sstt::{is_sstt_header_file, SSTTFile};

pub fn main() -> Result<()> {
    env_logger::init();

    let matches = App::new("sstt")
        .about("Inspect the header of an SSTT TCSPC dataset")
        .arg(
            Arg::with_name("header")
                .help("Path to the .sstt header file")
                .required(true)
                .index(1),
        )
        .get_matches();

    let path = PathBuf::from(matches.value_of("header").unwrap());
    if !is_sstt_header_file(&path) {
        eprintln!("warning: {} does not start with the SSTT magic line", path.display());
    }

    let file = SSTTFile::new(path)?;
    print!("{}", file);

    Ok(())
}
