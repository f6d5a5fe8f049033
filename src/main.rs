use anyhow::Result;
use clap::Parser;
use ptpnbound::{CliArguments, analyse_main};

fn main() -> Result<()> {
    let args = CliArguments::parse();

    analyse_main(args.analyse)
}
