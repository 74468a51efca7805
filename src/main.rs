#![warn(clippy::all, rust_2018_idioms)]
use clap::Parser;
use comic_panels::Settings;
use log4rs::config::Deserializers;
use std::{fs, path::Path};

mod cli;

fn main() -> anyhow::Result<()> {
    init_logger()?;

    let args = cli::CliArgs::parse();
    let settings = Settings::load()?;

    cli::run(args, &settings).inspect_err(|e| log::error!("{e:#}"))
}

const LOG_CONFIG_DIR: &str = "config";
const LOG_CONFIG: &str = "config/log4rs.yaml";

fn init_logger() -> anyhow::Result<()> {
    fs::create_dir_all(LOG_CONFIG_DIR)?;
    if !Path::new(&LOG_CONFIG).exists() {
        fs::write(LOG_CONFIG, include_str!("../config/log4rs.yaml"))?;
    }

    log4rs::init_file(LOG_CONFIG, Deserializers::default())?;
    Ok(())
}
