use crate::cli::run;

pub mod auth;
pub mod cli;
mod config;
pub mod domain;
pub mod http;
pub mod media;
pub mod storage;

fn main() -> anyhow::Result<()> {
    run()
}
