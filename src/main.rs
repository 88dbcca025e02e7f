use log::LevelFilter;
use minimal_analog::{config::Config, sim};

fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .filter_module("minimal_analog", LevelFilter::Debug)
        .parse_default_env()
        .init();

    let config = Config::load()?;
    sim::run(config)
}
