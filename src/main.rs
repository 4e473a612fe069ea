use bigp::config::TrainConfig;
use bigp::BIGP_LOG;
use clap::Parser;
use env_logger::{Builder, Env};

fn main() -> anyhow::Result<()> {
    let env = Env::new().filter_or(BIGP_LOG, "info");
    let mut builder = Builder::from_env(env);
    let builder = builder.target(env_logger::Target::Stdout);
    builder.try_init().ok();

    let config = TrainConfig::parse().resolve()?;
    let summary = bigp::run(&config)?;
    for (name, value) in summary.hyperparameters.iter() {
        println!("{name} = {value:.6}");
    }
    if let Some(rmse) = summary.history.final_rmse() {
        println!("Test RMSE = {rmse:.6}");
    }
    Ok(())
}
