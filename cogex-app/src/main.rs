mod app;
mod env_config;
mod participant;

use app::App;

use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = env_config::Settings::from_env()?;
    let path = App::new(settings).run()?;
    println!("{}", path.display());

    Ok(())
}
