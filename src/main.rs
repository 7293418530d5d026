use log::error;

use section_scheduler::config::ServerConfig;
use section_scheduler::server;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            std::process::exit(2);
        }
    };

    if let Err(e) = server::run_server(config).await {
        error!("server stopped: {e}");
        std::process::exit(1);
    }
}
