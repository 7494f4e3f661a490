use clap::Parser;

use mangarank::cli::{Cli, Commands};
use mangarank::runtime::modes;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Serve);

    // 生成示例配置不需要加载配置和日志
    if matches!(command, Commands::Config { .. }) {
        return modes::run_cli(command).await;
    }

    mangarank::config::init_config_from(&cli.config);
    let config = mangarank::config::get_config();

    // guard 必须存活到进程结束
    let _log_guard = mangarank::system::init_logging(&config.logging)?;

    match command {
        Commands::Serve => modes::run_server().await,
        command => modes::run_cli(command).await,
    }
}
