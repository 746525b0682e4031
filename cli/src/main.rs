use std::path::PathBuf;

use blog_admin_core::{AppConfig, AppContext};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

use commands::Command;

#[derive(Parser)]
#[command(name = "blog-admin")]
#[command(about = "Blog administration from the command line", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./blog-admin.toml when present)
    #[arg(short, long, global = true, env = "BLOG_ADMIN_CONFIG")]
    config: Option<PathBuf>,

    /// Answer every command locally, regardless of configuration
    #[arg(long, global = true)]
    mock: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "blog_admin=info,blog_admin_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load_from(cli.config.as_deref())?;
    if cli.mock {
        config.use_mock_api = true;
    }

    let mut out = std::io::stdout().lock();
    if let Command::Config = cli.command {
        return commands::print_json(&mut out, &config);
    }

    let ctx = AppContext::from_config(config).await?;
    commands::run(&ctx, cli.command, &mut out).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from(["blog-admin", "stats", "--mock", "-c", "site.toml"]).unwrap();
        assert!(cli.mock);
        assert_eq!(cli.config, Some(PathBuf::from("site.toml")));
        assert!(matches!(cli.command, Command::Stats));
    }
}
