use anyhow::{Context, Result};
use backoffice_api::{
    auth::{all_permissions, AuthConfig, AuthService, ADMIN_ROLE},
    config,
};
use clap::{ArgAction, Parser};

/// Mint an operator access token signed with the configured JWT secret
#[derive(Parser)]
#[command(name = "issue-token", about = "Issue a bearer token for the back office API", version)]
struct Cli {
    #[arg(long, help = "Token subject, usually the operator's id or login")]
    subject: String,
    #[arg(long, help = "Operator display name")]
    name: Option<String>,
    #[arg(
        long = "permission",
        short = 'p',
        help = "Permission to grant, e.g. stocks:read or stocks:*; repeatable"
    )]
    permissions: Vec<String>,
    #[arg(long, action = ArgAction::SetTrue, help = "Grant the admin role")]
    admin: bool,
    #[arg(
        long,
        action = ArgAction::SetTrue,
        help = "Grant every concrete permission without the admin role"
    )]
    all: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config().context("failed to load configuration")?;
    let auth = AuthService::new(AuthConfig::from(&cfg));

    let roles = if cli.admin {
        vec![ADMIN_ROLE.to_string()]
    } else {
        Vec::new()
    };
    let mut permissions = cli.permissions;
    if cli.all {
        permissions.extend(all_permissions());
    }
    if roles.is_empty() && permissions.is_empty() {
        anyhow::bail!("grant at least one --permission, or pass --admin or --all");
    }

    let token = auth
        .issue_token(&cli.subject, cli.name, roles, permissions)
        .context("failed to sign token")?;
    println!("{token}");
    Ok(())
}
