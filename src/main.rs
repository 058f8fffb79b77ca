use clap::Parser;
use serde::Serialize;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use linkstash::auth::{Decision, Navigation};
use linkstash::cache::ItemScope;
use linkstash::config::{Cli, Command, Config};
use linkstash::models::{EntityId, LoginRequest, SignupRequest};
use linkstash::routes::Route;
use linkstash::state::ClientContext;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so command output stays pipeable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli)?;
    let context = ClientContext::connect(&config).await?;

    match cli.command {
        Command::Signup {
            username,
            email,
            password,
        } => {
            let session = context
                .session
                .signup(&SignupRequest {
                    username,
                    email,
                    password,
                })
                .await?;
            print_json(&session.user())?;
        }
        Command::Login { email, password } => {
            let session = context
                .session
                .login(&LoginRequest { email, password })
                .await?;
            print_json(&session.user())?;
        }
        Command::Logout => {
            context.logout().await?;
        }
        Command::Whoami => match context.session.current_user() {
            Some(user) => print_json(&user)?,
            None => println!("Not signed in"),
        },
        Command::Items { mine, user } => {
            let scope = match (mine, user) {
                (true, _) => ItemScope::Mine,
                (false, Some(user)) => ItemScope::ByUser(EntityId::new(user)),
                (false, None) => ItemScope::All,
            };
            let items = context.items.load(scope).await?;
            print_json(&items)?;
        }
        Command::Item { id } => {
            let id = EntityId::new(id);
            let item = context.items.fetch_by_id(&id).await?;
            context.reactions.load_for_item(&id).await?;
            print_json(&json!({
                "item": item,
                "mine": context.items.is_mine(&item),
                "reactions": context.reactions.counts(),
                "my_reaction": context.reactions.my_reaction().map(|r| r.kind),
            }))?;
        }
        Command::Tags => {
            let tags = context.tags.load_all().await?;
            print_json(&tags)?;
        }
        Command::React { item_id, kind } => {
            let reaction = context
                .reactions
                .add(&EntityId::new(item_id), &kind)
                .await?;
            print_json(&reaction)?;
        }
        Command::Check { path } => {
            let route = Route::parse(&path)
                .ok_or_else(|| anyhow::anyhow!("Unknown route: {}", path))?;
            let navigation = Navigation::to(route);
            let decision = context.guard.check(&navigation).await;

            let outcome = match &decision {
                Decision::Allow => "allow",
                Decision::Redirect(_) => "redirect",
                Decision::Deny(_) => "deny",
            };
            print_json(&json!({
                "route": navigation.to.name(),
                "decision": outcome,
                "destination": decision.destination(&navigation).path(),
                "notice": decision.notice(),
            }))?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
