//! CLI for nestwalk.
//!
//! `serve`: expose the all-nested-groups resource over MCP (HTTP or stdio).
//! `walk`: walk one group and print the tree or JSON.

use clap::{Args, Parser, Subcommand};
use nestwalk_core::error::{NestwalkError, NestwalkResult};
use nestwalk_core::GroupId;
use nestwalk_provider::gitlab::DEFAULT_HOST;
use nestwalk_provider::{GitLabLister, InMemoryLister, SharedLister};
use nestwalk_server::{McpServer, NestedGroupsResource, DEFAULT_PORT};
use nestwalk_traversal::{Report, Walker, DEFAULT_MAX_DEPTH};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(name = "nestwalk", version, about = "Recursive GitLab subgroup listing over MCP")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the all-nested-groups resource.
    Serve {
        #[command(flatten)]
        gitlab: GitLabArgs,

        #[command(flatten)]
        walk: WalkArgs,

        #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
        port: u16,

        #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
        bind: IpAddr,

        /// Speak MCP on stdin/stdout instead of HTTP.
        #[arg(long, default_value_t = false)]
        stdio: bool,
    },
    /// Walk one group and print its nested subgroups.
    Walk {
        /// Numeric group id or full path.
        group: String,

        #[command(flatten)]
        gitlab: GitLabArgs,

        #[command(flatten)]
        walk: WalkArgs,

        /// Read the hierarchy from a JSON fixture instead of GitLab.
        #[arg(long)]
        fixture: Option<PathBuf>,

        /// Print the full outcome tree as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[derive(Args, Debug, Clone)]
struct GitLabArgs {
    /// Bearer token for the GitLab API.
    #[arg(long, env = "GITLAB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[arg(long, env = "GITLAB_HOST", default_value = DEFAULT_HOST)]
    host: String,

    #[arg(long, env = "NESTWALK_PER_PAGE", default_value_t = 100)]
    per_page: u32,

    #[arg(long, env = "NESTWALK_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,
}

impl GitLabArgs {
    fn lister(&self) -> NestwalkResult<GitLabLister> {
        let token = self
            .token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| NestwalkError::Config("Set GITLAB_TOKEN in your environment.".into()))?;

        Ok(GitLabLister::new(&self.host, token)?
            .with_per_page(self.per_page)
            .with_timeout(Duration::from_secs(self.timeout_secs)))
    }
}

#[derive(Args, Debug, Clone)]
struct WalkArgs {
    #[arg(long, env = "NESTWALK_MAX_DEPTH", default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: u32,

    /// Max in-flight listing calls; 1 walks strictly sequentially.
    #[arg(long, env = "NESTWALK_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,
}

impl WalkArgs {
    fn walker(&self, lister: SharedLister) -> Walker {
        Walker::new(lister)
            .with_max_depth(self.max_depth)
            .with_concurrency(self.concurrency)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // stdout carries MCP frames in stdio mode, so logs always go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            gitlab,
            walk,
            port,
            bind,
            stdio,
        } => {
            let lister = gitlab.lister()?;
            let server = McpServer::new(NestedGroupsResource::new(
                walk.walker(Arc::new(lister)),
            ));

            tracing::info!(
                host = %gitlab.host,
                max_depth = walk.max_depth,
                concurrency = walk.concurrency,
                stdio,
                "starting nestwalk"
            );

            if stdio {
                nestwalk_server::stdio::serve_stdio(server).await?;
            } else {
                nestwalk_server::http::serve(server, SocketAddr::new(bind, port)).await?;
            }
        }
        Commands::Walk {
            group,
            gitlab,
            walk,
            fixture,
            json,
        } => {
            let lister: SharedLister = match fixture {
                Some(path) => {
                    let raw = std::fs::read_to_string(&path).map_err(|e| {
                        NestwalkError::InvalidInput(format!("Failed to read {}: {e}", path.display()))
                    })?;
                    Arc::new(InMemoryLister::from_json(&raw)?)
                }
                None => Arc::new(gitlab.lister()?),
            };

            let root = GroupId::parse(&group)?;
            let t0 = Instant::now();
            let traversal = walk.walker(lister).walk(&root).await;

            if json {
                println!("{}", serde_json::to_string_pretty(&traversal)?);
            } else {
                print!("{}", Report::build(&traversal, t0.elapsed()).render());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_defaults() {
        let cli = Cli::try_parse_from(["nestwalk", "serve", "--token", "t"]).unwrap();
        let Commands::Serve {
            gitlab,
            walk,
            bind,
            stdio,
            ..
        } = cli.command
        else {
            panic!("expected serve");
        };
        assert_eq!(gitlab.token.as_deref(), Some("t"));
        assert_eq!(walk.concurrency, 1);
        assert_eq!(bind, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert!(!stdio);
    }

    #[test]
    fn walk_flags() {
        let cli = Cli::try_parse_from([
            "nestwalk",
            "walk",
            "gitlab-org/frontend",
            "--max-depth",
            "2",
            "--concurrency",
            "8",
            "--host",
            "https://git.example.com",
            "--json",
        ])
        .unwrap();
        let Commands::Walk {
            group,
            gitlab,
            walk,
            json,
            fixture,
        } = cli.command
        else {
            panic!("expected walk");
        };
        assert_eq!(group, "gitlab-org/frontend");
        assert_eq!(gitlab.host, "https://git.example.com");
        assert_eq!(walk.max_depth, 2);
        assert_eq!(walk.concurrency, 8);
        assert!(json);
        assert!(fixture.is_none());
    }

    #[test]
    fn walk_requires_group() {
        assert!(Cli::try_parse_from(["nestwalk", "walk"]).is_err());
    }

    #[test]
    fn missing_token_is_a_config_error() {
        let args = GitLabArgs {
            token: None,
            host: DEFAULT_HOST.into(),
            per_page: 100,
            timeout_secs: 30,
        };
        assert!(matches!(args.lister(), Err(NestwalkError::Config(_))));

        let blank = GitLabArgs {
            token: Some("  ".into()),
            ..args
        };
        assert!(matches!(blank.lister(), Err(NestwalkError::Config(_))));
    }

    #[test]
    fn token_builds_lister() {
        let args = GitLabArgs {
            token: Some("glpat-x".into()),
            host: "https://git.example.com/".into(),
            per_page: 20,
            timeout_secs: 5,
        };
        let lister = args.lister().unwrap();
        assert_eq!(lister.host().as_str(), "https://git.example.com/");
    }
}
