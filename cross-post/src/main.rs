//! cross-post - Publish one post to Facebook Pages, LinkedIn and WordPress.com

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::io::{IsTerminal, Read};
use std::path::PathBuf;
use std::sync::Arc;

use libcrosspost::logging::LoggingConfig;
use libcrosspost::providers::WordPressClient;
use libcrosspost::{
    build_publisher, Config, CrosspostError, CredentialStore, FileCredentialStore, HttpTransport,
    MediaFile, MediaRef, PostPayload, Provider, PublishOrchestrator, PublishReport, Publisher,
    ReqwestTransport, Result, TargetContainer, Visibility,
};

#[derive(Parser, Debug)]
#[command(name = "cross-post")]
#[command(version, about = "Publish one post to Facebook Pages, LinkedIn and WordPress.com")]
#[command(long_about = r#"Publish one post to Facebook Pages, LinkedIn and WordPress.com.

Each provider is validated and published independently: a failure on one
provider never stops the others, and the result is reported per provider.

EXAMPLES:
    # Publish to the default providers from config.toml
    cross-post post "Hello from cross-post"

    # Pick providers and targets explicitly
    cross-post post "Launch day" --platform linkedin,facebook --facebook-page 1234567890

    # WordPress child page with an image
    cross-post post "Details inside" -p wordpress --wordpress-site 987 \
        --wordpress-parent 55 --title "Release notes" --image shot.png

    # Read content from stdin, JSON report for scripting
    echo "From a pipe" | cross-post --format json post

    # List Facebook Pages or WordPress sites, show the linked account
    cross-post containers facebook
    cross-post containers wordpress --site 987
    cross-post whoami linkedin

EXIT CODES:
    0 - Success on every selected provider
    1 - At least one provider failed
    2 - Authentication required (every failure was AuthRequired)
    3 - Invalid input
"#)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Output format
    #[arg(short, long, global = true, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Publish content to one or more providers
    Post(PostArgs),

    /// List publishing targets: Facebook Pages, WordPress sites (or a site's pages)
    Containers {
        /// facebook, linkedin or wordpress
        provider: String,

        /// List the published pages of this WordPress site instead of the sites
        #[arg(long, value_name = "SITE_ID")]
        site: Option<u64>,
    },

    /// Show the account behind a provider's access token
    Whoami {
        /// facebook, linkedin or wordpress
        provider: String,
    },
}

#[derive(Args, Debug)]
struct PostArgs {
    /// Content to post (reads from stdin if not provided)
    content: Option<String>,

    /// Target specific provider(s) (comma-separated)
    #[arg(short, long)]
    platform: Option<String>,

    /// Facebook Page to publish to
    #[arg(long, value_name = "PAGE_ID")]
    facebook_page: Option<String>,

    /// WordPress.com site to publish to
    #[arg(long, value_name = "SITE_ID")]
    wordpress_site: Option<u64>,

    /// Parent page for the new WordPress page
    #[arg(long, value_name = "PAGE_ID")]
    wordpress_parent: Option<u64>,

    /// Post title (WordPress)
    #[arg(short, long)]
    title: Option<String>,

    /// Image to attach (repeatable)
    #[arg(short, long = "image", value_name = "PATH")]
    images: Vec<PathBuf>,

    /// LinkedIn audience: public, connections or logged-in
    #[arg(long)]
    visibility: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    LoggingConfig::from_env("error").verbose(cli.verbose).init();

    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> Result<i32> {
    let json = cli.format == "json";
    match cli.command {
        Command::Post(args) => post(args, json).await,
        Command::Containers { provider, site } => containers(&provider, site, json).await,
        Command::Whoami { provider } => whoami(&provider, json).await,
    }
}

fn parse_provider(name: &str) -> Result<Provider> {
    name.parse().map_err(CrosspostError::InvalidInput)
}

fn parse_providers(list: &str) -> Result<Vec<Provider>> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(parse_provider)
        .collect()
}

fn read_content(content: Option<String>) -> Result<String> {
    match content {
        Some(content) => Ok(content),
        None if !std::io::stdin().is_terminal() => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| CrosspostError::InvalidInput(format!("Failed to read stdin: {}", e)))?;
            Ok(buffer)
        }
        None => Ok(String::new()),
    }
}

fn transport(config: &Config) -> Result<Arc<dyn HttpTransport>> {
    Ok(Arc::new(ReqwestTransport::new(&config.http.user_agent)?))
}

async fn post(args: PostArgs, json: bool) -> Result<i32> {
    let text = read_content(args.content)?;
    if text.trim().is_empty() && args.images.is_empty() {
        return Err(CrosspostError::InvalidInput(
            "Content cannot be empty".to_string(),
        ));
    }

    let requested = args.platform.as_deref().map(parse_providers).transpose()?;
    let visibility = args
        .visibility
        .as_deref()
        .map(str::parse::<Visibility>)
        .transpose()
        .map_err(CrosspostError::InvalidInput)?;

    let mut payload = PostPayload::new(text);
    payload.title = args.title;
    payload.visibility = visibility;
    for path in &args.images {
        let file = MediaFile::from_path(path).await.map_err(|e| {
            CrosspostError::InvalidInput(format!("Failed to read image {}: {}", path.display(), e))
        })?;
        payload = payload.with_media(MediaRef::Upload(file));
    }

    let config = Config::load()?;
    let providers = match requested {
        Some(providers) => providers,
        None => config.default_providers().map_err(CrosspostError::InvalidInput)?,
    };

    let store = FileCredentialStore::from_config(&config);
    let transport = transport(&config)?;
    let mut orchestrator = PublishOrchestrator::new();
    for provider in providers {
        let target = target_for(
            provider,
            &args.facebook_page,
            args.wordpress_site,
            args.wordpress_parent,
            &config,
        );
        orchestrator.add_provider(provider, &store, transport.clone(), target);
    }

    let report = orchestrator.publish(&payload).await?;
    print_report(&report, json);
    Ok(report_exit_code(&report))
}

fn target_for(
    provider: Provider,
    facebook_page: &Option<String>,
    wordpress_site: Option<u64>,
    wordpress_parent: Option<u64>,
    config: &Config,
) -> Option<TargetContainer> {
    match provider {
        Provider::Facebook => facebook_page
            .clone()
            .or_else(|| config.facebook.as_ref().and_then(|c| c.page_id.clone()))
            .map(|page_id| TargetContainer::FacebookPage { page_id }),
        Provider::WordPress => {
            let wordpress = config.wordpress.as_ref();
            wordpress_site
                .or_else(|| wordpress.and_then(|c| c.site_id))
                .map(|site_id| TargetContainer::WordPressSite {
                    site_id,
                    parent_id: wordpress_parent.or_else(|| wordpress.and_then(|c| c.parent_id)),
                })
        }
        Provider::LinkedIn => None,
    }
}

fn report_exit_code(report: &PublishReport) -> i32 {
    let failures = report.failures();
    if failures.is_empty() {
        0
    } else if failures
        .iter()
        .all(|f| f.error_code.as_deref() == Some("AuthRequired"))
    {
        2
    } else {
        1
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(output) => println!("{}", output),
        Err(e) => eprintln!("Error: failed to render JSON output: {}", e),
    }
}

fn print_report(report: &PublishReport, json: bool) {
    if json {
        print_json(report);
        return;
    }

    for result in report.results.values() {
        if result.success {
            let post = result.data.as_ref();
            let id = post.and_then(|p| p.id.as_deref()).unwrap_or("-");
            match post.and_then(|p| p.url.as_deref()) {
                Some(url) => println!("{}: published {} ({})", result.provider, id, url),
                None => println!("{}: published {}", result.provider, id),
            }
        } else {
            println!(
                "{}: failed [{}] {}",
                result.provider,
                result.error_code.as_deref().unwrap_or("Error"),
                result.user_message.as_deref().unwrap_or("")
            );
            if let Some(technical) = &result.technical_message {
                tracing::debug!(provider = %result.provider, "{}", technical);
            }
        }
    }
}

async fn containers(provider: &str, site: Option<u64>, json: bool) -> Result<i32> {
    let provider = parse_provider(provider)?;
    if site.is_some() && provider != Provider::WordPress {
        return Err(CrosspostError::InvalidInput(
            "--site is only valid for wordpress".to_string(),
        ));
    }

    let config = Config::load()?;
    let credential = FileCredentialStore::from_config(&config).credential(provider)?;
    let transport = transport(&config)?;

    let containers = match site {
        Some(site_id) => WordPressClient::new(credential, transport).list_pages(site_id).await?,
        None => build_publisher(provider, credential, transport).containers().await?,
    };

    if json {
        print_json(&containers);
    } else if containers.is_empty() {
        println!("No containers found for {}", provider);
    } else {
        for container in &containers {
            match &container.url {
                Some(url) => println!("{}\t{}\t{}", container.id, container.name, url),
                None => println!("{}\t{}", container.id, container.name),
            }
        }
    }
    Ok(0)
}

async fn whoami(provider: &str, json: bool) -> Result<i32> {
    let provider = parse_provider(provider)?;
    let config = Config::load()?;
    let credential = FileCredentialStore::from_config(&config).credential(provider)?;
    let transport = transport(&config)?;

    let identity = build_publisher(provider, credential, transport).identity().await?;
    if json {
        print_json(&identity);
    } else {
        let name = identity.name.as_deref().unwrap_or("(no name)");
        match &identity.email {
            Some(email) => println!("{}: {} <{}> [{}]", provider, name, email, identity.id),
            None => println!("{}: {} [{}]", provider, name, identity.id),
        }
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use libcrosspost::{ErrorKind, ErrorRecord, ProviderResult, PublishedPost};
    use std::collections::BTreeMap;

    fn report(results: Vec<ProviderResult>) -> PublishReport {
        PublishReport {
            id: Default::default(),
            started_at: Default::default(),
            results: results.into_iter().map(|r| (r.provider, r)).collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn test_parse_providers() {
        assert_eq!(
            parse_providers("linkedin, wp").unwrap(),
            vec![Provider::LinkedIn, Provider::WordPress]
        );
        assert_eq!(parse_providers("myspace").unwrap_err().exit_code(), 3);
    }

    #[test]
    fn test_report_exit_codes() {
        let ok = ProviderResult::succeeded(Provider::LinkedIn, PublishedPost { id: None, url: None });
        let auth = ProviderResult::failed(ErrorRecord::auth_required(Provider::Facebook, "x"));
        let api = ProviderResult::failed(ErrorRecord::new(Provider::WordPress, ErrorKind::ApiError, 500, "x"));

        assert_eq!(report_exit_code(&report(vec![ok.clone()])), 0);
        assert_eq!(report_exit_code(&report(vec![ok.clone(), auth.clone()])), 2);
        assert_eq!(report_exit_code(&report(vec![auth, api])), 1);
    }

    #[test]
    fn test_target_for_prefers_flags_over_config() {
        let mut config = Config::default_config();
        if let Some(wordpress) = config.wordpress.as_mut() {
            wordpress.site_id = Some(1);
            wordpress.parent_id = Some(2);
        }

        assert_eq!(
            target_for(Provider::WordPress, &None, Some(9), None, &config),
            Some(TargetContainer::WordPressSite { site_id: 9, parent_id: Some(2) })
        );
        assert_eq!(
            target_for(Provider::Facebook, &Some("42".to_string()), None, None, &config),
            Some(TargetContainer::FacebookPage { page_id: "42".to_string() })
        );
        assert_eq!(target_for(Provider::Facebook, &None, None, None, &config), None);
        assert_eq!(target_for(Provider::LinkedIn, &None, Some(9), None, &config), None);
    }
}
