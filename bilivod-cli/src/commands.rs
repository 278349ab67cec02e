use crate::{
    cli::OutputFormat,
    config::AppConfig,
    error::{CliError, Result},
    output::{OutputManager, write_output},
    serve,
};
#[cfg(feature = "colored-output")]
use colored::*;
use bilivod_resolver::extractor::platform_extractor::SourceResolver;
use bilivod_resolver::extractor::{ProxyConfig, create_client};
use bilivod_resolver::{Bilibili, PlayableSource, ResolverConfig};
use hls_bridge::{BridgeConfig, HttpRangeFetcher, PlaylistBridge};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use reqwest::header::{REFERER, USER_AGENT};
use std::{net::SocketAddr, path::Path, sync::Arc, time::Duration};
use tracing::{debug, info};

/// Command-line overrides for the configured session.
#[derive(Debug, Default)]
pub struct SessionOverrides {
    pub timeout: Option<u64>,
    pub cookies: Option<String>,
    pub proxy: Option<String>,
    pub proxy_username: Option<String>,
    pub proxy_password: Option<String>,
    pub output: Option<OutputFormat>,
}

pub struct CommandExecutor {
    config: AppConfig,
    client: Client,
    cookies: Option<String>,
    output_format: OutputFormat,
    quiet: bool,
}

impl CommandExecutor {
    pub fn new(config: AppConfig, overrides: SessionOverrides, quiet: bool) -> Result<Self> {
        let proxy_config = match overrides.proxy {
            Some(url) => Some(ProxyConfig {
                url,
                username: overrides.proxy_username,
                password: overrides.proxy_password,
            }),
            None => config.default_proxy.clone().map(|url| ProxyConfig {
                url,
                username: config.default_proxy_username.clone(),
                password: config.default_proxy_password.clone(),
            }),
        };

        let timeout = Duration::from_secs(overrides.timeout.unwrap_or(config.default_timeout));
        let client = create_client(proxy_config, timeout)?;
        debug!("HTTP client ready (timeout {:?})", timeout);

        Ok(Self {
            cookies: overrides.cookies.or_else(|| config.default_cookies.clone()),
            output_format: overrides.output.unwrap_or(config.default_output_format),
            config,
            client,
            quiet,
        })
    }

    fn resolver(&self) -> Result<Bilibili> {
        let mut session = Bilibili::session(self.client.clone(), self.cookies.as_deref());
        if let Some(ua) = &self.config.user_agent {
            session.add_header(USER_AGENT.as_str(), ua)?;
        }
        Ok(Bilibili::new(session, ResolverConfig::default()))
    }

    pub async fn resolve(
        &self,
        input: &str,
        page: Option<u64>,
        output_file: Option<&Path>,
    ) -> Result<()> {
        let resolver = self.resolver()?;
        let source = self.resolve_with_progress(&resolver, input, page).await?;

        let output = OutputManager::new(self.config.colored_output)
            .format_source(&source, self.output_format)?;
        write_output(&output, output_file)?;

        if let Some(path) = output_file {
            self.print_success(&format!("Output saved to: {}", path.display()));
        }
        Ok(())
    }

    pub async fn pages(&self, input: &str) -> Result<()> {
        let resolver = self.resolver()?;
        let bvid = Bilibili::extract_bvid(input)?;

        let pb = self.create_progress_bar("Fetching pages...");
        let pages = resolver.list_pages(bvid).await;
        pb.finish_and_clear();

        let output = OutputManager::new(self.config.colored_output)
            .format_pages(&pages?, self.output_format)?;
        write_output(&output, None)
    }

    pub async fn serve(
        &self,
        input: &str,
        page: Option<u64>,
        bind: Option<SocketAddr>,
    ) -> Result<()> {
        let bind = match bind {
            Some(addr) => addr,
            None => self.config.bind_address.parse()?,
        };
        if !bind.ip().is_loopback() {
            return Err(CliError::invalid_input(format!(
                "refusing to serve on non-loopback address {bind}"
            )));
        }

        let resolver = self.resolver()?;
        let source = self.resolve_with_progress(&resolver, input, page).await?;

        if let Some(url) = source.single_url() {
            info!("Source is a single progressive file, nothing to bridge");
            println!("{url}");
            return Ok(());
        }

        let extractor = resolver.get_extractor();
        let mut bridge_config = BridgeConfig::default().with_base_uri(format!("http://{bind}/playlist"));
        if let Some(referer) = extractor.header_str(REFERER) {
            bridge_config.referer = referer.to_string();
        }
        if let Some(ua) = extractor.header_str(USER_AGENT) {
            bridge_config.user_agent = ua.to_string();
        }

        let fetcher = HttpRangeFetcher::new(self.client.clone(), &bridge_config)?;
        let bridge = PlaylistBridge::new(&source, Arc::new(fetcher), bridge_config)?;

        self.print_success(&format!("Master playlist: {}", bridge.master_uri()));
        serve::run(Arc::new(bridge), bind).await
    }

    async fn resolve_with_progress(
        &self,
        resolver: &Bilibili,
        input: &str,
        page: Option<u64>,
    ) -> Result<PlayableSource> {
        let pb = self.create_progress_bar("Resolving...");
        let result = resolver.resolve(input, page).await;
        pb.finish_and_clear();
        Ok(result?)
    }

    fn create_progress_bar(&self, message: &str) -> ProgressBar {
        if self.quiet {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new_spinner();
        pb.enable_steady_tick(Duration::from_millis(120));
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "),
        );
        pb.set_message(message.to_string());
        pb
    }

    fn print_success(&self, message: &str) {
        if self.quiet {
            return;
        }

        #[cfg(feature = "colored-output")]
        {
            if self.config.colored_output {
                eprintln!("{} {}", "✓".green(), message);
                return;
            }
        }
        eprintln!("✓ {message}");
    }
}
