use std::path::PathBuf;

use clap::Parser;
use splatkit::{ApiConfig, SessionConfig};
use url::Url;

/// Splatkit - dynamic routes, OAuth2 login and cookie preferences on axum
#[derive(Parser, Debug, Clone)]
#[command(name = "splatkit")]
#[command(version, about, long_about = None)]
pub struct ServerConfig {
    /// Host address to bind the server to
    #[arg(long, short = 'H', default_value = "0.0.0.0", env = "HOST")]
    pub host: String,

    /// Port to listen on
    #[arg(long, short, default_value = "3000", env = "PORT")]
    pub port: u16,

    /// Public origin used to build OAuth2 callback URLs
    #[arg(long, default_value = "http://localhost:3000", env = "WEBSITE_URL")]
    pub website_url: Url,

    /// Directory whose files are served under `icon/<file stem>`
    #[arg(long, env = "ICON_DIR")]
    pub icon_dir: Option<PathBuf>,

    /// Register the mock login provider
    #[arg(long, env = "MOCK_AUTH")]
    pub mock_auth: bool,

    /// Session signing secret
    #[arg(long, env = "COOKIE_AUTH_SECRET", hide_env_values = true)]
    pub session_secret: Option<String>,
}

impl ServerConfig {
    /// Address to bind when no listener is handed over.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig::new(self.website_url.clone())
    }

    /// Session settings from the environment, with the CLI secret taking
    /// precedence.
    pub fn session_config(&self) -> SessionConfig {
        let config = SessionConfig::from_env();
        match &self.session_secret {
            Some(secret) => config.with_secret(secret.clone()),
            None => config,
        }
    }
}
