use color_eyre::Result;
use scotify_api::{Pkce, Session, UserApi};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::{
    callback::CallbackListener,
    config::Config,
    poller::{Cycle, Poller},
    render::{ProfileView, Renderer},
    status::StatusLine,
    Shared,
};

/// Command typed on stdin while the player is running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Refresh,
    Logout,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "r" | "refresh" => Some(Self::Refresh),
            "l" | "logout" => Some(Self::Logout),
            "q" | "quit" => Some(Self::Quit),
            _ => None,
        }
    }
}

pub struct App {
    config: Config,
    auth: Shared<Pkce>,
    poller: Poller<Pkce>,
    renderer: Shared<dyn Renderer>,
    status: StatusLine,
}

impl App {
    pub fn new(config: Config, renderer: Shared<dyn Renderer>) -> Result<Self> {
        let auth = Pkce::new(config.oauth()?, config.api_config(), Session::new());
        Ok(Self::from_parts(config, auth, renderer))
    }

    /// Build the app around an existing handshake manager
    pub fn from_parts(config: Config, auth: Pkce, renderer: Shared<dyn Renderer>) -> Self {
        let auth = Shared::new(auth);
        let status = StatusLine::new(renderer.clone(), config.status_timeout());
        let poller = Poller::new(auth.clone(), renderer.clone(), status.clone());
        Self {
            config,
            auth,
            poller,
            renderer,
            status,
        }
    }

    pub fn auth(&self) -> &Pkce {
        &self.auth
    }

    pub fn poller(&self) -> &Poller<Pkce> {
        &self.poller
    }

    /// Send the user to spotify and wait for the redirect back
    pub async fn login(&self) -> Result<ProfileView> {
        let listener = CallbackListener::bind(&self.config.redirect_uri).await?;
        let url = self.auth.begin_login()?;

        if let Err(err) = open::that(&url) {
            log::warn!("Failed to open the browser: {err}");
        }
        println!("Log in to spotify at: {url}");

        let code = listener.code().await?;
        self.complete(&code).await
    }

    /// Exchange the authorization code, show the profile and start polling
    pub async fn complete(&self, code: &str) -> Result<ProfileView> {
        let token = self.auth.complete_login(code).await?;

        let profile = ProfileView::from(&self.auth.current_user_profile(token.access()).await?);
        log::info!("Logged in as {}", profile.name);
        self.renderer.render_profile(Some(&profile));

        self.poller.start(self.config.poll_interval());
        Ok(profile)
    }

    pub fn logout(&self) -> Result<()> {
        self.poller.stop();
        self.status.clear();
        self.auth.logout()?;
        self.renderer.render_profile(None);
        log::info!("Logged out");
        Ok(())
    }

    pub async fn refresh_now(&self) -> Cycle {
        self.poller.poll_now().await
    }

    /// Log in and handle commands until the user quits or logs out
    pub async fn run(&self) -> Result<()> {
        self.login().await?;
        println!("Commands: [r]efresh, [l]ogout, [q]uit");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdin_open = true;

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    return self.logout();
                }
                line = lines.next_line(), if stdin_open => match line? {
                    Some(line) => match Command::parse(&line) {
                        Some(Command::Refresh) => {
                            log::debug!("Manual refresh: {:?}", self.refresh_now().await);
                        }
                        Some(Command::Logout) => return self.logout(),
                        Some(Command::Quit) => {
                            self.poller.stop();
                            return Ok(());
                        }
                        None => self.status.notify(format!("Unknown command `{}`", line.trim())),
                    },
                    None => stdin_open = false,
                },
            }
        }
    }
}
