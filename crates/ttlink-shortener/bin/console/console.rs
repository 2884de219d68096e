use jiff::tz::TimeZone;
use jiff::Timestamp;
use std::io::{self, Write};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use ttlink_core::{
    Clock, ErrorKind, IdentityProvider, LinkError, LinkRepository, LinkStatus, ShortLink,
    SystemClock, ValidationError,
};
use ttlink_generator::KeyGenerator;
use ttlink_shortener::{IdentityError, LinkService, SessionIdentity};

const TIME_FORMAT: &str = "%d.%m.%Y %H:%M:%S";
const MAX_LISTED_URL_CHARS: usize = 60;

const HELP: &str = "\
User:
  whoami
  new-user
  switch-user <uuid>

Links:
  create <url> [maxClicks]
  open <shortKey>
  list
  list-all
  set-limit <shortKey> <newMaxClicks>
  delete <shortKey>
  export       (your links as JSON)

Other:
  help
  exit
";

/// One line of console input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    WhoAmI,
    NewUser,
    SwitchUser(String),
    Create { url: String, max_clicks: Option<i64> },
    Open(String),
    List,
    ListAll,
    SetLimit { key: String, max_clicks: i64 },
    Delete(String),
    Export,
    Help,
    Exit,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("Input error: number expected, got '{0}'")]
    NotANumber(String),

    #[error("Unknown command '{0}'. Type 'help'.")]
    Unknown(String),
}

impl Command {
    /// Parses one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Command>, ParseError> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(name) = parts.first() else {
            return Ok(None);
        };

        let command = match (name.to_lowercase().as_str(), &parts[1..]) {
            ("whoami", []) => Command::WhoAmI,
            ("new-user", []) => Command::NewUser,
            ("switch-user", [user]) => Command::SwitchUser(user.to_string()),
            ("switch-user", _) => return Err(ParseError::Usage("switch-user <uuid>")),
            ("create", [url]) => Command::Create {
                url: url.to_string(),
                max_clicks: None,
            },
            ("create", [url, max_clicks]) => Command::Create {
                url: url.to_string(),
                max_clicks: Some(parse_number(max_clicks)?),
            },
            ("create", _) => return Err(ParseError::Usage("create <url> [maxClicks]")),
            ("open", [key]) => Command::Open(key.to_string()),
            ("open", _) => return Err(ParseError::Usage("open <shortKey>")),
            ("list", _) => Command::List,
            ("list-all", _) => Command::ListAll,
            ("set-limit", [key, max_clicks]) => Command::SetLimit {
                key: key.to_string(),
                max_clicks: parse_number(max_clicks)?,
            },
            ("set-limit", _) => {
                return Err(ParseError::Usage("set-limit <shortKey> <newMaxClicks>"))
            }
            ("delete", [key]) => Command::Delete(key.to_string()),
            ("delete", _) => return Err(ParseError::Usage("delete <shortKey>")),
            ("export", _) => Command::Export,
            ("help", _) => Command::Help,
            ("exit" | "quit", _) => Command::Exit,
            (other, _) => return Err(ParseError::Unknown(other.to_string())),
        };

        Ok(Some(command))
    }
}

fn parse_number(raw: &str) -> Result<i64, ParseError> {
    raw.parse()
        .map_err(|_| ParseError::NotANumber(raw.to_string()))
}

fn click_quota(raw: i64) -> Result<u32, LinkError> {
    u32::try_from(raw).map_err(|_| ValidationError::InvalidMaxClicks(raw).into())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

#[derive(Debug, Error)]
enum CommandError {
    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Output(#[from] io::Error),

    #[error(transparent)]
    Export(#[from] serde_json::Error),
}

/// Line-oriented front end over a [`LinkService`].
pub struct Console<R, G, C = SystemClock> {
    service: LinkService<R, G, C>,
    identity: Arc<SessionIdentity>,
    time_zone: TimeZone,
}

impl<R: LinkRepository, G: KeyGenerator, C: Clock> Console<R, G, C> {
    pub fn new(service: LinkService<R, G, C>, identity: Arc<SessionIdentity>) -> Self {
        Self {
            service,
            identity,
            time_zone: TimeZone::system(),
        }
    }

    /// Renders timestamps in `time_zone` instead of the system zone.
    pub fn with_time_zone(mut self, time_zone: TimeZone) -> Self {
        self.time_zone = time_zone;
        self
    }

    pub fn banner(&self, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "=== Link Shortener CLI ===")?;
        writeln!(out, "Current user: {}", self.identity.current_owner())?;
        writeln!(out, "Type 'help' for commands.")
    }

    /// Parses and runs one line. Command failures are reported on `out`;
    /// only a failure to write `out` is returned.
    pub async fn handle_line(&self, line: &str, out: &mut impl Write) -> io::Result<Flow> {
        let command = match Command::parse(line) {
            Ok(Some(command)) => command,
            Ok(None) => return Ok(Flow::Continue),
            Err(err) => {
                writeln!(out, "{}", err)?;
                return Ok(Flow::Continue);
            }
        };

        if command == Command::Exit {
            writeln!(out, "Bye!")?;
            return Ok(Flow::Exit);
        }

        debug!(?command, "running console command");
        match self.execute(command, out).await {
            Ok(()) => {}
            Err(CommandError::Output(err)) => return Err(err),
            Err(CommandError::Link(err)) => writeln!(out, "{}: {}", prefix(&err), err)?,
            Err(CommandError::Identity(err)) => writeln!(out, "Input error: {}", err)?,
            Err(CommandError::Export(err)) => writeln!(out, "Fatal: export failed: {}", err)?,
        }

        Ok(Flow::Continue)
    }

    async fn execute(&self, command: Command, out: &mut impl Write) -> Result<(), CommandError> {
        let owner = self.identity.current_owner();

        match command {
            Command::WhoAmI => writeln!(out, "Current user: {}", owner)?,
            Command::NewUser => {
                let user = self.identity.create_new_user();
                writeln!(out, "Created and switched to new user: {}", user)?;
            }
            Command::SwitchUser(user) => {
                let user = self.identity.switch_user(&user)?;
                writeln!(out, "Switched to user: {}", user)?;
            }
            Command::Create { url, max_clicks } => {
                let max_clicks = max_clicks.map(click_quota).transpose()?;
                let link = self.service.create(&url, &owner, max_clicks).await?;

                writeln!(out, "Created short link:")?;
                writeln!(out, "  shortKey: {}", link.short_key())?;
                writeln!(out, "  original: {}", link.original_url())?;
                writeln!(out, "  maxClicks: {}", link.max_clicks())?;
                writeln!(out, "  expiresAt: {}", self.format_time(link.expires_at()))?;
            }
            Command::Open(key) => {
                let url = self.service.resolve(&key).await?;
                writeln!(out, "Open: {}", url)?;
            }
            Command::List => {
                let links = self.service.links_of(&owner).await?;
                if links.is_empty() {
                    writeln!(out, "No links for current user.")?;
                }
                for link in links {
                    writeln!(
                        out,
                        "- {} -> {} | clicks: {}/{} | status: {}",
                        link.short_key(),
                        link.original_url(),
                        link.clicks(),
                        link.max_clicks(),
                        link.status()
                    )?;
                }
            }
            Command::ListAll => {
                let links = self.service.all_links().await?;
                if links.is_empty() {
                    writeln!(out, "No links in system.")?;
                } else {
                    self.write_table(&links, out)?;
                }
            }
            Command::SetLimit { key, max_clicks } => {
                let max_clicks = click_quota(max_clicks)?;
                let link = self
                    .service
                    .update_max_clicks(&key, &owner, max_clicks)
                    .await?;

                writeln!(
                    out,
                    "Updated: {} maxClicks={}",
                    link.short_key(),
                    link.max_clicks()
                )?;
                if link.status() == LinkStatus::ExpiredByClicks {
                    writeln!(
                        out,
                        "Notice: link is now unavailable because clicks ({}) already reached the new limit.",
                        link.clicks()
                    )?;
                }
            }
            Command::Delete(key) => {
                if self.service.delete_by_owner(&key, &owner).await? {
                    writeln!(out, "Deleted {}.", key)?;
                } else {
                    writeln!(out, "Nothing deleted.")?;
                }
            }
            Command::Export => {
                let links = self.service.links_of(&owner).await?;
                writeln!(out, "{}", serde_json::to_string_pretty(&links)?)?;
            }
            Command::Help => write!(out, "{}", HELP)?,
            Command::Exit => {}
        }

        Ok(())
    }

    fn write_table(&self, links: &[ShortLink], out: &mut impl Write) -> io::Result<()> {
        writeln!(
            out,
            "{:<36}  {:<10}  {:<7}  {:<12}  {:<19}  ORIGINAL",
            "OWNER UUID", "SHORTKEY", "STATUS", "CLICKS", "EXPIRES AT"
        )?;
        writeln!(out, "{}", "-".repeat(36 + 2 + 10 + 2 + 7 + 2 + 12 + 2 + 19 + 2 + 30))?;

        for link in links {
            writeln!(
                out,
                "{:<36}  {:<10}  {:<7}  {:<12}  {:<19}  {}",
                link.owner_id(),
                link.short_key().as_str(),
                link.status().short_label(),
                format!("{}/{}", link.clicks(), link.max_clicks()),
                self.format_time(link.expires_at()),
                truncate(link.original_url(), MAX_LISTED_URL_CHARS)
            )?;
        }

        Ok(())
    }

    fn format_time(&self, at: Timestamp) -> String {
        at.to_zoned(self.time_zone.clone())
            .strftime(TIME_FORMAT)
            .to_string()
    }
}

fn prefix(err: &LinkError) -> &'static str {
    match err.kind() {
        ErrorKind::Validation => "Input error",
        ErrorKind::NotFound => "Not found",
        ErrorKind::AccessDenied => "Access denied",
        ErrorKind::KeyspaceExhausted | ErrorKind::Storage => "Fatal",
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars - 3).collect();
    format!("{}...", kept)
}
