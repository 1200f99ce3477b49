use super::Parser;

#[derive(Parser, Debug)]
#[command(name = "warden", about = "Identity and session service")]
pub struct Cli {
    /// Path to a TOML settings file; defaults to settings/dev.toml or settings/release.toml.
    #[arg(long)]
    pub settings: Option<String>,
}
