use clap::{Parser, Subcommand};

/// Keysmith — API credential issuance and session token service
#[derive(Parser)]
#[command(name = "keysmith", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to bind (defaults to KEYSMITH_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Manage API credentials
    Key {
        #[command(subcommand)]
        command: KeyCommands,
    },

    /// Inspect session tokens
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },
}

#[derive(Subcommand)]
pub enum KeyCommands {
    /// Issue a new credential. The secret is printed exactly once.
    Issue {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        note: Option<String>,
    },
    /// Show the public reference of an owner's latest credential
    Show {
        #[arg(long)]
        owner: String,
    },
}

#[derive(Subcommand)]
pub enum SessionCommands {
    /// Verify a session token against the configured signing key
    Verify {
        /// The token (without the "Bearer " prefix)
        token: String,
    },
}
