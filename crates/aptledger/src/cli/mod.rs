//! Command-line interface for aptledger.
//!
//! This module provides the CLI structure for the `aptledger` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    AccountArgs, AuditCommand, BackupCommand, CollectionArg, ConfigCommand, ItemCommand,
    LanguageArg, OutputFormat, PurchaseCommand, RegisterCommand, ReportCommand, ReportKindArg,
    RoleArg, ScopeArg, StatusCommand, TrashCommand, TrashKindArg, UserCommand, VendorCommand,
};

/// aptledger - Track apartment purchases
///
/// Log purchases against a shared catalog of vendors and items, see
/// dashboards and reports, and manage accounts, backups and the trash.
#[derive(Debug, Parser)]
#[command(name = "aptledger")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log in as this user
    #[arg(short, long, global = true, env = "APTLEDGER_USER")]
    pub user: Option<String>,

    /// Password for --user
    #[arg(short, long, global = true, env = "APTLEDGER_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create the first system administrator
    Setup(RegisterCommand),

    /// Create your own account, when self-registration is enabled
    Register(RegisterCommand),

    /// Manage accounts
    #[command(subcommand)]
    User(UserCommand),

    /// Manage vendors
    #[command(subcommand)]
    Vendor(VendorCommand),

    /// Manage items
    #[command(subcommand)]
    Item(ItemCommand),

    /// Log and list purchases
    #[command(subcommand)]
    Purchase(PurchaseCommand),

    /// Inspect and empty the trash
    #[command(subcommand)]
    Trash(TrashCommand),

    /// Create and restore backups
    #[command(subcommand)]
    Backup(BackupCommand),

    /// Spending reports
    Report(ReportCommand),

    /// Current month overview
    Dashboard {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the audit log
    Audit(AuditCommand),

    /// Score a password without storing it
    PasswordStrength {
        /// The password to score
        password: String,
    },

    /// Show database status
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Command {
    /// Whether the command runs without logging in.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        matches!(
            self,
            Self::Setup(_)
                | Self::Register(_)
                | Self::PasswordStrength { .. }
                | Self::Status(_)
                | Self::Config(_)
        )
    }
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        crate::logging::Verbosity::from_flags(self.verbose, self.quiet)
    }
}
