//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::ledger::TrashKind;
use crate::model::{BackupScope, Collection, Language, Role};
use crate::report::ReportKind;

/// Account fields shared by `setup`, `register` and `user add`.
#[derive(Debug, Args)]
pub struct AccountArgs {
    /// Login name
    #[arg(long)]
    pub username: String,

    /// Display name in English
    #[arg(long)]
    pub name: String,

    /// Display name in Arabic
    #[arg(long, default_value = "")]
    pub arabic_name: String,

    /// Contact email
    #[arg(long)]
    pub email: String,

    /// Apartment the account belongs to
    #[arg(long)]
    pub apartment: String,

    /// Preferred language
    #[arg(long, value_enum, default_value = "en")]
    pub language: LanguageArg,
}

/// Setup and self-registration arguments.
#[derive(Debug, Args)]
pub struct RegisterCommand {
    /// Account details
    #[command(flatten)]
    pub account: AccountArgs,

    /// Password for the new account
    #[arg(long, env = "APTLEDGER_NEW_PASSWORD", hide_env_values = true)]
    pub new_password: String,
}

/// Account management commands.
#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// List accounts
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Show one account
    Show {
        /// Account id
        id: String,
    },

    /// Create an account
    Add {
        /// Account details
        #[command(flatten)]
        account: AccountArgs,

        /// Role of the new account
        #[arg(long, value_enum, default_value = "apartment-user")]
        role: RoleArg,

        /// Initial password
        #[arg(long, env = "APTLEDGER_NEW_PASSWORD", hide_env_values = true)]
        new_password: String,
    },

    /// Edit an account
    Update {
        /// Account id
        id: String,

        /// New English name
        #[arg(long)]
        name: Option<String>,

        /// New Arabic name
        #[arg(long)]
        arabic_name: Option<String>,

        /// New email
        #[arg(long)]
        email: Option<String>,

        /// Move to another apartment
        #[arg(long)]
        apartment: Option<String>,

        /// New role
        #[arg(long, value_enum)]
        role: Option<RoleArg>,

        /// New preferred language
        #[arg(long, value_enum)]
        language: Option<LanguageArg>,
    },

    /// Allow an account to log in again
    Activate {
        /// Account id
        id: String,
    },

    /// Stop an account from logging in
    Deactivate {
        /// Account id
        id: String,
    },

    /// Set a new password for an account, generating one if none is given
    ResetPassword {
        /// Account id
        id: String,

        /// The new password
        #[arg(long)]
        new_password: Option<String>,
    },

    /// Change your own password
    ChangePassword {
        /// The new password
        #[arg(long, env = "APTLEDGER_NEW_PASSWORD", hide_env_values = true)]
        new_password: String,
    },

    /// Edit your own profile
    Profile {
        /// New English name
        #[arg(long)]
        name: Option<String>,

        /// New Arabic name
        #[arg(long)]
        arabic_name: Option<String>,

        /// New email
        #[arg(long)]
        email: Option<String>,

        /// New preferred language
        #[arg(long, value_enum)]
        language: Option<LanguageArg>,
    },

    /// Show your account activity
    Activity {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

/// Vendor commands.
#[derive(Debug, Subcommand)]
pub enum VendorCommand {
    /// List active vendors
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Add a vendor
    Add {
        /// Name in English
        name: String,

        /// Name in Arabic
        #[arg(long, default_value = "")]
        arabic_name: String,

        /// Contact person
        #[arg(long, default_value = "")]
        contact: String,

        /// Phone number
        #[arg(long, default_value = "")]
        phone: String,

        /// Email address
        #[arg(long, default_value = "")]
        email: String,
    },

    /// Edit a vendor
    Update {
        /// Vendor id
        id: String,

        /// New English name
        #[arg(long)]
        name: Option<String>,

        /// New Arabic name
        #[arg(long)]
        arabic_name: Option<String>,

        /// New contact person
        #[arg(long)]
        contact: Option<String>,

        /// New phone number
        #[arg(long)]
        phone: Option<String>,

        /// New email address
        #[arg(long)]
        email: Option<String>,
    },

    /// Move a vendor to the trash
    Trash {
        /// Vendor id
        id: String,
    },
}

/// Item commands.
#[derive(Debug, Subcommand)]
pub enum ItemCommand {
    /// List active items
    List {
        /// Only this category
        #[arg(long)]
        category: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// List item categories in use
    Categories,

    /// Add an item
    Add {
        /// Name in English
        name: String,

        /// Category
        #[arg(long)]
        category: String,

        /// Default price per unit
        #[arg(long)]
        price: f64,

        /// Name in Arabic
        #[arg(long, default_value = "")]
        arabic_name: String,

        /// Description
        #[arg(long, default_value = "")]
        description: String,
    },

    /// Edit an item
    Update {
        /// Item id
        id: String,

        /// New English name
        #[arg(long)]
        name: Option<String>,

        /// New Arabic name
        #[arg(long)]
        arabic_name: Option<String>,

        /// New category
        #[arg(long)]
        category: Option<String>,

        /// New default price
        #[arg(long)]
        price: Option<f64>,

        /// New description
        #[arg(long)]
        description: Option<String>,
    },

    /// Move an item to the trash
    Trash {
        /// Item id
        id: String,
    },
}

/// Purchase commands.
#[derive(Debug, Subcommand)]
pub enum PurchaseCommand {
    /// List purchases, newest first
    List {
        /// Purchased on or after this date (YYYY-MM-DD)
        #[arg(long)]
        since: Option<String>,

        /// Purchased before this date (YYYY-MM-DD)
        #[arg(long)]
        until: Option<String>,

        /// Only from this vendor
        #[arg(long)]
        vendor: Option<String>,

        /// Only of this item
        #[arg(long)]
        item: Option<String>,

        /// Maximum number of results
        #[arg(short, long, default_value = "50")]
        limit: usize,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Log a purchase
    Add {
        /// Vendor id
        #[arg(long)]
        vendor: String,

        /// Item id
        #[arg(long)]
        item: String,

        /// Units bought
        #[arg(long, default_value = "1")]
        quantity: u32,

        /// Price per unit; defaults to the item's price
        #[arg(long)]
        price: Option<f64>,

        /// Purchase date (YYYY-MM-DD); defaults to now
        #[arg(long)]
        date: Option<String>,
    },

    /// Show one purchase
    Show {
        /// Purchase id
        id: String,
    },

    /// Move a purchase to the trash
    Trash {
        /// Purchase id
        id: String,
    },
}

/// Trash commands.
#[derive(Debug, Subcommand)]
pub enum TrashCommand {
    /// List trashed records
    List {
        /// Only this kind of record
        #[arg(long, value_enum)]
        kind: Option<TrashKindArg>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Bring a record back
    Restore {
        /// Record kind
        #[arg(value_enum)]
        kind: TrashKindArg,

        /// Record id
        id: String,
    },

    /// Permanently delete one trashed record
    Purge {
        /// Record kind
        #[arg(value_enum)]
        kind: TrashKindArg,

        /// Record id
        id: String,
    },

    /// Permanently delete everything in the trash you manage
    Empty {
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Permanently delete records past the retention window
    PurgeExpired,
}

/// Backup commands.
#[derive(Debug, Subcommand)]
pub enum BackupCommand {
    /// Write a backup file
    Create {
        /// What to back up
        #[arg(long, value_enum, default_value = "apartment")]
        scope: ScopeArg,

        /// Apartment to back up; defaults to yours
        #[arg(long)]
        apartment: Option<String>,

        /// Include trashed records
        #[arg(long)]
        include_deleted: bool,

        /// Encrypt the backup with a passphrase
        #[arg(long)]
        encrypt: bool,

        /// Passphrase for encryption
        #[arg(long, env = "APTLEDGER_BACKUP_PASSPHRASE", hide_env_values = true)]
        passphrase: Option<String>,

        /// Directory to write to; defaults to the configured one
        #[arg(short, long, value_name = "DIR")]
        dir: Option<PathBuf>,
    },

    /// Restore a backup file
    Restore {
        /// Backup file
        file: PathBuf,

        /// Passphrase for encrypted backups
        #[arg(long, env = "APTLEDGER_BACKUP_PASSPHRASE", hide_env_values = true)]
        passphrase: Option<String>,

        /// Only these collections (system admins)
        #[arg(long, value_enum, value_delimiter = ',')]
        collections: Vec<CollectionArg>,
    },

    /// Show backup history
    History {
        /// Maximum number of entries
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
}

/// Report command arguments.
#[derive(Debug, Args)]
pub struct ReportCommand {
    /// Which report
    #[arg(value_enum)]
    pub kind: ReportKindArg,

    /// Period as YYYY-MM or YYYY; defaults to the current month, or the
    /// current year for the yearly report
    pub period: Option<String>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Audit log arguments.
#[derive(Debug, Args)]
pub struct AuditCommand {
    /// Maximum number of entries
    #[arg(short, long, default_value = "50")]
    pub limit: usize,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Role argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RoleArg {
    /// Every apartment
    SystemAdmin,
    /// One apartment, with administration
    ApartmentAdmin,
    /// One apartment
    ApartmentUser,
}

impl From<RoleArg> for Role {
    fn from(arg: RoleArg) -> Self {
        match arg {
            RoleArg::SystemAdmin => Self::SystemAdmin,
            RoleArg::ApartmentAdmin => Self::ApartmentAdmin,
            RoleArg::ApartmentUser => Self::ApartmentUser,
        }
    }
}

/// Language argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LanguageArg {
    /// English
    En,
    /// Arabic
    Ar,
}

impl From<LanguageArg> for Language {
    fn from(arg: LanguageArg) -> Self {
        match arg {
            LanguageArg::En => Self::En,
            LanguageArg::Ar => Self::Ar,
        }
    }
}

/// Trash kind argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TrashKindArg {
    /// Purchases
    Purchase,
    /// Vendors
    Vendor,
    /// Items
    Item,
}

impl From<TrashKindArg> for TrashKind {
    fn from(arg: TrashKindArg) -> Self {
        match arg {
            TrashKindArg::Purchase => Self::Purchase,
            TrashKindArg::Vendor => Self::Vendor,
            TrashKindArg::Item => Self::Item,
        }
    }
}

/// Backup scope argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScopeArg {
    /// Every apartment
    All,
    /// One apartment
    Apartment,
}

impl From<ScopeArg> for BackupScope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::All => Self::All,
            ScopeArg::Apartment => Self::Apartment,
        }
    }
}

/// Restorable collection argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CollectionArg {
    /// Accounts
    Users,
    /// Purchases
    Purchases,
    /// Vendors
    Vendors,
    /// Items
    Items,
}

impl From<CollectionArg> for Collection {
    fn from(arg: CollectionArg) -> Self {
        match arg {
            CollectionArg::Users => Self::Users,
            CollectionArg::Purchases => Self::Purchases,
            CollectionArg::Vendors => Self::Vendors,
            CollectionArg::Items => Self::Items,
        }
    }
}

/// Report kind argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportKindArg {
    /// Totals for a month
    Monthly,
    /// Totals per month of a year
    Yearly,
    /// Spending per category
    Category,
    /// Spending per vendor
    Vendor,
    /// Spending per item
    Item,
}

impl From<ReportKindArg> for ReportKind {
    fn from(arg: ReportKindArg) -> Self {
        match arg {
            ReportKindArg::Monthly => Self::Monthly,
            ReportKindArg::Yearly => Self::Yearly,
            ReportKindArg::Category => Self::Category,
            ReportKindArg::Vendor => Self::Vendor,
            ReportKindArg::Item => Self::Item,
        }
    }
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    Plain,
    /// Formatted table
    #[default]
    Table,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_arg_conversion() {
        assert_eq!(Role::from(RoleArg::SystemAdmin), Role::SystemAdmin);
        assert_eq!(Role::from(RoleArg::ApartmentAdmin), Role::ApartmentAdmin);
        assert_eq!(Role::from(RoleArg::ApartmentUser), Role::ApartmentUser);
    }

    #[test]
    fn test_trash_kind_arg_conversion() {
        assert_eq!(TrashKind::from(TrashKindArg::Purchase), TrashKind::Purchase);
        assert_eq!(TrashKind::from(TrashKindArg::Vendor), TrashKind::Vendor);
        assert_eq!(TrashKind::from(TrashKindArg::Item), TrashKind::Item);
    }

    #[test]
    fn test_collection_arg_conversion() {
        assert_eq!(Collection::from(CollectionArg::Users), Collection::Users);
        assert_eq!(Collection::from(CollectionArg::Items), Collection::Items);
    }

    #[test]
    fn test_report_kind_arg_conversion() {
        assert_eq!(ReportKind::from(ReportKindArg::Yearly), ReportKind::Yearly);
        assert_eq!(ReportKind::from(ReportKindArg::Vendor), ReportKind::Vendor);
    }

    #[test]
    fn test_scope_and_language_conversion() {
        assert_eq!(BackupScope::from(ScopeArg::All), BackupScope::All);
        assert_eq!(Language::from(LanguageArg::Ar), Language::Ar);
    }

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Table);
    }

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Show { json: false };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Show"));
    }
}
