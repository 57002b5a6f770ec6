//! `aptledger` - CLI for the apartment purchase ledger
//!
//! Every command except setup, registration, status, configuration and the
//! password checker runs as the account given by `--user`/`--password`.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use clap::Parser;
use serde::Serialize;

use aptledger::backup::format_bytes;
use aptledger::cli::{
    AccountArgs, AuditCommand, BackupCommand, Cli, Command, ConfigCommand, ItemCommand,
    OutputFormat, PurchaseCommand, RegisterCommand, ReportCommand, TrashCommand, UserCommand,
    VendorCommand,
};
use aptledger::ledger::{BackupRequest, RestoreOptions, TrashKind};
use aptledger::model::{
    now, Collection, ItemUpdate, LocalizedName, NewItem, NewPurchase, NewUser, NewVendor,
    ProfileUpdate, Role, UserUpdate, VendorUpdate,
};
use aptledger::password::check_strength;
use aptledger::report::{Amount, Report, ReportKind, ReportPeriod};
use aptledger::storage::PurchaseQuery;
use aptledger::{init_logging, Config, Ledger, Session};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone()).context("failed to load configuration")?;

    let Cli {
        user,
        password,
        command,
        ..
    } = cli;

    if !command.is_anonymous() && (user.is_none() || password.is_none()) {
        bail!("this command needs --user and --password (or APTLEDGER_USER and APTLEDGER_PASSWORD)");
    }

    match command {
        Command::Config(cmd) => handle_config(&config, cmd),
        Command::PasswordStrength { password } => handle_password_strength(&password),
        command => {
            let ledger = Ledger::open(config).context("failed to open the ledger database")?;
            let credentials = Credentials {
                user: user.unwrap_or_default(),
                password: password.unwrap_or_default(),
            };
            run(&ledger, &credentials, command)
        }
    }
}

struct Credentials {
    user: String,
    password: String,
}

impl Credentials {
    fn login(&self, ledger: &Ledger) -> Result<Session> {
        ledger
            .login(&self.user, &self.password)
            .with_context(|| format!("login as '{}' failed", self.user))
    }
}

fn run(ledger: &Ledger, credentials: &Credentials, command: Command) -> Result<()> {
    match command {
        Command::Setup(cmd) => handle_setup(ledger, cmd, false),
        Command::Register(cmd) => handle_setup(ledger, cmd, true),
        Command::Status(cmd) => handle_status(ledger, cmd.json),
        Command::User(cmd) => handle_user(ledger, credentials, cmd),
        Command::Vendor(cmd) => handle_vendor(ledger, &credentials.login(ledger)?, cmd),
        Command::Item(cmd) => handle_item(ledger, &credentials.login(ledger)?, cmd),
        Command::Purchase(cmd) => handle_purchase(ledger, &credentials.login(ledger)?, cmd),
        Command::Trash(cmd) => handle_trash(ledger, &credentials.login(ledger)?, cmd),
        Command::Backup(cmd) => handle_backup(ledger, &credentials.login(ledger)?, cmd),
        Command::Report(cmd) => handle_report(ledger, &credentials.login(ledger)?, &cmd),
        Command::Dashboard { json } => handle_dashboard(ledger, &credentials.login(ledger)?, json),
        Command::Audit(cmd) => handle_audit(ledger, &credentials.login(ledger)?, &cmd),
        Command::Config(cmd) => handle_config(ledger.config(), cmd),
        Command::PasswordStrength { password } => handle_password_strength(&password),
    }
}

fn new_user(account: AccountArgs, password: String, role: Role) -> NewUser {
    NewUser {
        username: account.username,
        password,
        name: LocalizedName::new(account.name, account.arabic_name),
        email: account.email,
        apartment_id: account.apartment,
        role,
        preferred_language: account.language.into(),
    }
}

fn handle_setup(ledger: &Ledger, cmd: RegisterCommand, register: bool) -> Result<()> {
    let new = new_user(cmd.account, cmd.new_password, Role::ApartmentUser);
    let user = if register {
        ledger.register(new)?
    } else {
        ledger.setup(new)?
    };
    println!(
        "Created {} '{}' ({}) in apartment {}",
        user.role, user.username, user.id, user.apartment_id
    );
    Ok(())
}

fn handle_user(ledger: &Ledger, credentials: &Credentials, cmd: UserCommand) -> Result<()> {
    let session = credentials.login(ledger)?;
    match cmd {
        UserCommand::List { format } => {
            let users = ledger.list_users(&session)?;
            if format == OutputFormat::Json {
                let rows: Vec<_> = users.iter().map(public_user).collect();
                return print_json(&rows);
            }
            print_table(
                format,
                &["ID", "USERNAME", "NAME", "ROLE", "APARTMENT", "ACTIVE"],
                users
                    .iter()
                    .map(|u| {
                        vec![
                            u.id.clone(),
                            u.username.clone(),
                            u.name.get(session.language).to_string(),
                            u.role.to_string(),
                            u.apartment_id.clone(),
                            yes_no(u.is_active).to_string(),
                        ]
                    })
                    .collect(),
            );
        }
        UserCommand::Show { id } => {
            let user = ledger.get_user(&session, &id)?;
            print_json(&public_user(&user))?;
        }
        UserCommand::Add {
            account,
            role,
            new_password,
        } => {
            let user = ledger.add_user(&session, new_user(account, new_password, role.into()))?;
            println!("Created {} '{}' ({})", user.role, user.username, user.id);
        }
        UserCommand::Update {
            id,
            name,
            arabic_name,
            email,
            apartment,
            role,
            language,
        } => {
            let user = ledger.update_user(
                &session,
                &id,
                UserUpdate {
                    english_name: name,
                    arabic_name,
                    email,
                    apartment_id: apartment,
                    role: role.map(Into::into),
                    preferred_language: language.map(Into::into),
                },
            )?;
            println!("Updated '{}'", user.username);
        }
        UserCommand::Activate { id } => {
            let user = ledger.set_user_active(&session, &id, true)?;
            println!("Activated '{}'", user.username);
        }
        UserCommand::Deactivate { id } => {
            let user = ledger.set_user_active(&session, &id, false)?;
            println!("Deactivated '{}'", user.username);
        }
        UserCommand::ResetPassword { id, new_password } => {
            let generated = new_password.is_none();
            let password = ledger.reset_password(&session, &id, new_password)?;
            if generated {
                println!("New password: {password}");
            } else {
                println!("Password reset.");
            }
        }
        UserCommand::ChangePassword { new_password } => {
            ledger.change_password(&session, &credentials.password, &new_password)?;
            println!("Password changed.");
        }
        UserCommand::Profile {
            name,
            arabic_name,
            email,
            language,
        } => {
            let user = ledger.update_profile(
                &session,
                ProfileUpdate {
                    english_name: name,
                    arabic_name,
                    email,
                    preferred_language: language.map(Into::into),
                },
            )?;
            print_json(&public_user(&user))?;
        }
        UserCommand::Activity { json } => {
            let activity = ledger.account_activity(&session)?;
            if json {
                return print_json(&activity);
            }
            let currency = &ledger.config().display.currency;
            println!("Member since:     {}", short_date(activity.member_since));
            println!(
                "Last login:       {}",
                activity.last_login.map_or_else(|| "never".to_string(), short_time)
            );
            println!("Purchases added:  {}", activity.purchases_added);
            println!("Total spent:      {}", money(activity.total_spent, currency));
        }
    }
    Ok(())
}

fn handle_vendor(ledger: &Ledger, session: &Session, cmd: VendorCommand) -> Result<()> {
    match cmd {
        VendorCommand::List { format } => {
            let vendors = ledger.list_vendors(session)?;
            if format == OutputFormat::Json {
                return print_json(&vendors);
            }
            print_table(
                format,
                &["ID", "NAME", "CONTACT", "PHONE", "EMAIL"],
                vendors
                    .iter()
                    .map(|v| {
                        vec![
                            v.id.clone(),
                            v.name.get(session.language).to_string(),
                            v.contact_person.clone(),
                            v.phone.clone(),
                            v.email.clone(),
                        ]
                    })
                    .collect(),
            );
        }
        VendorCommand::Add {
            name,
            arabic_name,
            contact,
            phone,
            email,
        } => {
            let vendor = ledger.create_vendor(
                session,
                NewVendor {
                    name: LocalizedName::new(name, arabic_name),
                    contact_person: contact,
                    phone,
                    email,
                },
            )?;
            println!("Created vendor '{}' ({})", vendor.name.english_name, vendor.id);
        }
        VendorCommand::Update {
            id,
            name,
            arabic_name,
            contact,
            phone,
            email,
        } => {
            let vendor = ledger.update_vendor(
                session,
                &id,
                VendorUpdate {
                    english_name: name,
                    arabic_name,
                    contact_person: contact,
                    phone,
                    email,
                },
            )?;
            println!("Updated vendor '{}'", vendor.name.english_name);
        }
        VendorCommand::Trash { id } => {
            let vendor = ledger.trash_vendor(session, &id)?;
            println!("Moved vendor '{}' to the trash", vendor.name.english_name);
        }
    }
    Ok(())
}

fn handle_item(ledger: &Ledger, session: &Session, cmd: ItemCommand) -> Result<()> {
    let currency = &ledger.config().display.currency;
    match cmd {
        ItemCommand::List { category, format } => {
            let items = ledger.list_items(session, category.as_deref())?;
            if format == OutputFormat::Json {
                return print_json(&items);
            }
            print_table(
                format,
                &["ID", "NAME", "CATEGORY", "PRICE", "LAST PURCHASED"],
                items
                    .iter()
                    .map(|l| {
                        vec![
                            l.item.id.clone(),
                            l.item.name.get(session.language).to_string(),
                            l.item.category.clone(),
                            money(l.item.unit_price, currency),
                            l.last_purchased.map_or_else(|| "-".to_string(), short_date),
                        ]
                    })
                    .collect(),
            );
        }
        ItemCommand::Categories => {
            for category in ledger.item_categories()? {
                println!("{category}");
            }
        }
        ItemCommand::Add {
            name,
            category,
            price,
            arabic_name,
            description,
        } => {
            let item = ledger.create_item(
                session,
                NewItem {
                    name: LocalizedName::new(name, arabic_name),
                    category,
                    unit_price: price,
                    description,
                },
            )?;
            println!("Created item '{}' ({})", item.name.english_name, item.id);
        }
        ItemCommand::Update {
            id,
            name,
            arabic_name,
            category,
            price,
            description,
        } => {
            let item = ledger.update_item(
                session,
                &id,
                ItemUpdate {
                    english_name: name,
                    arabic_name,
                    category,
                    unit_price: price,
                    description,
                },
            )?;
            println!("Updated item '{}'", item.name.english_name);
        }
        ItemCommand::Trash { id } => {
            let item = ledger.trash_item(session, &id)?;
            println!("Moved item '{}' to the trash", item.name.english_name);
        }
    }
    Ok(())
}

fn handle_purchase(ledger: &Ledger, session: &Session, cmd: PurchaseCommand) -> Result<()> {
    let currency = &ledger.config().display.currency;
    match cmd {
        PurchaseCommand::List {
            since,
            until,
            vendor,
            item,
            limit,
            format,
        } => {
            let mut query = PurchaseQuery::in_apartment(None).limit(limit);
            query.since = since.as_deref().map(parse_date).transpose()?;
            query.until = until.as_deref().map(parse_date).transpose()?;
            query.vendor_id = vendor;
            query.item_id = item;

            let purchases = ledger.list_purchases(session, query)?;
            if format == OutputFormat::Json {
                return print_json(&purchases);
            }
            print_table(
                format,
                &["ID", "DATE", "ITEM", "VENDOR", "QTY", "UNIT", "TOTAL"],
                purchases
                    .iter()
                    .map(|p| {
                        vec![
                            p.purchase.id.clone(),
                            short_date(p.purchase.purchased_at),
                            p.item_name.clone(),
                            p.vendor_name.clone(),
                            p.purchase.quantity.to_string(),
                            money(p.purchase.unit_price, currency),
                            money(p.purchase.total_price, currency),
                        ]
                    })
                    .collect(),
            );
        }
        PurchaseCommand::Add {
            vendor,
            item,
            quantity,
            price,
            date,
        } => {
            let purchase = ledger.create_purchase(
                session,
                NewPurchase {
                    vendor_id: vendor,
                    item_id: item,
                    quantity,
                    unit_price: price,
                    purchased_at: date.as_deref().map(parse_date).transpose()?,
                },
            )?;
            println!(
                "Logged purchase {} for {}",
                purchase.id,
                money(purchase.total_price, currency)
            );
        }
        PurchaseCommand::Show { id } => {
            print_json(&ledger.get_purchase(session, &id)?)?;
        }
        PurchaseCommand::Trash { id } => {
            ledger.trash_purchase(session, &id)?;
            println!("Moved purchase {id} to the trash");
        }
    }
    Ok(())
}

fn handle_trash(ledger: &Ledger, session: &Session, cmd: TrashCommand) -> Result<()> {
    match cmd {
        TrashCommand::List { kind, format } => {
            let entries = ledger.list_trash(session, kind.map(Into::into))?;
            if format == OutputFormat::Json {
                return print_json(&entries);
            }
            print_table(
                format,
                &["KIND", "ID", "NAME", "DELETED", "BY", "STATUS"],
                entries
                    .iter()
                    .map(|e| {
                        vec![
                            e.kind.to_string(),
                            e.id.clone(),
                            e.name.clone(),
                            e.deleted_at.map_or_else(|| "-".to_string(), short_date),
                            e.deleted_by.clone().unwrap_or_else(|| "-".to_string()),
                            e.status.to_string(),
                        ]
                    })
                    .collect(),
            );
        }
        TrashCommand::Restore { kind, id } => {
            let kind = TrashKind::from(kind);
            ledger.restore(session, kind, &id)?;
            println!("Restored {kind} {id}");
        }
        TrashCommand::Purge { kind, id } => {
            let kind = TrashKind::from(kind);
            ledger.purge(session, kind, &id)?;
            println!("Permanently deleted {kind} {id}");
        }
        TrashCommand::Empty { yes } => {
            if !yes {
                println!("This permanently deletes everything in the trash you manage.");
                println!("Use --yes to confirm.");
                return Ok(());
            }
            let summary = ledger.empty_trash(session)?;
            println!(
                "Deleted {} records ({} purchases, {} vendors, {} items)",
                summary.total(),
                summary.purchases,
                summary.vendors,
                summary.items
            );
        }
        TrashCommand::PurgeExpired => {
            let summary = ledger.purge_expired(session)?;
            println!("Purged {} expired records", summary.total());
        }
    }
    Ok(())
}

fn handle_backup(ledger: &Ledger, session: &Session, cmd: BackupCommand) -> Result<()> {
    match cmd {
        BackupCommand::Create {
            scope,
            apartment,
            include_deleted,
            encrypt,
            passphrase,
            dir,
        } => {
            if encrypt && passphrase.is_none() {
                bail!("--encrypt needs --passphrase or APTLEDGER_BACKUP_PASSPHRASE");
            }
            let outcome = ledger.create_backup(
                session,
                BackupRequest {
                    scope: scope.into(),
                    apartment_id: apartment,
                    include_deleted: include_deleted.then_some(true),
                    passphrase: passphrase.filter(|_| encrypt),
                    directory: dir,
                },
            )?;
            println!("Backup written to {}", outcome.path.display());
            println!(
                "  {} users, {} purchases, {} vendors, {} items ({})",
                outcome.counts.users,
                outcome.counts.purchases,
                outcome.counts.vendors,
                outcome.counts.items,
                format_bytes(outcome.record.size_bytes)
            );
        }
        BackupCommand::Restore {
            file,
            passphrase,
            collections,
        } => {
            let options = RestoreOptions {
                passphrase,
                collections: (!collections.is_empty())
                    .then(|| collections.into_iter().map(Collection::from).collect()),
            };
            let summary = ledger
                .restore_backup(session, &file, &options)
                .with_context(|| format!("failed to restore {}", file.display()))?;
            println!(
                "Restored {} records from a {} backup taken {}",
                summary.restored.total(),
                summary.metadata.scope,
                short_time(summary.metadata.created_at)
            );
        }
        BackupCommand::History { limit, format } => {
            let history = ledger.backup_history(session, limit)?;
            if format == OutputFormat::Json {
                return print_json(&history);
            }
            print_table(
                format,
                &["FILE", "CREATED", "BY", "SCOPE", "FORMAT", "SIZE"],
                history
                    .iter()
                    .map(|r| {
                        vec![
                            r.file_name.clone(),
                            short_time(r.metadata.created_at),
                            r.metadata.created_by.clone(),
                            r.metadata.scope.to_string(),
                            r.metadata.format.to_string(),
                            format_bytes(r.size_bytes),
                        ]
                    })
                    .collect(),
            );
        }
    }
    Ok(())
}

fn handle_report(ledger: &Ledger, session: &Session, cmd: &ReportCommand) -> Result<()> {
    let kind = ReportKind::from(cmd.kind);
    let period = match &cmd.period {
        Some(period) => period.parse::<ReportPeriod>()?,
        None if kind == ReportKind::Yearly => ReportPeriod::year(now().year())?,
        None => ReportPeriod::month_of(now())?,
    };

    let report = ledger.report(session, kind, period)?;
    if cmd.json {
        return print_json(&report);
    }

    let currency = &ledger.config().display.currency;
    let header = report.header();
    println!("{} - {}", header.title, header.period_label);
    println!("{}", "=".repeat(header.title.chars().count() + header.period_label.chars().count() + 3));
    match &report {
        Report::Monthly(r) => {
            println!("Purchases:        {}", r.purchase_count);
            println!("Total:            {}", money(r.total_amount, currency));
            println!("Average:          {}", money(r.average_purchase, currency));
            print_amounts("By category", &r.by_category, currency);
            print_amounts("By vendor", &r.by_vendor, currency);
        }
        Report::Yearly(r) => {
            print_amounts("By month", &r.by_month, currency);
            print_amounts("By category", &r.by_category, currency);
            println!();
            println!("Total:            {}", money(r.total_amount, currency));
            println!("Monthly average:  {}", money(r.monthly_average, currency));
        }
        Report::Category(r) => {
            for c in &r.categories {
                println!();
                println!(
                    "{}: {} ({} purchases)",
                    c.category,
                    money(c.total_amount, currency),
                    c.purchase_count
                );
                for item in &c.items {
                    println!("  {:<24} {:>14} x{}", item.name, money(item.amount, currency), item.count);
                }
            }
        }
        Report::Vendor(r) => {
            for v in &r.vendors {
                println!();
                println!(
                    "{}: {} ({} purchases)",
                    v.name,
                    money(v.total_amount, currency),
                    v.purchase_count
                );
                if !v.contact_person.is_empty() || !v.phone.is_empty() {
                    println!("  Contact: {} {}", v.contact_person, v.phone);
                }
            }
        }
        Report::Item(r) => {
            print_table(
                OutputFormat::Table,
                &["ITEM", "CATEGORY", "QTY", "TOTAL", "AVG PRICE"],
                r.items
                    .iter()
                    .map(|i| {
                        vec![
                            i.name.clone(),
                            i.category.clone(),
                            i.total_quantity.to_string(),
                            money(i.total_amount, currency),
                            money(i.average_price, currency),
                        ]
                    })
                    .collect(),
            );
        }
    }
    Ok(())
}

fn handle_dashboard(ledger: &Ledger, session: &Session, json: bool) -> Result<()> {
    let dashboard = ledger.dashboard(session)?;
    if json {
        return print_json(&dashboard);
    }
    let currency = &ledger.config().display.currency;
    println!("Dashboard - {}", dashboard.month);
    println!("---------------------------");
    println!("Purchases this month: {}", dashboard.purchase_count);
    println!("Spent this month:     {}", money(dashboard.total_spent, currency));
    println!("Active vendors:       {}", dashboard.active_vendors);
    println!("Active items:         {}", dashboard.active_items);
    print_amounts("By category", &dashboard.by_category, currency);
    println!();
    println!("Recent purchases:");
    for p in &dashboard.recent {
        println!(
            "  {}  {:<20} {:<20} {:>14}",
            short_date(p.purchase.purchased_at),
            p.item_name,
            p.vendor_name,
            money(p.purchase.total_price, currency)
        );
    }
    Ok(())
}

fn handle_audit(ledger: &Ledger, session: &Session, cmd: &AuditCommand) -> Result<()> {
    let entries = ledger.audit_log(session, cmd.limit)?;
    if cmd.format == OutputFormat::Json {
        return print_json(&entries);
    }
    print_table(
        cmd.format,
        &["TIME", "ACTION", "COLLECTION", "TARGET", "ACTOR"],
        entries
            .iter()
            .map(|e| {
                vec![
                    short_time(e.timestamp),
                    e.action.to_string(),
                    e.collection.to_string(),
                    e.target_id.clone().unwrap_or_else(|| "-".to_string()),
                    e.actor_id.clone().unwrap_or_else(|| "-".to_string()),
                ]
            })
            .collect(),
    );
    Ok(())
}

fn handle_password_strength(password: &str) -> Result<()> {
    let report = check_strength(password);
    println!("Strength: {} ({}/7)", report.strength, report.score);
    for hint in &report.feedback {
        println!("  - {hint}");
    }
    Ok(())
}

fn handle_status(ledger: &Ledger, json: bool) -> Result<()> {
    let stats = ledger.storage().stats()?;
    if json {
        let status = serde_json::json!({
            "database_path": ledger.storage().path(),
            "retention_days": ledger.config().retention.trash_retention_days,
            "stats": stats,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("aptledger status");
        println!("----------------");
        println!("Database:       {}", ledger.storage().path().display());
        println!("Size:           {}", format_bytes(stats.db_size_bytes));
        println!("Schema version: {}", stats.schema_version);
        println!("Users:          {}", stats.users);
        println!("Vendors:        {}", stats.vendors);
        println!("Items:          {}", stats.items);
        println!("Purchases:      {}", stats.purchases);
        println!("In trash:       {}", stats.trashed);
        println!("Audit entries:  {}", stats.audit_entries);
        if let Some(newest) = stats.newest_purchase {
            println!("Last purchase:  {}", short_date(newest));
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:       {}", config.database_path().display());
                println!();
                println!("[Retention]");
                println!(
                    "  Trash retention:     {} days",
                    config.retention.trash_retention_days
                );
                println!();
                println!("[Security]");
                println!("  Hash iterations:     {}", config.security.hash_iterations);
                println!("  Salt length:         {}", config.security.salt_length);
                println!(
                    "  Min password score:  {}",
                    config.security.min_password_score
                );
                println!(
                    "  Self-registration:   {}",
                    config.security.allow_self_registration
                );
                println!();
                println!("[Backup]");
                println!("  Directory:           {}", config.backup_dir().display());
                println!("  Include deleted:     {}", config.backup.include_deleted);
                println!();
                println!("[Display]");
                println!("  Language:            {}", config.display.language);
                println!("  Currency:            {}", config.display.currency);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}

/// Account fields safe to print.
fn public_user(user: &aptledger::model::User) -> serde_json::Value {
    serde_json::json!({
        "id": user.id,
        "username": user.username,
        "english_name": user.name.english_name,
        "arabic_name": user.name.arabic_name,
        "email": user.email,
        "apartment_id": user.apartment_id,
        "role": user.role,
        "is_active": user.is_active,
        "preferred_language": user.preferred_language,
        "created_at": user.created_at,
        "last_login": user.last_login,
    })
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_table(format: OutputFormat, headers: &[&str], rows: Vec<Vec<String>>) {
    if format == OutputFormat::Plain {
        for row in rows {
            println!("{}", row.join("\t"));
        }
        return;
    }

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }
    let line = |cells: Vec<String>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };
    println!("{}", line(headers.iter().map(ToString::to_string).collect()));
    println!("{}", line(widths.iter().map(|w| "-".repeat(*w)).collect()));
    for row in rows {
        println!("{}", line(row));
    }
}

fn print_amounts(title: &str, amounts: &[Amount], currency: &str) {
    if amounts.is_empty() {
        return;
    }
    println!();
    println!("{title}:");
    for a in amounts {
        println!("  {:<24} {:>14}", a.label, money(a.amount, currency));
    }
}

fn money(amount: f64, currency: &str) -> String {
    format!("{amount:.2} {currency}")
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn short_date(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

fn short_time(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M").to_string()
}

fn parse_date(s: &str) -> Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("expected a date like 2024-03-15, got '{s}'"))?;
    Ok(date.and_time(NaiveTime::MIN).and_utc())
}
