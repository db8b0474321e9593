use anyhow::{bail, Context, Result};
use std::env;
use std::path::Path;

use listing_ledger::{
    config::LedgerConfig, date, import_into, load_csv, money, telemetry, Account,
};

fn main() -> Result<()> {
    let config = LedgerConfig::from_env()?;
    telemetry::init(&config.log_filter);

    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("show");
    let rest = args.get(2..).unwrap_or(&[]);

    match command {
        "init" => run_init(&config, rest),
        "show" => run_show(&config, rest),
        "import" => run_import(&config, rest),
        "commit" => run_commit(&config, rest),
        "archive" => run_archive(&config, rest),
        "verify" => run_verify(&config),
        "version" => {
            println!("ledger {}", listing_ledger::VERSION);
            Ok(())
        }
        other => {
            print_usage();
            bail!("Unknown command: {other}")
        }
    }
}

fn print_usage() {
    eprintln!("Usage: ledger <command>");
    eprintln!("  init [initial balance]   create an empty account");
    eprintln!("  show [--json]            print the live listing and balances");
    eprintln!("  import <file.csv>        append statements from a CSV export");
    eprintln!("  commit <index>...        mark live statements as committed");
    eprintln!("  archive <name>           move committed statements to <name>.lst");
    eprintln!("  verify                   check every digest");
}

fn open_account(config: &LedgerConfig) -> Result<Account> {
    let path = config.account_path();
    Account::open(&path).with_context(|| format!("Failed to open account {}", path.display()))
}

fn save_account(config: &LedgerConfig, account: &Account) -> Result<()> {
    let path = config.account_path();
    account
        .save_as(&path)
        .with_context(|| format!("Failed to save account {}", path.display()))
}

fn run_init(config: &LedgerConfig, args: &[String]) -> Result<()> {
    println!("📒 Creating account '{}'", config.account_name);

    let path = config.account_path();
    if path.exists() {
        bail!("Account already exists: {}", path.display());
    }
    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("Failed to create {}", config.data_dir.display()))?;

    let mut account = Account::new(&config.account_name, &config.data_dir);
    if let Some(amount) = args.first() {
        let amount = money::parse_amount(amount)?;
        account = account.with_initial_balance(amount, date::today())?;
        println!("✓ Initial balance: {}", money::format_amount(amount));
    }

    save_account(config, &account)?;
    println!("✓ Saved {}", path.display());
    Ok(())
}

fn run_show(config: &LedgerConfig, args: &[String]) -> Result<()> {
    let account = open_account(config)?;
    let json = args.iter().any(|arg| arg == "--json");

    if json {
        let archives: Vec<_> = account
            .archived_listings()
            .iter()
            .map(|archive| {
                serde_json::json!({
                    "file": archive.path().display().to_string(),
                    "final_date": archive.final_date(),
                    "final_balance": archive.final_balance(),
                    "digest": archive.digest(),
                })
            })
            .collect();
        let summary = serde_json::json!({
            "description": account.description(),
            "currency": account.currency(),
            "balance": account.balance(),
            "archived_balance": account.archived_balance(),
            "current_listing": account.current_listing(),
            "archives": archives,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    if !account.description().is_empty() {
        println!("{}\n", account.description());
    }
    for (index, statement) in account.current_listing().iter().enumerate() {
        print!("{index:>4} {statement}");
    }

    let currency = account.currency().unwrap_or("");
    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Archives:          {}", account.archived_listings().len());
    println!("Archived balance:  {} {currency}", money::format_amount(account.archived_balance()));
    println!("Balance:           {} {currency}", money::format_amount(account.balance()));
    Ok(())
}

fn run_import(config: &LedgerConfig, args: &[String]) -> Result<()> {
    let Some(csv_path) = args.first() else {
        bail!("Usage: ledger import <file.csv>");
    };

    println!("📂 Loading CSV...");
    let statements = load_csv(Path::new(csv_path))?;
    println!("✓ Loaded {} statements", statements.len());

    let mut account = open_account(config)?;
    let range = import_into(account.current_listing_mut(), statements);
    save_account(config, &account)?;

    println!("✓ Imported as statements {}..{}", range.start().index(), range.end().index());
    Ok(())
}

fn run_commit(config: &LedgerConfig, args: &[String]) -> Result<()> {
    if args.is_empty() {
        bail!("Usage: ledger commit <index>...");
    }

    let mut account = open_account(config)?;
    let listing = account.current_listing_mut();
    for arg in args {
        let index: usize = arg
            .parse()
            .with_context(|| format!("Invalid statement index: {arg}"))?;
        let Some(handle) = listing.handle(index) else {
            bail!("No statement at index {index} (listing has {})", listing.len());
        };
        listing.set_committed(handle, true);
        println!("✓ Committed {}", listing[handle].main_entry());
    }

    save_account(config, &account)
}

fn run_archive(config: &LedgerConfig, args: &[String]) -> Result<()> {
    let Some(name) = args.first() else {
        bail!("Usage: ledger archive <name>");
    };

    println!("🗄️  Archiving committed statements...");
    let mut account = open_account(config)?;
    let archive = account.archive(name)?;
    println!(
        "✓ {} ({} statements, balance {})",
        archive.path().display(),
        archive.listing()?.len(),
        money::format_amount(archive.final_balance())
    );

    save_account(config, &account)?;
    println!("✓ {} statements remain in the live listing", account.current_listing().len());
    Ok(())
}

fn run_verify(config: &LedgerConfig) -> Result<()> {
    println!("🔍 Verifying account...");
    let account = open_account(config)?;
    println!("✓ Live listing: {} statements", account.current_listing().len());

    account.verify()?;
    for archive in account.archived_listings() {
        let listing = archive
            .listing()
            .with_context(|| format!("Failed to load {}", archive.path().display()))?;
        println!("✓ {} {} ({} statements)", archive.digest(), archive.path().display(), listing.len());
    }

    println!("✅ All digests match");
    Ok(())
}
