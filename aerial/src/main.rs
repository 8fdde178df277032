use std::error::Error;
use std::path::PathBuf;
use std::process::Command as ProcessCommand;
use std::sync::Arc;
use std::time::Instant;

use clap::{Arg, ArgAction, ArgMatches, Command};
use indicatif::{ProgressBar, ProgressStyle};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

use aerial::catalog::{CatalogStore, ResolvedAsset, StorePaths};
use aerial::progress::{format_duration, format_size};
use aerial::{
    AerialConfig, ColorHelper, ColorMode, ProgressReporter, ProgressTracker, TransferAction,
    TransferClient, WorkItem, preflight, run_batch,
};

/// Everything one invocation needs; keeps the command handlers from
/// threading six arguments around.
struct Session {
    rt: Runtime,
    store: CatalogStore,
    client: TransferClient,
    config: AerialConfig,
    colors: ColorHelper,
}

/// A batch that is ready to run: the work list plus its byte total.
struct TransferPlan {
    action: TransferAction,
    items: Vec<WorkItem>,
    total_bytes: u64,
}

fn main() {
    let matches = build_app().get_matches();

    let mut config = AerialConfig::default();
    if let Some(root) = matches.get_one::<String>("store-root") {
        config = config.with_store(StorePaths::new(PathBuf::from(root)));
    }
    if let Some(width) = matches.get_one::<usize>("concurrency") {
        config = config.with_max_concurrent_transfers(*width);
    }
    if matches.get_flag("insecure") {
        config = config.with_accept_invalid_certs(true);
    }
    if let Some(color) = matches.get_one::<String>("color") {
        match color.parse::<ColorMode>() {
            Ok(mode) => config = config.with_color_mode(mode),
            Err(e) => eprintln!("warning: {e}, using 'auto'"),
        }
    }

    let colors = ColorHelper::new(config.color_mode);
    if let Err(e) = run(&matches, config, &colors) {
        eprintln!("{} {}", colors.red("error:"), e);
        std::process::exit(1);
    }
}

fn build_app() -> Command {
    Command::new("aerial")
        .about("Manage macOS aerial wallpapers: bulk-download or remove 4K SDR 240FPS assets by category")
        .version("0.1")
        .arg(
            Arg::new("store-root")
                .long("store-root")
                .value_name("DIR")
                .help("Root of the idleassetsd store (defaults to the system location)"),
        )
        .arg(
            Arg::new("concurrency")
                .long("concurrency")
                .short('j')
                .value_name("N")
                .value_parser(clap::value_parser!(usize))
                .default_value("8")
                .help("Worker pool width: how many transfers run at once"),
        )
        .arg(
            Arg::new("insecure")
                .long("insecure")
                .action(ArgAction::SetTrue)
                .help(
                    "Skip TLS certificate validation. Some CDN endpoints present \
                     certificate chains the system trust store rejects; only enable \
                     this when you understand what it gives up",
                ),
        )
        .arg(
            Arg::new("color")
                .long("color")
                .value_name("WHEN")
                .value_parser(["auto", "always", "never"])
                .default_value("auto")
                .help("Control color output"),
        )
        .arg(
            Arg::new("yes")
                .long("yes")
                .short('y')
                .action(ArgAction::SetTrue)
                .help("Skip the confirmation prompt"),
        )
        .arg(
            Arg::new("no-restart")
                .long("no-restart")
                .action(ArgAction::SetTrue)
                .help("Do not restart idleassetsd after a batch"),
        )
        .arg(
            Arg::new("command")
                .value_name("COMMAND")
                .index(1)
                .help("Command to execute: list, info, download, delete (omit for the interactive menu)"),
        )
        .arg(
            Arg::new("category")
                .value_name("CATEGORY")
                .index(2)
                .help("Category id or localized name; omit (or 'all') for every wallpaper"),
        )
        .after_help(
            "EXAMPLES:\n\
             \x20 sudo aerial                      interactive menu\n\
             \x20 sudo aerial list\n\
             \x20 sudo aerial download Landscape\n\
             \x20 sudo aerial delete Underwater --yes --no-restart",
        )
}

fn run(
    matches: &ArgMatches,
    config: AerialConfig,
    colors: &ColorHelper,
) -> Result<(), Box<dyn Error>> {
    preflight::verify_store_layout(&config)?;

    let session = Session {
        rt: Runtime::new()?,
        store: CatalogStore::load(config.store.clone())?,
        client: TransferClient::new(&config)?,
        config,
        colors: colors.clone(),
    };

    let assume_yes = matches.get_flag("yes");
    let no_restart = matches.get_flag("no-restart");

    match matches.get_one::<String>("command").map(String::as_str) {
        Some(command) => {
            let category = matches.get_one::<String>("category").map(String::as_str);
            session.run_cli(command, category, assume_yes, no_restart)
        }
        None => session.run_interactive(),
    }
}

impl Session {
    // === Interactive mode ===

    fn run_interactive(&self) -> Result<(), Box<dyn Error>> {
        println!("{}", self.colors.bold("aerial wallpaper manager"));
        println!("{}", self.colors.dimmed("------------------------"));
        println!();

        let mut rl = DefaultEditor::new()?;

        let categories = self.store.categories();
        println!("Available categories:");
        for (i, category) in categories.iter().enumerate() {
            let count = self.store.assets_in_category(Some(&category.id)).len();
            println!(
                "{}. {} ({} wallpapers)",
                i + 1,
                self.store.category_name(category),
                count
            );
        }
        println!("{}. all wallpapers", categories.len() + 1);

        let Some(choice) = prompt(&mut rl, "\nCategory number: ")? else {
            return Ok(());
        };
        let choice: usize = choice
            .trim()
            .parse()
            .map_err(|_| "please enter a category number")?;
        if choice == 0 || choice > categories.len() + 1 {
            return Err("invalid category selection".into());
        }
        let category_id = if choice <= categories.len() {
            Some(categories[choice - 1].id.clone())
        } else {
            None
        };

        let Some(answer) = prompt(&mut rl, "\nAction: (d)ownload, (x) delete, (q)uit: ")? else {
            return Ok(());
        };
        let action = match answer.trim().to_lowercase().as_str() {
            "d" => TransferAction::Download,
            "x" => TransferAction::Delete,
            _ => return Ok(()),
        };

        let plan = self.build_plan(category_id.as_deref(), action)?;
        if plan.items.is_empty() {
            println!("\nNothing to {}.", action.label());
            return Ok(());
        }

        preflight::verify_writable(&self.config.store.video_dir())?;
        if action == TransferAction::Download {
            self.report_disk_space(&plan)?;
        }

        let Some(answer) = prompt(&mut rl, &confirm_text(&plan))? else {
            return Ok(());
        };
        if !answer.trim().eq_ignore_ascii_case("y") {
            return Ok(());
        }

        self.execute(plan);

        let Some(answer) = prompt(&mut rl, "\nRestart idleassetsd so changes take effect? (y/n): ")?
        else {
            return Ok(());
        };
        if answer.trim().eq_ignore_ascii_case("y") {
            self.restart_idleassetsd();
        }
        Ok(())
    }

    // === CLI mode ===

    fn run_cli(
        &self,
        command: &str,
        category: Option<&str>,
        assume_yes: bool,
        no_restart: bool,
    ) -> Result<(), Box<dyn Error>> {
        match command {
            "list" | "ls" => self.cmd_list(),
            "info" => self.cmd_info(),
            "download" | "dl" => {
                self.cmd_transfer(TransferAction::Download, category, assume_yes, no_restart)
            }
            "delete" | "rm" => {
                self.cmd_transfer(TransferAction::Delete, category, assume_yes, no_restart)
            }
            other => {
                Err(format!("unknown command: {other} (expected list, info, download or delete)")
                    .into())
            }
        }
    }

    fn cmd_list(&self) -> Result<(), Box<dyn Error>> {
        println!("{}", self.colors.bold("Wallpaper categories:"));
        for category in self.store.categories() {
            let count = self.store.assets_in_category(Some(&category.id)).len();
            println!(
                "  {:<14} {} ({} wallpapers)",
                self.colors.cyan(&category.id),
                self.store.category_name(category),
                count
            );
        }
        println!(
            "  {:<14} everything ({} wallpapers)",
            self.colors.cyan("all"),
            self.store.assets().len()
        );
        Ok(())
    }

    fn cmd_info(&self) -> Result<(), Box<dyn Error>> {
        let resolved = self.store.resolve_category(None);
        let on_disk = resolved
            .iter()
            .filter(|asset| asset.destination.exists())
            .count();

        println!("Store root:  {}", self.config.store.root().display());
        println!(
            "Catalog:     {} assets in {} categories",
            self.store.assets().len(),
            self.store.categories().len()
        );
        println!(
            "Downloaded:  {} of {} manageable assets",
            on_disk,
            resolved.len()
        );
        println!(
            "Free space:  {}",
            format_size(preflight::available_space(&self.config.store.video_dir()))
        );
        println!("Pool width:  {}", self.config.max_concurrent_transfers);
        Ok(())
    }

    fn cmd_transfer(
        &self,
        action: TransferAction,
        category: Option<&str>,
        assume_yes: bool,
        no_restart: bool,
    ) -> Result<(), Box<dyn Error>> {
        let category_id = self.resolve_category_arg(category)?;
        let plan = self.build_plan(category_id.as_deref(), action)?;
        if plan.items.is_empty() {
            println!("Nothing to {}.", action.label());
            return Ok(());
        }

        preflight::verify_writable(&self.config.store.video_dir())?;
        if action == TransferAction::Download {
            self.report_disk_space(&plan)?;
        }

        if !assume_yes {
            let mut rl = DefaultEditor::new()?;
            let Some(answer) = prompt(&mut rl, &confirm_text(&plan))? else {
                return Ok(());
            };
            if !answer.trim().eq_ignore_ascii_case("y") {
                return Ok(());
            }
        }

        self.execute(plan);

        if !no_restart {
            self.restart_idleassetsd();
        }
        Ok(())
    }

    fn resolve_category_arg(&self, category: Option<&str>) -> Result<Option<String>, Box<dyn Error>> {
        match category {
            None => Ok(None),
            Some(needle) if needle.eq_ignore_ascii_case("all") => Ok(None),
            Some(needle) => match self.store.find_category(needle) {
                Some(category) => Ok(Some(category.id.clone())),
                None => Err(format!("unknown category: {needle} (try 'aerial list')").into()),
            },
        }
    }

    // === Planning ===

    fn build_plan(
        &self,
        category_id: Option<&str>,
        action: TransferAction,
    ) -> Result<TransferPlan, Box<dyn Error>> {
        let resolved = self.store.resolve_category(category_id);
        match action {
            TransferAction::Download => Ok(self.plan_download(resolved)),
            TransferAction::Delete => Ok(self.plan_delete(resolved)),
        }
    }

    /// Downloads skip files already on disk; every remaining asset is
    /// HEAD-probed so the batch knows its byte total up front.
    fn plan_download(&self, resolved: Vec<ResolvedAsset>) -> TransferPlan {
        let (pending, existing): (Vec<_>, Vec<_>) = resolved
            .into_iter()
            .partition(|asset| !asset.destination.exists());

        for asset in &existing {
            println!(
                "  {} {}",
                self.colors.dimmed("- already present:"),
                asset.name
            );
        }

        let pb = self.planning_bar(pending.len() as u64);
        let mut items = Vec::with_capacity(pending.len());
        let mut total_bytes = 0u64;

        self.rt.block_on(async {
            for asset in pending {
                let size = self.client.probe_size(&asset.url).await;
                plan_line(&pb, format!("  + {} ({})", asset.name, format_size(size)));
                pb.inc(1);

                total_bytes += size;
                items.push(WorkItem {
                    name: asset.name,
                    source: asset.url,
                    destination: asset.destination,
                });
            }
        });
        pb.finish_and_clear();

        TransferPlan {
            action: TransferAction::Download,
            items,
            total_bytes,
        }
    }

    /// Deletes take only what is actually on disk, sized locally.
    fn plan_delete(&self, resolved: Vec<ResolvedAsset>) -> TransferPlan {
        let mut items = Vec::new();
        let mut total_bytes = 0u64;

        for asset in resolved {
            match std::fs::metadata(&asset.destination) {
                Ok(meta) => {
                    println!("  + {} ({})", asset.name, format_size(meta.len()));
                    total_bytes += meta.len();
                    items.push(WorkItem {
                        name: asset.name,
                        source: asset.url,
                        destination: asset.destination,
                    });
                }
                Err(_) => {
                    println!("  {} {}", self.colors.dimmed("- not on disk:"), asset.name);
                }
            }
        }

        TransferPlan {
            action: TransferAction::Delete,
            items,
            total_bytes,
        }
    }

    fn planning_bar(&self, len: u64) -> ProgressBar {
        if !self.show_progress_enabled() {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{msg} [{bar:40.cyan/blue}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▉▊▋▌▍▎▏ "),
        );
        pb.set_message("probing sizes");
        pb
    }

    fn report_disk_space(&self, plan: &TransferPlan) -> Result<(), Box<dyn Error>> {
        let video_dir = self.config.store.video_dir();
        let free = preflight::available_space(&video_dir);
        if free > 0 {
            println!(
                "\nFree space: {}  |  download total: {}",
                format_size(free),
                format_size(plan.total_bytes)
            );
        }
        preflight::verify_disk_space(&video_dir, plan.total_bytes)?;
        Ok(())
    }

    // === Execution ===

    /// Run the batch: reporter task and scheduler share one tracker. The
    /// reporter is cancelled once the scheduler drains, which covers batches
    /// where failed items never credit the tracker.
    fn execute(&self, plan: TransferPlan) {
        let action = plan.action;
        let started = Instant::now();
        println!();

        let outcomes = self.rt.block_on(async {
            let tracker = Arc::new(ProgressTracker::new(
                plan.items.len() as u64,
                plan.total_bytes,
            ));
            let cancel = CancellationToken::new();

            let reporter = if self.show_progress_enabled() {
                let reporter = ProgressReporter::new(
                    tracker.clone(),
                    self.config.poll_interval,
                    action.progress_label(),
                );
                Some(tokio::spawn(reporter.run(cancel.clone())))
            } else {
                None
            };

            let outcomes = run_batch(
                &self.client,
                plan.items,
                action,
                tracker,
                self.config.max_concurrent_transfers,
            )
            .await;

            cancel.cancel();
            if let Some(handle) = reporter {
                let _ = handle.await;
            }
            outcomes
        });

        let mut succeeded = 0usize;
        let mut failed = 0usize;
        for outcome in &outcomes {
            if outcome.succeeded {
                succeeded += 1;
                println!(
                    "  {} {} {}",
                    self.colors.green("✓"),
                    outcome.name,
                    self.colors.dimmed(&outcome.message)
                );
            } else {
                failed += 1;
                println!(
                    "  {} {} ({})",
                    self.colors.red("✗"),
                    outcome.name,
                    outcome.message
                );
            }
        }

        println!(
            "\n{} {} succeeded, {} failed, took {}",
            self.colors.bold("Summary:"),
            succeeded,
            failed,
            format_duration(started.elapsed())
        );
    }

    fn restart_idleassetsd(&self) {
        match ProcessCommand::new("killall").arg("idleassetsd").status() {
            Ok(status) if status.success() => {
                println!("{}", self.colors.green("idleassetsd restarted"));
            }
            Ok(status) => eprintln!("killall idleassetsd exited with {status}"),
            Err(e) => eprintln!("failed to restart idleassetsd: {e}"),
        }
    }

    fn show_progress_enabled(&self) -> bool {
        self.config.show_progress && std::env::var("NO_PROGRESS").is_err()
    }
}

fn confirm_text(plan: &TransferPlan) -> String {
    let verb = match plan.action {
        TransferAction::Download => "Download",
        TransferAction::Delete => "Delete",
    };
    format!(
        "\n{verb} {} wallpapers ({})? (y/n): ",
        plan.items.len(),
        format_size(plan.total_bytes)
    )
}

/// Read one line; Ctrl-C and Ctrl-D both mean "never mind".
fn prompt(rl: &mut DefaultEditor, text: &str) -> Result<Option<String>, Box<dyn Error>> {
    match rl.readline(text) {
        Ok(line) => Ok(Some(line)),
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
        Err(e) => Err(Box::new(e)),
    }
}

fn plan_line(pb: &ProgressBar, line: String) {
    if pb.is_hidden() {
        println!("{line}");
    } else {
        pb.println(line);
    }
}
