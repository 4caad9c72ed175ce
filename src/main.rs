//! Atelier CLI - Virtual Try-On Studio
//!
//! Command-line interface for the Atelier virtual fitting room.

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use atelier::cli::commands::{self, CliContext};
use atelier::cli::{Cli, Commands, WardrobeCommand};
use atelier::AtelierError;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Atelier v{}", env!("CARGO_PKG_VERSION"));

    let mut ctx = CliContext::open(&cli.studio, cli.offline)
        .with_context(|| format!("failed to open studio file {}", cli.studio.display()))?;

    match cli.command {
        Some(cmd) => handle_command(&mut ctx, cmd).map_err(|err| {
            report(&err);
            anyhow::Error::new(err)
        }),
        None => {
            println!("Atelier v{}", env!("CARGO_PKG_VERSION"));
            commands::print_studio_info(&ctx);
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn report(err: &AtelierError) {
    eprintln!("{}", err.friendly_message("The request could not be completed"));
    for suggestion in err.recovery_suggestions() {
        eprintln!("  - {}", suggestion);
    }
}

fn handle_command(ctx: &mut CliContext, cmd: Commands) -> atelier::Result<()> {
    match cmd {
        Commands::NewModel { photo, name } => commands::new_model(ctx, &photo, &name),
        Commands::Models => commands::list_models(ctx),
        Commands::Select { model_id } => commands::select(ctx, &model_id),
        Commands::Home => commands::home(ctx),
        Commands::Wardrobe(WardrobeCommand::Add { source, name }) => {
            commands::wardrobe_add(ctx, &source, name.as_deref())
        }
        Commands::Wardrobe(WardrobeCommand::Import { dir }) => commands::wardrobe_import(ctx, &dir),
        Commands::Wardrobe(WardrobeCommand::List) => commands::wardrobe_list(ctx),
        Commands::Dress { garments, pose } => commands::dress(ctx, &garments, pose.as_deref()),
        Commands::Pose { pose } => commands::pose(ctx, &pose),
        Commands::Background(args) => commands::background(ctx, &args),
        Commands::Backgrounds => commands::list_backgrounds(ctx),
        Commands::Refine { instruction } => commands::refine(ctx, &instruction),
        Commands::Undo => commands::undo(ctx),
        Commands::History => commands::show_history(ctx),
        Commands::SaveOutfit => commands::save_outfit(ctx),
        Commands::Outfits => commands::list_outfits(ctx),
        Commands::LoadOutfit { outfit_id } => commands::load_outfit(ctx, &outfit_id),
        Commands::DeleteOutfit { outfit_id } => commands::delete_outfit(ctx, &outfit_id),
        Commands::Export { output } => commands::export(ctx, output.as_deref()),
        Commands::Animate { prompt, output } => commands::animate(ctx, &prompt, output.as_deref()),
    }
}
