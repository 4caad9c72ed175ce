//! CLI Module
//!
//! Command-line interface for the Atelier virtual fitting room.

pub mod commands;

use clap::{ArgGroup, Args, Parser, Subcommand};
use std::path::PathBuf;

/// Atelier - virtual try-on studio backed by a hosted image model
#[derive(Parser, Debug)]
#[command(name = "atelier")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Studio file holding models, sessions and the wardrobe
    #[arg(long, global = true, default_value = "atelier.json")]
    pub studio: PathBuf,

    /// Use the built-in mock stylist instead of the hosted service
    #[arg(long, global = true)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a digital model from a photo and make it active
    #[command(name = "new-model")]
    NewModel {
        /// Photo of the person
        photo: PathBuf,

        /// Display name
        #[arg(short, long, default_value = "My model")]
        name: String,
    },

    /// List digital models
    #[command(name = "models")]
    Models,

    /// Switch to another digital model
    #[command(name = "select")]
    Select {
        /// Model id
        model_id: String,
    },

    /// Store the active session and return to the start screen
    #[command(name = "home")]
    Home,

    /// Manage the wardrobe
    #[command(subcommand)]
    Wardrobe(WardrobeCommand),

    /// Put garments from the wardrobe on the active model
    #[command(name = "dress")]
    Dress {
        /// Wardrobe item ids
        #[arg(required = true)]
        garments: Vec<String>,

        /// Pose instruction (defaults to the current pose)
        #[arg(short, long)]
        pose: Option<String>,
    },

    /// Change the pose of the current look
    #[command(name = "pose")]
    Pose {
        /// Pose instruction
        pose: String,
    },

    /// Change the background of the current look
    #[command(name = "background")]
    Background(BackgroundArgs),

    /// List stock backgrounds
    #[command(name = "backgrounds")]
    Backgrounds,

    /// Edit the current image with a free-text instruction
    #[command(name = "refine")]
    Refine {
        /// What to change
        instruction: String,
    },

    /// Remove the most recently added garment layer
    #[command(name = "undo")]
    Undo,

    /// Show the outfit history of the active model
    #[command(name = "history")]
    History,

    /// Save the current look to favorites
    #[command(name = "save-outfit")]
    SaveOutfit,

    /// List saved outfits
    #[command(name = "outfits")]
    Outfits,

    /// Restore a saved outfit
    #[command(name = "load-outfit")]
    LoadOutfit {
        /// Saved outfit id
        outfit_id: String,
    },

    /// Delete a saved outfit
    #[command(name = "delete-outfit")]
    DeleteOutfit {
        /// Saved outfit id
        outfit_id: String,
    },

    /// Write the current image to a file
    #[command(name = "export")]
    Export {
        /// Output file (extension follows the image type by default)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Turn the current image into a short video
    #[command(name = "animate")]
    Animate {
        /// Motion description
        prompt: String,

        /// Download the finished video to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum WardrobeCommand {
    /// Add a garment from a file or an http(s) URL
    #[command(name = "add")]
    Add {
        /// Image file or product image URL
        source: String,

        /// Display name (defaults to the file name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Add every supported image under a directory
    #[command(name = "import")]
    Import {
        /// Directory to scan
        dir: PathBuf,
    },

    /// List wardrobe items
    #[command(name = "list")]
    List,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("source").required(true).args(["prompt", "image", "preset"])))]
pub struct BackgroundArgs {
    /// Describe the scene
    #[arg(long)]
    pub prompt: Option<String>,

    /// Use a reference image
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// Stock background id (see `atelier backgrounds`)
    #[arg(long)]
    pub preset: Option<String>,
}
