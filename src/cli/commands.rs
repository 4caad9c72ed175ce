//! CLI Command Implementations
//!
//! Every command loads the studio file, runs one operation and writes the
//! studio back when something changed.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::StudioConfig;
use crate::error::{AtelierError, Result};
use crate::media::ImageRef;
use crate::state::{StudioStore, CURRENT_SCHEMA_VERSION};
use crate::studio::{BackgroundChoice, EditOutcome, EditRequest, Studio};
use crate::stylist::{Animator, GeminiStylist, MockAnimator, MockStylist, Stylist};

use super::BackgroundArgs;

/// A studio loaded from its file, plus how to reach the stylist.
pub struct CliContext {
    store: StudioStore,
    studio: Studio,
    offline: bool,
}

impl CliContext {
    /// Open the studio file, starting an empty studio when it does not exist.
    pub fn open(path: &Path, offline: bool) -> Result<Self> {
        let config = StudioConfig::from_env()?;
        let store = StudioStore::new(path);
        let studio = match store.load_if_exists()? {
            Some(snapshot) => Studio::from_snapshot(config, snapshot)?,
            None => {
                info!(path = %path.display(), "starting a new studio file");
                Studio::new(config)
            }
        };
        Ok(Self {
            store,
            studio,
            offline,
        })
    }

    pub fn studio(&self) -> &Studio {
        &self.studio
    }

    fn save(&self) -> Result<()> {
        self.store.save(&self.studio.snapshot())
    }

    fn stylist(&self) -> Result<Box<dyn Stylist>> {
        if self.offline {
            Ok(Box::new(MockStylist::new()))
        } else {
            Ok(Box::new(GeminiStylist::from_config(self.studio.config())?))
        }
    }

    fn animator(&self) -> Result<Box<dyn Animator>> {
        if self.offline {
            Ok(Box::new(MockAnimator::default()))
        } else {
            Ok(Box::new(GeminiStylist::from_config(self.studio.config())?))
        }
    }

    fn edit(&mut self, request: EditRequest) -> Result<EditOutcome> {
        let stylist = self.stylist()?;
        let outcome = self.studio.apply_edit(stylist.as_ref(), request)?;
        self.save()?;
        Ok(outcome)
    }
}

fn print_outcome(outcome: &EditOutcome) {
    if outcome.cached {
        println!("Pose '{}' restored from cache (no generation needed).", outcome.pose);
    } else {
        println!("New look generated for pose '{}'.", outcome.pose);
    }
    println!("Layers: {}", outcome.layers);
    println!("Image: {}", outcome.image.abbreviated());
}

/// Generate a base model from a photo.
pub fn new_model(ctx: &mut CliContext, photo: &Path, name: &str) -> Result<()> {
    info!("Creating digital model '{}' from {}", name, photo.display());

    let stylist = ctx.stylist()?;
    let photo_ref = ImageRef::new(photo.to_string_lossy());
    let model_id = ctx.studio.create_model(stylist.as_ref(), name, &photo_ref)?;
    ctx.save()?;

    println!("Digital model created: {} ({})", name, model_id);
    Ok(())
}

/// List digital models.
pub fn list_models(ctx: &CliContext) -> Result<()> {
    let sessions = ctx.studio.sessions();
    if sessions.models().is_empty() {
        println!("No digital models yet. Create one with 'atelier new-model <photo>'.");
        return Ok(());
    }

    for model in sessions.models() {
        let marker = if sessions.active_model_id() == Some(model.id.as_str()) {
            ">>> "
        } else {
            "    "
        };
        println!(
            "{}{}: {} (created {})",
            marker,
            model.id,
            model.name,
            model.created_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}

pub fn select(ctx: &mut CliContext, model_id: &str) -> Result<()> {
    ctx.studio.select_model(model_id)?;
    ctx.save()?;

    let pose = ctx.studio.current_pose().unwrap_or_default();
    println!("Active model: {}", model_id);
    println!("Current pose: {}", pose);
    Ok(())
}

pub fn home(ctx: &mut CliContext) -> Result<()> {
    match ctx.studio.go_home()? {
        Some(model_id) => println!("Session of {} stored.", model_id),
        None => println!("No model was active."),
    }
    ctx.save()
}

/// Add a garment from a file path or URL.
pub fn wardrobe_add(ctx: &mut CliContext, source: &str, name: Option<&str>) -> Result<()> {
    let source_ref = ImageRef::new(source);
    let default_name = Path::new(source)
        .file_stem()
        .map(|stem| stem.to_string_lossy().replace(['-', '_'], " "))
        .unwrap_or_else(|| "Garment".to_string());
    let name = name.map(str::to_string).unwrap_or(default_name);

    let item = if source_ref.is_remote() {
        ctx.studio.import_garment_from_url(&name, source)?
    } else {
        ctx.studio.upload_garment(&name, &source_ref)?
    };
    ctx.save()?;

    println!("Wardrobe item: {} ({})", item.name, item.id);
    Ok(())
}

pub fn wardrobe_import(ctx: &mut CliContext, dir: &Path) -> Result<()> {
    let imported = ctx.studio.import_wardrobe_dir(dir)?;
    ctx.save()?;

    println!("Imported {} garment(s) from {}", imported, dir.display());
    Ok(())
}

pub fn wardrobe_list(ctx: &CliContext) -> Result<()> {
    let wardrobe = ctx.studio.wardrobe();
    if wardrobe.is_empty() {
        println!("The wardrobe is empty.");
        return Ok(());
    }

    let worn = ctx.studio.worn_garment_ids();
    for item in wardrobe.items() {
        let marker = if worn.contains(&item.id) { "[worn] " } else { "       " };
        println!("{}{}: {}", marker, item.id, item.name);
    }
    Ok(())
}

pub fn dress(ctx: &mut CliContext, garment_ids: &[String], pose: Option<&str>) -> Result<()> {
    let garments = garment_ids
        .iter()
        .map(|id| ctx.studio.garment(id).cloned())
        .collect::<Result<Vec<_>>>()?;

    let mut request = EditRequest::add_garments(garments);
    if let Some(pose) = pose {
        request = request.with_pose(pose);
    }
    let outcome = ctx.edit(request)?;
    print_outcome(&outcome);
    Ok(())
}

pub fn pose(ctx: &mut CliContext, pose: &str) -> Result<()> {
    let outcome = ctx.edit(EditRequest::change_pose(pose))?;
    print_outcome(&outcome);
    Ok(())
}

pub fn background(ctx: &mut CliContext, args: &BackgroundArgs) -> Result<()> {
    let choice = match (&args.prompt, &args.image, &args.preset) {
        (Some(prompt), _, _) => BackgroundChoice::Prompt(prompt.clone()),
        (_, Some(image), _) => BackgroundChoice::Image(ImageRef::new(image.to_string_lossy())),
        (_, _, Some(preset)) => BackgroundChoice::Preset(preset.clone()),
        (None, None, None) => {
            return Err(AtelierError::InvalidConfig {
                key: "background".to_string(),
                value: "one of --prompt, --image or --preset is required".to_string(),
            })
        }
    };

    let outcome = ctx.edit(EditRequest::change_background(choice))?;
    print_outcome(&outcome);
    Ok(())
}

pub fn list_backgrounds(ctx: &CliContext) -> Result<()> {
    for option in ctx.studio.backgrounds() {
        println!("{}: {}", option.id, option.name);
    }
    Ok(())
}

pub fn refine(ctx: &mut CliContext, instruction: &str) -> Result<()> {
    let outcome = ctx.edit(EditRequest::refine(instruction))?;
    print_outcome(&outcome);
    Ok(())
}

pub fn undo(ctx: &mut CliContext) -> Result<()> {
    if ctx.studio.remove_last_garment()? {
        ctx.save()?;
        println!("Removed the last layer.");
    } else {
        println!("Nothing to undo: only the base model is left.");
    }
    Ok(())
}

/// Show the outfit history of the active model.
pub fn show_history(ctx: &CliContext) -> Result<()> {
    let history = ctx.studio.history()?;
    let pose = ctx.studio.current_pose().unwrap_or_default();

    println!("Outfit History:");
    println!("{:-<60}", "");
    for (i, layer) in history.layers().iter().enumerate() {
        let marker = if i + 1 == history.len() { ">>> " } else { "    " };
        let garments = if i == 0 {
            "base model".to_string()
        } else if layer.has_garments() {
            layer.garment_names().join(", ")
        } else {
            "(edit)".to_string()
        };
        let poses: Vec<_> = layer.pose_images.poses().collect();
        println!("{}{}: {} [poses: {}]", marker, i, garments, poses.join(" | "));
    }
    println!("{:-<60}", "");
    println!("Current pose: {}", pose);
    Ok(())
}

pub fn save_outfit(ctx: &mut CliContext) -> Result<()> {
    match ctx.studio.save_outfit()? {
        Some(outfit) => {
            ctx.save()?;
            println!("Outfit saved: {}", outfit.id);
        }
        None => println!("Nothing to save (already saved, or no garments on the model)."),
    }
    Ok(())
}

pub fn list_outfits(ctx: &CliContext) -> Result<()> {
    let session = ctx.studio.active_session()?;
    if session.saved_outfits.is_empty() {
        println!("No saved outfits.");
        return Ok(());
    }

    for outfit in session.saved_outfits.iter() {
        println!(
            "{}: {} layer(s), saved {}",
            outfit.id,
            outfit.layers.len(),
            outfit.saved_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}

pub fn load_outfit(ctx: &mut CliContext, outfit_id: &str) -> Result<()> {
    ctx.studio.load_outfit(outfit_id)?;
    ctx.save()?;

    println!("Outfit {} loaded.", outfit_id);
    println!("Current pose: {}", ctx.studio.current_pose().unwrap_or_default());
    Ok(())
}

pub fn delete_outfit(ctx: &mut CliContext, outfit_id: &str) -> Result<()> {
    ctx.studio.delete_outfit(outfit_id)?;
    ctx.save()?;

    println!("Outfit {} deleted.", outfit_id);
    Ok(())
}

/// Write the current image to disk.
pub fn export(ctx: &CliContext, output: Option<&Path>) -> Result<()> {
    let image = ctx.studio.current_image_data()?;
    let path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(format!("look.{}", image.extension())));

    write_file(&path, image.bytes())?;
    println!("Image written to {}", path.display());
    Ok(())
}

pub fn animate(ctx: &mut CliContext, prompt: &str, output: Option<&Path>) -> Result<()> {
    let animator = ctx.animator()?;
    println!("Animating the current look. This might take a few minutes...");
    let video_url = ctx.studio.animate(animator.as_ref(), prompt)?;
    println!("Video ready: {}", video_url);

    if let Some(path) = output {
        if ctx.offline {
            println!("Offline mode has no video to download.");
        } else {
            let bytes = GeminiStylist::from_config(ctx.studio.config())?.download_video(&video_url)?;
            write_file(path, &bytes)?;
            println!("Video written to {}", path.display());
        }
    }
    Ok(())
}

/// Print studio file details.
pub fn print_studio_info(ctx: &CliContext) {
    println!("Studio file: {}", ctx.store.path().display());
    println!("Schema version: {}", CURRENT_SCHEMA_VERSION);
    println!("Models: {}", ctx.studio.sessions().models().len());
    println!("Wardrobe items: {}", ctx.studio.wardrobe().len());
    if let Some(model) = ctx.studio.sessions().active_model() {
        println!("Active model: {} ({})", model.name, model.id);
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).map_err(|e| AtelierError::FileWriteError {
        path: path.to_path_buf(),
        source: e,
    })
}
