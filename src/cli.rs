//! Headless front end.
//!
//! Drives a [`Session`] with synthetic pointer events so masks can be drawn,
//! analyzed and sent for generation from scripts. Pointer coordinates are
//! native image pixels (the display rectangle is the identity).

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use maskpaint::config::{AppConfig, ConfigError, GenerationParams};
use maskpaint::coord_map::{DisplayRect, MapError, fit_display};
use maskpaint::error::SessionError;
use maskpaint::geometry::Point;
use maskpaint::session::Session;
use maskpaint::tool::DrawTool;
use maskpaint_backend::{HttpBackend, LoadModelsRequest, ModelSource};
use thiserror::Error;
use web_time::Instant;

/// Mask drawing and inpainting client.
#[derive(Parser, Debug)]
#[command(name = "maskpaint", version, about = "Draw inpainting masks and run generation from the command line")]
pub struct CliArgs {
    /// Configuration file (defaults to the platform config directory).
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Backend base URL, overriding the configuration.
    #[arg(long, global = true, value_name = "URL")]
    pub server: Option<String>,

    /// Write the effective configuration back to the configuration file.
    #[arg(long, global = true)]
    pub save_config: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Draw a mask and write it as PNG.
    Mask(MaskArgs),
    /// Ask the backend whether its models are loaded.
    Check,
    /// Load the base model and LoRA weights on the backend.
    LoadModels(LoadModelsArgs),
    /// Draw a mask, generate variants and save them.
    Generate(GenerateArgs),
}

/// A rectangle given as two opposite corners.
#[derive(Debug, Clone, Copy)]
pub struct RectArg(Point, Point);

/// Points of one brush stroke.
#[derive(Debug, Clone)]
pub struct StrokeArg(Vec<Point>);

fn parse_point(s: &str) -> Result<Point, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got '{}'", s))?;
    let x = x.trim().parse::<f32>().map_err(|e| format!("bad x in '{}': {}", s, e))?;
    let y = y.trim().parse::<f32>().map_err(|e| format!("bad y in '{}': {}", s, e))?;
    Ok(Point::new(x, y))
}

fn parse_rect(s: &str) -> Result<RectArg, String> {
    let values = s
        .split(',')
        .map(|v| v.trim().parse::<f32>().map_err(|e| format!("bad value in '{}': {}", s, e)))
        .collect::<Result<Vec<_>, _>>()?;
    match values.as_slice() {
        [x0, y0, x1, y1] => Ok(RectArg(Point::new(*x0, *y0), Point::new(*x1, *y1))),
        _ => Err(format!("expected X0,Y0,X1,Y1 but got '{}'", s)),
    }
}

fn parse_stroke(s: &str) -> Result<StrokeArg, String> {
    let points = s
        .split(';')
        .filter(|p| !p.trim().is_empty())
        .map(parse_point)
        .collect::<Result<Vec<_>, _>>()?;
    if points.is_empty() {
        return Err("a stroke needs at least one point".to_string());
    }
    Ok(StrokeArg(points))
}

fn parse_viewport(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH but got '{}'", s))?;
    let w = w.trim().parse::<u32>().map_err(|e| e.to_string())?;
    let h = h.trim().parse::<u32>().map_err(|e| e.to_string())?;
    if w == 0 || h == 0 {
        return Err("viewport must be non-empty".to_string());
    }
    Ok((w, h))
}

/// Source image and the shapes drawn on its mask.
#[derive(Args, Debug)]
pub struct MaskInput {
    /// Image to draw on.
    #[arg(long, value_name = "IMAGE")]
    pub image: PathBuf,

    /// Rectangle selection; may be repeated.
    #[arg(long = "rect", value_name = "X0,Y0,X1,Y1", value_parser = parse_rect)]
    pub rects: Vec<RectArg>,

    /// Brush stroke through the given points; may be repeated.
    #[arg(long = "stroke", value_name = "X,Y;X,Y;...", value_parser = parse_stroke)]
    pub strokes: Vec<StrokeArg>,

    /// Brush diameter in pixels (overrides the configuration).
    #[arg(long, value_name = "N")]
    pub brush_size: Option<u32>,
}

#[derive(Args, Debug)]
pub struct MaskArgs {
    #[command(flatten)]
    pub input: MaskInput,

    /// Where to write the mask PNG.
    #[arg(long, value_name = "MASK.png")]
    pub out: PathBuf,
}

#[derive(Args, Debug)]
pub struct LoadModelsArgs {
    /// Base model path on the backend host.
    #[arg(long)]
    pub sd3_path: Option<String>,
    /// Base model file to upload (used when no path is given).
    #[arg(long)]
    pub sd3_file: Option<PathBuf>,
    /// LoRA weights path on the backend host.
    #[arg(long)]
    pub lora_path: Option<String>,
    /// LoRA weights file to upload (used when no path is given).
    #[arg(long)]
    pub lora_file: Option<PathBuf>,
}

/// Which overlays to draw on the saved composites.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlayArg {
    #[default]
    None,
    Mask,
    Crop,
    Both,
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub input: MaskInput,

    #[arg(long)]
    pub prompt: Option<String>,

    #[arg(long)]
    pub negative_prompt: Option<String>,

    #[arg(long, value_name = "N")]
    pub num_images: Option<u32>,

    #[arg(long)]
    pub guidance_scale: Option<f32>,

    #[arg(long, value_name = "N")]
    pub steps: Option<u32>,

    /// Context around the mask in pixels.
    #[arg(long, value_name = "N", conflicts_with = "auto_padding")]
    pub padding: Option<u32>,

    /// Ask the backend for a padding suited to the mask.
    #[arg(long)]
    pub auto_padding: bool,

    /// Directory for the generated images.
    #[arg(long, value_name = "DIR")]
    pub out_dir: PathBuf,

    /// Also save each result with these overlays drawn on top.
    #[arg(long, value_enum, default_value_t = OverlayArg::None)]
    pub overlay: OverlayArg,

    /// Viewer size used for overlay composites.
    #[arg(long, value_name = "WxH", default_value = "1200x800", value_parser = parse_viewport)]
    pub viewport: (u32, u32),
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Layout error: {0}")]
    Layout(#[from] MapError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Resolve the configuration: explicit file, then default path, then defaults.
fn load_config(args: &CliArgs) -> Result<AppConfig, ConfigError> {
    let mut config = match &args.config {
        // A file about to be written may not exist yet.
        Some(path) if args.save_config && !path.exists() => AppConfig::default(),
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::load_from_default_path().unwrap_or_default(),
    };
    if let Some(server) = &args.server {
        config.backend_url = server.clone();
    }
    Ok(config)
}

/// Persist `config` to the `--config` file or the default location.
fn save_config(args: &CliArgs, config: &AppConfig) -> Result<PathBuf, ConfigError> {
    let path = args.config.clone().or_else(AppConfig::default_path).ok_or_else(|| {
        ConfigError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine config directory",
        ))
    })?;
    config.save(&path)?;
    Ok(path)
}

fn init_logging(config: &AppConfig) {
    env_logger::Builder::new()
        .filter_level(config.log_level.to_level_filter())
        .parse_default_env()
        .init();
}

/// Run the selected command and return an OS exit code.
pub fn run(args: CliArgs) -> ExitCode {
    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config);

    if args.save_config {
        if let Err(e) = save_config(&args, &config) {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    }

    match execute(args.command, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn execute(command: Command, config: AppConfig) -> Result<(), CliError> {
    let backend = HttpBackend::new(config.backend_url.clone());
    let mut session = Session::new(config);

    match command {
        Command::Mask(args) => {
            draw_mask(&mut session, &args.input)?;
            session.layers().mask.bitmap().save(&args.out)?;
            println!("Mask written to {}", args.out.display());
            print_mask_info(&session);
        }
        Command::Check => {
            let loaded = session.run_check_model(&backend)?;
            println!("Models loaded: {}", if loaded { "yes" } else { "no" });
        }
        Command::LoadModels(args) => {
            let request = LoadModelsRequest {
                sd3: ModelSource::prefer_path(args.sd3_path.as_deref(), args.sd3_file),
                lora: ModelSource::prefer_path(args.lora_path.as_deref(), args.lora_file),
            };
            let message = session.run_load_models(&backend, &request)?;
            println!("{}", message);
        }
        Command::Generate(args) => generate(&mut session, &backend, args)?,
    }
    Ok(())
}

/// Load the image and replay the requested shapes as pointer events.
fn draw_mask(session: &mut Session, input: &MaskInput) -> Result<(), CliError> {
    session.load_image_path(&input.image)?;
    if let Some(size) = input.brush_size {
        session.set_brush_size(size);
    }
    let (width, height) = session.image().map(|i| i.dimensions()).unwrap_or_default();
    let display = DisplayRect::sized(width as f32, height as f32);

    session.set_tool(DrawTool::Rect);
    for RectArg(a, b) in &input.rects {
        session.pointer_down(*a, display)?;
        session.pointer_move(*b, display)?;
        session.pointer_up(*b, display, Instant::now())?;
    }

    session.set_tool(DrawTool::Brush);
    for StrokeArg(points) in &input.strokes {
        let Some((first, rest)) = points.split_first() else {
            continue;
        };
        session.pointer_down(*first, display)?;
        for point in rest {
            session.pointer_move(*point, display)?;
        }
        let last = rest.last().unwrap_or(first);
        session.pointer_up(*last, display, Instant::now())?;
    }
    Ok(())
}

fn print_mask_info(session: &Session) {
    match session.local_mask_info() {
        Some(info) => {
            println!("Bounding box: {}", info.bbox_label());
            println!("Auto padding: {}px", info.auto_padding);
            println!("Model input: {}", info.model_size_label());
        }
        None => println!("Mask is empty"),
    }
}

fn generate(session: &mut Session, backend: &HttpBackend, args: GenerateArgs) -> Result<(), CliError> {
    draw_mask(session, &args.input)?;

    if !session.run_check_model(backend)? {
        return Err(SessionError::ModelsNotLoaded.into());
    }
    if args.auto_padding {
        if let Some(info) = session.run_mask_info(backend)? {
            println!("Bounding box: {}", info.bbox_label());
        }
        println!("Auto padding: {}px", session.padding().unwrap_or(0));
    }

    let defaults = session.config().generation.clone();
    let params = GenerationParams {
        prompt: args.prompt.unwrap_or(defaults.prompt),
        negative_prompt: args.negative_prompt.unwrap_or(defaults.negative_prompt),
        num_images: args.num_images.unwrap_or(defaults.num_images),
        guidance_scale: args.guidance_scale.unwrap_or(defaults.guidance_scale),
        num_inference_steps: args.steps.unwrap_or(defaults.num_inference_steps),
        padding_mask_crop: args.padding,
    };
    session.run_generation(backend, params)?;
    if let Some(status) = session.status() {
        println!("{}", status.text);
    }

    for path in session.save_results(&args.out_dir)? {
        println!("Saved {}", path.display());
    }
    if args.overlay != OverlayArg::None {
        save_overlays(session, &args.out_dir, args.overlay, args.viewport)?;
    }
    Ok(())
}

/// Save every result composited with the chosen overlays.
fn save_overlays(
    session: &mut Session,
    dir: &Path,
    overlay: OverlayArg,
    (view_w, view_h): (u32, u32),
) -> Result<(), CliError> {
    let viewer = session.viewer_mut();
    viewer.set_viewport(view_w, view_h)?;
    if matches!(overlay, OverlayArg::Mask | OverlayArg::Both) {
        viewer.toggle_mask()?;
    }
    if matches!(overlay, OverlayArg::Crop | OverlayArg::Both) {
        viewer.toggle_crop()?;
    }

    let count = viewer.nav_state().map_or(0, |nav| nav.len);
    for index in 0..count {
        viewer.show_image(index);
        let Some((w, h)) = viewer.current_image().map(|img| img.dimensions()) else {
            continue;
        };
        let (fit_w, fit_h) = fit_display(w, h, view_w as f32, view_h as f32);
        viewer.notify_image_loaded(index, fit_w, fit_h)?;
        if let Some(composite) = viewer.composite() {
            let path = dir.join(format!("overlay_{}.png", index + 1));
            composite.save(&path)?;
            println!("Saved {}", path.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rect() {
        let RectArg(a, b) = parse_rect("100, 100,300,250").unwrap();
        assert_eq!((a.x, a.y, b.x, b.y), (100.0, 100.0, 300.0, 250.0));
        assert!(parse_rect("1,2,3").is_err());
        assert!(parse_rect("a,b,c,d").is_err());
    }

    #[test]
    fn test_parse_stroke() {
        let StrokeArg(points) = parse_stroke("1,2;3,4;").unwrap();
        assert_eq!(points.len(), 2);
        assert!(parse_stroke("").is_err());
        assert!(parse_stroke("1;2").is_err());
    }

    #[test]
    fn test_parse_viewport() {
        assert_eq!(parse_viewport("1200x800"), Ok((1200, 800)));
        assert_eq!(parse_viewport("640X480"), Ok((640, 480)));
        assert!(parse_viewport("0x10").is_err());
        assert!(parse_viewport("1200").is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = CliArgs::try_parse_from([
            "maskpaint",
            "--server",
            "http://localhost:7000",
            "generate",
            "--image",
            "in.png",
            "--rect",
            "10,10,50,50",
            "--stroke",
            "1,1;5,5",
            "--auto-padding",
            "--out-dir",
            "out",
            "--overlay",
            "both",
        ])
        .unwrap();
        assert_eq!(args.server.as_deref(), Some("http://localhost:7000"));
        let Command::Generate(generate) = args.command else {
            panic!("expected generate");
        };
        assert_eq!(generate.input.rects.len(), 1);
        assert_eq!(generate.input.strokes.len(), 1);
        assert!(generate.auto_padding);
        assert_eq!(generate.overlay, OverlayArg::Both);
        assert_eq!(generate.viewport, (1200, 800));
    }

    #[test]
    fn test_save_config_persists_server_override() {
        let dir = std::env::temp_dir().join(format!("maskpaint-cli-config-{}", std::process::id()));
        let path = dir.join("config.json");
        let _ = std::fs::remove_dir_all(&dir);
        let path_arg = path.to_string_lossy().into_owned();

        let args = CliArgs::try_parse_from([
            "maskpaint",
            "--config",
            path_arg.as_str(),
            "--server",
            "http://gpu-box:5000",
            "--save-config",
            "check",
        ])
        .unwrap();
        assert!(args.save_config);

        let config = load_config(&args).unwrap();
        assert_eq!(save_config(&args, &config).unwrap(), path);
        let saved = AppConfig::load(&path).unwrap();
        assert_eq!(saved.backend_url, "http://gpu-box:5000");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_padding_conflicts_with_auto_padding() {
        let result = CliArgs::try_parse_from([
            "maskpaint",
            "generate",
            "--image",
            "in.png",
            "--padding",
            "20",
            "--auto-padding",
            "--out-dir",
            "out",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_draw_mask_replays_shapes() {
        let dir = std::env::temp_dir().join(format!("maskpaint-cli-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let image_path = dir.join("in.png");
        image::RgbImage::new(120, 80).save(&image_path).unwrap();

        let input = MaskInput {
            image: image_path,
            rects: vec![parse_rect("10,10,40,30").unwrap()],
            strokes: vec![parse_stroke("80,40;100,40").unwrap()],
            brush_size: Some(4),
        };
        let mut session = Session::default();
        draw_mask(&mut session, &input).unwrap();

        let mask = &session.layers().mask;
        assert!(mask.is_selected(20, 20));
        assert!(mask.is_selected(90, 40));
        assert!(!mask.is_selected(60, 60));
        assert_eq!(session.brush_size(), 4);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
