use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "splitcap", version)]
struct Cli {
    /// Log level written to stderr.
    #[arg(long, global = true, default_value = "info")]
    log: tracing::Level,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Composite one display frame (PNG/JPEG) and write the result as a PNG.
    Frame(FrameArgs),
    /// Print the capture plan for a display as JSON.
    Plan(PlanArgs),
}

#[derive(Args, Debug)]
struct CaptureArgs {
    /// Capture options JSON; flags below override its fields.
    #[arg(long)]
    options: Option<PathBuf>,

    /// Display rotation, in counter-clockwise quarter turns.
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..4))]
    rotation: u8,

    /// First region crop, `width:height:x:y`.
    #[arg(long)]
    crop: Option<String>,

    /// Second region crop, `width:height:x:y`, packed to the right of the first.
    #[arg(long)]
    crop2: Option<String>,

    /// Capture orientation `[@]<0|90|180|270|flip0|flip90|flip180|flip270>`; `@` locks it.
    #[arg(long)]
    capture_orientation: Option<String>,

    /// Free rotation, degrees clockwise.
    #[arg(long, allow_hyphen_values = true)]
    angle: Option<f64>,

    /// Longest-edge cap of a single-region capture (0 = none).
    #[arg(long)]
    max_size: Option<u32>,
}

#[derive(Args, Debug)]
struct FrameArgs {
    /// Input display frame.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Backend to use.
    #[arg(long, value_enum, default_value_t = BackendChoice::Cpu)]
    backend: BackendChoice,

    #[command(flatten)]
    capture: CaptureArgs,
}

#[derive(Args, Debug)]
struct PlanArgs {
    /// Display size, `WIDTHxHEIGHT` (already rotated).
    #[arg(long)]
    display_size: String,

    #[command(flatten)]
    capture: CaptureArgs,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BackendChoice {
    Cpu,
    #[cfg(feature = "gpu")]
    Gpu,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.log)
        .with_writer(std::io::stderr)
        .init();

    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Plan(args) => cmd_plan(args),
    }
}

fn read_options_json(path: &Path) -> anyhow::Result<splitcap::CaptureOptions> {
    let f = File::open(path).with_context(|| format!("open options '{}'", path.display()))?;
    let options = splitcap::CaptureOptions::from_json_reader(BufReader::new(f))
        .with_context(|| format!("parse options '{}'", path.display()))?;
    Ok(options)
}

fn build_options(args: &CaptureArgs) -> anyhow::Result<splitcap::CaptureOptions> {
    let mut options = match &args.options {
        Some(path) => read_options_json(path)?,
        None => splitcap::CaptureOptions::default(),
    };
    if let Some(crop) = &args.crop {
        options.crop = Some(crop.parse().context("--crop")?);
    }
    if let Some(crop) = &args.crop2 {
        options.crop_region2 = Some(crop.parse().context("--crop2")?);
    }
    if let Some(orientation) = &args.capture_orientation {
        options
            .set_capture_orientation(orientation)
            .context("--capture-orientation")?;
    }
    if let Some(angle) = args.angle {
        options.angle = angle;
    }
    if let Some(max_size) = args.max_size {
        options.max_size = max_size;
    }
    options.validate()?;
    Ok(options)
}

fn parse_size(s: &str) -> anyhow::Result<splitcap::Size> {
    let (w, h) = s
        .split_once('x')
        .with_context(|| format!("size must be WIDTHxHEIGHT, got '{s}'"))?;
    Ok(splitcap::Size::new(
        w.trim().parse().with_context(|| format!("width in '{s}'"))?,
        h.trim().parse().with_context(|| format!("height in '{s}'"))?,
    ))
}

fn make_backend(choice: BackendChoice) -> anyhow::Result<Box<dyn splitcap::CompositeBackend>> {
    let kind = match choice {
        BackendChoice::Cpu => splitcap::BackendKind::Cpu,
        #[cfg(feature = "gpu")]
        BackendChoice::Gpu => splitcap::BackendKind::Gpu,
    };
    Ok(splitcap::create_backend(kind)?)
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let options = build_options(&args.capture)?;

    let img = image::open(&args.in_path)
        .with_context(|| format!("open image '{}'", args.in_path.display()))?
        .into_rgba8();
    let (width, height) = img.dimensions();
    let input = splitcap::FrameRGBA::new(width, height, img.into_raw())?;

    let mut display = splitcap::StaticDisplay::new(
        options.display_id,
        splitcap::Size::new(width, height),
        args.capture.rotation,
    );
    let mut backend = make_backend(args.backend)?;
    let mut session =
        splitcap::CaptureSession::new(options, splitcap::DeviceCapabilities::default())?;

    session.prepare(&display)?;
    session.start(backend.as_mut(), &mut display, None)?;
    let rendered = session.render_frame(backend.as_mut(), &splitcap::SourceFrame::new(&input));
    let frame = rendered.and_then(|()| backend.readback_rgba8());
    session.stop(backend.as_mut());
    session.release(&mut display);
    let frame = frame?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    image::save_buffer_with_format(
        &args.out,
        &frame.data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!(
        "wrote {} ({}x{})",
        args.out.display(),
        frame.width,
        frame.height
    );
    Ok(())
}

fn cmd_plan(args: PlanArgs) -> anyhow::Result<()> {
    let options = build_options(&args.capture)?;
    let size = parse_size(&args.display_size)?;
    let display = splitcap::StaticDisplay::new(options.display_id, size, args.capture.rotation);
    let mut session =
        splitcap::CaptureSession::new(options, splitcap::DeviceCapabilities::default())?;
    let plan = session.prepare(&display)?;
    println!("{}", serde_json::to_string_pretty(plan)?);
    Ok(())
}
