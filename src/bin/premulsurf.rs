use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use sha2::Digest as _;

#[derive(Parser, Debug)]
#[command(name = "premulsurf", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode an image into a premultiplied BGRA surface and describe it.
    Inspect(InspectArgs),
    /// Convert a single straight-alpha RGBA pixel.
    Pixel(PixelArgs),
}

#[derive(Parser, Debug)]
struct InspectArgs {
    /// Input PNG/JPEG file.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Print the report as JSON.
    #[arg(long)]
    json: bool,

    /// Write the raw premultiplied BGRA bytes to this path.
    #[arg(long)]
    dump_raw: Option<PathBuf>,

    /// Decoder options as a JSON file (see `DecoderOpts`).
    #[arg(long)]
    decoder_opts: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct PixelArgs {
    r: u8,
    g: u8,
    b: u8,
    a: u8,
}

#[derive(serde::Serialize, Debug)]
struct InspectReport {
    width: u32,
    height: u32,
    stride: usize,
    byte_size: usize,
    format: premulsurf::SurfaceFormat,
    sha256: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Inspect(args) => cmd_inspect(args),
        Command::Pixel(args) => cmd_pixel(args),
    }
}

fn read_decoder_opts(path: &Path) -> anyhow::Result<premulsurf::DecoderOpts> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("open decoder options '{}'", path.display()))?;
    Ok(premulsurf::DecoderOpts::from_json_str(&text)?)
}

fn cmd_inspect(args: InspectArgs) -> anyhow::Result<()> {
    let bytes = std::fs::read(&args.in_path)
        .with_context(|| format!("read image '{}'", args.in_path.display()))?;

    let decoder = match &args.decoder_opts {
        Some(path) => premulsurf::ImageDecoder::new(read_decoder_opts(path)?),
        None => premulsurf::ImageDecoder::default(),
    };
    let backend = premulsurf::PixmapBackend::new(premulsurf::PixmapBackendOpts::from_env());
    let surface = premulsurf::SurfaceResource::from_encoded_with(&decoder, backend, &bytes)
        .with_context(|| format!("build surface from '{}'", args.in_path.display()))?;

    let pixels = surface
        .read()
        .context("surface is empty after a successful load (bug)")?;

    if let Some(out) = &args.dump_raw {
        if let Some(parent) = out.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create output dir '{}'", parent.display()))?;
        }
        std::fs::write(out, &*pixels)
            .with_context(|| format!("write raw surface '{}'", out.display()))?;
    }

    let dims = surface.dimensions();
    let report = InspectReport {
        width: dims.width,
        height: dims.height,
        stride: surface.stride(),
        byte_size: surface.byte_size(),
        format: surface.format(),
        sha256: sha256_hex(&pixels),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("size:      {}x{}", report.width, report.height);
        println!("stride:    {}", report.stride);
        println!("byte_size: {}", report.byte_size);
        println!("format:    {:?}", report.format);
        println!("sha256:    {}", report.sha256);
    }

    if let Some(out) = &args.dump_raw {
        eprintln!("wrote {}", out.display());
    }
    Ok(())
}

fn cmd_pixel(args: PixelArgs) -> anyhow::Result<()> {
    let [b, g, r, a] = premulsurf::convert_pixel([args.r, args.g, args.b, args.a]);
    println!("B={b} G={g} R={r} A={a}");
    Ok(())
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = sha2::Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        out.push_str(&format!("{:02x}", b));
    }
    out
}
