use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use image::{GrayImage, ImageReader};

use graycrypt::{compress, decrypt, encrypt, CompressedImage, EncryptedImage, Image};

/// Encrypt, compress, and decrypt grayscale images. The compressor works on
/// ciphertext and needs no key.
#[derive(Parser)]
#[command(name = "graycrypt", about = "Compress encrypted grayscale images", long_about = None)]
struct Cli {
    /// Encrypt mode
    #[arg(short = 'e')]
    encrypt: bool,

    /// Compress mode
    #[arg(short = 'c')]
    compress: bool,

    /// Decrypt mode
    #[arg(short = 'd')]
    decrypt: bool,

    /// Force overwrite existing files
    #[arg(short = 'f')]
    force: bool,

    /// Path to key file (raw key bytes, trailing newline ignored)
    #[arg(short = 'k', value_name = "FILE")]
    key_file: Option<PathBuf>,

    /// Passkey, used as raw key bytes (must be 16, 24, or 32 bytes)
    #[arg(short = 'p', value_name = "PASSKEY")]
    passkey: Option<String>,

    /// Path to output file
    #[arg(short = 'o', value_name = "FILE")]
    output: Option<PathBuf>,

    /// Quantization for compression, a power of two in [1, 128]
    #[arg(short = 'q', default_value_t = 1)]
    quantization: u8,

    /// Input file; without a mode flag the extension decides:
    /// .png/.gif/.jpg/.jpeg encrypt, .gse compresses, .gsc decrypts
    input: PathBuf,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Encrypt,
    Compress,
    Decrypt,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mode = select_mode(&cli)?;
    let out_path = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output(&cli.input, mode));

    if !cli.force && out_path.exists() && !confirm_overwrite(&out_path)? {
        return Ok(());
    }

    match mode {
        Mode::Encrypt => run_encrypt(&cli, &out_path),
        Mode::Compress => run_compress(&cli, &out_path),
        Mode::Decrypt => run_decrypt(&cli, &out_path),
    }
}

fn select_mode(cli: &Cli) -> Result<Mode> {
    let flagged: Vec<Mode> = [
        (cli.encrypt, Mode::Encrypt),
        (cli.compress, Mode::Compress),
        (cli.decrypt, Mode::Decrypt),
    ]
    .into_iter()
    .filter_map(|(set, mode)| set.then_some(mode))
    .collect();

    match flagged[..] {
        [mode] => Ok(mode),
        [] => infer_mode(&cli.input),
        _ => bail!("multiple modes specified"),
    }
}

fn infer_mode(input: &Path) -> Result<Mode> {
    let ext = input
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "gse" => Ok(Mode::Compress),
        "gsc" => Ok(Mode::Decrypt),
        "png" | "gif" | "jpg" | "jpeg" => Ok(Mode::Encrypt),
        _ => bail!(
            "cannot infer a mode from {}; pass -e, -c, or -d",
            input.display()
        ),
    }
}

fn default_output(input: &Path, mode: Mode) -> PathBuf {
    let ext = match mode {
        Mode::Encrypt => "gse",
        Mode::Compress => "gsc",
        Mode::Decrypt => "png",
    };
    input.with_extension(ext)
}

fn confirm_overwrite(path: &Path) -> Result<bool> {
    print!("Overwrite existing file {}? (y/[n]): ", path.display());
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn load_key(cli: &Cli) -> Result<Vec<u8>> {
    match (&cli.key_file, &cli.passkey) {
        (Some(_), Some(_)) => bail!("both -k and -p provided"),
        (None, None) => bail!("no key provided; pass -k or -p"),
        (None, Some(passkey)) => Ok(passkey.as_bytes().to_vec()),
        (Some(path), None) => {
            let mut bytes = fs::read(path)
                .with_context(|| format!("read key file {}", path.display()))?;
            if bytes.last() == Some(&b'\n') {
                bytes.pop();
                if bytes.last() == Some(&b'\r') {
                    bytes.pop();
                }
            }
            Ok(bytes)
        }
    }
}

fn run_encrypt(cli: &Cli, out_path: &Path) -> Result<()> {
    let key = load_key(cli)?;
    let gray = ImageReader::open(&cli.input)
        .with_context(|| format!("open {}", cli.input.display()))?
        .decode()
        .context("decode input image")?
        .to_luma8();
    let (width, height) = gray.dimensions();
    println!("width: {} height: {}", width, height);

    let img = Image::from_gray(gray.into_raw(), width as usize, height as usize)?;
    let enc = encrypt(&img, &key)?;
    fs::write(out_path, enc.to_bytes()?)
        .with_context(|| format!("write {}", out_path.display()))?;
    Ok(())
}

fn run_compress(cli: &Cli, out_path: &Path) -> Result<()> {
    let data = fs::read(&cli.input)
        .with_context(|| format!("read {}", cli.input.display()))?;
    let enc = EncryptedImage::from_bytes(&data)?;
    let comp = compress(&enc, cli.quantization)?;

    let original = comp.width * comp.height;
    let compressed = comp.quarter.len() + comp.qtable.len() + comp.encoded_qdiffs.len();
    println!(
        "q: {} orig: {:6}k diffs: {:6}k comp: {:6}k ratio: {:.3}",
        cli.quantization,
        original / 1000,
        comp.encoded_qdiffs.len() / 1000,
        compressed / 1000,
        compressed as f64 / original as f64
    );

    fs::write(out_path, comp.to_bytes()?)
        .with_context(|| format!("write {}", out_path.display()))?;
    Ok(())
}

fn run_decrypt(cli: &Cli, out_path: &Path) -> Result<()> {
    let key = load_key(cli)?;
    let data = fs::read(&cli.input)
        .with_context(|| format!("read {}", cli.input.display()))?;
    let comp = CompressedImage::from_bytes(&data)?;
    let dec = decrypt(&comp, &key)?;

    let out = GrayImage::from_raw(
        dec.unpadded_width() as u32,
        dec.unpadded_height() as u32,
        dec.unpadded_pixels(),
    )
    .ok_or_else(|| anyhow!("reconstructed image has inconsistent dimensions"))?;
    out.save(out_path)
        .with_context(|| format!("write {}", out_path.display()))?;
    Ok(())
}
