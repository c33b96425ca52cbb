//! ds3port - command line front end.
//!
//! Parses run options, identifies the source game from the first binder,
//! and drives one conversion pipeline over the given files.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ds3port::codec::TomlCodec;
use ds3port::havok::ToolDowngrader;
use ds3port::pipeline::{Pipeline, Profile};
use ds3port::{AssetCodec, AssetKind, Game, Options};

#[derive(Parser)]
#[command(name = "ds3port")]
#[command(about = "Ports Bloodborne / Sekiro / Elden Ring assets to Dark Souls III formats")]
#[command(version)]
struct Cli {
    /// Source binder documents, in load order
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Four-digit id the ported asset is emitted under
    #[arg(short = 'c', long)]
    ported_id: String,

    /// Four-digit character id substituted into sound events; defaults to
    /// the ported id
    #[arg(short = 's', long)]
    sound_id: Option<String>,

    /// Leave source sound ids untouched
    #[arg(long, conflicts_with = "sound_id")]
    keep_sound_ids: bool,

    /// Convert only the animation event table
    #[arg(short = 't', long)]
    tae_only: bool,

    /// Convert only the meshes
    #[arg(short = 'f', long)]
    flver_only: bool,

    /// Animation layer offsets to drop wholesale, comma separated
    #[arg(short = 'o', long, value_delimiter = ',')]
    excluded_offsets: Vec<u32>,

    /// Directory holding rule tables and the material catalog
    #[arg(long, default_value = "res")]
    res_dir: PathBuf,

    /// Directory holding the Havok downgrade tool chain
    #[arg(long, default_value = "tools")]
    tools_dir: PathBuf,

    /// Directory converted files are written into
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if cli.tae_only && cli.flver_only {
        bail!("-t and -f are mutually exclusive");
    }

    let mut sources = Vec::with_capacity(cli.files.len());
    for path in &cli.files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        sources.push((name, bytes));
    }

    let codec = TomlCodec;
    let first = codec
        .read_container(&sources[0].1)
        .with_context(|| format!("reading {}", sources[0].0))?;
    let Some(game) = Game::detect(&first) else {
        bail!("could not identify the source game from {}", sources[0].0);
    };
    let source_id = source_id_of(&sources[0].0)
        .with_context(|| format!("no asset id in file name {}", sources[0].0))?;
    let asset_kind = if sources.iter().any(|(n, _)| {
        n.contains(".objbnd") || n.contains(".geombnd") || n.contains(".geomhkxbnd")
    }) {
        AssetKind::Object
    } else {
        AssetKind::Character
    };
    info!(?game, %source_id, ported = %cli.ported_id, ?asset_kind, "starting conversion");

    let options = Options {
        res_dir: cli.res_dir,
        tools_dir: cli.tools_dir.clone(),
        source_id,
        ported_id: cli.ported_id,
        sound_id: cli.sound_id,
        keep_sound_ids: cli.keep_sound_ids,
        asset_kind,
        tae_only: cli.tae_only,
        flver_only: cli.flver_only,
        excluded_offsets: cli.excluded_offsets,
        source_file_names: sources.iter().map(|(n, _)| n.clone()).collect(),
    };
    let downgrader = ToolDowngrader::new(cli.tools_dir);
    let profile = Profile::new(game, asset_kind);
    let mut pipeline = Pipeline::new(&codec, &downgrader, profile, options)?;

    for (name, bytes) in &sources {
        for emitted in pipeline.convert_source(name, bytes)? {
            let out = cli.out_dir.join(&emitted.file_name);
            fs::write(&out, &emitted.bytes)
                .with_context(|| format!("writing {}", out.display()))?;
            info!(file = %out.display(), "wrote");
        }
    }
    Ok(())
}

/// Leading digit run of the file name's stem: `c5020.anibnd.dcx` gives
/// `5020`, and fragment suffixes (`c2070_div00`) do not bleed in.
fn source_id_of(name: &str) -> Option<String> {
    let stem = name.split('.').next()?;
    let digits: String = stem
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect();
    (!digits.is_empty()).then_some(digits)
}
