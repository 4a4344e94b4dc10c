use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use field_codec_core::listing::{assemble, disassemble};
use field_codec_core::script::{decode_script, encode_script, insert_labels, resolve_labels};
use field_codec_core::section1::{decode_text, Section1};
use field_codec_core::{
    run_verify, BackgroundFile, EncounterFile, FieldFile, SectionKind, TableId, VerifySettings,
};

#[derive(Debug, Parser)]
#[command(name = "fieldcodec", version, about = "Final Fantasy VII field file inspector")]
struct Args {
    /// Field files given to the subcommands are raw, not LZS-compressed.
    #[arg(long, global = true, default_value_t = false)]
    uncompressed: bool,

    /// Print JSON instead of text.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the scripts of a field, one opcode per line.
    Dump {
        field: PathBuf,
        /// Only this entity.
        #[arg(long)]
        entity: Option<usize>,
        /// Keep byte-offset jumps instead of labels.
        #[arg(long, default_value_t = false)]
        raw_jumps: bool,
        /// Also print the dialog texts.
        #[arg(long, default_value_t = false)]
        texts: bool,
    },
    /// Show the encounter tables of a field.
    Encounter { field: PathBuf },
    /// Show the palettes, layers and tiles of a field background.
    Background { field: PathBuf },
    /// Assemble a listing into bytecode.
    Asm {
        listing: PathBuf,
        #[arg(long)]
        output: PathBuf,
        /// Jumps hold byte offsets, as printed by `dump --raw-jumps`.
        #[arg(long, default_value_t = false)]
        raw_jumps: bool,
    },
    /// Round-trip every field in a directory or an LGP archive.
    Verify {
        #[arg(required_unless_present = "config")]
        input: Option<PathBuf>,
        /// JSON settings file; command line flags override it.
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        filter: Option<String>,
        #[arg(long, default_value_t = false)]
        skip_backgrounds: bool,
    },
}

fn load_field(path: &Path, uncompressed: bool) -> Result<FieldFile> {
    let data = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let field = if uncompressed {
        FieldFile::parse(&data)
    } else {
        FieldFile::from_compressed(&data)
    };
    field.with_context(|| format!("parsing {}", path.display()))
}

fn dump(args: &Args, path: &Path, only: Option<usize>, raw_jumps: bool, texts: bool) -> Result<()> {
    let field = load_field(path, args.uncompressed)?;
    let section = Section1::parse(field.section(SectionKind::Scripts))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&section.header)?);
    } else {
        println!(
            "# {} by {}, {} entities",
            section.header.name, section.header.creator, section.header.entity_count
        );
    }

    for (entity, index, bytes) in section.scripts() {
        if only.is_some_and(|e| e != entity) {
            continue;
        }
        let name = &section.entities[entity].name;
        let mut opcodes = decode_script(bytes?)
            .with_context(|| format!("decoding script {name}/{index}"))?;
        if !raw_jumps {
            opcodes = insert_labels(&opcodes)
                .with_context(|| format!("labelling script {name}/{index}"))?;
        }
        if args.json {
            println!("{}", serde_json::to_string(&opcodes)?);
        } else {
            println!("\n# {name} script {index}");
            print!("{}", disassemble(&opcodes));
        }
    }

    if texts {
        println!();
        for i in 0..section.text_count()? {
            println!("# text {i}: {}", decode_text(section.text(i)?));
        }
    }
    Ok(())
}

fn encounter(args: &Args, path: &Path) -> Result<()> {
    let field = load_field(path, args.uncompressed)?;
    let encounters = EncounterFile::open(field.section(SectionKind::Encounter))?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&encounters)?);
        return Ok(());
    }
    for id in [TableId::Normal, TableId::Special] {
        let table = encounters.table(id);
        println!(
            "{id:?}: enabled {}, rate {}",
            table.is_enabled(),
            table.rate
        );
        for (i, e) in table.standard.iter().chain(&table.special).enumerate() {
            println!("  {i:2}: battle {:4} chance {:2}", e.battle_id(), e.probability());
        }
    }
    Ok(())
}

fn background(args: &Args, path: &Path) -> Result<()> {
    let field = load_field(path, args.uncompressed)?;
    let mut file = BackgroundFile::new(field.section(SectionKind::Background).to_vec());
    let bg = file.open(field.section(SectionKind::Palette))?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&bg.tiles)?);
        return Ok(());
    }
    println!("palettes: {}", bg.palettes.len());
    for layer in &bg.layers {
        println!(
            "layer {}: {}x{}, {} tiles",
            layer.layer_id, layer.width, layer.height, layer.tile_count
        );
    }
    let pages = bg.textures.pages.iter().filter(|p| p.is_some()).count();
    println!("texture pages: {pages}");
    if let Some(offset) = file.texture_offset() {
        println!("textures at {offset:#x}");
    }
    Ok(())
}

fn assemble_listing(src: &str, raw_jumps: bool) -> Result<Vec<u8>> {
    let mut opcodes = assemble(src)?;
    if raw_jumps {
        for (i, op) in opcodes.iter().enumerate() {
            if let Some(field) = op.jump_field_index() {
                op.fields()[field]
                    .check_range()
                    .with_context(|| format!("jump at opcode {i}"))?;
            }
        }
    } else {
        opcodes = resolve_labels(&opcodes)?;
    }
    let bytes = encode_script(&opcodes)?;
    log::info!("{} opcodes, {} bytes", opcodes.len(), bytes.len());
    Ok(bytes)
}

fn asm(listing: &Path, output: &Path, raw_jumps: bool) -> Result<()> {
    let src = fs::read_to_string(listing).with_context(|| format!("reading {}", listing.display()))?;
    let bytes = assemble_listing(&src, raw_jumps)
        .with_context(|| format!("assembling {}", listing.display()))?;
    fs::write(output, &bytes).with_context(|| format!("writing {}", output.display()))?;
    Ok(())
}

fn verify(
    args: &Args,
    input: Option<&PathBuf>,
    config: Option<&PathBuf>,
    filter: Option<&String>,
    skip_backgrounds: bool,
) -> Result<()> {
    let mut settings = match config {
        Some(path) => VerifySettings::from_json_file(path)?,
        None => VerifySettings::default(),
    };
    if let Some(input) = input {
        settings.input_path = input.clone();
    }
    if filter.is_some() {
        settings.filter = filter.cloned();
    }
    if args.uncompressed {
        settings.compressed = false;
    }
    if skip_backgrounds {
        settings.check_backgrounds = false;
    }

    let report = run_verify(&settings)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for field in report.fields.iter().filter(|f| !f.is_ok()) {
            for err in &field.errors {
                println!("{}: {err}", field.name);
            }
        }
        println!("{}", report.summary());
    }
    if report.failed() > 0 {
        bail!("{} field(s) failed", report.failed());
    }
    Ok(())
}

fn run(args: &Args) -> Result<()> {
    match &args.command {
        Command::Dump {
            field,
            entity,
            raw_jumps,
            texts,
        } => dump(args, field, *entity, *raw_jumps, *texts),
        Command::Encounter { field } => encounter(args, field),
        Command::Background { field } => background(args, field),
        Command::Asm {
            listing,
            output,
            raw_jumps,
        } => asm(listing, output, *raw_jumps),
        Command::Verify {
            input,
            config,
            filter,
            skip_backgrounds,
        } => verify(args, input.as_ref(), config.as_ref(), filter.as_ref(), *skip_backgrounds),
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    if let Err(err) = run(&args) {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
