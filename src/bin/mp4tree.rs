use anyhow::{Context, Result};
use clap::Parser;
use mp4tree::{locate_header, parse_header, BoxData, BoxId, BoxTree, FourCC, KnownBox, ParseLimits};
use std::fs;
use std::path::PathBuf;

/// Dump the box tree of an ISOBMFF/MP4 file.
#[derive(Parser)]
#[command(name = "mp4tree", version)]
struct Args {
    /// Input file
    path: PathBuf,

    /// Emit the full parse output as JSON
    #[arg(long)]
    json: bool,

    /// Limit the printed tree depth
    #[arg(long)]
    max_depth: Option<usize>,

    /// Print a per-type summary of the index
    #[arg(long)]
    index: bool,

    /// List every box of the given fourcc with its parse context
    #[arg(long, value_name = "FOURCC")]
    find: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let data =
        fs::read(&args.path).with_context(|| format!("reading {}", args.path.display()))?;

    let header = locate_header(&data, None)
        .with_context(|| format!("locating the movie header in {}", args.path.display()))?;
    let output = parse_header(&header, &ParseLimits::default()).context("decoding the box tree")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    for &root in &output.roots {
        print_node(&output.tree, root, 0, args.max_depth);
    }

    if args.index {
        println!();
        let mut types: Vec<_> = output.index.iter().collect();
        types.sort_by_key(|(typ, _)| typ.0);
        for (typ, entries) in types {
            println!("{typ}: {} box(es)", entries.len());
        }
    }

    if let Some(wanted) = &args.find {
        let typ = FourCC::from_str(wanted)
            .with_context(|| format!("'{wanted}' is not a four-character code"))?;
        println!();
        for entry in output.index.get(typ) {
            let node = output.tree.get(entry.id);
            println!(
                "{typ} ({}) at {:#x}, {} bytes, track {}, handler {:?}",
                KnownBox::from(typ).full_name(),
                node.header.offset,
                node.header.size,
                entry.ctx.track_id,
                entry.ctx.handler,
            );
        }
    }

    for d in &output.diagnostics {
        eprintln!("warning at {:#x}: {}", d.offset, d.message);
    }

    Ok(())
}

fn print_node(tree: &BoxTree, id: BoxId, depth: usize, max_depth: Option<usize>) {
    if max_depth.is_some_and(|m| depth > m) {
        return;
    }
    let node = tree.get(id);
    let note = match &node.data {
        BoxData::Ftyp(f) => format!(" major_brand={}", f.major_brand),
        BoxData::Hdlr(h) => format!(" handler={}", h.handler_type),
        BoxData::Tkhd(t) => format!(" track_id={}", t.track_id),
        BoxData::Table(t) => format!(" entries={}", t.entry_count),
        BoxData::Stsz(s) => format!(" samples={}", s.table.entry_count),
        _ => String::new(),
    };
    println!(
        "{:indent$}[{}] {}, {} bytes{}",
        "",
        node.header.typ,
        KnownBox::from(node.header.typ).full_name(),
        node.header.size,
        note,
        indent = depth * 2
    );
    for &child in &node.children {
        print_node(tree, child, depth + 1, max_depth);
    }
}
