//! MOD3 CLI - Tool for inspecting, checking and re-encoding MOD3 files.

use mod3::export::{encode, write_file, ExportOptions};
use mod3::format::HeaderValue;
use mod3::import::{decode_file, ImportOptions};
use mod3::model::{Model, Skeleton};
use mod3::validate::ValidationReport;
use std::collections::BTreeMap;
use std::env;
use std::path::Path;

use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Verbosity requested on the command line
#[derive(Clone, Copy, PartialEq, Eq)]
enum Verbosity {
    Quiet,
    Info,
    Debug,
    Trace,
}

impl Verbosity {
    fn directive(self) -> &'static str {
        match self {
            Verbosity::Quiet => "off",
            Verbosity::Info => "info",
            Verbosity::Debug => "debug",
            Verbosity::Trace => "trace",
        }
    }
}

/// `RUST_LOG` wins over the flags when set.
fn init_logging(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let args: Vec<String> = env::args().collect();

    // Parse global flags
    let mut verbosity = Verbosity::Info;
    let mut filtered_args: Vec<&str> = Vec::new();
    for arg in &args[1..] {
        match arg.as_str() {
            "-v" | "--verbose" => verbosity = Verbosity::Debug,
            "-vv" | "--trace" => verbosity = Verbosity::Trace,
            "-q" | "--quiet" => verbosity = Verbosity::Quiet,
            _ => filtered_args.push(arg),
        }
    }

    if filtered_args.is_empty() {
        print_help();
        return;
    }

    let json_mode = filtered_args.iter().any(|&s| s == "--json" || s == "-j");
    init_logging(if json_mode { Verbosity::Quiet } else { verbosity });

    match filtered_args[0] {
        "info" | "i" => {
            let file = require(&filtered_args, 1, "mod3-cli info <file.mod3>");
            cmd_info(file);
        }

        "tree" | "t" => {
            let file = require(&filtered_args, 1, "mod3-cli tree <file.mod3>");
            cmd_tree(file);
        }

        "dump" | "d" => {
            let file = require(&filtered_args, 1, "mod3-cli dump <file.mod3> [--json]");
            cmd_dump(file, json_mode);
        }

        // Decode and re-encode
        "copy" | "c" => {
            let input = require(&filtered_args, 1, "mod3-cli copy <in.mod3> <out.mod3> [--options f.json]");
            let output = require(&filtered_args, 2, "mod3-cli copy <in.mod3> <out.mod3> [--options f.json]");
            let options = export_options(&filtered_args);
            cmd_copy(input, output, &options);
        }

        // Run export validation without writing
        "check" | "k" => {
            let file = require(&filtered_args, 1, "mod3-cli check <file.mod3> [--options f.json]");
            let options = export_options(&filtered_args);
            cmd_check(file, &options);
        }

        "version" | "-V" | "--version" => print_version(),

        "help" | "h" | "-h" | "--help" => print_help(),

        // Default: if file exists, show info; otherwise error
        _ => {
            if Path::new(filtered_args[0]).exists() {
                cmd_info(filtered_args[0]);
            } else {
                eprintln!("Unknown command: {}", filtered_args[0]);
                eprintln!();
                print_help();
                std::process::exit(1);
            }
        }
    }
}

/// Positional argument or usage error.
fn require<'a>(args: &[&'a str], index: usize, usage: &str) -> &'a str {
    let mut positional = Vec::new();
    let mut skip = false;
    for &arg in args {
        if skip {
            skip = false;
        } else if arg == "--options" {
            skip = true;
        } else if !arg.starts_with('-') {
            positional.push(arg);
        }
    }
    match positional.get(index) {
        Some(&arg) => arg,
        None => {
            eprintln!("Error: missing argument");
            eprintln!("Usage: {}", usage);
            std::process::exit(1);
        }
    }
}

fn export_options(args: &[&str]) -> ExportOptions {
    let Some(path) = args
        .windows(2)
        .find(|w| w[0] == "--options")
        .map(|w| w[1])
    else {
        return ExportOptions::preserving();
    };
    let json = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to read options {}: {}", path, e);
            std::process::exit(1);
        }
    };
    match ExportOptions::from_json(&json) {
        Ok(o) => {
            debug!("export options from {}", path);
            o
        }
        Err(e) => {
            eprintln!("Invalid options {}: {}", path, e);
            std::process::exit(1);
        }
    }
}

fn open(path: &str) -> Model {
    info!("Opening model: {}", path);
    match decode_file(path, &ImportOptions::everything()) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Failed to open {}: {}", path, e);
            std::process::exit(1);
        }
    }
}

fn print_help() {
    println!("mod3-cli - MOD3 model toolkit");
    println!();
    println!("USAGE:");
    println!("    mod3-cli [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    i, info   <file>              Show header summary and counts");
    println!("    t, tree   <file>              Show skeleton hierarchy");
    println!("    d, dump   <file> [--json]     Dump header fields and mesh parts");
    println!("    c, copy   <in> <out>          Decode and re-encode (--options f.json)");
    println!("    k, check  <file>              Run export validation only (--options f.json)");
    println!("    version                       Show build information");
    println!("    h, help                       Show this help");
    println!();
    println!("OPTIONS:");
    println!("    -v, --verbose    Show debug output");
    println!("    -vv, --trace     Show trace output (very verbose)");
    println!("    -q, --quiet      Suppress all output");
    println!();
    println!("EXAMPLES:");
    println!("    mod3-cli info pl000.mod3                       # Quick overview");
    println!("    mod3-cli tree pl000.mod3                       # Bone hierarchy");
    println!("    mod3-cli dump pl000.mod3 --json                # Machine-readable dump");
    println!("    mod3-cli copy in.mod3 out.mod3                 # Round-trip test");
    println!("    mod3-cli check in.mod3 --options strict.json   # Validate with custom levels");
    println!();
    println!("NOTES:");
    println!("    - Passing a .mod3 file directly is equivalent to 'info'");
    println!("    - Without --options, copy and check keep LODs, normals and boxes as stored");
    println!("    - RUST_LOG overrides -v/-vv/-q");
}

fn print_version() {
    println!("mod3-cli {}", env!("CARGO_PKG_VERSION"));
    println!("Built {} {}", env!("MOD3_BUILD_DATE"), env!("MOD3_BUILD_TIME"));
}

fn cmd_info(path: &str) {
    let model = open(path);
    debug!("Model decoded successfully");

    println!("Model: {}", path);
    if let Some(version) = model.header_value("version").and_then(HeaderValue::as_i64) {
        println!("Version: {}", version);
    }
    println!();

    let vertices: usize = model.mesh_parts.iter().map(|p| p.num_vertices()).sum();
    let triangles: usize = model.mesh_parts.iter().map(|p| p.num_triangles()).sum();
    println!("Contents:");
    println!("  Bones:      {}", model.num_bones());
    println!("  Materials:  {}", model.materials.len());
    println!("  Mesh parts: {} ({} vertices, {} triangles)", model.mesh_parts.len(), vertices, triangles);
    println!("  Boxes:      {}", model.bounding_boxes.len());
    println!("  Groups:     {}", model.group_functions.len());
    if !model.trailing.is_empty() {
        println!("  Trailing:   {} bytes", model.trailing.len());
    }
    println!();

    let mut lods: BTreeMap<u32, usize> = BTreeMap::new();
    for part in &model.mesh_parts {
        *lods.entry(part.lod).or_default() += 1;
    }
    println!("LODs:");
    for (lod, count) in &lods {
        println!("  [{}] {} parts", lod, count);
    }

    let b = model.bounds();
    if !b.is_empty() {
        println!();
        println!("Bounds: [{:.3}, {:.3}, {:.3}] - [{:.3}, {:.3}, {:.3}]",
            b.min.x, b.min.y, b.min.z, b.max.x, b.max.y, b.max.z);
    }
}

fn cmd_tree(path: &str) {
    let model = open(path);

    println!("Model: {}", path);
    println!();

    match &model.skeleton {
        Some(skeleton) if !skeleton.is_empty() => {
            for index in skeleton.depth_first() {
                print_bone(skeleton, index);
            }
        }
        _ => println!("(no skeleton)"),
    }
}

fn print_bone(skeleton: &Skeleton, index: usize) {
    let Some(bone) = skeleton.get(index) else {
        return;
    };
    let t = bone.local.translation;
    let pair = bone.pair.map(|p| format!(" <-> {}", p)).unwrap_or_default();
    // Function ids are looked up first-match, so later duplicates are unreachable
    let shadowed = match skeleton.bone_by_function(bone.function) {
        Some(first) if first != index => format!(" (shadowed by {})", first),
        _ => String::new(),
    };
    println!(
        "{}[{}] function {}{}{} @ ({:.3}, {:.3}, {:.3})",
        "  ".repeat(skeleton.depth(index)),
        index,
        bone.function,
        shadowed,
        pair,
        t.x,
        t.y,
        t.z
    );
}

fn cmd_dump(path: &str, json_mode: bool) {
    let model = open(path);

    if json_mode {
        let parts: Vec<serde_json::Value> = model
            .mesh_parts
            .iter()
            .enumerate()
            .map(|(i, p)| {
                serde_json::json!({
                    "index": i,
                    "lod": p.lod,
                    "group": p.group_id,
                    "material": p.material,
                    "blocktype": p.blocktype.map(|b| format!("{:08X}", b.bits())),
                    "vertices": p.num_vertices(),
                    "triangles": p.num_triangles(),
                    "weight_slots": p.max_weight_slots(),
                    "boxes": p.bounding_boxes,
                })
            })
            .collect();
        let materials: Vec<&str> = model.materials.iter().map(|m| m.name.as_str()).collect();
        let out = serde_json::json!({
            "file": path,
            "header": model.header,
            "materials": materials,
            "parts": parts,
        });
        match serde_json::to_string_pretty(&out) {
            Ok(s) => println!("{}", s),
            Err(e) => {
                eprintln!("Failed to serialize: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    println!("Model: {}", path);
    println!();
    println!("Header:");
    for p in model.header.iter().flatten() {
        println!("  {:<18} {:?}", p.key, p.value);
    }
    println!();
    println!("Materials:");
    for (i, m) in model.materials.iter().enumerate() {
        println!("  [{}] {}", i, m.name);
    }
    println!();
    println!("Mesh parts:");
    for (i, p) in model.mesh_parts.iter().enumerate() {
        let bt = p
            .blocktype
            .map(|b| format!("{:08X}", b.bits()))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  [{}] lod {} group {} material {} blocktype {} - {} vertices, {} triangles, {} weights/vertex, {} boxes",
            i,
            p.lod,
            p.group_id,
            p.material,
            bt,
            p.num_vertices(),
            p.num_triangles(),
            p.max_weight_slots(),
            p.bounding_boxes.len()
        );
    }
}

fn cmd_copy(input: &str, output: &str, options: &ExportOptions) {
    let model = open(input);
    let start = std::time::Instant::now();

    let encoded = match encode(&model, options) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Failed to encode {}: {}", input, e);
            if let Some(report) = e.report() {
                print_report(report);
            }
            std::process::exit(1);
        }
    };
    print_report(&encoded.report);

    if let Err(e) = write_file(output, &encoded.bytes) {
        eprintln!("Failed to write {}: {}", output, e);
        std::process::exit(1);
    }
    info!("Encoded in {:.2?}", start.elapsed());
    println!("Wrote {} ({} bytes)", output, encoded.bytes.len());
}

fn cmd_check(path: &str, options: &ExportOptions) {
    let model = open(path);

    for r in &model.unresolved {
        println!("unresolved: {}", r);
    }
    match encode(&model, options) {
        Ok(encoded) => {
            print_report(&encoded.report);
            println!("OK: {} warnings", encoded.report.warnings().count());
        }
        Err(e) => {
            if let Some(report) = e.report() {
                print_report(report);
            }
            eprintln!("FAILED: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_report(report: &ValidationReport) {
    for v in report.errors() {
        println!("error:   {}", v);
    }
    for v in report.warnings() {
        println!("warning: {}", v);
    }
    for v in report.ignored() {
        debug!("ignored: {}", v);
    }
}
