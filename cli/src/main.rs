use clap::{Parser, Subcommand};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use pe2pkcs7::{
    builtin_schema, compile_modules, dump, export, logging::init_tracing, schema_from_json,
    schema_to_json, DumpConfig, ExportFormat, Pe2Pkcs7Error, Schema, AUTO_ROOT, DEFAULT_ROOT,
};

#[derive(Parser)]
#[command(name = "pe2pkcs7")]
#[command(about = "Dump the PKCS#7 signature block of a signed executable as an annotated ASN.1 tree", long_about = None)]
struct Cli {
    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a BER/DER blob and print it as a tree
    Dump {
        /// Input file holding the encoded signature
        #[arg(short, long)]
        input: PathBuf,

        /// ASN.1 module(s) describing the input (defaults to the bundled Authenticode module)
        #[arg(short, long = "schema", conflicts_with_all = ["schema_json", "no_schema"])]
        schemas: Vec<PathBuf>,

        /// Schema symbol table previously written by the `schema` command
        #[arg(long, conflicts_with = "no_schema")]
        schema_json: Option<PathBuf>,

        /// Render without any schema
        #[arg(long)]
        no_schema: bool,

        /// Definition to apply to the top-level value, or `auto`
        #[arg(short, long)]
        root: Option<String>,

        /// Output format: text, json or der
        #[arg(short, long)]
        format: Option<ExportFormat>,

        /// Output file (if omitted, prints to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Byte offset of the top-level value in the input
        #[arg(long)]
        offset: Option<usize>,

        /// Deepest nesting accepted while decoding
        #[arg(long)]
        max_depth: Option<usize>,

        /// Show `@offset+length` on every line
        #[arg(long)]
        show_offsets: bool,

        /// Truncate content summaries to this many characters
        #[arg(long)]
        max_summary: Option<usize>,

        /// JSON file with dump settings; flags override it
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Compile ASN.1 modules and print the schema symbol table as JSON
    Schema {
        /// Input ASN.1 module(s) (defaults to the bundled Authenticode module)
        #[arg(short, long)]
        input: Vec<PathBuf>,

        /// Output `.json` file (if omitted, prints to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Compiles the given modules, or the bundled module when there are none.
fn load_modules(paths: &[PathBuf]) -> Result<Schema, Pe2Pkcs7Error> {
    if paths.is_empty() {
        return builtin_schema();
    }
    let texts = paths
        .iter()
        .map(fs::read_to_string)
        .collect::<Result<Vec<_>, _>>()?;
    let texts: Vec<&str> = texts.iter().map(String::as_str).collect();
    compile_modules(&texts)
}

fn write_output(output: Option<&Path>, bytes: &[u8]) -> Result<(), Pe2Pkcs7Error> {
    match output {
        Some(path) => {
            fs::write(path, bytes)?;
            info!(path = %path.display(), bytes = bytes.len(), "output written");
        }
        None => std::io::stdout().write_all(bytes)?,
    }
    Ok(())
}

fn main() -> Result<(), Pe2Pkcs7Error> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Dump {
            input,
            schemas,
            schema_json,
            no_schema,
            root,
            format,
            output,
            offset,
            max_depth,
            show_offsets,
            max_summary,
            config,
        } => {
            let mut config = match config {
                Some(path) => DumpConfig::from_json_file(path)?,
                None => DumpConfig::default(),
            };

            let (schema, default_root) = if no_schema {
                (Schema::default(), None)
            } else if let Some(path) = schema_json {
                (schema_from_json(&fs::read_to_string(path)?)?, Some(AUTO_ROOT))
            } else if !schemas.is_empty() {
                (load_modules(&schemas)?, Some(AUTO_ROOT))
            } else {
                (builtin_schema()?, Some(DEFAULT_ROOT))
            };
            info!(definitions = schema.len(), "schema loaded");

            if let Some(root) = root {
                config.root_type = Some(root);
            } else if config.root_type.is_none() {
                config.root_type = default_root.map(str::to_owned);
            }
            if let Some(format) = format {
                config.format = format;
            }
            if let Some(offset) = offset {
                config.offset = offset;
            }
            if let Some(max_depth) = max_depth {
                config.decode.max_depth = max_depth;
            }
            if show_offsets {
                config.render.show_offsets = true;
            }
            if max_summary.is_some() {
                config.render.max_summary_chars = max_summary;
            }

            let data = fs::read(&input)?;
            info!(path = %input.display(), bytes = data.len(), "input read");

            let result = dump(&data, &schema, &config)?;
            info!(
                lines = result.lines.len(),
                root = result.root_type.as_deref().unwrap_or("-"),
                "rendered"
            );

            let bytes = export(&result, config.format, &config.render)?;
            write_output(output.as_deref(), &bytes)
        }

        Commands::Schema { input, output } => {
            let schema = load_modules(&input)?;
            let mut json = schema_to_json(&schema)?;
            json.push('\n');
            write_output(output.as_deref(), json.as_bytes())
        }
    }
}
