//! Command-line interface for rgql.
//!
//! # Usage
//!
//! ```bash
//! # Print the REST routes generated for a schema
//! rgql routes schema.json --options rgql.json
//!
//! # Write an OpenAPI document
//! rgql openapi schema.json --output openapi.json --title "Users API"
//!
//! # List the types recognised as resources
//! rgql models schema.json
//! ```
//!
//! Schemas are read from the JSON form of [`rgql_schema::Schema`].

use clap::{Parser, Subcommand};
use colored::Colorize;
use rgql_openapi::{Info, OpenApi};
use rgql_runtime::error::{ErrorCode, ResultExt, RgqlResult};
use rgql_runtime::routes::RouteCompiler;
use rgql_runtime::{extract_models, Route, RouteTable, RouterOptions, SelectionCompiler};
use rgql_schema::Schema;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "rgql")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the route table generated for a schema
    Routes {
        /// Schema file (JSON)
        schema: PathBuf,

        /// Router options file (JSON)
        #[arg(short, long)]
        options: Option<PathBuf>,

        /// Base path, overrides the options file
        #[arg(long)]
        base_path: Option<String>,
    },

    /// Generate an OpenAPI document
    Openapi {
        /// Schema file (JSON)
        schema: PathBuf,

        /// Router options file (JSON)
        #[arg(short, long)]
        options: Option<PathBuf>,

        /// Base path, overrides the options file
        #[arg(long)]
        base_path: Option<String>,

        /// Output file (.json, .yaml or .yml), prints JSON to stdout when omitted
        #[arg(short = 'O', long)]
        output: Option<PathBuf>,

        /// API title
        #[arg(long, default_value = "rgql")]
        title: String,

        /// API version
        #[arg(long, default_value = "1.0.0")]
        api_version: String,

        /// Server URLs
        #[arg(long)]
        server: Vec<String>,
    },

    /// List the types recognised as REST resources
    Models {
        /// Schema file (JSON)
        schema: PathBuf,
    },

    /// Print version information
    Version,
}

pub fn run(cli: Cli) -> Result<i32, Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Routes {
            schema,
            options,
            base_path,
        } => {
            let schema = load_schema(&schema)?;
            let options = load_options(options.as_deref(), base_path)?;
            let table = RouteReport::compile(&schema, &options)?;

            if !cli.quiet {
                print!("{}", table.render(base_path_of(&options)));
            }
            if cli.verbose {
                for route in table.routes.iter() {
                    if let Some(info) = route.info() {
                        println!();
                        println!("{} {}", "#".dimmed(), info.document.name.bold());
                        println!("{}", info.document.source);
                    }
                }
            }
            Ok(0)
        }
        Commands::Openapi {
            schema,
            options,
            base_path,
            output,
            title,
            api_version,
            server,
        } => {
            let schema = load_schema(&schema)?;
            let options = load_options(options.as_deref(), base_path)?;
            let table = RouteReport::compile(&schema, &options)?;

            let mut openapi = OpenApi::new(schema, Info::new(title, api_version));
            for url in server {
                openapi = openapi.with_server(url);
            }
            for info in table.routes.iter().filter_map(Route::info) {
                openapi.add_route(&info, base_path_of(&options));
            }

            match output {
                Some(path) => {
                    openapi.save(&path)?;
                    if !cli.quiet {
                        println!("{} {}", "Wrote".green(), path.display());
                    }
                }
                None => println!("{}", openapi.to_json()?),
            }
            Ok(0)
        }
        Commands::Models { schema } => {
            let schema = load_schema(&schema)?;
            for model in extract_models(&schema) {
                println!("{model}");
            }
            Ok(0)
        }
        Commands::Version => {
            println!("rgql {}", env!("CARGO_PKG_VERSION"));
            Ok(0)
        }
    }
}

/// Reads a schema from its JSON form.
pub fn load_schema(path: &Path) -> RgqlResult<Schema> {
    let json = std::fs::read_to_string(path).map_rgql_err_with(
        ErrorCode::IoError,
        format!("Cannot read schema {}", path.display()),
    )?;
    parse_schema(&json)
}

pub fn parse_schema(json: &str) -> RgqlResult<Schema> {
    let schema: Schema = serde_json::from_str(json).map_rgql_err(ErrorCode::SchemaError)?;
    Ok(schema.with_builtin_scalars())
}

fn load_options(path: Option<&Path>, base_path: Option<String>) -> RgqlResult<RouterOptions> {
    let mut options = match path {
        Some(path) => RouterOptions::from_file(path)?,
        None => RouterOptions::default(),
    };
    if base_path.is_some() {
        options.base_path = base_path;
    }
    debug!("Router options: {:?}", options);
    Ok(options)
}

fn base_path_of(options: &RouterOptions) -> &str {
    options.base_path.as_deref().unwrap_or("")
}

/// Routes and models compiled without a running router.
pub struct RouteReport {
    pub models: Vec<String>,
    pub routes: RouteTable,
    pub subscriptions: bool,
}

impl RouteReport {
    pub fn compile(schema: &Schema, options: &RouterOptions) -> RgqlResult<Self> {
        let models = extract_models(schema);
        let compiled = RouteCompiler {
            schema,
            models: &models,
            ignore: &options.ignore,
            depth_limit: options.depth_limit,
            method_map: &options.method,
            compiler: &SelectionCompiler,
        }
        .compile()?;

        let mut routes = RouteTable::new();
        for route in compiled {
            routes.insert(route);
        }

        Ok(Self {
            models,
            routes,
            subscriptions: schema.subscription_root().is_some(),
        })
    }

    /// Renders one aligned line per route.
    pub fn render(&self, base_path: &str) -> String {
        let mut rows: Vec<(String, String, String)> = self
            .routes
            .iter()
            .map(|route| {
                (
                    route.method.to_string(),
                    format!("{base_path}{}", route.path),
                    route
                        .info()
                        .map(|info| info.document.name.clone())
                        .unwrap_or_default(),
                )
            })
            .collect();

        if self.subscriptions {
            for (method, path, action) in [
                ("POST", "/webhook", "start subscription"),
                ("POST", "/webhook/:id", "update subscription"),
                ("DELETE", "/webhook/:id", "stop subscription"),
            ] {
                rows.push((method.into(), format!("{base_path}{path}"), action.into()));
            }
        }

        let method_width = rows.iter().map(|r| r.0.len()).max().unwrap_or(0);
        let path_width = rows.iter().map(|r| r.1.len()).max().unwrap_or(0);

        let mut out = String::new();
        for (method, path, target) in rows {
            let _ = writeln!(out, "{method:<method_width$}  {path:<path_width$}  {target}");
        }
        out
    }
}

/// Log filter used when `RUST_LOG` is not set.
///
/// `RGQL_DEBUG` switches to `debug` and takes precedence over the level
/// selected by `RGQL_LOG`.
pub fn default_log_filter(level: Option<&str>, debug: bool) -> String {
    if debug {
        return "rgql=debug".to_string();
    }
    match level.map(str::to_ascii_lowercase).as_deref() {
        Some(level @ ("error" | "warn" | "info" | "debug" | "trace")) => format!("rgql={level}"),
        _ => "rgql=info".to_string(),
    }
}
