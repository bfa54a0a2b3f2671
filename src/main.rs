use anyhow::{anyhow, Result};
use cluster_console::api_client::ApiClient;
use cluster_console::config::config::Config;
use cluster_console::system::catalog::{FunctionDraft, FunctionKey};
use cluster_console::system::catalog_store::ConsoleCatalogStore;
use cluster_console::system::navigation::NavigationFrame;
use cluster_console::system::schema::{can_drill_down, infer_schema};
use cluster_console::table_display::{display_catalog, display_level, export_to_csv};
use cluster_console::utils::app_paths::AppPaths;
use crossterm::style::Stylize;
use std::path::PathBuf;

fn print_help() {
    println!("{}", "Cluster Console - browse cluster introspection data".blue().bold());
    println!();
    println!("{}", "Usage:".yellow());
    println!("  cluster-console [OPTIONS] [COMMAND]");
    println!();
    println!("{}", "Options:".yellow());
    println!(
        "  {}  - Initialize configuration with wizard",
        "--init-config".green()
    );
    println!(
        "  {} - Generate config file with defaults",
        "--generate-config".green()
    );
    println!("  {}           - Show this help", "--help".green());
    println!();
    println!("{}", "Commands:".yellow());
    println!("  {}                       - Interactive browser (default)", "(none)".green());
    println!("  {}             - Print the function catalog", "functions [--all]".green());
    println!(
        "  {} - Print one level, optionally as CSV",
        "show <function> [path] [--export FILE.csv]".green()
    );
    println!(
        "  {} - Add a custom function",
        "new <category> <name> <description> <sql>".green()
    );
    println!(
        "  {} - Change a custom function",
        "edit <name> [--category C] [--description D] [--sql SQL] [--rename NAME]".green()
    );
    println!();
    println!("{}", "Examples:".yellow());
    println!("  cluster-console show transactions");
    println!("  cluster-console show transactions 5001/running --export txn.csv");
    println!("  cluster-console new Diagnostics slow_queries \"Queries over 10s\" \"SELECT ...\"");
    println!();
}

/// Value following `flag`, removing both from `args`.
fn take_flag_value(args: &mut Vec<String>, flag: &str) -> Option<String> {
    let pos = args.iter().position(|a| a == flag)?;
    args.remove(pos);
    (pos < args.len()).then(|| args.remove(pos))
}

fn catalog_store(config: &Config) -> Result<ConsoleCatalogStore> {
    let api = ApiClient::new(&config.server)?;
    ConsoleCatalogStore::new(api, AppPaths::catalog_prefs_file()?)
}

fn list_functions(config: &Config, show_all: bool) -> Result<()> {
    let store = catalog_store(config)?;
    let (catalog, error) = store.load_catalog(config.browser.compact_category_limit);
    if let Some(e) = error {
        eprintln!("{}", format!("Showing built-in functions only: {}", e).yellow());
    }

    let groups = if show_all {
        catalog.groups()
    } else {
        catalog.compact_groups()
    };
    display_catalog(&groups, &config.display);
    Ok(())
}

fn show_level(
    config: &Config,
    function_name: &str,
    nested_path: Option<&str>,
    export: Option<PathBuf>,
) -> Result<()> {
    let store = catalog_store(config)?;
    let (catalog, _) = store.load_catalog(config.browser.compact_category_limit);

    let stored_user_function = catalog
        .find_by_name(function_name)
        .filter(|f| f.is_user_defined())
        .and_then(|f| match f.key {
            FunctionKey::Stored(id) => Some(id),
            FunctionKey::Builtin(_) => None,
        });

    let (frame, rows, schema) = match stored_user_function {
        Some(id) => {
            if nested_path.is_some() {
                return Err(anyhow!("{} is a stored query and has no levels", function_name));
            }
            let rows = store.api().execute_function(id)?;
            let schema = infer_schema(&rows, false, false);
            (NavigationFrame::root(function_name), rows, schema)
        }
        None => {
            let mut frame = NavigationFrame::root(function_name);
            for segment in nested_path.into_iter().flat_map(|p| p.split('/')) {
                if !segment.is_empty() {
                    frame = frame.child(segment);
                }
            }

            println!("{}", format!("Fetching {}", frame.full_path()).cyan());
            let level = store
                .api()
                .fetch_level(&frame.function_name, frame.nested_path.as_deref())?;

            let max_depth = config.browser.max_depth;
            let depth_allows = max_depth == 0 || frame.depth() < max_depth;
            let schema = infer_schema(&level.data, can_drill_down(function_name), depth_allows);
            (frame, level.data, schema)
        }
    };

    display_level(&frame, &rows, &schema, &config.display);

    if let Some(path) = export {
        export_to_csv(&rows, &schema.columns, &path)?;
        println!("{}", format!("Results exported to {}", path.display()).green());
    }
    Ok(())
}

fn create_function(config: &Config, draft: FunctionDraft) -> Result<()> {
    let mut store = catalog_store(config)?;
    let (mut catalog, error) = store.load_catalog(config.browser.compact_category_limit);
    if let Some(e) = error {
        return Err(anyhow!("Cannot reach the backend: {}", e));
    }

    let created = catalog.create(draft, &mut store)?;
    println!(
        "{}",
        format!("Created {} in {}", created.name, created.category).green()
    );
    Ok(())
}

fn edit_function(
    config: &Config,
    function_name: &str,
    category: Option<String>,
    description: Option<String>,
    sql_query: Option<String>,
    rename: Option<String>,
) -> Result<()> {
    let mut store = catalog_store(config)?;
    let (mut catalog, error) = store.load_catalog(config.browser.compact_category_limit);
    if let Some(e) = error {
        return Err(anyhow!("Cannot reach the backend: {}", e));
    }

    let existing = catalog
        .find_by_name(function_name)
        .ok_or_else(|| anyhow!("No function named {}", function_name))?;
    let key = existing.key.clone();
    let mut draft = FunctionDraft::from_descriptor(existing);
    if let Some(category) = category {
        draft.category = category;
    }
    if let Some(description) = description {
        draft.description = description;
    }
    if let Some(sql_query) = sql_query {
        draft.sql_query = sql_query;
    }
    if let Some(name) = rename {
        draft.name = name;
    }

    let updated = catalog.edit(&key, draft, &mut store)?;
    println!(
        "{}",
        format!("Updated {} in {}", updated.name, updated.category).green()
    );
    Ok(())
}

fn main() -> Result<()> {
    let log_buffer = cluster_console::utils::logging::init_tracing_with_dual_logging();

    let mut args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    if args.contains(&"--init-config".to_string()) {
        match Config::init_wizard() {
            Ok(config) => {
                println!("\nConfiguration initialized successfully!");
                if !config.display.use_glyphs {
                    println!("Note: Simple mode enabled (ASCII markers)");
                }
                return Ok(());
            }
            Err(e) => {
                eprintln!("Error initializing config: {}", e);
                std::process::exit(1);
            }
        }
    }

    if args.contains(&"--generate-config".to_string()) {
        let path = Config::get_config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, Config::create_default_with_comments())?;
        println!("Configuration file created at: {:?}", path);
        println!("Edit this file to point the console at your backend.");
        return Ok(());
    }

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", format!("Could not load config, using defaults: {}", e).yellow());
            let mut config = Config::default();
            config.apply_env_overrides(|key| std::env::var(key).ok());
            config
        }
    };

    let export = take_flag_value(&mut args, "--export").map(PathBuf::from);
    let category = take_flag_value(&mut args, "--category");
    let description = take_flag_value(&mut args, "--description");
    let sql_query = take_flag_value(&mut args, "--sql");
    let rename = take_flag_value(&mut args, "--rename");
    let show_all = if let Some(pos) = args.iter().position(|a| a == "--all") {
        args.remove(pos);
        true
    } else {
        false
    };

    let result = match args.first().map(String::as_str) {
        None => {
            if let Some(logger) = cluster_console::utils::dual_logging::get_dual_logger() {
                eprintln!("Logs: {}", logger.log_path().display());
            }
            cluster_console::ui::console_app::run_console_app(config, log_buffer)
        }
        Some("functions") => list_functions(&config, show_all),
        Some("show") => match args.get(1) {
            Some(function_name) => show_level(
                &config,
                function_name,
                args.get(2).map(String::as_str),
                export,
            ),
            None => Err(anyhow!("Usage: cluster-console show <function> [path]")),
        },
        Some("new") => match &args[1..] {
            [category, name, description, sql] => create_function(
                &config,
                FunctionDraft {
                    category: category.clone(),
                    name: name.clone(),
                    description: description.clone(),
                    sql_query: sql.clone(),
                },
            ),
            _ => Err(anyhow!(
                "Usage: cluster-console new <category> <name> <description> <sql>"
            )),
        },
        Some("edit") => match args.get(1) {
            Some(function_name) => edit_function(
                &config,
                function_name,
                category,
                description,
                sql_query,
                rename,
            ),
            None => Err(anyhow!(
                "Usage: cluster-console edit <name> [--category C] [--description D] [--sql SQL] [--rename NAME]"
            )),
        },
        Some(other) => {
            print_help();
            Err(anyhow!("Unknown command: {}", other))
        }
    };

    if let Err(e) = result {
        eprintln!("{}", format!("Error: {}", e).red());
        std::process::exit(1);
    }
    Ok(())
}
