use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "docxlate")]
#[command(author, version, about = "Format-preserving DOCX translation with glossary protection", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Translate a document or a directory of documents
    Translate(TranslateArgs),

    /// Manage the glossary of protected and forced terms
    Glossary(GlossaryArgs),

    /// Inspect or clear the translation cache
    Cache(CacheArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

#[derive(Parser, Debug)]
pub struct TranslateArgs {
    /// Input .docx file or directory
    #[arg(required = true)]
    pub input: PathBuf,

    /// Output file, or output directory for directory input
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Target language (e.g., en, de, tr)
    #[arg(short, long)]
    pub lang: Option<String>,

    /// Source language (default: auto)
    #[arg(long)]
    pub source_lang: Option<String>,

    /// Translation backend (google, deepl)
    #[arg(long)]
    pub api: Option<String>,

    /// API key (can also be set via environment variable)
    #[arg(long)]
    pub api_key: Option<String>,

    /// Glossary category to apply
    #[arg(short, long)]
    pub category: Option<String>,

    /// Glossary database path
    #[arg(long)]
    pub glossary_db: Option<PathBuf>,

    /// Process subdirectories recursively
    #[arg(short, long, default_value_t = false)]
    pub recursive: bool,

    /// Do not read or write the translation cache
    #[arg(long, default_value_t = false)]
    pub no_cache: bool,

    /// Translate symbol-only table cells too
    #[arg(long, default_value_t = false)]
    pub keep_symbol_cells: bool,
}

#[derive(Parser, Debug)]
pub struct GlossaryArgs {
    /// Glossary database path
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub action: GlossaryAction,
}

#[derive(Subcommand, Debug)]
pub enum GlossaryAction {
    /// Add or replace a term
    Add {
        /// Source term
        term: String,

        /// Always translate the term as this text; omit to keep the term untranslated
        #[arg(short, long)]
        translation: Option<String>,

        /// Category
        #[arg(short, long)]
        category: Option<String>,

        /// Match case exactly
        #[arg(long, default_value_t = false)]
        exact_case: bool,
    },

    /// Remove a term
    Remove {
        term: String,

        #[arg(short, long)]
        category: Option<String>,
    },

    /// List terms
    List {
        /// Only this category
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Import terms from a text file (`term` or `term = translation` per line)
    Import {
        file: PathBuf,

        #[arg(short, long)]
        category: Option<String>,
    },

    /// Show entry counts per category
    Stats,
}

#[derive(Parser, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub action: CacheAction,
}

#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Show cached translation counts
    Stats,

    /// Delete every cached translation
    Clear,

    /// Show cache file path
    Path,
}

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Initialize configuration file with defaults
    Init {
        /// Overwrite existing config
        #[arg(short, long, default_value_t = false)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., translation.default_language)
        key: String,
        /// Value to set
        value: String,
    },

    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },

    /// Show config file path
    Path,

    /// Edit config file with default editor
    Edit,
}
