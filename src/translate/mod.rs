pub mod backend;
pub mod cache;
pub mod extractor;
pub mod glossary;
pub mod machine_translate;
pub mod pipeline;
pub mod reassembler;
pub mod store;
pub mod translator;

use anyhow::{Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::cli::{CacheAction, CacheArgs, GlossaryAction, GlossaryArgs, TranslateArgs};
use crate::config::Config;
use crate::utils::same_file;
use cache::TranslationCache;
use glossary::{Glossary, GlossaryEntry, MatchPolicy};
use machine_translate::{MachineTranslateClient, MachineTranslateConfig, MachineTranslateProvider};
use pipeline::{BatchJob, DocumentPipeline, PipelineOptions};
use store::{GlossaryStore, load_glossary};

pub fn run(args: TranslateArgs) -> Result<()> {
    let cfg = Config::load().unwrap_or_default();

    // CLI arg > config > default
    let provider_str = args.api.clone().unwrap_or_else(|| cfg.api.provider.clone());
    let lang = args
        .lang
        .clone()
        .unwrap_or_else(|| cfg.translation.default_language.clone());
    let source_lang = args
        .source_lang
        .clone()
        .unwrap_or_else(|| cfg.translation.source_language.clone());
    let category = args
        .category
        .clone()
        .unwrap_or_else(|| cfg.glossary.category.clone());

    let client = create_client(&provider_str, &source_lang, &cfg, &args)?;

    let policy = MatchPolicy::for_language(&source_lang, &cfg.glossary.substring_match_languages);
    let glossary = match args.glossary_db.clone().or_else(|| cfg.glossary_path()) {
        Some(path) => load_glossary(&path, &category, policy),
        None => Glossary::new().with_policy(policy),
    };
    if !glossary.is_empty() {
        println!(
            "{}",
            format!("[Glossary] {} terms from '{}'", glossary.len(), category).cyan()
        );
    }

    let cache = if args.no_cache || !cfg.translation.use_cache {
        None
    } else {
        match TranslationCache::open() {
            Ok(c) => Some(c),
            Err(e) => {
                tracing::warn!("Translation cache unavailable: {}", e);
                None
            }
        }
    };

    let mut options = PipelineOptions::new(&lang);
    options.translate = cfg.translate_options();
    options.extractor = cfg.extractor_options();
    if args.keep_symbol_cells {
        options.extractor.skip_symbol_cells = false;
    }

    let input = &args.input;
    if input.is_file() {
        translate_single(&client, &glossary, cache.as_ref(), &options, input, args.output.as_deref())
    } else if input.is_dir() {
        translate_directory(
            &client,
            &glossary,
            cache.as_ref(),
            &options,
            cfg.translation.concurrency,
            input,
            args.output.as_deref(),
            args.recursive,
        )
    } else {
        anyhow::bail!("Input path does not exist: {}", input.display());
    }
}

fn create_client(
    provider_str: &str,
    source_lang: &str,
    cfg: &Config,
    args: &TranslateArgs,
) -> Result<MachineTranslateClient> {
    let provider = MachineTranslateProvider::from_str(provider_str)
        .with_context(|| format!("Unknown translation backend: {}", provider_str))?;

    let config = match provider {
        MachineTranslateProvider::Google => {
            println!("{}", "[Translate] Using Google Translate".cyan());
            MachineTranslateConfig::google(source_lang)
        }
        MachineTranslateProvider::DeepL => {
            let api_key = args
                .api_key
                .clone()
                .or_else(|| cfg.get_api_key("deepl"))
                .context("DeepL API key is required (--api-key, config or DEEPL_API_KEY)")?;
            println!("{}", "[Translate] Using DeepL".cyan());
            MachineTranslateConfig::deepl(source_lang, api_key)
        }
    };

    MachineTranslateClient::new(config.with_timeout(cfg.timeout()))
}

fn translate_single(
    client: &MachineTranslateClient,
    glossary: &Glossary,
    cache: Option<&TranslationCache>,
    options: &PipelineOptions,
    input: &Path,
    output: Option<&Path>,
) -> Result<()> {
    println!("{}", format!("[Translate] {}", input.display()).green());

    let output_path = match output {
        Some(p) if p.is_dir() => {
            away_from_input(input, p.join(input.file_name().unwrap_or_default()))
        }
        Some(p) => away_from_input(input, p.to_path_buf()),
        None => translated_name(input),
    };

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len}")?
            .progress_chars("=>-"),
    );
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    let result = DocumentPipeline::new(client, glossary, options.clone())
        .with_cache(cache)
        .with_progress(|done, total| {
            pb.set_length(total as u64);
            pb.set_position(done as u64);
        })
        .translate_file(input, &output_path);
    pb.finish_and_clear();

    let report = result.with_context(|| format!("Failed to translate {}", input.display()))?;

    if report.segments == 0 {
        println!("{}", "[WARN] No translatable text found".yellow());
    }
    if report.failed > 0 {
        println!(
            "{}",
            format!(
                "[WARN] {} segment(s) kept their original text",
                report.failed
            )
            .yellow()
        );
    }
    println!(
        "{}",
        format!(
            "[OK] Translated {} of {} segments -> {}",
            report.translated,
            report.segments,
            output_path.display()
        )
        .green()
    );

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn translate_directory(
    client: &MachineTranslateClient,
    glossary: &Glossary,
    cache: Option<&TranslationCache>,
    options: &PipelineOptions,
    concurrency: usize,
    dir: &Path,
    output: Option<&Path>,
    recursive: bool,
) -> Result<()> {
    let inputs = find_documents(dir, recursive);

    if inputs.is_empty() {
        println!("{}", "[WARN] No DOCX files found".yellow());
        return Ok(());
    }

    println!(
        "{}",
        format!("[Translate] Found {} DOCX file(s)", inputs.len()).green()
    );

    let jobs: Vec<BatchJob> = inputs
        .into_iter()
        .map(|input| BatchJob {
            output: output_path_for(&input, dir, output),
            input,
        })
        .collect();

    let pb = ProgressBar::new(jobs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=>-"),
    );

    let report = pipeline::translate_documents(
        &jobs,
        client,
        glossary,
        cache,
        options,
        concurrency,
        |outcome| {
            pb.inc(1);
            if let Err(e) = &outcome.result {
                pb.suspend(|| {
                    eprintln!(
                        "{}",
                        format!("[ERROR] Failed to translate {}: {}", outcome.input.display(), e)
                            .red()
                    );
                });
            }
        },
    );
    pb.finish_and_clear();

    println!(
        "{}",
        format!(
            "[OK] {} document(s) translated, {} failed; {} segment(s) translated, {} kept original",
            report.succeeded(),
            report.failed_documents(),
            report.translated_segments(),
            report.failed_segments()
        )
        .green()
    );

    Ok(())
}

/// `.docx` files under `dir`, skipping Word lock files and earlier outputs.
pub fn find_documents(dir: &Path, recursive: bool) -> Vec<PathBuf> {
    let walker = if recursive {
        WalkDir::new(dir)
    } else {
        WalkDir::new(dir).max_depth(1)
    };

    let mut files: Vec<PathBuf> = walker
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            let name = p.file_name().unwrap_or_default().to_string_lossy();
            p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("docx"))
                && !name.starts_with("~$")
                && !p
                    .file_stem()
                    .is_some_and(|s| s.to_string_lossy().ends_with("_translated"))
        })
        .collect();
    files.sort();
    files
}

/// `<stem>_translated.docx` beside the input, or the same relative path under `output`.
/// Never the input itself.
pub fn output_path_for(input: &Path, root: &Path, output: Option<&Path>) -> PathBuf {
    match output {
        Some(base) => {
            let relative = input.strip_prefix(root).unwrap_or(input);
            away_from_input(input, base.join(relative))
        }
        None => translated_name(input),
    }
}

fn away_from_input(input: &Path, output: PathBuf) -> PathBuf {
    if same_file(input, &output) {
        translated_name(&output)
    } else {
        output
    }
}

fn translated_name(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    input.with_file_name(format!("{}_translated.docx", stem))
}

fn open_store(db: Option<PathBuf>, cfg: &Config) -> Result<(GlossaryStore, PathBuf)> {
    let path = db
        .or_else(|| cfg.glossary_path())
        .context("Could not determine glossary database path")?;
    let store = GlossaryStore::open(&path)
        .with_context(|| format!("Failed to open glossary {}", path.display()))?;
    Ok((store, path))
}

pub fn run_glossary(args: GlossaryArgs) -> Result<()> {
    let cfg = Config::load().unwrap_or_default();
    let (store, path) = open_store(args.db, &cfg)?;
    let category_or_default = |c: Option<String>| c.unwrap_or_else(|| cfg.glossary.category.clone());

    match args.action {
        GlossaryAction::Add {
            term,
            translation,
            category,
            exact_case,
        } => {
            let category = category_or_default(category);
            let mut entry = match &translation {
                Some(t) => GlossaryEntry::forced(&term, t),
                None => GlossaryEntry::protected(&term),
            };
            if exact_case {
                entry = entry.with_exact_case();
            }
            store.upsert(&entry, &category)?;
            match translation {
                Some(t) => println!(
                    "{}",
                    format!("[Glossary] {} -> {} ({})", term, t, category).green()
                ),
                None => println!(
                    "{}",
                    format!("[Glossary] {} protected ({})", term, category).green()
                ),
            }
        }
        GlossaryAction::Remove { term, category } => {
            let category = category_or_default(category);
            if store.remove(&term, &category)? {
                println!("{}", format!("[Glossary] Removed {} ({})", term, category).green());
            } else {
                println!("{}", format!("[WARN] {} not found in '{}'", term, category).yellow());
            }
        }
        GlossaryAction::List { category } => {
            let entries = store.list(category.as_deref())?;
            if entries.is_empty() {
                println!("{}", "[Glossary] No terms".yellow());
            }
            for (category, entry) in entries {
                let target = match &entry.forced_translation {
                    Some(t) => format!("-> {}", t),
                    None => "(protected)".to_string(),
                };
                let case = if entry.exact_case { " [exact case]" } else { "" };
                println!("  [{}] {} {}{}", category.cyan(), entry.term, target, case);
            }
        }
        GlossaryAction::Import { file, category } => {
            let category = category_or_default(category);
            let glossary = Glossary::load(&file)?;
            let count = store.import(&glossary, &category)?;
            println!(
                "{}",
                format!(
                    "[Glossary] Imported {} terms from {} into '{}'",
                    count,
                    file.display(),
                    category
                )
                .green()
            );
        }
        GlossaryAction::Stats => {
            let stats = store.stats()?;
            println!("{}", "[Glossary Stats]".green());
            println!("  Location: {}", path.display());
            println!("  Total entries: {}", stats.total_entries);
            for (category, count) in &stats.categories {
                println!("  {}: {}", category, count);
            }
        }
    }

    Ok(())
}

pub fn run_cache(args: CacheArgs) -> Result<()> {
    match args.action {
        CacheAction::Stats => {
            let cache = TranslationCache::open()?;
            let stats = cache.stats()?;
            println!("{}", "[Cache Stats]".green());
            println!("  Total entries: {}", stats.total_entries);
            for (provider, count) in &stats.providers {
                println!("  {}: {}", provider, count);
            }
        }
        CacheAction::Clear => {
            TranslationCache::open()?.clear()?;
            println!("{}", "[Cache] Cleared".green());
        }
        CacheAction::Path => {
            println!("{}", TranslationCache::cache_path()?.display());
        }
    }
    Ok(())
}
