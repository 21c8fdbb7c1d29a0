//! gf: CLI binary for building feature sets and per-example feature matrices.
//!
//! Subcommands:
//! - init     scan the corpus, build every feature vocabulary, save the feature set
//! - compute  load a saved feature set and compute one matrix per example
//! - run      init + compute in one pass
//! - inspect  print a saved feature set's layout and vocabularies

use std::env;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;

use gf_corpus::{EmbeddingCache, JsonDirStore};
use gf_features::{Config, Encoding, FeatureMatrixBuilder, FeatureSet};
use gf_logging::{
    ComputeDoneEventV1, ComputeProgressEventV1, FeatureInitEventV1, NdjsonWriter, RunManifestV1,
};

fn die(context: &str, e: impl Display) -> ! {
    eprintln!("{context}: {e}");
    process::exit(1);
}

fn value_of(args: &[String], i: usize, flag: &str) -> String {
    args.get(i + 1).cloned().unwrap_or_else(|| {
        eprintln!("Missing value for {flag}");
        process::exit(1);
    })
}

fn print_help() {
    eprintln!(
        r#"gf - game-record feature matrices

USAGE:
    gf <COMMAND> [OPTIONS]

COMMANDS:
    init        Build feature vocabularies from the corpus and save the feature set
    compute     Compute feature matrices with a saved feature set
    run         init + compute
    inspect     Print a saved feature set's column layout

OPTIONS:
    -h, --help          Print this help message
    -V, --version       Print version

Run `gf <COMMAND> --help` for command options.
"#
    );
}

fn print_version() {
    println!("gf {}", env!("CARGO_PKG_VERSION"));
}

/// Options shared by `init`, `compute` and `run`.
struct RunArgs {
    config_path: PathBuf,
    feature_set_dir: Option<PathBuf>,
}

fn parse_run_args(cmd: &str, args: &[String]) -> Option<RunArgs> {
    let mut config_path: Option<String> = None;
    let mut feature_set_dir: Option<String> = None;

    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                println!(
                    r#"gf {cmd}

USAGE:
    gf {cmd} --config cfg.yaml [--feature-set DIR]

OPTIONS:
    --config PATH       Path to YAML config (required)
    --feature-set DIR   Feature set directory (default: output.feature_set_dir)
"#
                );
                return None;
            }
            "--config" => {
                config_path = Some(value_of(args, i, "--config"));
                i += 2;
            }
            "--feature-set" => {
                feature_set_dir = Some(value_of(args, i, "--feature-set"));
                i += 2;
            }
            other => {
                eprintln!("Unknown option for `gf {cmd}`: {other}");
                eprintln!("Run `gf {cmd} --help` for usage.");
                process::exit(1);
            }
        }
    }

    let config_path = config_path.unwrap_or_else(|| {
        eprintln!("Missing --config");
        process::exit(1);
    });
    Some(RunArgs {
        config_path: PathBuf::from(config_path),
        feature_set_dir: feature_set_dir.map(PathBuf::from),
    })
}

/// Loaded config plus the run's event log and manifest.
struct Run {
    cfg: Config,
    feature_set_dir: PathBuf,
    run_id: String,
    events: NdjsonWriter,
    manifest: RunManifestV1,
    manifest_path: PathBuf,
}

impl Run {
    fn open(cmd: &str, a: &RunArgs) -> Self {
        let config_bytes = std::fs::read(&a.config_path)
            .unwrap_or_else(|e| die("Failed to read config file", e));
        let base = a
            .config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let cfg = Config::load(&a.config_path)
            .unwrap_or_else(|e| die("Failed to load config", e))
            .rebase(&base);
        let feature_set_dir = a
            .feature_set_dir
            .clone()
            .unwrap_or_else(|| cfg.output.feature_set_dir.clone());

        let logs_dir = cfg.output.logs_dir.clone();
        std::fs::create_dir_all(&logs_dir).unwrap_or_else(|e| die("Failed to create logs dir", e));
        let events = NdjsonWriter::open_append_with_flush(
            logs_dir.join("events.ndjson"),
            cfg.output.flush_every_lines,
        )
        .unwrap_or_else(|e| die("Failed to open event log", e));

        let created_ts_ms = gf_logging::now_ms();
        let run_id = format!("{cmd}-{created_ts_ms}");
        let manifest = RunManifestV1 {
            run_manifest_version: gf_logging::RUN_MANIFEST_VERSION,
            run_id: run_id.clone(),
            command: cmd.to_string(),
            created_ts_ms,
            completed_ts_ms: None,
            git_hash: gf_logging::try_git_hash(),
            config_hash: Some(gf_logging::hash_config_bytes(&config_bytes)),
            games_dir: cfg.corpus.games_dir.display().to_string(),
            feature_set_dir: feature_set_dir.display().to_string(),
            matrices_file: cfg.output.matrices_file.display().to_string(),
            logs_dir: logs_dir.display().to_string(),
            feature_set: cfg.feature_set.name.clone(),
            features: cfg.feature_set.resolved_order(),
            dimensionality: 0,
            games_scanned: 0,
            datums_written: 0,
            rows_written: 0,
        };
        let manifest_path = logs_dir.join("run.json");
        let run = Self {
            cfg,
            feature_set_dir,
            run_id,
            events,
            manifest,
            manifest_path,
        };
        run.write_manifest();
        run
    }

    fn write_manifest(&self) {
        gf_logging::write_manifest_atomic(&self.manifest_path, &self.manifest)
            .unwrap_or_else(|e| die("Failed to write run manifest", e));
    }

    fn store(&self) -> JsonDirStore {
        JsonDirStore::open(&self.cfg.corpus.games_dir)
            .unwrap_or_else(|e| die("Failed to open corpus", e))
    }

    fn init(&mut self, models: &mut EmbeddingCache) -> FeatureSet {
        let fs_cfg = &self.cfg.feature_set;
        println!("Building feature set {:?}...", fs_cfg.name);
        let set = FeatureSet::init(
            &fs_cfg.name,
            &self.store(),
            &fs_cfg.extractors(),
            &fs_cfg.features,
            &fs_cfg.resolved_order(),
            models,
        )
        .unwrap_or_else(|e| die("Failed to build feature set", e));

        for f in set.features() {
            let ev = FeatureInitEventV1 {
                event: FeatureInitEventV1::EVENT,
                ts_ms: gf_logging::now_ms(),
                run_id: self.run_id.clone(),
                feature_set: set.name().to_string(),
                feature: f.name().to_string(),
                kind: f.kind().as_str().to_string(),
                dimensionality: f.dimensionality() as u64,
                vocabulary_size: f.vocabulary().map(|v| v.len() as u64),
            };
            self.events
                .write_event(&ev)
                .unwrap_or_else(|e| die("Failed to write event log", e));
            println!("  - {}: {}, {} columns", f.name(), f.kind().as_str(), f.dimensionality());
        }

        gf_features::save_feature_set(&set, &self.feature_set_dir)
            .unwrap_or_else(|e| die("Failed to save feature set", e));
        self.manifest.dimensionality = set.dimensionality() as u64;
        self.write_manifest();
        println!(
            "Feature set saved. dimensionality={} dir={}",
            set.dimensionality(),
            self.feature_set_dir.display()
        );
        set
    }

    fn compute(&mut self, set: &FeatureSet, models: &mut EmbeddingCache) {
        set.ensure_models(models)
            .unwrap_or_else(|e| die("Failed to load embedding models", e));
        let store = self.store();
        let started = Instant::now();
        println!("Computing feature matrices...");

        let run_id = self.run_id.clone();
        let events = &mut self.events;
        let mut games = 0u64;
        let out = FeatureMatrixBuilder::new(set, models)
            .build_with_progress(&store, &self.cfg.examples, |p| {
                games = p.games_done;
                let ev = ComputeProgressEventV1 {
                    event: ComputeProgressEventV1::EVENT,
                    ts_ms: gf_logging::now_ms(),
                    run_id: run_id.clone(),
                    game: p.game.to_string(),
                    games_done: p.games_done,
                    examples_done: p.examples_done,
                };
                events
                    .write_event(&ev)
                    .unwrap_or_else(|e| die("Failed to write event log", e));
            })
            .unwrap_or_else(|e| die("Failed to compute feature matrices", e));

        gf_features::save_collection(&out, &self.cfg.output.matrices_file)
            .unwrap_or_else(|e| die("Failed to save feature matrices", e));

        let ev = ComputeDoneEventV1 {
            event: ComputeDoneEventV1::EVENT,
            ts_ms: gf_logging::now_ms(),
            run_id,
            feature_set: set.name().to_string(),
            games,
            datums: out.len() as u64,
            rows: out.rows() as u64,
            dimensionality: set.dimensionality() as u64,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        self.events
            .write_event(&ev)
            .unwrap_or_else(|e| die("Failed to write event log", e));

        self.manifest.dimensionality = set.dimensionality() as u64;
        self.manifest.games_scanned = games;
        self.manifest.datums_written = out.len() as u64;
        self.manifest.rows_written = out.rows() as u64;
        println!(
            "Computed {} datums ({} rows x {} columns) from {} games -> {}",
            out.len(),
            out.rows(),
            set.dimensionality(),
            games,
            self.cfg.output.matrices_file.display()
        );
    }

    fn finish(mut self) {
        let _ = self.events.flush();
        self.manifest.completed_ts_ms = Some(gf_logging::now_ms());
        self.write_manifest();
    }
}

fn cmd_init(args: &[String]) {
    let Some(a) = parse_run_args("init", args) else {
        return;
    };
    let mut run = Run::open("init", &a);
    let mut models = EmbeddingCache::new();
    run.init(&mut models);
    run.finish();
}

fn cmd_compute(args: &[String]) {
    let Some(a) = parse_run_args("compute", args) else {
        return;
    };
    let mut run = Run::open("compute", &a);
    let set = gf_features::load_feature_set(&run.feature_set_dir)
        .unwrap_or_else(|e| die("Failed to load feature set", e));
    let mut models = EmbeddingCache::new();
    run.compute(&set, &mut models);
    run.finish();
}

fn cmd_run(args: &[String]) {
    let Some(a) = parse_run_args("run", args) else {
        return;
    };
    let mut run = Run::open("run", &a);
    let mut models = EmbeddingCache::new();
    let set = run.init(&mut models);
    run.compute(&set, &mut models);
    run.finish();
}

fn cmd_inspect(args: &[String]) {
    let mut config_path: Option<String> = None;
    let mut feature_set_dir: Option<String> = None;
    let mut indices: Vec<usize> = Vec::new();
    let mut feature: Option<String> = None;

    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                println!(
                    r#"gf inspect

USAGE:
    gf inspect (--feature-set DIR | --config cfg.yaml) [--index N]... [--feature NAME]

OPTIONS:
    --feature-set DIR   Saved feature set directory
    --config PATH       Take the feature set directory from this config
    --index N           Print the vocabulary key of global column N (repeatable)
    --feature NAME      Print one feature's column range and vocabulary
"#
                );
                return;
            }
            "--config" => {
                config_path = Some(value_of(args, i, "--config"));
                i += 2;
            }
            "--feature-set" => {
                feature_set_dir = Some(value_of(args, i, "--feature-set"));
                i += 2;
            }
            "--index" => {
                let v = value_of(args, i, "--index");
                indices.push(v.parse().unwrap_or_else(|_| {
                    eprintln!("Invalid --index value: {v}");
                    process::exit(1);
                }));
                i += 2;
            }
            "--feature" => {
                feature = Some(value_of(args, i, "--feature"));
                i += 2;
            }
            other => {
                eprintln!("Unknown option for `gf inspect`: {other}");
                eprintln!("Run `gf inspect --help` for usage.");
                process::exit(1);
            }
        }
    }

    let dir = match (feature_set_dir, config_path) {
        (Some(d), _) => PathBuf::from(d),
        (None, Some(c)) => {
            let c = PathBuf::from(c);
            let base = c.parent().map(Path::to_path_buf).unwrap_or_default();
            Config::load(&c)
                .unwrap_or_else(|e| die("Failed to load config", e))
                .rebase(&base)
                .output
                .feature_set_dir
        }
        (None, None) => {
            eprintln!("Missing --feature-set (or --config)");
            process::exit(1);
        }
    };

    let set = gf_features::load_feature_set(&dir)
        .unwrap_or_else(|e| die("Failed to load feature set", e));

    if indices.is_empty() && feature.is_none() {
        println!("Feature set: {}", set.name());
        println!("  - Dimensionality: {}", set.dimensionality());
        for f in set.features() {
            let range = set.feature_range(f.name()).unwrap_or_default();
            let vocab = f
                .vocabulary()
                .map_or_else(|| "-".to_string(), |v| v.len().to_string());
            println!(
                "  - {}: {} columns [{}, {}) vocabulary={}",
                f.name(),
                f.kind().as_str(),
                range.start,
                range.end,
                vocab
            );
        }
    }

    for ix in indices {
        match set.column_owner(ix) {
            Some((f, local)) => println!(
                "{ix}\t{}\t{}",
                f.name(),
                f.column_key(local).unwrap_or("-")
            ),
            None => {
                eprintln!(
                    "Column {ix} is out of range (dimensionality {})",
                    set.dimensionality()
                );
                process::exit(1);
            }
        }
    }

    if let Some(name) = feature {
        let f = set
            .feature(&name)
            .unwrap_or_else(|| die("Unknown feature", format!("{name:?}")));
        let range = set.feature_range(&name).unwrap_or_default();
        println!("{name}: {} columns [{}, {})", f.kind().as_str(), range.start, range.end);
        if let Some(v) = f.vocabulary() {
            // Index encoding stores the ordinal in its single column.
            let ordinals = f.encoding() == Some(Encoding::Index);
            if ordinals {
                println!("  ordinals in column {}", range.start);
            }
            for (key, local) in v.iter() {
                let label = if ordinals { local } else { range.start + local };
                println!("  {label}\t{key}");
            }
        }
    }
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_help();
        process::exit(1);
    }

    match args[1].as_str() {
        "-h" | "--help" | "help" => print_help(),
        "-V" | "--version" => print_version(),
        "init" => cmd_init(&args[2..]),
        "compute" => cmd_compute(&args[2..]),
        "run" => cmd_run(&args[2..]),
        "inspect" => cmd_inspect(&args[2..]),
        cmd => {
            eprintln!("Unknown command: {cmd}");
            eprintln!("Run `gf --help` for usage.");
            process::exit(1);
        }
    }
}
