//! Command-line front end.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::archive::{self, DEFAULT_BASE_URL};
use crate::config::{self, AppConfig};
use crate::editor::{Editor, EditorEvent, EditorOutcome};
use crate::error::{AppError, AppResult};
use crate::notification;
use crate::offline::{
    CacheController, DirCacheStorage, FetchOutcome, Network, OfflineManifest, OfflineNetwork,
    Request, SiteRootNetwork,
};
use crate::preset::PresetResolver;
use crate::storage::{FileKeyValueStore, StorageError};
use crate::store::TokenStore;
use crate::theme::{self, ColorOverrides, ShadowLevel, TokenPatch};

#[derive(Debug, Parser)]
#[command(name = "scenestealer", version, about = "Design-token theme editor")]
pub struct Cli {
    /// Read settings from this file instead of the XDG config path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the persisted theme and offline caches
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the current tokens and section flags
    Show,
    /// Merge token values into the current theme
    Set(SetArgs),
    /// Load a named preset
    Preset { name: String },
    /// List presets the configured sources can enumerate
    Presets,
    /// Show or hide a preview section
    Section {
        id: String,
        #[arg(long)]
        hide: bool,
    },
    /// Toggle the dark background override
    Dark {
        #[arg(value_enum)]
        mode: Toggle,
    },
    /// Write the HTML snapshot and the theme document
    Export {
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Write theme.json with the current tokens
    Theme {
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Restore a previously exported theme document
    Import { file: PathBuf },
    /// Print the tokens declared in an HTML file's :root block
    Extract { file: PathBuf },
    /// Manage the offline asset cache
    Offline {
        #[command(subcommand)]
        action: OfflineAction,
    },
    /// Generate the sample gallery page
    Archive(ArchiveArgs),
    /// Generate the RSS feed of recent samples
    Rss(ArchiveArgs),
    /// Generate the sitemap
    Sitemap(ArchiveArgs),
    /// Highlight the newest sample on the landing page
    Index {
        #[arg(long, default_value = "samples")]
        samples: PathBuf,
        #[arg(long, default_value = "index.html")]
        index: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

#[derive(Debug, Args)]
pub struct SetArgs {
    #[arg(long)]
    pub primary: Option<String>,
    #[arg(long)]
    pub bg: Option<String>,
    #[arg(long)]
    pub fg: Option<String>,
    #[arg(long)]
    pub accent: Option<String>,
    /// Corner radius, e.g. `12` or `12px`
    #[arg(long)]
    pub radius: Option<String>,
    /// none, sm, md or lg
    #[arg(long)]
    pub shadow: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum OfflineAction {
    /// Pre-cache the manifest and activate it
    Install,
    /// Install a new manifest version and evict the previous one
    Update {
        #[arg(long)]
        version: String,
    },
    /// Answer a request the way the active controller would
    Fetch {
        path: String,
        #[arg(long)]
        navigate: bool,
        /// Treat the network as unreachable
        #[arg(long)]
        offline: bool,
    },
    /// Print controller state and cached generations
    Status,
}

#[derive(Debug, Args)]
pub struct ArchiveArgs {
    #[arg(long, default_value = "samples")]
    pub samples: PathBuf,
    #[arg(long)]
    pub out: PathBuf,
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,
}

impl SetArgs {
    fn to_patch(&self) -> AppResult<TokenPatch> {
        let corner_radius = self
            .radius
            .as_deref()
            .map(|radius| {
                theme::parse_radius(radius)
                    .ok_or_else(|| AppError::InvalidInput(format!("radius {radius:?}")))
            })
            .transpose()?;
        Ok(TokenPatch {
            colors: ColorOverrides {
                primary: self.primary.clone(),
                bg: self.bg.clone(),
                fg: self.fg.clone(),
                accent: self.accent.clone(),
            },
            corner_radius,
            shadow_level: self.shadow.as_deref().map(ShadowLevel::from_key),
        })
    }
}

struct Context {
    config: AppConfig,
    data_dir: PathBuf,
}

impl Context {
    fn new(cli: &Cli) -> AppResult<Self> {
        let config = match &cli.config {
            Some(path) => config::load_app_config_from(path),
            None => config::load_app_config(),
        };
        let data_dir = cli
            .data_dir
            .clone()
            .or_else(|| config.resolved_data_dir())
            .ok_or(StorageError::MissingHomeDirectory)?;
        Ok(Self { config, data_dir })
    }

    fn editor(&self) -> Editor<FileKeyValueStore> {
        let storage = FileKeyValueStore::with_root(self.data_dir.join("state"));
        let mut store = TokenStore::new(storage);
        store.on_refresh(|state| {
            tracing::debug!(
                radius = state.tokens.corner_radius,
                shadow = state.tokens.shadow_level.key(),
                "theme refreshed"
            );
        });
        let mut editor = Editor::new(store, PresetResolver::from_dirs(&self.config.preset_dirs));
        editor.start();
        editor
    }

    fn controller<N: Network>(
        &self,
        manifest: OfflineManifest,
        network: N,
    ) -> CacheController<DirCacheStorage, N> {
        let caches = DirCacheStorage::with_root(self.data_dir.join("caches"));
        CacheController::new(manifest, caches, network)
    }

    fn surface(&self, err: &AppError) {
        if self.config.notifications {
            notification::send(err.to_string());
        }
    }
}

pub fn run(cli: Cli) -> AppResult<()> {
    let context = Context::new(&cli)?;
    let result = execute(&context, cli.command);
    if let Err(err) = &result {
        context.surface(err);
    }
    result
}

fn execute(context: &Context, command: Command) -> AppResult<()> {
    match command {
        Command::Show => {
            let editor = context.editor();
            print_json(editor.store().state())
        }
        Command::Set(args) => {
            let patch = args.to_patch()?;
            if patch.is_empty() {
                return Err(AppError::InvalidInput("nothing to set".to_string()));
            }
            let mut editor = context.editor();
            editor.dispatch(EditorEvent::ApplyTokens(patch))?;
            print_json(editor.store().tokens())
        }
        Command::Preset { name } => {
            let mut editor = context.editor();
            if let EditorOutcome::PresetLoaded { name, source } =
                editor.dispatch(EditorEvent::LoadPreset(name))?
            {
                println!("loaded preset {name} from {source}");
            }
            Ok(())
        }
        Command::Presets => {
            let resolver = PresetResolver::from_dirs(&context.config.preset_dirs);
            for name in resolver.available() {
                println!("{name}");
            }
            Ok(())
        }
        Command::Section { id, hide } => {
            let mut editor = context.editor();
            editor.dispatch(EditorEvent::SetSection {
                id,
                visible: !hide,
            })?;
            print_json(editor.store().sections())
        }
        Command::Dark { mode } => {
            let mut editor = context.editor();
            editor.dispatch(EditorEvent::SetDarkMode(mode == Toggle::On))?;
            print_json(editor.store().tokens())
        }
        Command::Export { out } => {
            let mut editor = context.editor();
            if let EditorOutcome::DesignExported(files) =
                editor.dispatch(EditorEvent::ExportDesign(out))?
            {
                println!("{}", files.html.display());
                println!("{}", files.json.display());
            }
            Ok(())
        }
        Command::Theme { out } => {
            let mut editor = context.editor();
            if let EditorOutcome::ThemeDownloaded(path) =
                editor.dispatch(EditorEvent::DownloadTheme(out))?
            {
                println!("{}", path.display());
            }
            Ok(())
        }
        Command::Import { file } => {
            let document = read_json(&file)?;
            let mut editor = context.editor();
            editor.store_mut().import(&document)?;
            print_json(editor.store().state())
        }
        Command::Extract { file } => {
            let html = read_text(&file)?;
            print_json(&theme::extract_tokens_from_html(&html))
        }
        Command::Offline { action } => run_offline(context, action),
        Command::Archive(args) => {
            let samples = archive::scan_samples(&args.samples)?;
            archive::write_output(&args.out, &archive::render_archive(&samples, Utc::now()))?;
            println!("{} samples -> {}", samples.len(), args.out.display());
            Ok(())
        }
        Command::Rss(args) => {
            let samples = archive::scan_samples(&args.samples)?;
            let feed = archive::render_rss(&samples, &args.base_url, Utc::now());
            archive::write_output(&args.out, &feed)?;
            println!("{}", args.out.display());
            Ok(())
        }
        Command::Sitemap(args) => {
            let samples = match archive::scan_samples(&args.samples) {
                Ok(samples) => samples,
                Err(archive::ArchiveError::MissingSamples(dir)) => {
                    tracing::warn!(dir = %dir.display(), "no samples directory; listing fixed pages only");
                    Vec::new()
                }
                Err(err) => return Err(err.into()),
            };
            let sitemap = archive::render_sitemap(&samples, &args.base_url, Utc::now());
            archive::write_output(&args.out, &sitemap)?;
            println!("{}", args.out.display());
            Ok(())
        }
        Command::Index { samples, index } => {
            match archive::update_index_file(&samples, &index)? {
                Some(latest) => println!("{}: latest sample {}", index.display(), latest.title),
                None => println!("{}: no samples, linked the archive", index.display()),
            }
            Ok(())
        }
    }
}

fn run_offline(context: &Context, action: OfflineAction) -> AppResult<()> {
    let manifest = OfflineManifest::from_config(&context.config.offline);
    let site = SiteRootNetwork::new(context.config.site_root());

    match action {
        OfflineAction::Install => {
            let mut controller = context.controller(manifest, site);
            controller.resume()?;
            let (installed, activated) = controller.install_and_activate()?;
            println!(
                "{}: cached {} asset(s), {} failed",
                installed.cache_name,
                installed.cached.len(),
                installed.failed.len()
            );
            for failure in &installed.failed {
                println!("  failed {}: {}", failure.asset, failure.reason);
            }
            for name in &activated.deleted {
                println!("deleted stale cache {name}");
            }
            Ok(())
        }
        OfflineAction::Update { version } => {
            let mut controller = context.controller(manifest, site);
            if !controller.resume()? {
                return Err(AppError::InvalidInput(format!(
                    "no active cache {}; run `offline install` first",
                    controller.manifest().cache_name()
                )));
            }
            let next = controller.manifest().clone().with_version(version);
            let (installed, activated) = controller.update(next)?;
            println!(
                "{}: cached {} asset(s), evicted {}",
                installed.cache_name,
                installed.cached.len(),
                activated.deleted.join(", ")
            );
            Ok(())
        }
        OfflineAction::Fetch {
            path,
            navigate,
            offline,
        } => {
            let request = if navigate {
                Request::navigate(&path)
            } else {
                Request::get(&path)
            };
            let outcome = if offline {
                let mut controller = context.controller(manifest, OfflineNetwork);
                controller.resume()?;
                controller.fetch(&request)?
            } else {
                let mut controller = context.controller(manifest, site);
                controller.resume()?;
                controller.fetch(&request)?
            };
            print_fetch(&request, &outcome);
            Ok(())
        }
        OfflineAction::Status => {
            let mut controller = context.controller(manifest, site);
            controller.resume()?;
            let status = controller.status()?;
            println!("state: {:?}", status.state);
            println!("current: {} ({} entries)", status.cache_name, status.cached_entries);
            for name in &status.caches {
                println!("cache: {name}");
            }
            Ok(())
        }
    }
}

fn print_fetch(request: &Request, outcome: &FetchOutcome) {
    println!(
        "/{} -> {} via {:?}, {} bytes{}",
        request.key(),
        outcome.response.status,
        outcome.source,
        outcome.response.body.len(),
        outcome
            .response
            .content_type
            .as_deref()
            .map(|content_type| format!(" ({content_type})"))
            .unwrap_or_default()
    );
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> AppResult<()> {
    let json = serde_json::to_string_pretty(value).map_err(crate::store::StoreError::from)?;
    println!("{json}");
    Ok(())
}

fn read_text(path: &Path) -> AppResult<String> {
    fs::read_to_string(path).map_err(|err| AppError::InvalidInput(format!("{}: {err}", path.display())))
}

fn read_json(path: &Path) -> AppResult<serde_json::Value> {
    let text = read_text(path)?;
    serde_json::from_str(&text)
        .map_err(|err| AppError::InvalidInput(format!("{}: {err}", path.display())))
}
