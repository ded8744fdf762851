use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::types::{ChunkParams, ChunkPlan, RetrievalMethod};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_from(Path::new("."), &env_name)
    }

    /// Merge defaults, `<dir>/config.toml`, `<dir>/config.<env>.toml` and `APP_*` env vars.
    pub fn load_from(dir: &Path, env_name: &str) -> anyhow::Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(dir.join("config.toml")));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate()?;
        Ok(config)
    }

    pub fn from_figment(figment: Figment) -> anyhow::Result<Self> {
        let config = Self { figment: Figment::from(Serialized::defaults(Settings::default())).merge(figment) };
        config.validate()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    pub fn settings(&self) -> anyhow::Result<Settings> {
        self.figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to read settings: {}", e))
    }

    fn validate(&self) -> anyhow::Result<()> {
        let settings = self.settings()?;
        if settings.embedding.dimension == 0 {
            anyhow::bail!("embedding.dimension must be > 0");
        }
        if settings.search.top_k == 0 {
            anyhow::bail!("search.top_k must be >= 1");
        }
        if !(0.0..=1.0).contains(&settings.chunking.semantic.similarity_threshold) {
            anyhow::bail!("chunking.semantic.similarity_threshold must be within [0, 1]");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub storage: StorageSettings,
    pub embedding: EmbeddingSettings,
    pub chunking: ChunkingSettings,
    pub search: SearchSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Root directory for files, collections and the experiment log.
    pub dir: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self { dir: "~/.local/share/chunklab".to_string() }
    }
}

impl StorageSettings {
    pub fn resolve(&self, base: &Path) -> PathBuf {
        resolve_with_base(base, &self.dir)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmbeddingBackend {
    /// Deterministic feature hashing, no model files required.
    #[default]
    Hash,
    /// Local BGE-M3 weights (requires the `candle` feature of chunklab-embed).
    BgeM3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    #[default]
    Cpu,
    Metal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub backend: EmbeddingBackend,
    pub dimension: usize,
    pub model_dir: Option<String>,
    pub device: DeviceKind,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self { backend: EmbeddingBackend::Hash, dimension: 384, model_dir: None, device: DeviceKind::Cpu }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WindowSettings {
    pub chunk_size: usize,
    pub overlap: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TokenSettings {
    pub token_count: usize,
    pub overlap: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SentenceSettings {
    pub sentence_count: usize,
    pub overlap: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SemanticSettings {
    pub similarity_threshold: f32,
}

/// Per-method defaults used when a batch does not pass explicit parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    pub fixed: WindowSettings,
    pub recursive: WindowSettings,
    pub token: TokenSettings,
    pub sentence: SentenceSettings,
    pub semantic: SemanticSettings,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            fixed: WindowSettings { chunk_size: 1000, overlap: 200 },
            recursive: WindowSettings { chunk_size: 1000, overlap: 200 },
            token: TokenSettings { token_count: 256, overlap: 50 },
            sentence: SentenceSettings { sentence_count: 5, overlap: 1 },
            semantic: SemanticSettings { similarity_threshold: 0.5 },
        }
    }
}

impl ChunkingSettings {
    pub fn plan(&self) -> ChunkPlan {
        ChunkPlan::new()
            .with(ChunkParams::Fixed { chunk_size: self.fixed.chunk_size, overlap: self.fixed.overlap })
            .with(ChunkParams::Recursive { chunk_size: self.recursive.chunk_size, overlap: self.recursive.overlap })
            .with(ChunkParams::Token { token_count: self.token.token_count, overlap: self.token.overlap })
            .with(ChunkParams::Sentence { sentence_count: self.sentence.sentence_count, overlap: self.sentence.overlap })
            .with(ChunkParams::Semantic { similarity_threshold: self.semantic.similarity_threshold })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub top_k: usize,
    pub methods: Vec<RetrievalMethod>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self { top_k: 5, methods: vec![RetrievalMethod::Dense] }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
