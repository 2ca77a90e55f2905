//! Hub model fetcher
//!
//! Resolves authentication and cache locations from model arguments and
//! downloads the requested artifact files at a pinned revision. Pickle-based
//! weight files are refused unless explicitly allowed.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ModelArguments;

/// Errors raised while fetching model artifacts
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid repository id: {repo_id} (expected \"org/name\")")]
    InvalidRepoId { repo_id: String },

    #[error("File {file} not found in {repo}")]
    FileNotFound { repo: String, file: String },

    #[error("Refusing pickle-format weights; request safetensors or allow explicitly")]
    PickleSecurityRisk,

    #[error("Hub API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

type Result<T> = std::result::Result<T, FetchError>;

/// Model weight format, detected from the file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeightFormat {
    /// SafeTensors (no code execution on load)
    SafeTensors,
    /// GGUF quantized format
    Gguf,
    /// Pickle-based format (arbitrary code execution on load)
    PyTorchBin,
}

impl WeightFormat {
    /// Detect format from a filename
    #[must_use]
    pub fn from_filename(filename: &str) -> Option<Self> {
        if filename.ends_with(".safetensors") {
            Some(Self::SafeTensors)
        } else if filename.ends_with(".gguf") {
            Some(Self::Gguf)
        } else if filename.ends_with(".bin") {
            Some(Self::PyTorchBin)
        } else {
            None
        }
    }

    /// Whether loading this format executes no code
    #[must_use]
    pub fn is_safe(&self) -> bool {
        !matches!(self, Self::PyTorchBin)
    }
}

/// Downloaded model artifact
#[derive(Debug)]
pub struct ModelArtifact {
    /// Local directory holding the downloaded files
    pub path: PathBuf,
    /// Detected weight format
    pub format: WeightFormat,
}

/// Options for a fetch
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Git revision: branch, tag, or commit
    pub revision: String,
    /// Files to download (defaults to weights + config when empty)
    pub files: Vec<String>,
    /// Allow pickle-format weight files
    pub allow_pickle: bool,
    /// Cache directory override
    pub cache_dir: Option<PathBuf>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            revision: "main".into(),
            files: vec![],
            allow_pickle: false,
            cache_dir: None,
        }
    }
}

impl FetchOptions {
    /// Create default options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive options from model arguments (revision + cache dir)
    #[must_use]
    pub fn for_model_args(args: &ModelArguments) -> Self {
        Self {
            revision: args.model_revision.clone(),
            cache_dir: args.cache_dir.clone(),
            ..Self::default()
        }
    }

    /// Set the revision
    #[must_use]
    pub fn revision(mut self, rev: impl Into<String>) -> Self {
        self.revision = rev.into();
        self
    }

    /// Set the files to download
    #[must_use]
    pub fn files(mut self, files: &[&str]) -> Self {
        self.files = files.iter().map(|s| (*s).to_string()).collect();
        self
    }

    /// Allow pickle-format weights
    #[must_use]
    pub fn allow_pickle(mut self, allow: bool) -> Self {
        self.allow_pickle = allow;
        self
    }

    /// The file set this fetch will request
    fn requested_files(&self, use_fast_tokenizer: bool) -> Vec<String> {
        if !self.files.is_empty() {
            return self.files.clone();
        }
        let tokenizer_file = if use_fast_tokenizer {
            "tokenizer.json"
        } else {
            "tokenizer.model"
        };
        vec![
            "model.safetensors".to_string(),
            "config.json".to_string(),
            tokenizer_file.to_string(),
        ]
    }
}

/// Hub model fetcher
pub struct HubFetcher {
    token: Option<String>,
    cache_dir: PathBuf,
    use_fast_tokenizer: bool,
}

impl HubFetcher {
    /// Create an anonymous fetcher with the default cache directory
    #[must_use]
    pub fn new() -> Self {
        Self {
            token: None,
            cache_dir: Self::default_cache_dir(),
            use_fast_tokenizer: true,
        }
    }

    /// Create a fetcher with an explicit token
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..Self::new()
        }
    }

    /// Derive a fetcher from model arguments
    ///
    /// Resolves the stored token only when `use_auth_token` is set, and
    /// honors the configured cache directory.
    #[must_use]
    pub fn for_model_args(args: &ModelArguments) -> Self {
        let token = if args.use_auth_token {
            Self::resolve_token()
        } else {
            None
        };
        Self {
            token,
            cache_dir: args
                .cache_dir
                .clone()
                .unwrap_or_else(Self::default_cache_dir),
            use_fast_tokenizer: args.use_fast_tokenizer,
        }
    }

    /// Resolve the stored hub token
    ///
    /// Priority: `HF_TOKEN` environment variable, then the token file under
    /// the home directory.
    #[must_use]
    pub fn resolve_token() -> Option<String> {
        if let Ok(token) = std::env::var("HF_TOKEN") {
            if !token.is_empty() {
                return Some(token);
            }
        }

        if let Some(home) = dirs::home_dir() {
            let token_path = home.join(".huggingface").join("token");
            if let Ok(token) = std::fs::read_to_string(token_path) {
                let token = token.trim().to_string();
                if !token.is_empty() {
                    return Some(token);
                }
            }
        }

        None
    }

    fn default_cache_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join("charlar")
            .join("hub")
    }

    /// Whether the fetcher will authenticate
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Parse and validate an "org/name" repository id
    pub fn parse_repo_id(repo_id: &str) -> Result<(&str, &str)> {
        let parts: Vec<&str> = repo_id.split('/').collect();
        if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
            return Err(FetchError::InvalidRepoId {
                repo_id: repo_id.to_string(),
            });
        }
        Ok((parts[0], parts[1]))
    }

    /// Download artifact files for a repository at the configured revision
    ///
    /// # Errors
    ///
    /// Fails on an invalid repo id, a refused pickle file, a missing remote
    /// file, or a transport error.
    pub fn download(&self, repo_id: &str, options: FetchOptions) -> Result<ModelArtifact> {
        Self::parse_repo_id(repo_id)?;

        let files = options.requested_files(self.use_fast_tokenizer);

        for file in &files {
            if let Some(format) = WeightFormat::from_filename(file) {
                if !format.is_safe() && !options.allow_pickle {
                    return Err(FetchError::PickleSecurityRisk);
                }
            }
        }

        let cache_path = options
            .cache_dir
            .clone()
            .unwrap_or_else(|| self.cache_dir.clone())
            .join(repo_id.replace('/', "--"))
            .join(&options.revision);
        std::fs::create_dir_all(&cache_path)?;

        let format = files
            .iter()
            .find_map(|f| WeightFormat::from_filename(f))
            .unwrap_or(WeightFormat::SafeTensors);

        let mut builder = hf_hub::api::sync::ApiBuilder::new().with_cache_dir(cache_path.clone());
        if let Some(token) = &self.token {
            builder = builder.with_token(Some(token.clone()));
        }
        let api = builder.build().map_err(|e| FetchError::Api(e.to_string()))?;

        let repo = api.repo(hf_hub::Repo::with_revision(
            repo_id.to_string(),
            hf_hub::RepoType::Model,
            options.revision.clone(),
        ));

        for file in &files {
            match repo.get(file) {
                Ok(path) => {
                    let dest = cache_path.join(file);
                    if path != dest && path.exists() && !dest.exists() {
                        if let Some(parent) = dest.parent() {
                            std::fs::create_dir_all(parent)?;
                        }
                        std::fs::copy(&path, &dest)?;
                    }
                }
                Err(e) if e.to_string().contains("404") => {
                    return Err(FetchError::FileNotFound {
                        repo: repo_id.to_string(),
                        file: file.clone(),
                    });
                }
                Err(e) => return Err(FetchError::Api(e.to_string())),
            }
        }

        Ok(ModelArtifact {
            path: cache_path,
            format,
        })
    }
}

impl Default for HubFetcher {
    fn default() -> Self {
        Self::new()
    }
}
