//! Reference backend over safetensors weight files
//!
//! Loads model metadata and a tokenizer handle at construction and delegates
//! text generation to the external [`InferenceEngine`]. The model handle
//! carries what the serving layer needs to know about the artifact (tensor
//! names, parameter count, layer count); the weights themselves are the
//! engine's business.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use safetensors::SafeTensors;

use super::template::ConvTemplate;
use super::{ChatModel, GenerateParams, InferenceEngine, ResponseStream};
use crate::config::ModelArguments;
use crate::error::{Error, Result};
use crate::hub::{FetchOptions, HubFetcher};

/// Metadata handle for a loaded model artifact
#[derive(Debug, Clone)]
pub struct ModelHandle {
    /// Path the weights were read from
    pub path: PathBuf,
    /// Tensor names in the artifact
    pub tensor_names: Vec<String>,
    /// Total parameter count
    pub param_count: u64,
    /// Layer count detected from tensor naming
    pub num_layers: usize,
}

impl ModelHandle {
    /// Read metadata from a safetensors file
    fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        let tensors = SafeTensors::deserialize(&data)
            .map_err(|e| Error::ModelLoad(format!("{}: {e}", path.display())))?;

        let tensor_names: Vec<String> = tensors.names().iter().map(|s| (*s).to_string()).collect();

        let mut param_count: u64 = 0;
        for name in &tensor_names {
            if let Ok(view) = tensors.tensor(name) {
                param_count += view.shape().iter().map(|&d| d as u64).product::<u64>();
            }
        }

        let num_layers = detect_layer_count(&tensor_names);

        Ok(Self {
            path: path.to_path_buf(),
            tensor_names,
            param_count,
            num_layers,
        })
    }
}

/// Tokenizer handle used for chunking and length accounting
///
/// Splits text at whitespace boundaries so that re-concatenating the pieces
/// reproduces the input byte-for-byte.
#[derive(Debug, Clone)]
pub struct TokenizerHandle {
    /// Whether the fast tokenizer implementation was requested
    pub fast: bool,
}

impl TokenizerHandle {
    /// Build the handle from model arguments
    pub fn new(args: &ModelArguments) -> Self {
        Self {
            fast: args.use_fast_tokenizer,
        }
    }

    /// Split text into concat-preserving chunks (one per token run)
    pub fn chunk_text(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut in_whitespace = false;

        for c in text.chars() {
            if c.is_whitespace() {
                in_whitespace = true;
                current.push(c);
            } else {
                if in_whitespace && !current.is_empty() {
                    chunks.push(std::mem::take(&mut current));
                }
                in_whitespace = false;
                current.push(c);
            }
        }
        if !current.is_empty() {
            chunks.push(current);
        }
        chunks
    }

    /// Number of tokens in a text
    pub fn count_tokens(&self, text: &str) -> usize {
        self.chunk_text(text).len()
    }

    /// Truncate text to at most `max_tokens` tokens
    pub fn truncate(&self, text: &str, max_tokens: usize) -> String {
        self.chunk_text(text)
            .into_iter()
            .take(max_tokens)
            .collect()
    }
}

/// Chat backend for safetensors model artifacts
pub struct SafeTensorsChat {
    model: ModelHandle,
    tokenizer: TokenizerHandle,
    engine: Arc<dyn InferenceEngine>,
}

impl SafeTensorsChat {
    /// Initialize the backend: resolve the artifact, load the model and
    /// tokenizer handles, and bind the inference engine
    ///
    /// Runs exactly once per instance. Any failure here is fatal; no
    /// partially initialized backend is ever returned.
    ///
    /// # Errors
    ///
    /// Returns a validation error for empty model arguments, a fetch error
    /// when a hub download fails, and `ModelLoad` when the artifact is
    /// missing or unparseable.
    pub fn load(args: &ModelArguments, engine: Arc<dyn InferenceEngine>) -> Result<Self> {
        args.validate()?;

        let weights_path = resolve_weights(args)?;
        let model = ModelHandle::load(&weights_path)?;
        let tokenizer = TokenizerHandle::new(args);

        Ok(Self {
            model,
            tokenizer,
            engine,
        })
    }

    /// Metadata for the loaded artifact
    pub fn model(&self) -> &ModelHandle {
        &self.model
    }

    /// Tokenizer handle fixed at construction
    pub fn tokenizer(&self) -> &TokenizerHandle {
        &self.tokenizer
    }
}

impl ChatModel for SafeTensorsChat {
    fn predict(&self, params: &GenerateParams) -> Result<String> {
        let template = self.default_template(&self.model.path.display().to_string());
        let rendered = template.render(&params.prompt);
        let output = self.engine.generate(&rendered, params)?;
        Ok(self.tokenizer.truncate(&output, params.max_new_tokens))
    }

    fn predict_stream(&self, params: &GenerateParams) -> Result<ResponseStream> {
        let full = self.predict(params)?;
        Ok(ResponseStream::new(self.tokenizer.chunk_text(&full)))
    }

    fn matches(&self, model_path: &str) -> bool {
        claims_path(model_path)
    }

    fn default_template(&self, _model_path: &str) -> ConvTemplate {
        ConvTemplate::one_shot()
    }
}

/// Whether this backend family claims a model path
///
/// Claims local safetensors files, directories containing
/// `model.safetensors`, and hub repository identifiers.
pub(crate) fn claims_path(model_path: &str) -> bool {
    if model_path.ends_with(".safetensors") {
        return true;
    }
    let path = Path::new(model_path);
    if path.is_dir() {
        return path.join("model.safetensors").is_file();
    }
    HubFetcher::parse_repo_id(model_path).is_ok()
}

/// Resolve the weights file for the configured model
fn resolve_weights(args: &ModelArguments) -> Result<PathBuf> {
    let local = Path::new(&args.model_name_or_path);
    if local.is_file() {
        return Ok(local.to_path_buf());
    }
    if local.is_dir() {
        let candidate = local.join("model.safetensors");
        if candidate.is_file() {
            return Ok(candidate);
        }
        return Err(Error::ModelLoad(format!(
            "no model.safetensors under {}",
            local.display()
        )));
    }

    // Not on disk: treat as a hub identifier
    let fetcher = HubFetcher::for_model_args(args);
    let artifact = fetcher.download(
        &args.model_name_or_path,
        FetchOptions::for_model_args(args).files(&["model.safetensors"]),
    )?;
    Ok(artifact.path.join("model.safetensors"))
}

/// Detect layer count from tensor naming conventions
///
/// Recognizes `layers.N.`, `layer.N.`, and `h.N.` patterns.
fn detect_layer_count(names: &[String]) -> usize {
    use std::collections::HashSet;

    let mut indices: HashSet<usize> = HashSet::new();
    for name in names {
        if let Some(idx) = extract_layer_index(name) {
            indices.insert(idx);
        }
    }
    indices.len()
}

fn extract_layer_index(name: &str) -> Option<usize> {
    for pattern in [".layers.", ".layer.", ".h."] {
        if let Some(pos) = name.find(pattern) {
            let rest = &name[pos + pattern.len()..];
            let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
            if !digits.is_empty() {
                return digits.parse().ok();
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use safetensors::tensor::{Dtype, TensorView};
    use std::collections::HashMap;
    use tempfile::TempDir;

    /// Engine returning a fixed completion regardless of the prompt
    struct FixedEngine(&'static str);

    impl InferenceEngine for FixedEngine {
        fn generate(&self, _prompt: &str, _params: &GenerateParams) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    /// Engine that fails every call
    struct FailingEngine;

    impl InferenceEngine for FailingEngine {
        fn generate(&self, _prompt: &str, _params: &GenerateParams) -> Result<String> {
            Err(Error::Inference("device lost".to_string()))
        }
    }

    fn write_model(dir: &Path, tensors: &[(&str, Vec<usize>)]) {
        let payloads: Vec<(String, Vec<f32>, Vec<usize>)> = tensors
            .iter()
            .map(|(name, shape)| {
                let numel = shape.iter().product();
                ((*name).to_string(), vec![0.0f32; numel], shape.clone())
            })
            .collect();

        let views: Vec<(&str, TensorView<'_>)> = payloads
            .iter()
            .map(|(name, data, shape)| {
                let view =
                    TensorView::new(Dtype::F32, shape.clone(), bytemuck::cast_slice(data)).unwrap();
                (name.as_str(), view)
            })
            .collect();

        let bytes = safetensors::serialize(views, &None::<HashMap<String, String>>).unwrap();
        std::fs::write(dir.join("model.safetensors"), bytes).unwrap();
    }

    fn backend_in(dir: &TempDir) -> SafeTensorsChat {
        write_model(
            dir.path(),
            &[
                ("model.layers.0.q.weight", vec![8, 8]),
                ("model.layers.1.q.weight", vec![8, 8]),
            ],
        );
        let args = ModelArguments::new(dir.path().display().to_string());
        SafeTensorsChat::load(&args, Arc::new(FixedEngine("LoRA adapts low-rank matrices.")))
            .unwrap()
    }

    #[test]
    fn test_load_reads_metadata() {
        let dir = TempDir::new().unwrap();
        let backend = backend_in(&dir);

        assert_eq!(backend.model().param_count, 128);
        assert_eq!(backend.model().num_layers, 2);
        assert_eq!(backend.model().tensor_names.len(), 2);
        assert!(backend.tokenizer().fast);
    }

    #[test]
    fn test_load_missing_artifact_is_fatal() {
        let dir = TempDir::new().unwrap();
        let args = ModelArguments::new(dir.path().display().to_string());
        let result = SafeTensorsChat::load(&args, Arc::new(FixedEngine("")));
        assert!(matches!(result, Err(Error::ModelLoad(_))));
    }

    #[test]
    fn test_load_empty_args_is_fatal() {
        let args = ModelArguments::default();
        let result = SafeTensorsChat::load(&args, Arc::new(FixedEngine("")));
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_load_corrupt_artifact_is_fatal() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("model.safetensors"), b"not safetensors").unwrap();
        let args = ModelArguments::new(dir.path().display().to_string());
        let result = SafeTensorsChat::load(&args, Arc::new(FixedEngine("")));
        assert!(matches!(result, Err(Error::ModelLoad(_))));
    }

    #[test]
    fn test_predict_and_stream_agree() {
        let dir = TempDir::new().unwrap();
        let backend = backend_in(&dir);
        let params = GenerateParams::new("What is LoRA?");

        let full = backend.predict(&params).unwrap();
        let streamed = backend.predict_stream(&params).unwrap().collect_text();
        assert_eq!(full, streamed);
        assert_eq!(full, "LoRA adapts low-rank matrices.");
    }

    #[test]
    fn test_predict_respects_token_cap() {
        let dir = TempDir::new().unwrap();
        let backend = backend_in(&dir);
        let params = GenerateParams::new("What is LoRA?").max_new_tokens(2);

        let out = backend.predict(&params).unwrap();
        assert_eq!(backend.tokenizer().count_tokens(&out), 2);
    }

    #[test]
    fn test_engine_failure_surfaces() {
        let dir = TempDir::new().unwrap();
        write_model(dir.path(), &[("w", vec![2, 2])]);
        let args = ModelArguments::new(dir.path().display().to_string());
        let backend = SafeTensorsChat::load(&args, Arc::new(FailingEngine)).unwrap();

        let err = backend.predict(&GenerateParams::new("hi")).unwrap_err();
        assert!(matches!(err, Error::Inference(_)));
    }

    #[test]
    fn test_matches_claims_safetensors_and_repo_ids() {
        let dir = TempDir::new().unwrap();
        let backend = backend_in(&dir);

        assert!(backend.matches("weights/model.safetensors"));
        assert!(backend.matches("meta-llama/Llama-2-7b-hf"));
        assert!(backend.matches(&dir.path().display().to_string()));
        assert!(!backend.matches("/nonexistent/dir/without/weights"));
        assert!(!backend.matches("model.gguf"));
    }

    #[test]
    fn test_chunk_text_preserves_concat() {
        let tok = TokenizerHandle { fast: true };
        for text in ["", "one", "a b  c\nd ", "  leading", "trailing  "] {
            let chunks = tok.chunk_text(text);
            assert_eq!(chunks.concat(), text);
        }
    }

    #[test]
    fn test_token_counting() {
        let tok = TokenizerHandle { fast: true };
        assert_eq!(tok.count_tokens(""), 0);
        assert_eq!(tok.count_tokens("one"), 1);
        assert_eq!(tok.count_tokens("one two three"), 3);
    }

    #[test]
    fn test_layer_detection_patterns() {
        let names = vec![
            "model.layers.0.q.weight".to_string(),
            "model.layers.1.q.weight".to_string(),
            "model.layers.10.q.weight".to_string(),
            "model.norm.weight".to_string(),
        ];
        assert_eq!(detect_layer_count(&names), 3);

        let gpt_names = vec!["transformer.h.0.attn.weight".to_string()];
        assert_eq!(detect_layer_count(&gpt_names), 1);

        assert_eq!(detect_layer_count(&["embeddings.weight".to_string()]), 0);
    }
}
