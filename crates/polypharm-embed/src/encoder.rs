//! ChemBERTa encoder using Candle.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config, HiddenAct, PositionEmbeddingType};
use hf_hub::api::sync::Api;
use lru::LruCache;
use tokenizers::models::bpe::BPE;
use tokenizers::models::wordpiece::WordPieceBuilder;
use tokenizers::pre_tokenizers::byte_level::ByteLevel;
use tokenizers::processors::roberta::RobertaProcessing;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::pooling::l2_normalize;
use crate::{EmbedError, EncoderConfig, Result};

/// Frozen ChemBERTa encoder for SMILES strings.
///
/// Downloads the checkpoint from the Hugging Face Hub on construction,
/// then serves synchronous batched inference. The checkpoint is a RoBERTa
/// architecture; Candle's BERT module runs it by loading under the
/// matching weight prefix.
pub struct ChemBertaEncoder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    config: EncoderConfig,
    hidden_size: usize,
    pad_token_id: u32,
    cache: Option<Arc<Mutex<LruCache<String, Vec<f32>>>>>,
}

/// Everything `load_config` pulls out of `config.json`.
struct ModelSpec {
    config: Config,
    hidden_size: usize,
    pad_token_id: u32,
}

impl ChemBertaEncoder {
    /// Downloads (or reuses the local Hub cache for) the configured model
    /// and loads it onto the best available device.
    pub async fn new(config: EncoderConfig) -> Result<Self> {
        let start = Instant::now();
        info!("Loading chemical language model: {}", config.model_id);

        let device = Self::select_device(&config)?;
        debug!("Using device: {:?}", device);

        // Hub downloads use the sync API; run them off the async runtime.
        let model_id = config.model_id.clone();
        let (spec, tokenizer, weights_path) = tokio::task::spawn_blocking(move || {
            use hf_hub::{Repo, RepoType};

            let api = Api::new().map_err(|e| EmbedError::Download(format!("API init: {}", e)))?;
            let repo = Repo::new(model_id.clone(), RepoType::Model);
            let api_repo = api.repo(repo);

            info!("Downloading config.json...");
            let config_path = api_repo
                .get("config.json")
                .map_err(|e| EmbedError::Download(format!("config.json: {}", e)))?;
            let spec = Self::load_config(&config_path)?;

            info!("Downloading tokenizer...");
            // Prefer tokenizer.json; RoBERTa-era checkpoints like ChemBERTa
            // ship vocab.json + merges.txt, older BERT exports only vocab.txt.
            let tokenizer = if let Ok(tokenizer_path) = api_repo.get("tokenizer.json") {
                info!("Found tokenizer.json");
                Tokenizer::from_file(&tokenizer_path)
                    .map_err(|e| EmbedError::Tokenizer(e.to_string()))?
            } else if let Ok(vocab_path) = api_repo.get("vocab.json") {
                info!("tokenizer.json not found, building BPE from vocab.json + merges.txt");
                let merges_path = api_repo
                    .get("merges.txt")
                    .map_err(|e| EmbedError::Download(format!("merges.txt: {}", e)))?;

                let vocab = vocab_path
                    .to_str()
                    .ok_or_else(|| EmbedError::Tokenizer("vocab path is not UTF-8".to_string()))?;
                let merges = merges_path
                    .to_str()
                    .ok_or_else(|| EmbedError::Tokenizer("merges path is not UTF-8".to_string()))?;
                let bpe = BPE::from_file(vocab, merges)
                    .unk_token("<unk>".to_string())
                    .build()
                    .map_err(|e| EmbedError::Tokenizer(format!("BPE build: {}", e)))?;

                let mut tokenizer = Tokenizer::new(bpe);
                // No prefix space: SMILES tokens carry no word boundaries.
                tokenizer.with_pre_tokenizer(ByteLevel::new(false, true, true));
                tokenizer.with_post_processor(RobertaProcessing::new(
                    ("</s>".to_string(), 2),
                    ("<s>".to_string(), 0),
                ));
                tokenizer
            } else {
                info!("Building WordPiece tokenizer from vocab.txt");
                let vocab_path = api_repo
                    .get("vocab.txt")
                    .map_err(|e| EmbedError::Download(format!("vocab.txt: {}", e)))?;

                let vocab_content = std::fs::read_to_string(&vocab_path)?;
                let vocab: std::collections::HashMap<String, u32> = vocab_content
                    .lines()
                    .enumerate()
                    .map(|(i, line)| (line.to_string(), i as u32))
                    .collect();
                info!("Loaded vocab with {} tokens", vocab.len());

                let wordpiece = WordPieceBuilder::new()
                    .vocab(vocab)
                    .continuing_subword_prefix("##".to_string())
                    .max_input_chars_per_word(100)
                    .unk_token("[UNK]".to_string())
                    .build()
                    .map_err(|e| EmbedError::Tokenizer(format!("WordPiece build: {}", e)))?;
                Tokenizer::new(wordpiece)
            };

            info!("Downloading model weights...");
            let weights_path = api_repo
                .get("model.safetensors")
                .or_else(|_| api_repo.get("pytorch_model.bin"))
                .map_err(|e| EmbedError::Download(format!("model weights: {}", e)))?;

            Ok::<_, EmbedError>((spec, tokenizer, weights_path))
        })
        .await
        .map_err(|e| EmbedError::Download(e.to_string()))??;

        info!("Model files downloaded, loading into memory...");

        let vb = if weights_path
            .extension()
            .map(|e| e == "safetensors")
            .unwrap_or(false)
        {
            unsafe { VarBuilder::from_mmaped_safetensors(&[&weights_path], DType::F32, &device)? }
        } else {
            VarBuilder::from_pth(&weights_path, DType::F32, &device)?
        };

        // RoBERTa checkpoints prefix weights with "roberta."; plain BERT
        // exports use "bert." or no prefix at all.
        let model = BertModel::load(vb.pp("roberta"), &spec.config)
            .or_else(|_| BertModel::load(vb.pp("bert"), &spec.config))
            .or_else(|_| BertModel::load(vb.clone(), &spec.config))
            .map_err(|e| EmbedError::ModelLoad(e.to_string()))?;
        info!("Model loaded in {:.2}s", start.elapsed().as_secs_f32());

        let cache = NonZeroUsize::new(config.cache_size)
            .map(|capacity| Arc::new(Mutex::new(LruCache::new(capacity))));

        Ok(Self {
            model,
            tokenizer,
            device,
            config,
            hidden_size: spec.hidden_size,
            pad_token_id: spec.pad_token_id,
            cache,
        })
    }

    /// Select the best available device.
    fn select_device(config: &EncoderConfig) -> Result<Device> {
        if !config.use_gpu {
            return Ok(Device::Cpu);
        }

        #[cfg(feature = "cuda")]
        {
            match Device::new_cuda(0) {
                Ok(device) => {
                    info!("CUDA device available");
                    return Ok(device);
                }
                Err(e) => {
                    debug!("CUDA not available: {}, falling back to CPU", e);
                }
            }
        }

        #[cfg(feature = "metal")]
        {
            match Device::new_metal(0) {
                Ok(device) => {
                    info!("Metal device available");
                    return Ok(device);
                }
                Err(e) => {
                    debug!("Metal not available: {}, falling back to CPU", e);
                }
            }
        }

        Ok(Device::Cpu)
    }

    /// Build Candle's BERT config from the checkpoint's config.json.
    /// Candle wants concrete fields, so missing values fall back to
    /// RoBERTa-base conventions.
    fn load_config(path: &std::path::Path) -> Result<ModelSpec> {
        let content = std::fs::read_to_string(path)?;
        let json: serde_json::Value = serde_json::from_str(&content)?;

        let hidden_act = match json.get("hidden_act").and_then(|v| v.as_str()) {
            Some("relu") => HiddenAct::Relu,
            Some("gelu_new") | Some("gelu_approximate") => HiddenAct::GeluApproximate,
            _ => HiddenAct::Gelu,
        };
        let hidden_size = json
            .get("hidden_size")
            .and_then(|v| v.as_u64())
            .unwrap_or(768) as usize;
        let pad_token_id = json
            .get("pad_token_id")
            .and_then(|v| v.as_u64())
            .unwrap_or(1) as u32;

        let config = Config {
            vocab_size: json
                .get("vocab_size")
                .and_then(|v| v.as_u64())
                .unwrap_or(52_000) as usize,
            hidden_size,
            num_hidden_layers: json
                .get("num_hidden_layers")
                .and_then(|v| v.as_u64())
                .unwrap_or(12) as usize,
            num_attention_heads: json
                .get("num_attention_heads")
                .and_then(|v| v.as_u64())
                .unwrap_or(12) as usize,
            intermediate_size: json
                .get("intermediate_size")
                .and_then(|v| v.as_u64())
                .unwrap_or(3072) as usize,
            hidden_act,
            hidden_dropout_prob: json
                .get("hidden_dropout_prob")
                .and_then(|v| v.as_f64())
                .unwrap_or(0.1),
            max_position_embeddings: json
                .get("max_position_embeddings")
                .and_then(|v| v.as_u64())
                .unwrap_or(515) as usize,
            type_vocab_size: json
                .get("type_vocab_size")
                .and_then(|v| v.as_u64())
                .unwrap_or(1) as usize,
            initializer_range: json
                .get("initializer_range")
                .and_then(|v| v.as_f64())
                .unwrap_or(0.02),
            layer_norm_eps: json
                .get("layer_norm_eps")
                .and_then(|v| v.as_f64())
                .unwrap_or(1e-12),
            pad_token_id: pad_token_id as usize,
            position_embedding_type: PositionEmbeddingType::Absolute,
            use_cache: true,
            classifier_dropout: None,
            model_type: json
                .get("model_type")
                .and_then(|v| v.as_str())
                .map(str::to_string),
        };

        Ok(ModelSpec {
            config,
            hidden_size,
            pad_token_id,
        })
    }

    /// Embed a list of SMILES strings, in input order.
    ///
    /// Cached entries are served without touching the model; the rest run
    /// through batched inference.
    pub fn encode_all(&self, smiles: &[String]) -> Result<Vec<Vec<f32>>> {
        if smiles.is_empty() {
            return Ok(Vec::new());
        }

        let start = Instant::now();
        let mut all_embeddings = Vec::with_capacity(smiles.len());

        let mut uncached_indices = Vec::new();
        let mut uncached_inputs = Vec::new();

        if let Some(cache) = &self.cache {
            let mut cache_guard = cache.lock().unwrap();
            for (i, input) in smiles.iter().enumerate() {
                if let Some(cached) = cache_guard.get(input) {
                    all_embeddings.push((i, cached.clone()));
                } else {
                    uncached_indices.push(i);
                    uncached_inputs.push(input.clone());
                }
            }
        } else {
            uncached_indices = (0..smiles.len()).collect();
            uncached_inputs = smiles.to_vec();
        }

        for batch_start in (0..uncached_inputs.len()).step_by(self.config.batch_size) {
            let batch_end = (batch_start + self.config.batch_size).min(uncached_inputs.len());
            let batch = &uncached_inputs[batch_start..batch_end];

            let batch_embeddings = self.forward_batch(batch)?;

            if let Some(cache) = &self.cache {
                let mut cache_guard = cache.lock().unwrap();
                for (input, embedding) in batch.iter().zip(batch_embeddings.iter()) {
                    cache_guard.put(input.clone(), embedding.clone());
                }
            }

            for (j, embedding) in batch_embeddings.into_iter().enumerate() {
                all_embeddings.push((uncached_indices[batch_start + j], embedding));
            }
        }

        all_embeddings.sort_by_key(|(i, _)| *i);
        let result: Vec<Vec<f32>> = all_embeddings.into_iter().map(|(_, e)| e).collect();

        debug!(
            "Embedded {} structures in {:.2}ms",
            smiles.len(),
            start.elapsed().as_secs_f32() * 1000.0,
        );

        Ok(result)
    }

    /// Embed a single SMILES string.
    pub fn encode(&self, smiles: &str) -> Result<Vec<f32>> {
        let embeddings = self.encode_all(std::slice::from_ref(&smiles.to_string()))?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbedError::InvalidInput("no embedding produced".to_string()))
    }

    /// Run one batch through tokenizer, model and pooling.
    fn forward_batch(&self, smiles: &[String]) -> Result<Vec<Vec<f32>>> {
        let refs: Vec<&str> = smiles.iter().map(|s| s.as_str()).collect();
        let encodings = self
            .tokenizer
            .encode_batch(refs, true)
            .map_err(|e| EmbedError::Tokenizer(e.to_string()))?;

        let mut input_ids_vec = Vec::with_capacity(smiles.len());
        let mut attention_mask_vec = Vec::with_capacity(smiles.len());
        let mut token_type_ids_vec = Vec::with_capacity(smiles.len());

        for encoding in &encodings {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let type_ids = encoding.get_type_ids();

            let max_len = self.config.max_length.min(512);
            let len = ids.len().min(max_len);

            input_ids_vec.push(ids[..len].to_vec());
            attention_mask_vec.push(mask[..len].to_vec());
            token_type_ids_vec.push(type_ids[..len].to_vec());
        }

        let max_len = input_ids_vec.iter().map(|v| v.len()).max().unwrap_or(0);

        // Pad ids with the model's pad token; mask zeros keep those
        // positions out of attention and pooling.
        for ((ids, mask), type_ids) in input_ids_vec
            .iter_mut()
            .zip(attention_mask_vec.iter_mut())
            .zip(token_type_ids_vec.iter_mut())
        {
            let pad_len = max_len - ids.len();
            ids.extend(std::iter::repeat_n(self.pad_token_id, pad_len));
            mask.extend(std::iter::repeat_n(0, pad_len));
            type_ids.extend(std::iter::repeat_n(0, pad_len));
        }

        let batch_size = smiles.len();
        let input_ids = Tensor::new(input_ids_vec, &self.device)?.reshape((batch_size, max_len))?;
        let attention_mask = Tensor::new(attention_mask_vec, &self.device)?
            .reshape((batch_size, max_len))?
            .to_dtype(DType::F32)?;
        let token_type_ids =
            Tensor::new(token_type_ids_vec, &self.device)?.reshape((batch_size, max_len))?;

        let hidden = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

        let pooled = self.config.pooling.apply(&hidden, &attention_mask)?;

        let output = if self.config.normalize {
            l2_normalize(&pooled)?
        } else {
            pooled
        };

        Ok(output.to_vec2::<f32>()?)
    }

    /// Embedding width, read from the checkpoint config (768 for
    /// ChemBERTa-base).
    pub fn dimension(&self) -> usize {
        self.hidden_size
    }

    /// Get the model name.
    pub fn model_name(&self) -> &str {
        &self.config.model_id
    }

    /// Check if GPU is being used.
    pub fn is_gpu(&self) -> bool {
        matches!(self.device, Device::Cuda(_) | Device::Metal(_))
    }

    /// Clear the embedding cache.
    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.lock().unwrap().clear();
        }
    }
}
