//! Shared application state for the web server.

use std::sync::Arc;

use tracing::info;

use polypharm_chem::FingerprintConfig;
use polypharm_embed::ChemBertaEncoder;
use polypharm_pipeline::{DrugFeaturizer, InteractionPredictor, InteractionScorer, SmilesEncoder};
use polypharm_store::{DrugCatalog, ReportStore, StructureTable};

use crate::config::AppConfig;

/// Shared state injected into every Axum handler.
pub struct AppState {
    pub predictor: Arc<InteractionPredictor>,
    pub config: AppConfig,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Downloads the encoder checkpoint, loads the tables and the model
    /// and wires the predictor.
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let encoder = ChemBertaEncoder::new(config.encoder.to_encoder_config()).await?;
        let predictor = Self::build_predictor(&config, Arc::new(encoder)).await?;
        Ok(Self {
            predictor: Arc::new(predictor),
            config,
        })
    }

    /// Wires a predictor around an already constructed encoder, loading
    /// tables and the model off the async runtime.
    pub async fn build_predictor(
        config: &AppConfig,
        encoder: Arc<dyn SmilesEncoder>,
    ) -> anyhow::Result<InteractionPredictor> {
        let tables = config.tables.clone();
        let model_path = config.model.path.clone();
        let threshold = config.model.threshold;
        let fingerprint = FingerprintConfig {
            radius: config.model.fingerprint_radius,
            n_bits: config.model.fingerprint_bits,
        };

        let (catalog, structures, reports, scorer) =
            tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
                let catalog = DrugCatalog::from_csv_file(&tables.drug_info)?;
                let structures = StructureTable::from_csv_file(&tables.structures)?;
                let reports = ReportStore::from_csv_file(&tables.reports)?;
                let scorer = InteractionScorer::from_file(&model_path, threshold)?;
                Ok((catalog, structures, reports, scorer))
            })
            .await??;

        let featurizer = DrugFeaturizer::new(fingerprint, encoder);
        let predictor = InteractionPredictor::new(
            Arc::new(catalog),
            Arc::new(structures),
            Arc::new(reports),
            featurizer,
            scorer,
        )?;
        info!(
            drugs = predictor.catalog().len(),
            structures = predictor.structure_count(),
            reports = predictor.report_count(),
            schema = %predictor.schema().version(),
            "predictor ready"
        );
        Ok(predictor)
    }
}
