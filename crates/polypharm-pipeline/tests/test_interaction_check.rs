//! End-to-end interaction check over file-backed tables.
//!
//! Everything runs offline: tables and the model are written to a temp
//! directory and the embedding backend is the deterministic stub.
//! ```bash
//! cargo test --package polypharm-pipeline --test test_interaction_check
//! ```

use std::fs;
use std::path::Path;
use std::sync::Arc;

use polypharm_chem::FingerprintConfig;
use polypharm_pipeline::{
    DrugFeaturizer, InteractionPredictor, InteractionScorer, MockSmilesEncoder, PredictError,
};
use polypharm_store::{DrugCatalog, DrugId, ReportStore, StructureTable};

const CATALOG_CSV: &str = "\
name_x,drugbank-id
Aspirin,DB00945
Warfarin,DB00682
Metformin,DB00331
";

const STRUCTURES_CSV: &str = "\
drugbank_id,smiles
DB00945,CC(=O)Oc1ccccc1C(=O)O
DB00682,CC(=O)CC(c1ccccc1)c1c(O)c2ccccc2oc1=O
DB00331,CN(C)C(=N)N=C(N)N
";

const REPORTS_CSV: &str = "\
DrugBankID,report_id,time,hyperedge_label
\"['DB00945', 'DB00682']\",R1,2014-07-01,1
\"['DB00945', 'DB00682', 'DB00331']\",R2,2015-02-01,1
\"['DB00331']\",R3,2016-05-01,0
";

// 72 inputs: 64 fingerprint bits and the 8-wide stub embedding.
const CONSTANT_MODEL: &str = "\
tree
num_class=1
max_feature_idx=71
objective=binary sigmoid:1

Tree=0
num_leaves=1
num_cat=0
split_feature=
threshold=
decision_type=
left_child=
right_child=
leaf_value=2.0

end of trees
";

const SPLIT_MODEL: &str = "\
tree
num_class=1
max_feature_idx=71
objective=binary sigmoid:1

Tree=0
num_leaves=2
num_cat=0
split_feature=64
threshold=0.0
decision_type=2
left_child=-1
right_child=-2
leaf_value=-1.0 1.5

end of trees
";

fn write_fixtures(dir: &Path, model: &str) {
    fs::write(dir.join("drug_info.csv"), CATALOG_CSV).unwrap();
    fs::write(dir.join("DrugBankID2SMILES.csv"), STRUCTURES_CSV).unwrap();
    fs::write(dir.join("combined.csv"), REPORTS_CSV).unwrap();
    fs::write(dir.join("model.txt"), model).unwrap();
}

fn load_predictor(dir: &Path, threshold: f64) -> InteractionPredictor {
    let catalog = Arc::new(DrugCatalog::from_csv_file(dir.join("drug_info.csv")).unwrap());
    let structures =
        Arc::new(StructureTable::from_csv_file(dir.join("DrugBankID2SMILES.csv")).unwrap());
    let reports = Arc::new(ReportStore::from_csv_file(dir.join("combined.csv")).unwrap());
    let featurizer = DrugFeaturizer::new(
        FingerprintConfig {
            radius: 2,
            n_bits: 64,
        },
        Arc::new(MockSmilesEncoder::new(8)),
    );
    let scorer = InteractionScorer::from_file(dir.join("model.txt"), threshold).unwrap();
    InteractionPredictor::new(catalog, structures, reports, featurizer, scorer).unwrap()
}

#[test]
fn check_flow_over_file_backed_tables() {
    let dir = tempfile::tempdir().unwrap();
    write_fixtures(dir.path(), CONSTANT_MODEL);
    let predictor = load_predictor(dir.path(), 0.5);

    let outcome = predictor.check(&["aspirin", " WARFARIN "], None).unwrap();
    println!(
        "p = {:.4}, interaction = {}, {} pairs, {} known reports",
        outcome.prediction.probability,
        outcome.prediction.interaction,
        outcome.pairwise.len(),
        outcome.known_reports.len()
    );

    assert_eq!(
        outcome.prediction.members,
        vec![DrugId::new("DB00945"), DrugId::new("DB00682")]
    );
    // The model is a single constant leaf with raw score 2.0.
    let expected = 1.0 / (1.0 + (-2.0f64).exp());
    assert!((outcome.prediction.probability - expected).abs() < 1e-12);
    assert!(outcome.prediction.interaction);

    assert_eq!(outcome.pairwise.len(), 1);
    assert_eq!(
        outcome.pairwise[0].probability,
        outcome.prediction.probability
    );

    let report_ids: Vec<&str> = outcome
        .known_reports
        .iter()
        .map(|r| r.report_id.as_str())
        .collect();
    assert_eq!(report_ids, vec!["R1", "R2"]);
}

#[test]
fn split_model_lands_on_one_of_its_leaves() {
    let dir = tempfile::tempdir().unwrap();
    write_fixtures(dir.path(), SPLIT_MODEL);
    let predictor = load_predictor(dir.path(), 0.5);

    let prediction = predictor
        .predict_names(&["aspirin", "warfarin", "metformin"], None)
        .unwrap();
    let left = 1.0 / (1.0 + 1.0f64.exp());
    let right = 1.0 / (1.0 + (-1.5f64).exp());
    assert!(
        (prediction.probability - left).abs() < 1e-12
            || (prediction.probability - right).abs() < 1e-12,
        "probability {} is not a leaf output",
        prediction.probability
    );

    // The same query always takes the same path.
    let again = predictor
        .predict_names(&["aspirin", "warfarin", "metformin"], None)
        .unwrap();
    assert_eq!(prediction.probability, again.probability);
}

#[test]
fn unknown_names_never_reach_the_model() {
    let dir = tempfile::tempdir().unwrap();
    write_fixtures(dir.path(), CONSTANT_MODEL);
    let predictor = load_predictor(dir.path(), 0.5);

    let err = predictor
        .check(&["aspirin", "unobtainium"], None)
        .unwrap_err();
    match err {
        PredictError::NotFound { what, key } => {
            assert_eq!(what, "drug name");
            assert_eq!(key, "unobtainium");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn per_call_threshold_applies_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    write_fixtures(dir.path(), CONSTANT_MODEL);
    let predictor = load_predictor(dir.path(), 0.5);

    // p is about 0.88 for every query under the constant model.
    let strict = predictor
        .check(&["aspirin", "warfarin"], Some(0.95))
        .unwrap();
    assert!(!strict.prediction.interaction);
    assert!(!strict.pairwise[0].interaction);

    let lenient = predictor.check(&["aspirin", "warfarin"], Some(0.1)).unwrap();
    assert!(lenient.prediction.interaction);
}
