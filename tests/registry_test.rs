//! Integration tests for the model registry.

use enrutar::{build_model, EnrutarError, Model, ModelConfig, ModelKind, Tensor};

fn small_config() -> ModelConfig {
    ModelConfig { in_channels: 3, out_channels: 1, base_channels: 4, adapter_dim: 2 }
}

#[test]
fn test_every_registered_kind_builds_and_runs() {
    let config = small_config();
    let x = Tensor::zeros((2, 3, 16, 16));

    for kind in ModelKind::ALL {
        let model = build_model(kind, &config, Some(42)).expect("construction should succeed");
        assert_eq!(model.kind(), kind);

        let y = model.forward(&x).expect("forward should succeed");
        let (b, _, h, w) = y.dim();
        assert_eq!((b, h, w), (2, 16, 16), "{kind} changed batch or spatial dims");
    }
}

#[test]
fn test_kind_parses_from_config_file_names() {
    for name in ["gpdl", "gpdl_adapter", "congestion_prediction"] {
        let kind: ModelKind = name.parse().expect("known name should parse");
        assert_eq!(kind.name(), name);
    }
}

#[test]
fn test_config_travels_through_json() {
    let config = small_config();
    let json = serde_json::to_string(&config).unwrap();
    let restored: ModelConfig = serde_json::from_str(&json).unwrap();

    let a = build_model(ModelKind::Gpdl, &config, Some(7)).unwrap();
    let b = build_model(ModelKind::Gpdl, &restored, Some(7)).unwrap();

    let x = Tensor::from_elem((1, 3, 8, 8), 0.1);
    assert_eq!(a.forward(&x).unwrap(), b.forward(&x).unwrap());
}

#[test]
fn test_invalid_config_is_rejected_before_construction() {
    let config = ModelConfig { base_channels: 0, ..small_config() };
    for kind in ModelKind::ALL {
        assert!(matches!(
            build_model(kind, &config, None),
            Err(EnrutarError::ConfigValue { .. })
        ));
    }
}

#[test]
fn test_adapter_variant_reports_trainable_split() {
    let model = build_model(ModelKind::GpdlAdapter, &small_config(), Some(3)).unwrap();
    let Model::GpdlAdapter(model) = model else {
        panic!("registry returned the wrong variant");
    };
    assert!(model.num_trainable_parameters() < model.num_parameters());
}
