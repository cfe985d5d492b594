//! Integration tests for the adapter fine-tuning workflow: train adapters
//! against a frozen backbone, ship them separately, restore them elsewhere.

use approx::assert_abs_diff_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;

use enrutar::adapter::{load_adapter, save_adapter, Adapter};
use enrutar::models::GpdlAdapter;
use enrutar::{ModelConfig, Tensor};

fn small_config() -> ModelConfig {
    ModelConfig { in_channels: 3, out_channels: 1, base_channels: 4, adapter_dim: 2 }
}

fn layout_features(b: usize, c: usize, h: usize, w: usize) -> Tensor {
    let mut x = Tensor::zeros((b, c, h, w));
    for (i, v) in x.iter_mut().enumerate() {
        *v = ((i % 23) as f32 - 11.0) * 0.05;
    }
    x
}

#[test]
fn test_adapters_ship_separately_from_the_backbone() {
    // "Training" stands in as a deterministic re-initialization of the
    // adapters; the backbone never changes.
    let mut tuned = GpdlAdapter::with_seed(&small_config(), 42);
    let mut rng = StdRng::seed_from_u64(1000);
    tuned.init_adapter_weights(&mut rng);

    let dir = tempfile::tempdir().unwrap();
    let paths: Vec<_> = (0..tuned.adapters().len())
        .map(|i| dir.path().join(format!("stage{i}.json")))
        .collect();
    for (adapter, path) in tuned.adapters().iter().zip(&paths) {
        save_adapter(adapter, path).expect("save should succeed");
    }

    // A second machine rebuilds the same backbone and restores only the
    // shipped adapter files.
    let mut restored = GpdlAdapter::with_seed(&small_config(), 42);
    for (slot, path) in restored.adapters_mut().iter_mut().zip(&paths) {
        let loaded: Adapter = load_adapter(path).expect("load should succeed");
        assert_eq!(loaded.embed_dim(), slot.embed_dim());
        *slot = loaded;
    }

    let x = layout_features(1, 3, 16, 16);
    let expected = tuned.forward(&x).unwrap();
    let actual = restored.forward(&x).unwrap();
    for (a, b) in expected.iter().zip(actual.iter()) {
        assert_abs_diff_eq!(a, b, epsilon = 1e-6);
    }
}

#[test]
fn test_snapshot_transfer_between_models_in_memory() {
    let config = small_config();
    let mut tuned = GpdlAdapter::with_seed(&config, 8);
    let mut rng = StdRng::seed_from_u64(77);
    tuned.init_adapter_weights(&mut rng);

    let mut fresh = GpdlAdapter::with_seed(&config, 8);
    let x = layout_features(1, 3, 8, 8);
    assert_ne!(tuned.forward(&x).unwrap(), fresh.forward(&x).unwrap());

    fresh.apply_adapter_weights(&tuned.adapter_weights()).expect("apply should succeed");
    assert_eq!(tuned.forward(&x).unwrap(), fresh.forward(&x).unwrap());
}

#[test]
fn test_untuned_adapters_do_not_perturb_the_backbone() {
    let model = GpdlAdapter::with_seed(&small_config(), 4);
    let x = layout_features(2, 3, 8, 8);
    assert_eq!(
        model.forward(&x).unwrap(),
        model.backbone().forward(&x).unwrap()
    );
}
