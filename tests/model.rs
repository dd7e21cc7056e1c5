use elmarkets::model::Model;
use std::path::PathBuf;

/// An integration test which attempts to load each demo model and assemble its prices
#[test]
fn test_model_from_path() {
    for name in ["district", "winter_day"] {
        let model_dir: PathBuf = ["demos", name].iter().collect();
        let model = Model::from_path(&model_dir).unwrap();
        let prices = model.market_timeline().unwrap();
        assert_eq!(prices.len(), model.dispatch_steps());
    }
}
