//! Tiny model and toy split shared by the ML tests.

use burn::backend::{Autodiff, NdArray};

use crate::data::dataset::PreparedSplit;
use crate::domain::bundle::{FeatureBundle, HostTensor, LabelVector, RawInput};
use crate::ml::model::PairClassifierConfig;

pub type AdBackend = Autodiff<NdArray>;

/// vocab 16, seq 6, d_model 8, 2 heads, 1 layer, no dropout.
pub fn tiny_config() -> PairClassifierConfig {
    PairClassifierConfig::new(16, 6, 8, 2, 1, 16, 0.0)
}

/// Four pairs of length 6, ids below 16.
pub fn toy_split(labels: Option<Vec<i64>>) -> PreparedSplit {
    let ids = HostTensor::from_rows(&[
        vec![1, 5, 2, 6, 2, 0],
        vec![1, 7, 2, 8, 2, 0],
        vec![1, 5, 2, 5, 2, 0],
        vec![1, 9, 2, 6, 2, 0],
    ])
    .unwrap();
    let seg  = HostTensor::from_rows(&vec![vec![0, 0, 0, 1, 1, 0]; 4]).unwrap();
    let mask = HostTensor::from_rows(&vec![vec![1, 1, 1, 1, 1, 0]; 4]).unwrap();
    let features = FeatureBundle::new(RawInput::Tensor(ids), RawInput::Tensor(seg), RawInput::Tensor(mask));
    PreparedSplit::prepare(&features, labels.map(LabelVector::from_classes).as_ref()).unwrap()
}
