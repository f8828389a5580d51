//! サンプルの並び順を入れ替えても、各サンプルの導関数が変わらないことを確かめます。

use burn::backend::{Autodiff, NdArray};
use burn::tensor::Tensor;
use heat_pinn::model::{GatedNet, GatedNetConfig};
use heat_pinn::{first_derivative, second_derivative};
use proptest::prelude::*;

type TestBackend = Autodiff<NdArray<f32>>;

fn model() -> GatedNet<TestBackend> {
    let device = Default::default();
    GatedNetConfig::new(2, 1)
        .with_n_hidden(8)
        .with_n_layers(2)
        .init::<TestBackend>(&device)
}

fn batch(rows: &[[f32; 2]]) -> Tensor<TestBackend, 2> {
    let device = Default::default();
    let flat: Vec<f32> = rows.iter().flatten().copied().collect();
    Tensor::<TestBackend, 1>::from_floats(flat.as_slice(), &device)
        .reshape([rows.len(), 2])
        .require_grad()
}

fn rows_of(tensor: Tensor<TestBackend, 2>) -> Vec<Vec<f32>> {
    let values = tensor.into_data().to_vec::<f32>().unwrap();
    values.chunks(2).map(<[f32]>::to_vec).collect()
}

/// サンプル列と、その並べ替え。
fn samples_and_permutation() -> impl Strategy<Value = (Vec<[f32; 2]>, Vec<usize>)> {
    prop::collection::vec(prop::array::uniform2(-1.0f32..1.0), 2..8).prop_flat_map(|rows| {
        let n = rows.len();
        (Just(rows), Just((0..n).collect::<Vec<usize>>()).prop_shuffle())
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn derivatives_follow_their_sample((rows, order) in samples_and_permutation()) {
        let model = model();
        let permuted: Vec<[f32; 2]> = order.iter().map(|&i| rows[i]).collect();

        let x = batch(&rows);
        let y = batch(&permuted);

        let first_x = rows_of(first_derivative(&model, &x).unwrap());
        let first_y = rows_of(first_derivative(&model, &y).unwrap());
        let second_x = rows_of(second_derivative(&model, &x, 1).unwrap());
        let second_y = rows_of(second_derivative(&model, &y, 1).unwrap());

        for (position, &source) in order.iter().enumerate() {
            for col in 0..2 {
                prop_assert!((first_y[position][col] - first_x[source][col]).abs() < 1e-5);
                prop_assert!((second_y[position][col] - second_x[source][col]).abs() < 1e-5);
            }
        }
    }
}
