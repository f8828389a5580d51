use approx::assert_abs_diff_eq;
use burn::backend::{Autodiff, NdArray};
use burn::tensor::Tensor;
use burn::tensor::backend::Backend;
use heat_pinn::analytic::{Combiner, Identity, Sine, Square};
use heat_pinn::jet::Jet;
use heat_pinn::model::{GatedNetConfig, ResidualNetConfig, SineNetConfig};
use heat_pinn::{
    DerivativeError, DifferentiableMap, derivatives, first_derivative, second_derivative,
};

type TestBackend = Autodiff<NdArray<f32>>;

const TOL: f32 = 1e-4;

fn batch(values: &[f32], cols: usize) -> Tensor<TestBackend, 2> {
    let device = Default::default();
    Tensor::<TestBackend, 1>::from_floats(values, &device)
        .reshape([values.len() / cols, cols])
        .require_grad()
}

fn flat(tensor: Tensor<TestBackend, 2>) -> Vec<f32> {
    tensor.into_data().to_vec::<f32>().unwrap()
}

fn assert_close(actual: &[f32], expected: &[f32]) {
    assert_eq!(actual.len(), expected.len());
    for (a, e) in actual.iter().zip(expected) {
        assert_abs_diff_eq!(*a, *e, epsilon = TOL);
    }
}

/// `f(x) = ln(x)`。負の入力で NaN を生成します。
struct Log;

impl<B: Backend> DifferentiableMap<B> for Log {
    fn forward_jet(&self, input: Jet<B>) -> Jet<B> {
        input.unary(|x| {
            let slope = x.clone().recip();
            let curvature = slope.clone().mul(slope.clone()).neg();
            [x.log(), slope, curvature]
        })
    }
}

#[test]
fn identity_has_unit_gradient() {
    let x = batch(&[-1.5, 0.0, 2.0, 7.0], 1);
    let du = first_derivative(&Identity, &x).unwrap();
    assert_eq!(du.dims(), [4, 1]);
    assert_eq!(flat(du), vec![1.0; 4]);
}

#[test]
fn square_derivatives() {
    let xs = [1.0, 2.0, 3.0];
    let x = batch(&xs, 1);

    let du = flat(first_derivative(&Square, &x).unwrap());
    assert_close(&du, &[2.0, 4.0, 6.0]);

    let d2u = flat(second_derivative(&Square, &x, 0).unwrap());
    assert_close(&d2u, &[2.0, 2.0, 2.0]);
}

#[test]
fn sine_derivatives() {
    let xs = [-2.5f32, -0.3, 0.0, 1.0, 2.0, 3.0];
    let x = batch(&xs, 1);

    let du = flat(first_derivative(&Sine, &x).unwrap());
    let expected: Vec<f32> = xs.iter().map(|v| v.cos()).collect();
    assert_close(&du, &expected);

    let d2u = flat(second_derivative(&Sine, &x, 0).unwrap());
    let expected: Vec<f32> = xs.iter().map(|v| -v.sin()).collect();
    assert_close(&d2u, &expected);
}

#[test]
fn combiner_derivatives() {
    let (a, b, c) = (1.5f32, -2.0f32, 3.0f32);
    let map = Combiner::new(a as f64, b as f64, c as f64);
    let pairs = [[1.0f32, 2.0], [2.0, 3.0], [-3.0, 4.0]];
    let values: Vec<f32> = pairs.iter().flatten().copied().collect();
    let x = batch(&values, 2);

    let du = flat(first_derivative(&map, &x).unwrap());
    let expected: Vec<f32> = pairs
        .iter()
        .flat_map(|[x0, _]| [2.0 * a * x0 + b, c])
        .collect();
    assert_close(&du, &expected);

    let d2u_0 = flat(second_derivative(&map, &x, 0).unwrap());
    assert_close(&d2u_0, &[2.0 * a, 0.0, 2.0 * a, 0.0, 2.0 * a, 0.0]);

    let d2u_1 = flat(second_derivative(&map, &x, 1).unwrap());
    assert_close(&d2u_1, &[0.0; 6]);
}

#[test]
fn mixed_partials_are_symmetric_for_networks() {
    let device = Default::default();
    let x = batch(&[0.1, -0.4, 0.7, 0.2, -0.9, 0.5, 0.3, 0.3], 2);
    let maps: Vec<Box<dyn DifferentiableMap<TestBackend>>> = vec![
        Box::new(ResidualNetConfig::new(2, 1).with_block_width(8).init::<TestBackend>(&device)),
        Box::new(SineNetConfig::new(2, 2).with_n_hidden(8).init::<TestBackend>(&device)),
        Box::new(GatedNetConfig::new(2, 1).with_n_hidden(8).init::<TestBackend>(&device)),
    ];

    for map in &maps {
        let h0 = flat(second_derivative(map.as_ref(), &x, 0).unwrap());
        let h1 = flat(second_derivative(map.as_ref(), &x, 1).unwrap());
        let d01: Vec<f32> = h0.chunks(2).map(|row| row[1]).collect();
        let d10: Vec<f32> = h1.chunks(2).map(|row| row[0]).collect();
        assert_close(&d01, &d10);
    }
}

#[test]
fn forward_mixed_partials_match_reverse_mode() {
    let device = Default::default();
    let model = ResidualNetConfig::new(2, 1)
        .with_n_blocks(3)
        .with_block_width(8)
        .init::<TestBackend>(&device);
    let x = batch(&[0.0, -1.0, 0.25, 0.5, 0.75, 0.9], 2);

    for axis in 0..2 {
        let forward = derivatives(&model, &x, axis).unwrap();
        let reverse = second_derivative(&model, &x, axis).unwrap();
        assert_close(&flat(forward.mixed), &flat(reverse));

        let gradient = first_derivative(&model, &x).unwrap();
        assert_close(&flat(forward.gradient), &flat(gradient));
        assert_eq!(forward.value.dims(), [3, 1]);
    }
}

#[test]
fn derivatives_do_not_require_tracking() {
    let device = Default::default();
    let x = Tensor::<TestBackend, 1>::from_floats([1.0, 2.0], &device).reshape([2, 1]);
    let result = derivatives(&Square, &x, 0).unwrap();
    assert_close(&flat(result.gradient), &[2.0, 4.0]);
    assert_close(&flat(result.mixed), &[2.0, 2.0]);
}

#[test]
fn untracked_input_is_rejected() {
    let device = Default::default();
    let x = Tensor::<TestBackend, 1>::from_floats([1.0, 2.0], &device).reshape([2, 1]);

    let err = first_derivative(&Square, &x).unwrap_err();
    assert!(matches!(err, DerivativeError::InvalidInput { .. }));

    let err = second_derivative(&Square, &x, 0).unwrap_err();
    assert!(matches!(err, DerivativeError::InvalidInput { .. }));
}

#[test]
fn dimension_index_out_of_range() {
    let x = batch(&[1.0, 2.0, 3.0, 4.0], 2);
    let map = Combiner::new(1.0, 1.0, 1.0);

    assert_eq!(
        second_derivative(&map, &x, 2).unwrap_err(),
        DerivativeError::IndexOutOfRange { index: 2, dims: 2 }
    );
    assert_eq!(
        derivatives(&map, &x, 5).unwrap_err(),
        DerivativeError::IndexOutOfRange { index: 5, dims: 2 }
    );
}

#[test]
fn non_finite_output_is_numerical_error() {
    let x = batch(&[1.0, -1.0], 1);
    let err = first_derivative(&Log, &x).unwrap_err();
    assert_eq!(
        err,
        DerivativeError::Numerical {
            quantity: "写像の出力",
            position: 1,
        }
    );
}

#[test]
fn non_finite_input_is_rejected() {
    let x = batch(&[1.0, f32::NAN], 1);
    let err = first_derivative(&Square, &x).unwrap_err();
    assert!(matches!(err, DerivativeError::InvalidInput { .. }));
}

#[test]
fn repeated_calls_reuse_the_same_input() {
    let x = batch(&[0.5, 1.5], 1);
    let first = flat(second_derivative(&Sine, &x, 0).unwrap());
    let again = flat(second_derivative(&Sine, &x, 0).unwrap());
    assert_eq!(first, again);
}

fn networks() -> Vec<(&'static str, Box<dyn DifferentiableMap<TestBackend>>)> {
    let device = Default::default();
    vec![
        (
            "residual",
            Box::new(
                ResidualNetConfig::new(2, 1)
                    .with_n_blocks(3)
                    .with_block_width(8)
                    .init::<TestBackend>(&device),
            ),
        ),
        (
            "sine",
            Box::new(
                SineNetConfig::new(2, 2)
                    .with_n_hidden(8)
                    .with_frequency(3.0)
                    .init::<TestBackend>(&device),
            ),
        ),
        (
            "gated",
            Box::new(
                GatedNetConfig::new(2, 1)
                    .with_n_hidden(8)
                    .init::<TestBackend>(&device),
            ),
        ),
    ]
}

const POINTS: [f32; 8] = [0.1, -0.4, 0.7, 0.2, -0.9, 0.5, 0.3, 0.3];

#[test]
fn network_gradients_match_reverse_mode() {
    for (name, net) in networks() {
        let x = batch(&POINTS, 2);
        let grads = net.forward(x.clone()).sum().backward();
        let reverse = x
            .grad(&grads)
            .unwrap_or_else(|| panic!("{name}: 入力の勾配がありません"))
            .into_data()
            .to_vec::<f32>()
            .unwrap();

        let forward = flat(first_derivative(net.as_ref(), &x).unwrap());
        assert_eq!(forward.len(), reverse.len());
        for (f, r) in forward.iter().zip(&reverse) {
            assert!((f - r).abs() < 1e-5, "{name}: {f} != {r}");
        }
    }
}

#[test]
fn network_second_derivatives_match_finite_differences() {
    let h = 1e-2f32;
    for (name, net) in networks() {
        for axis in 0..2 {
            let shifted = |delta: f32| {
                let mut values = POINTS;
                for row in values.chunks_mut(2) {
                    row[axis] += delta;
                }
                flat(first_derivative(net.as_ref(), &batch(&values, 2)).unwrap())
            };
            let (plus, minus) = (shifted(h), shifted(-h));

            let x = batch(&POINTS, 2);
            let second = flat(second_derivative(net.as_ref(), &x, axis).unwrap());
            for ((s, p), m) in second.iter().zip(&plus).zip(&minus) {
                let estimate = (p - m) / (2.0 * h);
                let tolerance = 2e-2 * (1.0 + estimate.abs());
                assert!(
                    (s - estimate).abs() < tolerance,
                    "{name} (axis {axis}): {s} != {estimate}"
                );
            }
        }
    }
}

#[test]
fn non_leaf_input_is_rejected() {
    let x = batch(&[1.0, 2.0], 1).mul_scalar(1.0);

    let err = first_derivative(&Square, &x).unwrap_err();
    assert!(matches!(err, DerivativeError::InvalidInput { .. }));

    let err = second_derivative(&Square, &x, 0).unwrap_err();
    assert!(matches!(err, DerivativeError::InvalidInput { .. }));
}
