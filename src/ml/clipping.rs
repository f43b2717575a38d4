// ============================================================
// Layer 5 - Global Gradient-Norm Clipping
// ============================================================
// Rescales the whole gradient set of one step so that its joint
// L2 norm is at most `max_norm`:
//
//   total = sqrt(Σ_params ‖g‖²)
//   g    ← g · max_norm / total     (only when total > max_norm)
//
// Burn's GradientClippingConfig::Norm looks at one tensor at a time,
// so a model whose parameters are each under the limit is never
// clipped. The walk here goes over the model with a ModuleVisitor
// and reads each parameter's gradient out of GradientsParams.
//
// Reference: Pascanu et al. (2013) On the difficulty of training RNNs

use std::marker::PhantomData;

use burn::{
    module::{ModuleVisitor, ParamId},
    optim::GradientsParams,
    prelude::*,
    tensor::backend::AutodiffBackend,
};

/// Sums ‖g‖² over every float parameter that received a gradient.
struct SquaredNorm<'a, B: AutodiffBackend> {
    grads: &'a GradientsParams,
    total: f64,
    _backend: PhantomData<B>,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for SquaredNorm<'_, B> {
    fn visit_float<const D: usize>(&mut self, id: ParamId, _tensor: &Tensor<B, D>) {
        if let Some(grad) = self.grads.get::<B::InnerBackend, D>(id) {
            self.total += grad.powf_scalar(2.0).sum().into_scalar().elem::<f64>();
        }
    }
}

struct Rescale<'a, B: AutodiffBackend> {
    grads: &'a mut GradientsParams,
    coef: f64,
    _backend: PhantomData<B>,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for Rescale<'_, B> {
    fn visit_float<const D: usize>(&mut self, id: ParamId, _tensor: &Tensor<B, D>) {
        if let Some(grad) = self.grads.remove::<B::InnerBackend, D>(id.clone()) {
            self.grads.register(id, grad.mul_scalar(self.coef));
        }
    }
}

/// Clip `grads` in place by their global norm. Returns the norm before clipping.
pub fn clip_global_norm<B, M>(model: &M, grads: &mut GradientsParams, max_norm: f64) -> f64
where
    B: AutodiffBackend,
    M: Module<B>,
{
    let mut norm = SquaredNorm::<B> { grads, total: 0.0, _backend: PhantomData };
    model.visit(&mut norm);
    let total = norm.total.sqrt();

    if total > max_norm {
        let mut rescale = Rescale::<B> { grads, coef: max_norm / total, _backend: PhantomData };
        model.visit(&mut rescale);
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::test_support::AdBackend;
    use burn::backend::NdArray;
    use burn::nn::{Linear, LinearConfig};

    /// A 1→1 linear layer fed x = 1 under loss 1.5·(w·x + b):
    /// both gradients are 1.5, the joint norm is √4.5 ≈ 2.1213.
    fn linear_grads() -> (Linear<AdBackend>, GradientsParams) {
        let device = Default::default();
        let linear: Linear<AdBackend> = LinearConfig::new(1, 1).init(&device);
        let x = Tensor::<AdBackend, 2>::from_floats([[1.0]], &device);
        let loss = linear.forward(x).sum().mul_scalar(1.5);
        let grads = GradientsParams::from_grads(loss.backward(), &linear);
        (linear, grads)
    }

    fn grad_values(linear: &Linear<AdBackend>, grads: &GradientsParams) -> (f64, f64) {
        let weight = grads
            .get::<NdArray, 2>(linear.weight.id.clone())
            .unwrap()
            .sum()
            .into_scalar()
            .elem::<f64>();
        let bias_id = linear.bias.as_ref().unwrap().id.clone();
        let bias = grads.get::<NdArray, 1>(bias_id).unwrap().sum().into_scalar().elem::<f64>();
        (weight, bias)
    }

    #[test]
    fn test_parameters_under_the_limit_are_clipped_jointly() {
        let (linear, mut grads) = linear_grads();
        assert_eq!(grad_values(&linear, &grads), (1.5, 1.5));

        let total = clip_global_norm(&linear, &mut grads, 2.0);

        assert!((total - 4.5f64.sqrt()).abs() < 1e-4, "norm {total}");
        let (weight, bias) = grad_values(&linear, &grads);
        assert!((weight - 2.0f64.sqrt()).abs() < 1e-4, "weight grad {weight}");
        assert!((bias - 2.0f64.sqrt()).abs() < 1e-4, "bias grad {bias}");
    }

    #[test]
    fn test_norm_within_the_limit_leaves_gradients_alone() {
        let (linear, mut grads) = linear_grads();

        let total = clip_global_norm(&linear, &mut grads, 5.0);

        assert!((total - 4.5f64.sqrt()).abs() < 1e-4);
        assert_eq!(grad_values(&linear, &grads), (1.5, 1.5));
    }
}
