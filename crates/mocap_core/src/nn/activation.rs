use crate::common::types::ActivationType;
use ndarray as nd;

impl ActivationType {
    pub fn apply(self, x: f32) -> f32 {
        match self {
            Self::Relu => x.max(0.0),
            Self::Linear => x,
            Self::Sigmoid => sigmoid(x),
            Self::Tanh => x.tanh(),
            Self::HardSigmoid => (0.2 * x + 0.5).clamp(0.0, 1.0),
        }
    }
    pub fn apply_inplace(self, v: &mut nd::Array1<f32>) {
        if self != Self::Linear {
            v.mapv_inplace(|x| self.apply(x));
        }
    }
}

pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activations() {
        assert_eq!(ActivationType::Relu.apply(-2.0), 0.0);
        assert_eq!(ActivationType::Relu.apply(1.5), 1.5);
        assert_eq!(ActivationType::Linear.apply(-3.0), -3.0);
        assert!((ActivationType::Sigmoid.apply(0.0) - 0.5).abs() < 1e-7);
        assert!((ActivationType::Tanh.apply(0.5) - 0.5f32.tanh()).abs() < 1e-7);
        assert_eq!(ActivationType::HardSigmoid.apply(10.0), 1.0);
        assert_eq!(ActivationType::HardSigmoid.apply(-10.0), 0.0);
        assert!((ActivationType::HardSigmoid.apply(1.0) - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_apply_inplace() {
        let mut v = nd::array![-1.0f32, 0.0, 2.0];
        ActivationType::Relu.apply_inplace(&mut v);
        assert_eq!(v, nd::array![0.0f32, 0.0, 2.0]);
    }
}
