// Reference kernels — softmax and softmax backward on row-major f64 buffers
//
// Both kernels work on a flat buffer viewed as (outer, axis_len, inner):
// element (o, a, i) lives at (o * axis_len + a) * inner + i. Each
// (o, i) pair is one independent "row" along the reduction axis.
//
//   softmax:     y_a  = exp(x_a - max(x)) / Σ_b exp(x_b - max(x))
//   softmax_bp:  dx_a = y_a * (g_a - Σ_b g_b * y_b)
//
// The backward formula is the Jacobian-vector product of softmax:
// J_ab = y_a (δ_ab - y_b), so (Jᵀg)_a = y_a g_a - y_a Σ_b y_b g_b.

/// Extents of a flat buffer around the reduction axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisView {
    pub outer: usize,
    pub axis_len: usize,
    pub inner: usize,
}

impl AxisView {
    pub fn len(&self) -> usize {
        self.outer * self.axis_len * self.inner
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    fn index(&self, o: usize, a: usize, i: usize) -> usize {
        (o * self.axis_len + a) * self.inner + i
    }
}

/// Numerically stable softmax along the view's axis.
pub fn softmax(x: &[f64], view: AxisView) -> Vec<f64> {
    let mut y = vec![0.0; x.len()];
    for o in 0..view.outer {
        for i in 0..view.inner {
            let max = (0..view.axis_len)
                .map(|a| x[view.index(o, a, i)])
                .fold(f64::NEG_INFINITY, f64::max);
            let mut sum = 0.0;
            for a in 0..view.axis_len {
                let idx = view.index(o, a, i);
                let e = (x[idx] - max).exp();
                y[idx] = e;
                sum += e;
            }
            for a in 0..view.axis_len {
                y[view.index(o, a, i)] /= sum;
            }
        }
    }
    y
}

/// Gradient of softmax w.r.t. its input, from upstream `grad` and forward output `y`.
pub fn softmax_bp(grad: &[f64], y: &[f64], view: AxisView) -> Vec<f64> {
    let mut dx = vec![0.0; grad.len()];
    for o in 0..view.outer {
        for i in 0..view.inner {
            let dot: f64 = (0..view.axis_len)
                .map(|a| {
                    let idx = view.index(o, a, i);
                    grad[idx] * y[idx]
                })
                .sum();
            for a in 0..view.axis_len {
                let idx = view.index(o, a, i);
                dx[idx] = y[idx] * (grad[idx] - dot);
            }
        }
    }
    dx
}
