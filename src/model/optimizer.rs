//! Optimizers and learning rate schedule over flat parameter vectors

/// Trait for optimization algorithms
pub trait Optimizer: Send {
    /// Perform a single optimization step
    fn step(&mut self, params: &mut [f32], grads: &[f32]);

    /// Get learning rate
    fn lr(&self) -> f32;

    /// Set learning rate
    fn set_lr(&mut self, lr: f32);

    /// Name used in configuration files
    fn name(&self) -> &str;
}

/// Stochastic gradient descent with optional momentum and L2 weight decay
#[derive(Debug, Clone)]
pub struct SGD {
    lr: f32,
    momentum: f32,
    weight_decay: f32,
    velocity: Vec<f32>,
}

impl SGD {
    /// Create a new SGD optimizer
    pub fn new(lr: f32, momentum: f32, weight_decay: f32) -> Self {
        Self {
            lr,
            momentum,
            weight_decay,
            velocity: Vec::new(),
        }
    }
}

impl Optimizer for SGD {
    fn step(&mut self, params: &mut [f32], grads: &[f32]) {
        if self.velocity.len() != params.len() {
            self.velocity = vec![0.0; params.len()];
        }
        for ((p, &g), v) in params.iter_mut().zip(grads).zip(&mut self.velocity) {
            let g = g + self.weight_decay * *p;
            // v = momentum * v - lr * grad
            *v = self.momentum * *v - self.lr * g;
            *p += *v;
        }
    }

    fn lr(&self) -> f32 {
        self.lr
    }

    fn set_lr(&mut self, lr: f32) {
        self.lr = lr;
    }

    fn name(&self) -> &str {
        "SGD"
    }
}

/// Adam moment estimates shared by [`Adam`] and [`AdamW`]
#[derive(Debug, Clone)]
struct Moments {
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    t: i32,
    m: Vec<f32>,
    v: Vec<f32>,
}

impl Moments {
    fn new() -> Self {
        Self {
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            t: 0,
            m: Vec::new(),
            v: Vec::new(),
        }
    }

    /// Bias-corrected update direction for every parameter
    fn update(&mut self, grads: &[f32]) -> Vec<f32> {
        if self.m.len() != grads.len() {
            self.m = vec![0.0; grads.len()];
            self.v = vec![0.0; grads.len()];
            self.t = 0;
        }
        self.t += 1;
        let (beta1, beta2, eps) = (self.beta1, self.beta2, self.epsilon);
        let c1 = 1.0 - beta1.powi(self.t);
        let c2 = 1.0 - beta2.powi(self.t);

        grads
            .iter()
            .zip(self.m.iter_mut().zip(self.v.iter_mut()))
            .map(|(&g, (m, v))| {
                *m = beta1 * *m + (1.0 - beta1) * g;
                *v = beta2 * *v + (1.0 - beta2) * g * g;
                (*m / c1) / ((*v / c2).sqrt() + eps)
            })
            .collect()
    }
}

/// Adam with L2 weight decay folded into the gradient
#[derive(Debug, Clone)]
pub struct Adam {
    lr: f32,
    weight_decay: f32,
    moments: Moments,
}

impl Adam {
    /// Create a new Adam optimizer
    pub fn new(lr: f32, weight_decay: f32) -> Self {
        Self {
            lr,
            weight_decay,
            moments: Moments::new(),
        }
    }
}

impl Optimizer for Adam {
    fn step(&mut self, params: &mut [f32], grads: &[f32]) {
        let wd = self.weight_decay;
        let decayed: Vec<f32> = params.iter().zip(grads).map(|(&p, &g)| g + wd * p).collect();
        let direction = self.moments.update(&decayed);
        for (p, d) in params.iter_mut().zip(direction) {
            *p -= self.lr * d;
        }
    }

    fn lr(&self) -> f32 {
        self.lr
    }

    fn set_lr(&mut self, lr: f32) {
        self.lr = lr;
    }

    fn name(&self) -> &str {
        "Adam"
    }
}

/// AdamW optimizer (Adam with decoupled weight decay)
///
/// θ_t = (1 - lr * λ) * θ_{t-1} - lr * m̂_t / (√v̂_t + ε)
#[derive(Debug, Clone)]
pub struct AdamW {
    lr: f32,
    weight_decay: f32,
    moments: Moments,
}

impl AdamW {
    /// Create a new AdamW optimizer
    pub fn new(lr: f32, weight_decay: f32) -> Self {
        Self {
            lr,
            weight_decay,
            moments: Moments::new(),
        }
    }
}

impl Optimizer for AdamW {
    fn step(&mut self, params: &mut [f32], grads: &[f32]) {
        let direction = self.moments.update(grads);
        for (p, d) in params.iter_mut().zip(direction) {
            *p = *p * (1.0 - self.lr * self.weight_decay) - self.lr * d;
        }
    }

    fn lr(&self) -> f32 {
        self.lr
    }

    fn set_lr(&mut self, lr: f32) {
        self.lr = lr;
    }

    fn name(&self) -> &str {
        "AdamW"
    }
}

/// Step decay learning rate schedule
///
/// Formula: lr_t = lr_initial * gamma^(floor(epoch / step_size))
#[derive(Debug, Clone, Copy)]
pub struct StepDecayLR {
    lr_initial: f32,
    gamma: f32,
    step_size: usize,
    current_epoch: usize,
}

impl StepDecayLR {
    /// Create a new step decay scheduler
    pub fn new(lr_initial: f32, step_size: usize, gamma: f32) -> Self {
        Self {
            lr_initial,
            gamma,
            step_size,
            current_epoch: 0,
        }
    }

    /// Current learning rate
    pub fn get_lr(&self) -> f32 {
        if self.step_size == 0 {
            return self.lr_initial;
        }
        let num_decays = self.current_epoch / self.step_size;
        self.lr_initial * self.gamma.powi(num_decays as i32)
    }

    /// Advance one epoch
    pub fn step(&mut self) {
        self.current_epoch += 1;
    }

    /// Apply the current learning rate to an optimizer
    pub fn apply(&self, optimizer: &mut dyn Optimizer) {
        optimizer.set_lr(self.get_lr());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn minimise(opt: &mut dyn Optimizer) -> f32 {
        // f(x) = (x - 3)^2
        let mut x = [0.0f32];
        for _ in 0..2000 {
            let g = [2.0 * (x[0] - 3.0)];
            opt.step(&mut x, &g);
        }
        x[0]
    }

    #[test]
    fn test_sgd_plain_step() {
        let mut opt = SGD::new(0.1, 0.0, 0.0);
        let mut p = [1.0, 2.0];
        opt.step(&mut p, &[0.5, 1.0]);
        assert_abs_diff_eq!(p[0], 0.95, epsilon = 1e-6);
        assert_abs_diff_eq!(p[1], 1.9, epsilon = 1e-6);
    }

    #[test]
    fn test_optimizers_converge_on_quadratic() {
        assert_abs_diff_eq!(minimise(&mut SGD::new(0.05, 0.9, 0.0)), 3.0, epsilon = 5e-2);
        assert_abs_diff_eq!(minimise(&mut Adam::new(0.05, 0.0)), 3.0, epsilon = 5e-2);
        assert_abs_diff_eq!(minimise(&mut AdamW::new(0.05, 0.0)), 3.0, epsilon = 5e-2);
    }

    #[test]
    fn test_first_adam_step_is_lr_sized() {
        let mut opt = Adam::new(0.01, 0.0);
        let mut p = [1.0];
        opt.step(&mut p, &[123.0]);
        assert_abs_diff_eq!(p[0], 0.99, epsilon = 1e-5);
    }

    #[test]
    fn test_adamw_decays_weights_without_gradient() {
        let mut opt = AdamW::new(0.1, 0.5);
        let mut p = [2.0];
        opt.step(&mut p, &[0.0]);
        assert_abs_diff_eq!(p[0], 2.0 * 0.95, epsilon = 1e-5);
    }

    #[test]
    fn test_step_decay_schedule() {
        let mut sched = StepDecayLR::new(0.1, 2, 0.5);
        let mut opt = SGD::new(1.0, 0.0, 0.0);
        let mut lrs = Vec::new();
        for _ in 0..5 {
            sched.apply(&mut opt);
            lrs.push(opt.lr());
            sched.step();
        }
        let expected = [0.1, 0.1, 0.05, 0.05, 0.025];
        for (a, b) in lrs.iter().zip(expected) {
            assert_abs_diff_eq!(*a, b, epsilon = 1e-7);
        }
    }

    #[test]
    fn test_zero_step_size_keeps_lr() {
        let mut sched = StepDecayLR::new(0.1, 0, 0.5);
        sched.step();
        sched.step();
        assert_abs_diff_eq!(sched.get_lr(), 0.1);
    }
}
