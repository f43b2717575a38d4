// ============================================================
// Layer 5 - Reduce-on-Plateau Learning Rate
// ============================================================
// Stepped once per epoch with the validation loss. When the
// loss has not improved on its best by more than `threshold`
// (relative) for more than `patience` epochs, the rate is
// multiplied by `factor`.
//
//   improved ⇔ loss < best · (1 − threshold)

/// Changes smaller than this are not applied.
const MIN_LR_DELTA: f64 = 1e-8;

#[derive(Debug, Clone)]
pub struct ReduceLrOnPlateau {
    lr:         f64,
    factor:     f64,
    patience:   usize,
    threshold:  f64,
    min_lr:     f64,
    best:       f64,
    bad_epochs: usize,
}

impl ReduceLrOnPlateau {
    pub fn new(initial_lr: f64, factor: f64, patience: usize) -> Self {
        Self {
            lr: initial_lr,
            factor,
            patience,
            threshold:  1e-4,
            min_lr:     0.0,
            best:       f64::INFINITY,
            bad_epochs: 0,
        }
    }

    pub fn lr(&self) -> f64 {
        self.lr
    }

    /// Feed one epoch's validation loss; returns the rate for the next epoch.
    pub fn step(&mut self, loss: f64) -> f64 {
        if loss < self.best * (1.0 - self.threshold) {
            self.best       = loss;
            self.bad_epochs = 0;
        } else {
            self.bad_epochs += 1;
        }

        if self.bad_epochs > self.patience {
            let reduced = (self.lr * self.factor).max(self.min_lr);
            if self.lr - reduced > MIN_LR_DELTA {
                tracing::info!("Reducing learning rate {:.3e} → {:.3e}", self.lr, reduced);
                self.lr = reduced;
            }
            self.bad_epochs = 0;
        }
        self.lr
    }
}
