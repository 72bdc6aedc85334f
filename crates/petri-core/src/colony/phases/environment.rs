use super::super::Colony;
use tracing::{debug, enabled, Level};

impl Colony {
    pub(in crate::colony) fn step_environment_phase(&mut self) {
        self.field.diffuse();

        if enabled!(Level::DEBUG) {
            let (min, max) = (self.field.min(), self.field.max());
            if min < 0.0 || max > self.field.c_max() {
                debug!(
                    iteration = self.iteration,
                    min,
                    max,
                    c_max = self.field.c_max(),
                    "nutrient field left [0, c_max] after diffusion"
                );
            }
        }
    }
}
