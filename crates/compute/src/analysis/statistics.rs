pub struct Statistics;

impl Statistics {
    pub fn sum(values: impl IntoIterator<Item = f64>) -> f64 {
        let mut sum = 0.0;
        for v in values {
            sum += v;
        }
        sum
    }

    /// Largest value, or `None` for an empty input. NaN values are ignored.
    pub fn max(values: impl IntoIterator<Item = f64>) -> Option<f64> {
        let mut best: Option<f64> = None;
        for v in values {
            if v.is_nan() {
                continue;
            }
            best = Some(match best {
                Some(b) => b.max(v),
                None => v,
            });
        }
        best
    }
}
