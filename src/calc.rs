//! Square-root oracle. Pure and deterministic; the validator relies on it
//! as ground truth for the table's materialized contents.

/// Value of table element `index`.
pub fn sqrt_at(index: usize) -> f64 {
    (index as f64).sqrt()
}

/// Writes `out[k] = sqrt(start_index + k)` for every k.
pub fn fill(start_index: usize, out: &mut [f64]) {
    for (k, slot) in out.iter_mut().enumerate() {
        *slot = sqrt_at(start_index + k);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_squares_are_exact() {
        assert_eq!(sqrt_at(0), 0.0);
        assert_eq!(sqrt_at(1), 1.0);
        assert_eq!(sqrt_at(4), 2.0);
        assert_eq!(sqrt_at(144), 12.0);
    }

    #[test]
    fn fill_matches_single_value_oracle() {
        let mut buf = [0.0f64; 16];
        fill(1000, &mut buf);
        for (k, &v) in buf.iter().enumerate() {
            assert_eq!(v.to_bits(), sqrt_at(1000 + k).to_bits());
        }
    }

    #[test]
    fn fill_is_bit_exact_across_runs() {
        let mut a = [0.0f64; 64];
        let mut b = [0.0f64; 64];
        fill(12345, &mut a);
        fill(12345, &mut b);
        assert_eq!(a.map(f64::to_bits), b.map(f64::to_bits));
    }
}
