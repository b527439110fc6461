use rand::Rng;

/// Returns `x` perturbed by up to `percent` in either direction, to better
/// simulate human playing. Mirrors the `RANDOMIZE` macro:
/// `x - x*percent/100 + rand() % (x*percent/50 + 1)`, clamped to a valid
/// MIDI velocity.
pub fn randomize(x: u8, percent: u8) -> u8 {
    if percent == 0 {
        return x;
    }
    let x = x as i32;
    let percent = percent as i32;
    let low = x - (x * percent / 100);
    let spread = (x * percent / 50) + 1;
    let offset = rand::thread_rng().gen_range(0..spread.max(1));
    (low + offset).clamp(0, 127) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_percent_is_a_no_op() {
        assert_eq!(randomize(90, 0), 90);
    }

    #[test]
    fn randomized_velocity_stays_in_range() {
        for _ in 0..100 {
            let v = randomize(90, 20);
            assert!(v <= 127);
        }
    }
}
