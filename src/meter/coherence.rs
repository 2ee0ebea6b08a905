//! Barlow's metric coherence and metric similarity.
//!
//! Coherence compares two meters played side by side: both are subdivided to a
//! shared fundamental pulse, their normalized indispensabilities are lined up
//! over a common cycle, and the mean squared product is mapped onto a 0..1
//! scale. Similarity divides the coherence of two meters by the coherence of
//! the "home" meter with itself, so a meter is always perfectly similar to
//! itself.

use super::error::{InvalidStrataError, MeterError};
use super::indispensability::{
    barlow_style_indispensability_array, indispensability_array_from_strata, Stratum,
};
use super::options::IndispensabilityOptions;

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

fn lcm(a: u64, b: u64) -> Option<u64> {
    (a / gcd(a, b)).checked_mul(b)
}

/// Prime factors in ascending order, with repetition.
fn prime_factors(mut n: u64) -> Vec<u64> {
    let mut factors = Vec::new();
    let mut candidate = 2;
    while candidate <= n / candidate {
        while n % candidate == 0 {
            n /= candidate;
            factors.push(candidate);
        }
        candidate += 1;
    }
    if n > 1 {
        factors.push(n);
    }
    factors
}

fn pulse_tempo(strata: &[Stratum], bar_tempo: u32) -> Result<u64, InvalidStrataError> {
    strata
        .iter()
        .map(Stratum::num_pulses)
        .try_fold(u64::from(bar_tempo), u64::checked_mul)
        .ok_or(InvalidStrataError::PulseRateOverflow)
}

/// Extends both strata lists so that their finest pulses coincide in time.
///
/// Each meter's pulse rate is pulses-per-bar times bars-per-minute; both are
/// subdivided up to the least common multiple of the two rates by appending
/// the prime factors of the ratio, largest first.
pub(crate) fn subdivide_to_shared_pulse(
    strata_1: &[Stratum],
    bar_tempo_1: u32,
    strata_2: &[Stratum],
    bar_tempo_2: u32,
) -> Result<(Vec<Stratum>, Vec<Stratum>), InvalidStrataError> {
    if bar_tempo_1 == 0 || bar_tempo_2 == 0 {
        return Err(InvalidStrataError::ZeroBarTempo);
    }
    if strata_1.is_empty() || strata_2.is_empty() {
        return Err(InvalidStrataError::NoStrata);
    }

    let pulse_tempo_1 = pulse_tempo(strata_1, bar_tempo_1)?;
    let pulse_tempo_2 = pulse_tempo(strata_2, bar_tempo_2)?;
    if pulse_tempo_1 == 0 || pulse_tempo_2 == 0 {
        return Err(InvalidStrataError::NoStrata);
    }
    let shared_tempo =
        lcm(pulse_tempo_1, pulse_tempo_2).ok_or(InvalidStrataError::PulseRateOverflow)?;

    let subdivide = |strata: &[Stratum], pulse_tempo: u64| -> Result<Vec<Stratum>, InvalidStrataError> {
        let mut subdivided = strata.to_vec();
        for factor in prime_factors(shared_tempo / pulse_tempo).into_iter().rev() {
            let factor = u32::try_from(factor)
                .map_err(|_| InvalidStrataError::SubdivisionTooFine { factor })?;
            subdivided.push(Stratum::Even(factor));
        }
        Ok(subdivided)
    };

    Ok((
        subdivide(strata_1, pulse_tempo_1)?,
        subdivide(strata_2, pulse_tempo_2)?,
    ))
}

fn normalized_weights(strata: &[Stratum], standard_barlow: bool) -> Result<Vec<f64>, MeterError> {
    let array = if standard_barlow {
        barlow_style_indispensability_array(strata.iter().cloned(), true)?
    } else {
        let options = IndispensabilityOptions::default().with_normalize(true);
        indispensability_array_from_strata(strata.iter().cloned(), &options)?
    };
    Ok(array.to_f64_vec())
}

/// Metric coherence of two meters, each given as rhythmic strata plus a tempo
/// in bars per minute.
///
/// With `standard_barlow`, strata must be even divisions and Barlow's original
/// indispensability is used; otherwise additive strata are allowed and the
/// general form is used.
///
/// # Errors
///
/// Returns [`InvalidStrataError`] for a zero bar tempo, missing strata,
/// additive strata in Barlow mode, or pulse rates whose common multiple does
/// not fit in a `u64`.
pub fn metric_coherence(
    strata_1: &[Stratum],
    bar_tempo_1: u32,
    strata_2: &[Stratum],
    bar_tempo_2: u32,
    standard_barlow: bool,
) -> Result<f64, MeterError> {
    let (subdivided_1, subdivided_2) =
        subdivide_to_shared_pulse(strata_1, bar_tempo_1, strata_2, bar_tempo_2)?;
    let weights_1 = normalized_weights(&subdivided_1, standard_barlow)?;
    let weights_2 = normalized_weights(&subdivided_2, standard_barlow)?;

    let cycle = lcm(weights_1.len() as u64, weights_2.len() as u64)
        .and_then(|cycle| usize::try_from(cycle).ok())
        .ok_or(InvalidStrataError::PulseRateOverflow)?;
    let sum_of_squared_products: f64 = weights_1
        .iter()
        .cycle()
        .zip(weights_2.iter().cycle())
        .take(cycle)
        .map(|(x, y)| (x * y).powi(2))
        .sum();
    let mean = sum_of_squared_products / cycle as f64;

    tracing::debug!(cycle, mean, "metric coherence");
    Ok(-1.0 / (2.0 * ((9.0 * mean - 1.0) / 3.5).ln()))
}

/// How close an "away" meter is to a "home" meter: their coherence divided by
/// the home meter's coherence with itself. Not symmetric.
pub fn metric_similarity(
    strata_away: &[Stratum],
    bar_tempo_away: u32,
    strata_home: &[Stratum],
    bar_tempo_home: u32,
    standard_barlow: bool,
) -> Result<f64, MeterError> {
    let auto_coherence = metric_coherence(
        strata_home,
        bar_tempo_home,
        strata_home,
        bar_tempo_home,
        standard_barlow,
    )?;
    let cross_coherence = metric_coherence(
        strata_away,
        bar_tempo_away,
        strata_home,
        bar_tempo_home,
        standard_barlow,
    )?;
    Ok(cross_coherence / auto_coherence)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn even(strata: &[u32]) -> Vec<Stratum> {
        strata.iter().copied().map(Stratum::Even).collect()
    }

    #[test]
    fn test_prime_factors_and_lcm() {
        assert_eq!(prime_factors(12), vec![2, 2, 3]);
        assert_eq!(prime_factors(7), vec![7]);
        assert!(prime_factors(1).is_empty());
        assert_eq!(lcm(4, 6), Some(12));
        assert_eq!(lcm(u64::MAX, 2), None);
    }

    #[test]
    fn test_subdivide_to_shared_pulse() {
        let (three, two) = subdivide_to_shared_pulse(&even(&[3]), 1, &even(&[2]), 1).unwrap();
        assert_eq!(three, even(&[3, 2]));
        assert_eq!(two, even(&[2, 3]));

        // Same pulse rate: nothing to add.
        let (a, b) = subdivide_to_shared_pulse(&even(&[4]), 30, &even(&[2]), 60).unwrap();
        assert_eq!(a, even(&[4]));
        assert_eq!(b, even(&[2]));

        let (additive, plain) =
            subdivide_to_shared_pulse(&[Stratum::Additive(vec![2, 3])], 1, &even(&[2]), 1).unwrap();
        assert_eq!(additive, vec![Stratum::Additive(vec![2, 3]), Stratum::Even(2)]);
        assert_eq!(plain, even(&[2, 5]));
    }

    #[test]
    fn test_coherence_of_simple_quadruple_meter() {
        let coherence = metric_coherence(&even(&[4]), 1, &even(&[4]), 1, true).unwrap();
        assert!((coherence - 0.7051).abs() < 1e-3, "got {coherence}");
    }

    #[test]
    fn test_similarity_to_self_is_one() {
        for strata in [even(&[4]), even(&[3, 2]), even(&[2, 2, 3])] {
            let similarity = metric_similarity(&strata, 20, &strata, 20, true).unwrap();
            assert_eq!(similarity, 1.0);
        }

        let additive = vec![Stratum::Additive(vec![2, 3, 2])];
        let similarity = metric_similarity(&additive, 10, &additive, 10, false).unwrap();
        assert_eq!(similarity, 1.0);
    }

    #[test]
    fn test_similarity_of_duple_to_triple() {
        // [2] and [3] both become 6 pulses: [5,0,2,4,1,3] against [5,0,3,1,4,2],
        // mean squared product 0.1944, while [3] against itself averages 0.3542.
        let coherence = metric_coherence(&even(&[2]), 1, &even(&[3]), 1, true).unwrap();
        assert!((coherence - 0.3245).abs() < 1e-3, "got {coherence}");

        let similarity = metric_similarity(&even(&[2]), 1, &even(&[3]), 1, true).unwrap();
        assert!((similarity - 0.3050).abs() < 1e-3, "got {similarity}");
    }

    #[test]
    fn test_huge_pulse_rates_are_rejected() {
        assert_eq!(
            metric_coherence(&even(&[4294967291]), 1, &even(&[4294967279]), 3, true),
            Err(MeterError::InvalidStrata(InvalidStrataError::PulseRateOverflow))
        );
        assert_eq!(
            metric_coherence(&even(&[u32::MAX, u32::MAX, u32::MAX]), 1, &even(&[2]), 1, true),
            Err(MeterError::InvalidStrata(InvalidStrataError::PulseRateOverflow))
        );
    }

    #[test]
    fn test_invalid_inputs() {
        assert_eq!(
            metric_coherence(&even(&[4]), 0, &even(&[4]), 1, true),
            Err(MeterError::InvalidStrata(InvalidStrataError::ZeroBarTempo))
        );
        assert_eq!(
            metric_coherence(&[Stratum::Additive(vec![2, 3])], 1, &even(&[5]), 1, true),
            Err(MeterError::InvalidStrata(InvalidStrataError::AdditiveStratum { index: 0 }))
        );
        assert_eq!(
            metric_coherence(&[], 1, &even(&[5]), 1, true),
            Err(MeterError::InvalidStrata(InvalidStrataError::NoStrata))
        );
    }
}
