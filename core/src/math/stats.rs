pub struct StatsHelper;

impl StatsHelper {
    /// Index and value of the largest sample; the first one wins ties.
    pub fn peak<I>(samples: I) -> Option<(usize, f32)>
    where
        I: IntoIterator<Item = f32>,
    {
        samples
            .into_iter()
            .enumerate()
            .fold(None, |best, (idx, value)| match best {
                Some((_, top)) if top >= value => best,
                _ => Some((idx, value)),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peak_prefers_first_maximum() {
        assert_eq!(StatsHelper::peak(vec![1.0, 5.0, 5.0, 2.0]), Some((1, 5.0)));
        assert_eq!(StatsHelper::peak(Vec::<f32>::new()), None);
    }

    #[test]
    fn peak_skips_leading_zeros() {
        assert_eq!(StatsHelper::peak(vec![0.0, 0.0, 0.5]), Some((2, 0.5)));
    }
}
