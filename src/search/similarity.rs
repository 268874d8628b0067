/// Scoring formulas shared by compilers and matchers.
#[derive(Debug, Clone, Copy, Default)]
pub struct Similarity;

impl Similarity {
    pub fn new() -> Self {
        Similarity
    }

    /// Reward for matching `overlap` of `max_overlap` sub-clauses.
    pub fn coord(&self, overlap: u32, max_overlap: u32) -> f32 {
        if max_overlap == 0 {
            1.0
        } else {
            overlap as f32 / max_overlap as f32
        }
    }

    /// `coord(i, num_kids)` for every `i` in `0..=num_kids`.
    pub fn coord_factors(&self, num_kids: usize) -> Vec<f32> {
        (0..=num_kids as u32)
            .map(|overlap| self.coord(overlap, num_kids as u32))
            .collect()
    }

    pub fn idf(&self, doc_freq: u32, total_docs: i32) -> f32 {
        let total_docs = total_docs.max(1) as f64;
        (1.0 + (total_docs / (doc_freq as f64 + 1.0)).ln()) as f32
    }

    pub fn tf(&self, freq: u32) -> f32 {
        (freq as f32).sqrt()
    }

    /// Factor which brings the squared weights of a query to unit length.
    pub fn query_norm(&self, sum_of_squared_weights: f32) -> f32 {
        if sum_of_squared_weights <= 0.0 {
            1.0
        } else {
            1.0 / sum_of_squared_weights.sqrt()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coord() {
        let sim = Similarity::new();
        assert_eq!(sim.coord_factors(2), vec![0.0, 0.5, 1.0]);
        assert_eq!(sim.coord(0, 0), 1.0);
    }

    #[test]
    fn test_idf_and_tf() {
        let sim = Similarity::new();
        assert!(sim.idf(1, 100) > sim.idf(50, 100), "rare terms weigh more");
        assert_eq!(sim.tf(4), 2.0);
        assert_eq!(sim.query_norm(4.0), 0.5);
        assert_eq!(sim.query_norm(0.0), 1.0);
    }
}
