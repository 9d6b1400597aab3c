//! Seeded bag-of-tokens projection.
//!
//! Not a language model: each lowercase alphanumeric token is hashed with the
//! seed into one signed coordinate. Only determinism matters here.

use crate::seed::leading_u64;

pub const EMBEDDING_DIM: usize = 64;

pub type Embedding = [f64; EMBEDDING_DIM];

/// Tag recorded in the `ssr_config` artifact
pub const EMBEDDING_MODEL: &str = "text-embedding-3-small";

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
}

/// L2-normalized projection of `text`. Text without tokens maps to zero.
pub fn embed_text(text: &str, seed: u64) -> Embedding {
    let mut vector = [0.0; EMBEDDING_DIM];
    for token in tokens(text) {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&seed.to_le_bytes());
        hasher.update(token.as_bytes());
        let digest = hasher.finalize();
        let bytes = digest.as_bytes();

        let index = (leading_u64(bytes) % EMBEDDING_DIM as u64) as usize;
        let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };
        let magnitude = 1.0 + f64::from(bytes[9]) / 255.0;
        vector[index] += sign * magnitude;
    }
    normalize(&mut vector);
    vector
}

pub fn normalize(vector: &mut Embedding) {
    let norm = vector.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|x| *x /= norm);
    }
}

/// Equal-weight blend, renormalized
pub fn blend(a: &Embedding, b: &Embedding) -> Embedding {
    let mut out = [0.0; EMBEDDING_DIM];
    for (slot, (x, y)) in out.iter_mut().zip(a.iter().zip(b)) {
        *slot = 0.5 * x + 0.5 * y;
    }
    normalize(&mut out);
    out
}

/// Cosine similarity; zero when either side is the zero vector
pub fn cosine(a: &Embedding, b: &Embedding) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    (dot / (na * nb)).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(v: &Embedding) -> f64 {
        v.iter().map(|x| x * x).sum::<f64>().sqrt()
    }

    #[test]
    fn test_embedding_is_unit_length() {
        let v = embed_text("Ship invoices in one click", 11);
        assert!((norm(&v) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_tokenization_ignores_case_and_punctuation() {
        assert_eq!(embed_text("Fast, CHEAP!", 3), embed_text("fast cheap", 3));
    }

    #[test]
    fn test_seed_changes_projection() {
        assert_ne!(embed_text("fast cheap", 3), embed_text("fast cheap", 4));
    }

    #[test]
    fn test_empty_text_is_zero() {
        let v = embed_text("  --  ", 1);
        assert_eq!(norm(&v), 0.0);
        assert_eq!(cosine(&v, &embed_text("anything", 1)), 0.0);
    }

    #[test]
    fn test_cosine_self_is_one() {
        let v = embed_text("weekly payroll for small teams", 5);
        assert!((cosine(&v, &v) - 1.0).abs() < 1e-9);
        let w = blend(&v, &v);
        assert!((cosine(&v, &w) - 1.0).abs() < 1e-9);
    }
}
