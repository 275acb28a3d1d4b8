//! Binary vector file encoding and similarity math.

use crate::domain::errors::{DomainError, DomainResult};

const MAGIC: &[u8; 4] = b"GZVI";
const VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 4 + 8;

/// Serialize vectors as header + row-major little-endian f32s.
pub(super) fn encode_vectors<'a>(
    dimension: usize,
    vectors: impl ExactSizeIterator<Item = &'a [f32]>,
) -> DomainResult<Vec<u8>> {
    let count = vectors.len();
    let dim = u32::try_from(dimension)
        .map_err(|_| DomainError::ValidationFailed(format!("dimension {dimension} too large")))?;

    let mut bytes = Vec::with_capacity(HEADER_LEN + count * dimension * 4);
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&VERSION.to_le_bytes());
    bytes.extend_from_slice(&dim.to_le_bytes());
    bytes.extend_from_slice(&(count as u64).to_le_bytes());

    for vector in vectors {
        if vector.len() != dimension {
            return Err(DomainError::DataIntegrity(format!(
                "vector of length {} in an index of dimension {dimension}",
                vector.len()
            )));
        }
        bytes.extend(vector.iter().flat_map(|f| f.to_le_bytes()));
    }

    Ok(bytes)
}

/// Parse a vector file into its dimension and rows.
pub(super) fn decode_vectors(bytes: &[u8]) -> DomainResult<(usize, Vec<Vec<f32>>)> {
    let corrupt = |what: &str| DomainError::DataIntegrity(format!("vector index file {what}"));

    if bytes.len() < HEADER_LEN {
        return Err(corrupt("is truncated"));
    }
    if &bytes[0..4] != MAGIC {
        return Err(corrupt("has an unknown format"));
    }

    let version = read_u32(&bytes[4..8]);
    if version != VERSION {
        return Err(corrupt(&format!("has unsupported version {version}")));
    }

    let dimension = read_u32(&bytes[8..12]) as usize;
    let count = usize::try_from(read_u64(&bytes[12..20]))
        .map_err(|_| corrupt("declares an impossible vector count"))?;

    let body = &bytes[HEADER_LEN..];
    let expected = count
        .checked_mul(dimension)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| corrupt("declares an impossible size"))?;
    if body.len() != expected {
        return Err(corrupt(&format!(
            "holds {} bytes of vectors, header declares {count} x {dimension}",
            body.len()
        )));
    }

    if dimension == 0 {
        return Ok((0, vec![Vec::new(); count]));
    }

    let vectors = body
        .chunks_exact(dimension * 4)
        .map(|row| {
            row.chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect()
        })
        .collect();

    Ok((dimension, vectors))
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(buf)
}

/// Cosine similarity given both vectors' precomputed norms
///
/// Returns 0.0 for mismatched lengths or zero-magnitude input.
pub(super) fn cosine(a: &[f32], a_norm: f32, b: &[f32], b_norm: f32) -> f32 {
    if a.len() != b.len() || a.is_empty() || a_norm == 0.0 || b_norm == 0.0 {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    dot / (a_norm * b_norm)
}

pub(super) fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode() {
        let rows = [vec![1.0, 0.0, -2.5], vec![0.25, 3.0, 1.0]];
        let bytes = encode_vectors(3, rows.iter().map(Vec::as_slice)).unwrap();
        assert_eq!(bytes.len(), HEADER_LEN + 2 * 3 * 4);

        let (dimension, decoded) = decode_vectors(&bytes).unwrap();
        assert_eq!(dimension, 3);
        assert_eq!(decoded, rows);
    }

    #[test]
    fn test_encode_rejects_wrong_length() {
        let rows = [vec![1.0, 0.0]];
        let err = encode_vectors(3, rows.iter().map(Vec::as_slice)).unwrap_err();
        assert!(matches!(err, DomainError::DataIntegrity(_)));
    }

    #[test]
    fn test_decode_rejects_truncated_body() {
        let rows = [vec![1.0, 2.0]];
        let mut bytes = encode_vectors(2, rows.iter().map(Vec::as_slice)).unwrap();
        bytes.truncate(bytes.len() - 2);
        assert!(matches!(
            decode_vectors(&bytes),
            Err(DomainError::DataIntegrity(_))
        ));
    }

    #[test]
    fn test_decode_rejects_bad_magic() {
        let bytes = vec![0u8; HEADER_LEN];
        assert!(decode_vectors(&bytes).is_err());
    }

    #[test]
    fn test_cosine() {
        let sim = |a: &[f32], b: &[f32]| cosine(a, norm(a), b, norm(b));
        assert!((sim(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(sim(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((sim(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert!(sim(&[0.0, 0.0], &[1.0, 0.0]).abs() < f32::EPSILON);
        assert!(sim(&[1.0], &[1.0, 0.0]).abs() < f32::EPSILON);
    }
}
