use crate::{Error, Result};

pub fn encode(vec: &[f32]) -> Vec<u8> {
	vec.iter().flat_map(|value| value.to_le_bytes()).collect()
}

pub fn decode(blob: &[u8]) -> Result<Vec<f32>> {
	if blob.len() % 4 != 0 {
		return Err(Error::Malformed(format!(
			"Embedding blob length {} is not a multiple of 4.",
			blob.len()
		)));
	}

	Ok(blob
		.chunks_exact(4)
		.map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
		.collect())
}

/// Cosine distance in `[0, 2]`. Vectors with no direction are treated as unrelated (distance 1).
pub fn cosine_distance(lhs: &[f32], rhs: &[f32]) -> f32 {
	if lhs.is_empty() || lhs.len() != rhs.len() {
		return 1.0;
	}

	let mut dot = 0.0_f32;
	let mut lhs_norm = 0.0_f32;
	let mut rhs_norm = 0.0_f32;

	for (l, r) in lhs.iter().zip(rhs.iter()) {
		dot += l * r;
		lhs_norm += l * l;
		rhs_norm += r * r;
	}

	if lhs_norm <= f32::EPSILON || rhs_norm <= f32::EPSILON {
		return 1.0;
	}

	1.0 - (dot / (lhs_norm.sqrt() * rhs_norm.sqrt())).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn blob_codec_is_little_endian() {
		let blob = encode(&[1.0, -0.5]);

		assert_eq!(blob, [0, 0, 128, 63, 0, 0, 0, 191]);
		assert_eq!(decode(&blob).expect("Failed to decode blob."), vec![1.0, -0.5]);
	}

	#[test]
	fn truncated_blob_is_malformed() {
		assert!(matches!(decode(&[0, 0, 128]), Err(Error::Malformed(_))));
	}

	#[test]
	fn cosine_distance_orders_by_angle() {
		let query = [0.1, 0.9, 0.0];
		let near = cosine_distance(&query, &[0.0, 1.0, 0.0]);
		let far = cosine_distance(&query, &[1.0, 0.0, 0.0]);

		assert!(near < far);
		assert!(cosine_distance(&[1.0, 0.0], &[2.0, 0.0]).abs() < 1e-6);
		assert!((cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]) - 2.0).abs() < 1e-6);
		assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
	}
}
