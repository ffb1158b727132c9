//! Binary encode/decode for cache files.
//!
//! All integers are little-endian, fixed width. A weight-matrix entry is
//! `i64 rows`, `i64 cols`, `i64 triplet_count`, then `triplet_count`
//! repetitions of `i64 row`, `i64 col`, `f64 weight`. A mask entry is
//! `i64 length` followed by one byte per point (0 or 1). No magic, no
//! padding, no self-describing schema; the decoder validates everything
//! it reads instead.

use std::io::{Read, Write};

use crate::error::CacheError;
use crate::mask::Mask;
use crate::matrix::{Triplet, WeightMatrix};

// ── Primitive writers ───────────────────────────────────────────

/// Write a little-endian i64.
pub fn write_i64_le(w: &mut dyn Write, v: i64) -> Result<(), CacheError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a little-endian f64.
pub fn write_f64_le(w: &mut dyn Write, v: f64) -> Result<(), CacheError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

// ── Primitive readers ───────────────────────────────────────────

/// Read a little-endian i64.
pub fn read_i64_le(r: &mut dyn Read) -> Result<i64, CacheError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(i64::from_le_bytes(buf))
}

/// Read a little-endian f64.
pub fn read_f64_le(r: &mut dyn Read) -> Result<f64, CacheError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

// ── Matrix encode/decode ────────────────────────────────────────

/// Encode a weight matrix.
pub fn encode_matrix(w: &mut dyn Write, matrix: &WeightMatrix) -> Result<(), CacheError> {
    write_i64_le(w, matrix.rows() as i64)?;
    write_i64_le(w, matrix.cols() as i64)?;
    write_i64_le(w, matrix.triplet_count() as i64)?;
    for t in matrix.triplets() {
        write_i64_le(w, t.row as i64)?;
        write_i64_le(w, t.col as i64)?;
        write_f64_le(w, t.weight)?;
    }
    Ok(())
}

/// Decode a weight matrix, validating it against the expected shape.
///
/// # Errors
///
/// Returns [`CacheError::ShapeMismatch`] when the recorded shape differs
/// from `(expected_rows, expected_cols)`, and [`CacheError::Malformed`]
/// for negative counts, out-of-bounds triplets, truncation mid-triplet,
/// or trailing bytes after the declared triplet count.
pub fn decode_matrix(
    r: &mut dyn Read,
    expected_rows: usize,
    expected_cols: usize,
) -> Result<WeightMatrix, CacheError> {
    let rows = read_i64_le(r)?;
    let cols = read_i64_le(r)?;
    let count = read_i64_le(r)?;
    if rows < 0 || cols < 0 || count < 0 {
        return Err(CacheError::Malformed {
            detail: format!("negative header field ({rows}/{cols}/{count})"),
        });
    }
    let (rows, cols) = (rows as usize, cols as usize);
    if rows != expected_rows || cols != expected_cols {
        return Err(CacheError::ShapeMismatch {
            expected: (expected_rows, expected_cols),
            found: (rows, cols),
        });
    }

    let mut triplets = Vec::with_capacity((count as usize).min(1 << 20));
    for i in 0..count {
        let row = read_i64_le(r).map_err(|e| truncated(e, i, count))?;
        let col = read_i64_le(r).map_err(|e| truncated(e, i, count))?;
        let weight = read_f64_le(r).map_err(|e| truncated(e, i, count))?;
        if row < 0 || col < 0 {
            return Err(CacheError::Malformed {
                detail: format!("negative triplet index ({row}, {col})"),
            });
        }
        triplets.push(Triplet {
            row: row as u64,
            col: col as u64,
            weight,
        });
    }
    expect_eof(r)?;

    WeightMatrix::from_triplets(rows, cols, triplets).map_err(|e| CacheError::Malformed {
        detail: e.to_string(),
    })
}

// ── Mask encode/decode ──────────────────────────────────────────

/// Encode a mask's per-point flags.
pub fn encode_mask(w: &mut dyn Write, mask: &Mask) -> Result<(), CacheError> {
    write_i64_le(w, mask.len() as i64)?;
    for &p in mask.points() {
        w.write_all(&[u8::from(p)])?;
    }
    Ok(())
}

/// Decode a mask's per-point flags, validating the expected length.
///
/// # Errors
///
/// Returns [`CacheError::ShapeMismatch`] when the recorded length differs
/// from `expected_len`, and [`CacheError::Malformed`] for negative
/// lengths, bytes other than 0/1, truncation, or trailing bytes.
pub fn decode_mask(r: &mut dyn Read, expected_len: usize) -> Result<Vec<bool>, CacheError> {
    let len = read_i64_le(r)?;
    if len < 0 {
        return Err(CacheError::Malformed {
            detail: format!("negative mask length {len}"),
        });
    }
    let len = len as usize;
    if len != expected_len {
        return Err(CacheError::ShapeMismatch {
            expected: (expected_len, 1),
            found: (len, 1),
        });
    }
    let mut bytes = vec![0u8; len];
    r.read_exact(&mut bytes)?;
    expect_eof(r)?;
    bytes
        .into_iter()
        .map(|b| match b {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(CacheError::Malformed {
                detail: format!("mask byte {other} is neither 0 nor 1"),
            }),
        })
        .collect()
}

fn truncated(e: CacheError, at: i64, count: i64) -> CacheError {
    match e {
        CacheError::Io(io) if io.kind() == std::io::ErrorKind::UnexpectedEof => {
            CacheError::Malformed {
                detail: format!("{count} triplets declared, data ends at triplet {at}"),
            }
        }
        other => other,
    }
}

fn expect_eof(r: &mut dyn Read) -> Result<(), CacheError> {
    let mut probe = [0u8; 1];
    match r.read(&mut probe)? {
        0 => Ok(()),
        _ => Err(CacheError::Malformed {
            detail: "trailing bytes after declared entry count".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn roundtrip(matrix: &WeightMatrix) -> Result<WeightMatrix, CacheError> {
        let mut buf = Vec::new();
        encode_matrix(&mut buf, matrix).unwrap();
        decode_matrix(&mut buf.as_slice(), matrix.rows(), matrix.cols())
    }

    fn sample_matrix() -> WeightMatrix {
        WeightMatrix::from_triplets(
            4,
            3,
            vec![
                Triplet {
                    row: 0,
                    col: 0,
                    weight: 0.25,
                },
                Triplet {
                    row: 2,
                    col: 1,
                    weight: 0.5,
                },
                Triplet {
                    row: 3,
                    col: 2,
                    weight: 1.0,
                },
            ],
        )
        .unwrap()
    }

    #[test]
    fn matrix_roundtrip_zero_one_many() {
        let zero = WeightMatrix::zero(3, 5);
        assert_eq!(roundtrip(&zero).unwrap(), zero);

        let one = WeightMatrix::from_triplets(
            1,
            1,
            vec![Triplet {
                row: 0,
                col: 0,
                weight: 1.0,
            }],
        )
        .unwrap();
        assert_eq!(roundtrip(&one).unwrap(), one);

        let many = sample_matrix();
        assert_eq!(roundtrip(&many).unwrap(), many);
    }

    #[test]
    fn shape_mismatch_is_reported() {
        let mut buf = Vec::new();
        encode_matrix(&mut buf, &sample_matrix()).unwrap();
        let err = decode_matrix(&mut buf.as_slice(), 5, 3).unwrap_err();
        assert!(matches!(
            err,
            CacheError::ShapeMismatch {
                expected: (5, 3),
                found: (4, 3)
            }
        ));
    }

    #[test]
    fn truncated_data_is_malformed() {
        let mut buf = Vec::new();
        encode_matrix(&mut buf, &sample_matrix()).unwrap();
        buf.truncate(buf.len() - 4);
        let err = decode_matrix(&mut buf.as_slice(), 4, 3).unwrap_err();
        assert!(matches!(err, CacheError::Malformed { .. }));
    }

    #[test]
    fn trailing_bytes_are_malformed() {
        let mut buf = Vec::new();
        encode_matrix(&mut buf, &sample_matrix()).unwrap();
        buf.push(0);
        let err = decode_matrix(&mut buf.as_slice(), 4, 3).unwrap_err();
        assert!(matches!(err, CacheError::Malformed { .. }));
    }

    #[test]
    fn negative_counts_are_malformed() {
        let mut buf = Vec::new();
        write_i64_le(&mut buf, 4).unwrap();
        write_i64_le(&mut buf, 3).unwrap();
        write_i64_le(&mut buf, -1).unwrap();
        let err = decode_matrix(&mut buf.as_slice(), 4, 3).unwrap_err();
        assert!(matches!(err, CacheError::Malformed { .. }));
    }

    #[test]
    fn out_of_bounds_triplet_is_malformed() {
        let mut buf = Vec::new();
        write_i64_le(&mut buf, 2).unwrap();
        write_i64_le(&mut buf, 2).unwrap();
        write_i64_le(&mut buf, 1).unwrap();
        write_i64_le(&mut buf, 2).unwrap(); // row == rows
        write_i64_le(&mut buf, 0).unwrap();
        write_f64_le(&mut buf, 1.0).unwrap();
        let err = decode_matrix(&mut buf.as_slice(), 2, 2).unwrap_err();
        assert!(matches!(err, CacheError::Malformed { .. }));
    }

    #[test]
    fn mask_roundtrip_and_validation() {
        let mask = Mask::new("m", vec![true, false, true]);
        let mut buf = Vec::new();
        encode_mask(&mut buf, &mask).unwrap();
        assert_eq!(
            decode_mask(&mut buf.as_slice(), 3).unwrap(),
            vec![true, false, true]
        );
        assert!(matches!(
            decode_mask(&mut buf.as_slice(), 4),
            Err(CacheError::ShapeMismatch { .. })
        ));

        let mut bad = buf.clone();
        bad[8] = 7;
        assert!(matches!(
            decode_mask(&mut bad.as_slice(), 3),
            Err(CacheError::Malformed { .. })
        ));
    }

    // ── Proptest strategies ─────────────────────────────────────

    fn arb_matrix() -> impl Strategy<Value = WeightMatrix> {
        (1usize..40, 1usize..40)
            .prop_flat_map(|(rows, cols)| {
                let triplet = (0..rows as u64, 0..cols as u64, -1e6f64..1e6).prop_map(
                    |(row, col, weight)| Triplet { row, col, weight },
                );
                (
                    Just(rows),
                    Just(cols),
                    prop::collection::vec(triplet, 0..64),
                )
            })
            .prop_map(|(rows, cols, triplets)| {
                WeightMatrix::from_triplets(rows, cols, triplets).unwrap()
            })
    }

    proptest! {
        #[test]
        fn matrix_roundtrip(matrix in arb_matrix()) {
            prop_assert_eq!(roundtrip(&matrix).unwrap(), matrix);
        }
    }
}
