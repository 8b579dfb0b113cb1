//! Reader for ITK text transform files (`#Insight Transform File V1.0`).
//!
//! Registration tools write the transform that maps fixed-image points to
//! moving-image points, in LPS coordinates. [`read_transform_file`] returns
//! the opposite direction in RAS: the matrix that carries the moving volume
//! onto the fixed one, suitable as the `to_parent` of the moving volume's
//! transform node.

use std::fs;
use std::path::Path;

use nalgebra::{Matrix3, Quaternion, Rotation3, UnitQuaternion, Vector3};

use crate::error::{FlexCropError, Result};
use crate::geometry::{Matrix, lps_to_ras};

const MAGIC: &str = "#Insight Transform File V1.0";

#[derive(Clone, Debug, Default, PartialEq)]
struct Entry {
    kind: String,
    parameters: Vec<f64>,
    fixed_parameters: Vec<f64>,
}

fn invalid(message: impl Into<String>) -> FlexCropError {
    FlexCropError::InvalidTransformFile(message.into())
}

fn parse_numbers(field: &str, text: &str) -> Result<Vec<f64>> {
    text.split_whitespace()
        .map(|token| {
            token
                .parse::<f64>()
                .map_err(|_| invalid(format!("bad number {token:?} in {field}")))
        })
        .collect()
}

fn parse_entries(text: &str) -> Result<Vec<Entry>> {
    let mut lines = text.lines().map(str::trim).filter(|line| !line.is_empty());
    match lines.next() {
        Some(MAGIC) => {}
        _ => return Err(invalid("missing Insight Transform File header")),
    }

    let mut entries: Vec<Entry> = Vec::new();
    for line in lines {
        if line.starts_with('#') {
            continue;
        }
        let (key, value) = line
            .split_once(':')
            .ok_or_else(|| invalid(format!("unexpected line {line:?}")))?;
        let value = value.trim();
        match key.trim() {
            "Transform" => entries.push(Entry {
                kind: value.to_string(),
                ..Entry::default()
            }),
            "Parameters" => {
                let entry = entries
                    .last_mut()
                    .ok_or_else(|| invalid("Parameters before Transform"))?;
                entry.parameters = parse_numbers("Parameters", value)?;
            }
            "FixedParameters" => {
                let entry = entries
                    .last_mut()
                    .ok_or_else(|| invalid("FixedParameters before Transform"))?;
                entry.fixed_parameters = parse_numbers("FixedParameters", value)?;
            }
            other => return Err(invalid(format!("unknown field {other:?}"))),
        }
    }
    Ok(entries)
}

fn expect_len(entry: &Entry, parameters: usize) -> Result<()> {
    if entry.parameters.len() != parameters {
        return Err(invalid(format!(
            "{} expects {parameters} parameters, found {}",
            entry.kind,
            entry.parameters.len()
        )));
    }
    Ok(())
}

/// `x -> A (x - c) + t + c` as a homogeneous matrix.
fn matrix_offset(linear: Matrix3<f64>, translation: Vector3<f64>, center: Vector3<f64>) -> Matrix {
    let offset = translation + center - linear * center;
    let mut matrix = linear.to_homogeneous();
    matrix.fixed_view_mut::<3, 1>(0, 3).copy_from(&offset);
    matrix
}

fn center_of(entry: &Entry) -> Result<Vector3<f64>> {
    match entry.fixed_parameters.as_slice() {
        [] => Ok(Vector3::zeros()),
        [x, y, z, ..] => Ok(Vector3::new(*x, *y, *z)),
        _ => Err(invalid(format!("{} has a malformed center", entry.kind))),
    }
}

/// Fixed→moving LPS matrix for one entry.
fn entry_matrix(entry: &Entry) -> Result<Matrix> {
    let base = entry.kind.split('_').next().unwrap_or_default();
    let p = &entry.parameters;
    match base {
        "AffineTransform" | "MatrixOffsetTransformBase" => {
            expect_len(entry, 12)?;
            let linear = Matrix3::from_row_slice(&p[..9]);
            Ok(matrix_offset(linear, Vector3::new(p[9], p[10], p[11]), center_of(entry)?))
        }
        "VersorRigid3DTransform" => {
            expect_len(entry, 6)?;
            let vector = Vector3::new(p[0], p[1], p[2]);
            let w = (1.0 - vector.norm_squared()).max(0.0).sqrt();
            let versor = UnitQuaternion::from_quaternion(Quaternion::new(w, p[0], p[1], p[2]));
            let linear = versor.to_rotation_matrix().into_inner();
            Ok(matrix_offset(linear, Vector3::new(p[3], p[4], p[5]), center_of(entry)?))
        }
        "Euler3DTransform" => {
            expect_len(entry, 6)?;
            let rx = Rotation3::from_axis_angle(&Vector3::x_axis(), p[0]);
            let ry = Rotation3::from_axis_angle(&Vector3::y_axis(), p[1]);
            let rz = Rotation3::from_axis_angle(&Vector3::z_axis(), p[2]);
            // The fourth fixed parameter selects ZYX over the default ZXY order.
            let compute_zyx = entry.fixed_parameters.get(3).is_some_and(|flag| *flag != 0.0);
            let linear = if compute_zyx {
                (rz * ry * rx).into_inner()
            } else {
                (rz * rx * ry).into_inner()
            };
            Ok(matrix_offset(linear, Vector3::new(p[3], p[4], p[5]), center_of(entry)?))
        }
        other => Err(invalid(format!("unsupported transform type {other:?}"))),
    }
}

/// Parse transform file text into the moving→fixed RAS matrix.
pub fn parse_transform(text: &str) -> Result<Matrix> {
    let entries: Vec<Entry> = parse_entries(text)?
        .into_iter()
        .filter(|entry| !entry.kind.starts_with("CompositeTransform"))
        .collect();

    let entry = match entries.as_slice() {
        [entry] => entry,
        [] => return Err(invalid("no transform found")),
        _ => return Err(invalid("only single-transform files are supported")),
    };

    let fixed_to_moving_lps = entry_matrix(entry)?;
    let flip = lps_to_ras();
    let fixed_to_moving_ras = flip * fixed_to_moving_lps * flip;
    fixed_to_moving_ras
        .try_inverse()
        .ok_or(FlexCropError::SingularTransform)
}

pub fn read_transform_file(path: impl AsRef<Path>) -> Result<Matrix> {
    parse_transform(&fs::read_to_string(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translation_of(matrix: &Matrix) -> Vector3<f64> {
        matrix.fixed_view::<3, 1>(0, 3).into_owned()
    }

    #[test]
    fn versor_translation_is_inverted_and_flipped() {
        let text = "#Insight Transform File V1.0\n\
                    #Transform 0\n\
                    Transform: VersorRigid3DTransform_double_3_3\n\
                    Parameters: 0 0 0 1 2 3\n\
                    FixedParameters: 10 10 10\n";
        let matrix = parse_transform(text).unwrap();
        assert!(matrix.fixed_view::<3, 3>(0, 0).is_identity(1e-12));
        let t = translation_of(&matrix);
        assert!((t - Vector3::new(1.0, 2.0, -3.0)).norm() < 1e-12);
    }

    #[test]
    fn affine_rotation_about_center() {
        // Quarter turn about z, centered at (1, 0, 0) in LPS.
        let text = "#Insight Transform File V1.0\n\
                    Transform: AffineTransform_double_3_3\n\
                    Parameters: 0 -1 0 1 0 0 0 0 1 0 0 0\n\
                    FixedParameters: 1 0 0\n";
        let matrix = parse_transform(text).unwrap();
        // Fixed→moving maps the center onto itself, so its RAS image (-1, 0, 0)
        // is a fixed point of the inverse as well.
        let p = matrix.transform_point(&nalgebra::Point3::new(-1.0, 0.0, 0.0));
        assert!((p.coords - Vector3::new(-1.0, 0.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn composite_wrapper_is_skipped() {
        let text = "#Insight Transform File V1.0\n\
                    #Transform 0\n\
                    Transform: CompositeTransform_double_3_3\n\
                    #Transform 1\n\
                    Transform: Euler3DTransform_double_3_3\n\
                    Parameters: 0 0 0 0 0 5\n\
                    FixedParameters: 0 0 0 0\n";
        let matrix = parse_transform(text).unwrap();
        assert!((translation_of(&matrix) - Vector3::new(0.0, 0.0, -5.0)).norm() < 1e-12);
    }

    #[test]
    fn euler_honours_the_zyx_flag() {
        let euler = |flag: u8| {
            format!(
                "#Insight Transform File V1.0\n\
                 Transform: Euler3DTransform_double_3_3\n\
                 Parameters: 0.3 0.5 0 0 0 0\n\
                 FixedParameters: 0 0 0 {flag}\n"
            )
        };
        let rx = Rotation3::from_axis_angle(&Vector3::x_axis(), 0.3);
        let ry = Rotation3::from_axis_angle(&Vector3::y_axis(), 0.5);
        let flip = lps_to_ras();
        let expected = |rotation: Rotation3<f64>| {
            (flip * rotation.to_homogeneous() * flip).try_inverse().unwrap()
        };

        let zxy = parse_transform(&euler(0)).unwrap();
        let zyx = parse_transform(&euler(1)).unwrap();
        assert!((zxy - expected(rx * ry)).norm() < 1e-12);
        assert!((zyx - expected(ry * rx)).norm() < 1e-12);
        assert!((zxy - zyx).norm() > 1e-3);
    }

    #[test]
    fn rejects_missing_header_and_unknown_types() {
        assert!(matches!(
            parse_transform("Transform: AffineTransform_double_3_3\n"),
            Err(FlexCropError::InvalidTransformFile(_))
        ));
        let text = "#Insight Transform File V1.0\nTransform: BSplineTransform_double_3_3\nParameters: 1\n";
        assert!(matches!(
            parse_transform(text),
            Err(FlexCropError::InvalidTransformFile(_))
        ));
    }

    #[test]
    fn rejects_wrong_parameter_count() {
        let text = "#Insight Transform File V1.0\nTransform: VersorRigid3DTransform_double_3_3\nParameters: 0 0 0 1\n";
        assert!(parse_transform(text).is_err());
    }
}
