//! Raw NRRD writer used to hand volumes to external tools.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{FlexCropError, Result};
use crate::geometry::Matrix;
use crate::volume::Volume;

/// Header for a float volume of `dim = (depth, height, width)`, in RAS space.
pub fn header(ijk_to_ras: &Matrix, dim: (usize, usize, usize)) -> String {
    let (depth, height, width) = dim;
    let m = ijk_to_ras;
    let direction = |axis: usize| format!("({},{},{})", m[(0, axis)], m[(1, axis)], m[(2, axis)]);
    let endian = if cfg!(target_endian = "little") {
        "little"
    } else {
        "big"
    };

    format!(
        "NRRD0004\n\
         type: float\n\
         dimension: 3\n\
         space: right-anterior-superior\n\
         sizes: {width} {height} {depth}\n\
         space directions: {} {} {}\n\
         kinds: domain domain domain\n\
         endian: {endian}\n\
         encoding: raw\n\
         space origin: ({},{},{})\n\n",
        direction(0),
        direction(1),
        direction(2),
        m[(0, 3)],
        m[(1, 3)],
        m[(2, 3)],
    )
}

/// Write `volume` as a single-file raw NRRD. The voxel geometry is the
/// volume's own IJK→RAS matrix; parent transforms are not applied.
pub fn write_volume(volume: &Volume, path: impl AsRef<Path>) -> Result<()> {
    write_placed_volume(volume, &Matrix::identity(), path)
}

/// Like [`write_volume`], with `placement` applied on top of the volume's
/// IJK→RAS matrix. Used to hand over a volume nested under transforms.
pub fn write_placed_volume(volume: &Volume, placement: &Matrix, path: impl AsRef<Path>) -> Result<()> {
    let image = volume.data().ok_or_else(|| {
        FlexCropError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "volume has no image data",
        ))
    })?;
    let contiguous = image.as_standard_layout();
    let voxels = contiguous
        .as_slice()
        .ok_or_else(|| FlexCropError::Io(std::io::Error::other("image is not contiguous")))?;

    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    let ijk_to_ras = placement * volume.ijk_to_ras;
    writer.write_all(header(&ijk_to_ras, image.dim()).as_bytes())?;
    writer.write_all(bytemuck::cast_slice(voxels))?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Translation3;
    use ndarray::Array3;

    #[test]
    fn header_lists_sizes_fastest_axis_first() {
        let mut ijk_to_ras = Matrix::identity();
        ijk_to_ras[(0, 0)] = -0.5;
        ijk_to_ras[(2, 3)] = 12.5;
        let text = header(&ijk_to_ras, (2, 3, 4));
        assert!(text.starts_with("NRRD0004\n"));
        assert!(text.contains("sizes: 4 3 2\n"));
        assert!(text.contains("space directions: (-0.5,0,0) (0,1,0) (0,0,1)\n"));
        assert!(text.contains("space origin: (0,0,12.5)\n"));
        assert!(text.ends_with("\n\n"));
    }

    #[test]
    fn placement_moves_the_written_origin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("placed.nrrd");
        let volume = Volume::new(Array3::zeros((1, 1, 1)), Matrix::identity());
        let placement = Translation3::new(0.0, 0.0, 20.0).to_homogeneous();
        write_placed_volume(&volume, &placement, &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("space origin: (0,0,20)\n"));
    }
}
