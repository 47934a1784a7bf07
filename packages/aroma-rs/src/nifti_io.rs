//! NIfTI-1 volume reading and writing (`.nii` and `.nii.gz`).

use crate::error::{AromaError, Result};
use ndarray::{Array, Array3, Array4, ArrayD, Axis, Dimension, Ix3, Ix4, RemoveAxis};
use nifti::writer::WriterOptions;
use nifti::{IntoNdArray, NiftiObject, ReaderOptions};

pub use nifti::NiftiHeader;
use std::path::Path;

// xyzt_units time bits
const NIFTI_UNITS_MSEC: u8 = 16;
const NIFTI_UNITS_USEC: u8 = 24;
const TIME_UNITS_MASK: u8 = 0x38;

fn nifti_error(path: &Path, e: impl std::fmt::Display) -> AromaError {
    AromaError::Nifti(format!("{}: {}", path.display(), e))
}

fn read_dyn(path: &Path) -> Result<(ArrayD<f64>, NiftiHeader)> {
    let obj = ReaderOptions::new()
        .read_file(path)
        .map_err(|e| nifti_error(path, e))?;
    let header = obj.header().clone();
    let data = obj
        .into_volume()
        .into_ndarray::<f64>()
        .map_err(|e| nifti_error(path, e))?;
    log::debug!("Read NIfTI {:?}: shape {:?}", path, data.shape());
    Ok((data, header))
}

fn to_4d(path: &Path, data: ArrayD<f64>) -> Result<Array4<f64>> {
    match data.ndim() {
        3 => data
            .into_dimensionality::<Ix3>()
            .map(|v| v.insert_axis(Axis(3)))
            .map_err(|e| nifti_error(path, e)),
        4 => data
            .into_dimensionality::<Ix4>()
            .map_err(|e| nifti_error(path, e)),
        n => Err(AromaError::Nifti(format!(
            "{}: expected a 3-D or 4-D image, found {}-D",
            path.display(),
            n
        ))),
    }
}

/// Read a single 3-D volume. A 4-D image with exactly one volume is accepted.
pub fn read_volume_3d(path: &Path) -> Result<Array3<f64>> {
    let (data, _) = read_dyn(path)?;
    let data = to_4d(path, data)?;
    if data.len_of(Axis(3)) != 1 {
        return Err(AromaError::Nifti(format!(
            "{}: expected a single volume, found {}",
            path.display(),
            data.len_of(Axis(3))
        )));
    }
    Ok(data.index_axis_move(Axis(3), 0))
}

/// Read a 4-D series together with its header
pub fn read_volume_4d(path: &Path) -> Result<(Array4<f64>, NiftiHeader)> {
    let (data, header) = read_dyn(path)?;
    let data = to_4d(path, data)?;
    log::info!(
        "NIfTI series loaded: {:?}, {:?} voxels, {} volumes",
        path,
        &data.shape()[..3],
        data.len_of(Axis(3))
    );
    Ok((data, header))
}

/// Read thresholded component maps stacked along the fourth axis, one
/// volume per component
pub fn read_component_maps(path: &Path) -> Result<Vec<Array3<f64>>> {
    let (data, _) = read_dyn(path)?;
    let data = to_4d(path, data)?;
    Ok(data
        .axis_iter(Axis(3))
        .map(|volume| volume.to_owned())
        .collect())
}

/// Repetition time in seconds from `pixdim[4]`, honouring the time units.
/// `None` when the header carries no positive value.
pub fn repetition_time(header: &NiftiHeader) -> Option<f64> {
    let raw = header.pixdim[4] as f64;
    if !raw.is_finite() || raw <= 0.0 {
        return None;
    }
    let seconds = match header.xyzt_units & TIME_UNITS_MASK {
        NIFTI_UNITS_MSEC => raw * 1e-3,
        NIFTI_UNITS_USEC => raw * 1e-6,
        _ => raw,
    };
    Some(seconds)
}

/// Write a volume as 32-bit float. Geometry and timing come from `reference`
/// when given; intensity scaling is reset since the data is written unscaled.
pub fn write_volume<D>(
    path: &Path,
    data: &Array<f64, D>,
    reference: Option<&NiftiHeader>,
) -> Result<()>
where
    D: Dimension + RemoveAxis,
{
    let values = data.mapv(|v| v as f32);
    let reference = reference.map(|header| {
        let mut header = header.clone();
        header.scl_slope = 1.0;
        header.scl_inter = 0.0;
        header
    });

    let mut options = WriterOptions::new(path);
    if let Some(ref header) = reference {
        options = options.reference_header(header);
    }
    options
        .write_nifti(&values)
        .map_err(|e| nifti_error(path, e))?;
    log::info!("Wrote {:?} {:?}", path, data.shape());
    Ok(())
}
