//! On-disk inputs for a small three-component run.
//!
//! Component 1 follows the first realignment parameter, component 2 lives on
//! the edge shell, component 3 has an empty map and a constant time course.

use aroma_rs::nifti_io::{write_volume, NiftiHeader};
use ndarray::{Array3, Array4};
use std::f64::consts::PI;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

pub const T: usize = 100;
const GRID: usize = 4;

pub struct Fixture {
    pub dir: tempfile::TempDir,
    pub mix: PathBuf,
    pub motion: PathBuf,
    pub ic_maps: PathBuf,
    pub brain_mask: PathBuf,
    pub edge_mask: PathBuf,
    pub csf_mask: PathBuf,
    pub data: PathBuf,
}

impl Fixture {
    pub fn out_dir(&self) -> PathBuf {
        self.dir.path().join("aroma_out")
    }

    /// Required `aroma run` arguments except `--out-dir`
    pub fn input_args(&self) -> Vec<String> {
        let pairs = [
            ("--mix", &self.mix),
            ("--motion", &self.motion),
            ("--ic-maps", &self.ic_maps),
            ("--brain-mask", &self.brain_mask),
            ("--edge-mask", &self.edge_mask),
            ("--csf-mask", &self.csf_mask),
        ];
        pairs
            .iter()
            .flat_map(|(flag, path)| [flag.to_string(), path.display().to_string()])
            .collect()
    }
}

fn sine(cycles: f64, t: usize) -> f64 {
    (2.0 * PI * cycles * t as f64 / T as f64).sin()
}

fn motion_row(t: usize) -> [f64; 6] {
    let x = 2.0 * PI * t as f64 / T as f64;
    [
        x.sin(),
        (2.0 * x).cos(),
        0.01 * t as f64,
        (3.0 * x).sin(),
        0.5 * x.cos(),
        0.2 * (2.0 * x).sin(),
    ]
}

fn time_courses(t: usize) -> [f64; 3] {
    [motion_row(t)[0], sine(7.0, t), 1.0]
}

fn on_shell(x: usize, y: usize, z: usize) -> bool {
    [x, y, z].iter().any(|&c| c == 0 || c == GRID - 1)
}

fn write_table(path: &Path, rows: impl Iterator<Item = Vec<f64>>) {
    let mut text = String::new();
    for row in rows {
        let cells: Vec<String> = row.iter().map(|v| format!("{:e}", v)).collect();
        writeln!(text, "{}", cells.join("  ")).unwrap();
    }
    std::fs::write(path, text).unwrap();
}

pub fn build(tr: f32) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let shape = (GRID, GRID, GRID);

    let mix = root.join("melodic_mix");
    write_table(&mix, (0..T).map(|t| time_courses(t).to_vec()));

    let motion = root.join("mc.par");
    write_table(&motion, (0..T).map(|t| motion_row(t).to_vec()));

    let ic_maps = root.join("melodic_IC_thr_MNI2mm.nii.gz");
    let maps = Array4::from_shape_fn((GRID, GRID, GRID, 3), |(x, y, z, k)| match k {
        0 if (x, y, z) == (2, 2, 2) => 4.0,
        1 if on_shell(x, y, z) => 1.5,
        _ => 0.0,
    });
    write_volume(&ic_maps, &maps, None).unwrap();

    let brain_mask = root.join("mask_csf_brain.nii.gz");
    write_volume(&brain_mask, &Array3::from_elem(shape, 1.0), None).unwrap();

    let edge_mask = root.join("mask_edge.nii.gz");
    let edge = Array3::from_shape_fn(shape, |(x, y, z)| if on_shell(x, y, z) { 1.0 } else { 0.0 });
    write_volume(&edge_mask, &edge, None).unwrap();

    let csf_mask = root.join("mask_csf.nii.gz");
    let csf = Array3::from_shape_fn(shape, |p| if p == (1, 1, 1) { 1.0 } else { 0.0 });
    write_volume(&csf_mask, &csf, None).unwrap();

    let data = root.join("filtered_func_data.nii.gz");
    let series = Array4::from_shape_fn((2, 2, 2, T), |(x, y, z, t)| {
        let v = (x + 2 * y + 4 * z) as f64;
        let [a, b, c] = time_courses(t);
        100.0 + 10.0 * v + (1.0 + v) * a + 0.5 * b + 2.0 * c
    });
    let header = NiftiHeader {
        pixdim: [1.0, 2.0, 2.0, 2.0, tr, 1.0, 1.0, 1.0],
        xyzt_units: 2 | 8,
        ..NiftiHeader::default()
    };
    write_volume(&data, &series, Some(&header)).unwrap();

    Fixture {
        dir,
        mix,
        motion,
        ic_maps,
        brain_mask,
        edge_mask,
        csf_mask,
        data,
    }
}
